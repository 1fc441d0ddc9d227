//! Owned GraphQL schema model used by the transform.
//!
//! Input SDL is parsed with the parser re-exported by `async-graphql` and converted into
//! this model, which (unlike the parser's AST) is cheap to look up by name and to mutate.
//! The transform only ever adds definitions; it never reorders or removes user types.

mod naming;
mod parse;
mod print;
mod validate;

use std::fmt;

pub use async_graphql::Value;

pub use naming::{is_builtin_scalar, to_camel_case, to_pascal_case};
pub use parse::parse_document;
pub use print::print_document;
pub use validate::validate_document;

/// A reference to a type: `Foo`, `[Foo]`, `Foo!`, `[Foo!]!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    /// Name of the innermost named type, with every list and non-null wrapper stripped.
    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base_name(),
        }
    }

    /// Whether the type is a list once an outer non-null wrapper is removed.
    pub fn is_list(&self) -> bool {
        match self {
            TypeRef::List(_) => true,
            TypeRef::NonNull(inner) => matches!(**inner, TypeRef::List(_)),
            TypeRef::Named(_) => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

/// A directive occurrence, e.g. `@index(name: "byOwner")`.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<(String, Value)>,
}

impl Directive {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, value)| value)
    }
}

/// Lookup helpers shared by everything that carries directives.
pub trait HasDirectives {
    fn directives(&self) -> &[Directive];

    fn directive(&self, name: &str) -> Option<&Directive> {
        self.directives().iter().find(|d| d.name == name)
    }

    fn has_directive(&self, name: &str) -> bool {
        self.directive(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputValue {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
    pub directives: Vec<Directive>,
}

impl InputValue {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
            directives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<InputValue>,
    pub ty: TypeRef,
    pub directives: Vec<Directive>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            ty,
            directives: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: InputValue) -> Self {
        self.arguments.push(argument);
        self
    }
}

impl HasDirectives for FieldDefinition {
    fn directives(&self) -> &[Directive] {
        &self.directives
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub description: Option<String>,
    pub directives: Vec<Directive>,
}

impl EnumValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            directives: Vec::new(),
        }
    }
}

/// Fields of an object or interface type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectType {
    pub implements: Vec<String>,
    pub fields: Vec<FieldDefinition>,
}

impl ObjectType {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Scalar,
    Object(ObjectType),
    Interface(ObjectType),
    Union(Vec<String>),
    Enum(Vec<EnumValue>),
    InputObject(Vec<InputValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub name: String,
    pub description: Option<String>,
    pub extend: bool,
    pub directives: Vec<Directive>,
    pub kind: TypeKind,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            extend: false,
            directives: Vec::new(),
            kind,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match &self.kind {
            TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectType> {
        match &mut self.kind {
            TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }
}

impl HasDirectives for TypeDefinition {
    fn directives(&self) -> &[Directive] {
        &self.directives
    }
}

/// A parsed schema document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub types: Vec<TypeDefinition>,
    /// Name of the query root; `Query` unless a `schema { query: ... }` block says otherwise.
    pub query_type: String,
    /// Root types from an explicit `schema { ... }` block, if the source had one.
    pub explicit_schema: Option<SchemaRoots>,
}

/// Root operation types declared by a `schema { ... }` block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaRoots {
    pub query: Option<String>,
    pub mutation: Option<String>,
    pub subscription: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            types: Vec::new(),
            query_type: "Query".to_string(),
            explicit_schema: None,
        }
    }
}

impl Document {
    /// First non-extension definition with this name.
    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name == name && !t.extend)
    }

    pub fn get_type_mut(&mut self, name: &str) -> Option<&mut TypeDefinition> {
        self.types.iter_mut().find(|t| t.name == name && !t.extend)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.get_type(name).is_some()
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.get_type(name).and_then(TypeDefinition::as_object)
    }

    /// Add `definition` unless a type of the same name already exists.
    ///
    /// Returns `true` when the definition was added.
    pub fn add_type_if_absent(&mut self, definition: TypeDefinition) -> bool {
        if self.has_type(&definition.name) {
            return false;
        }
        self.types.push(definition);
        true
    }

    /// Add `field` to the object type `type_name` unless a field of that name exists.
    ///
    /// Returns `Some(true)` when added, `Some(false)` when the existing field was kept,
    /// and `None` when `type_name` is not an object type.
    pub fn add_field_if_absent(&mut self, type_name: &str, field: FieldDefinition) -> Option<bool> {
        let object = self
            .get_type_mut(type_name)
            .and_then(TypeDefinition::as_object_mut)?;
        if object.has_field(&field.name) {
            return Some(false);
        }
        object.fields.push(field);
        Some(true)
    }

    /// The query root, created empty if the document does not define one.
    pub fn query_type_mut(&mut self) -> &mut ObjectType {
        let name = self.query_type.clone();
        let position = match self
            .types
            .iter()
            .position(|t| t.name == name && !t.extend && t.as_object().is_some())
        {
            Some(position) => position,
            None => {
                self.types
                    .push(TypeDefinition::new(name, TypeKind::Object(ObjectType::default())));
                self.types.len() - 1
            }
        };
        match &mut self.types[position].kind {
            TypeKind::Object(object) => object,
            _ => unreachable!("query root is always an object type"),
        }
    }

    /// Add a field to the query root; existing fields with the same name win.
    pub fn add_query_field(&mut self, field: FieldDefinition) -> bool {
        let query = self.query_type_mut();
        if query.has_field(&field.name) {
            return false;
        }
        query.fields.push(field);
        true
    }

    /// Object types, in document order, skipping extensions.
    pub fn objects(&self) -> impl Iterator<Item = (&TypeDefinition, &ObjectType)> {
        self.types
            .iter()
            .filter(|t| !t.extend)
            .filter_map(|t| t.as_object().map(|o| (t, o)))
    }

    /// Remove every occurrence of the named directive from types and fields.
    pub fn strip_directive(&mut self, name: &str) {
        for definition in &mut self.types {
            definition.directives.retain(|d| d.name != name);
            if let TypeKind::Object(object) | TypeKind::Interface(object) = &mut definition.kind {
                for field in &mut object.fields {
                    field.directives.retain(|d| d.name != name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_unwrapping() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("Post"))));
        assert_eq!(ty.to_string(), "[Post!]!");
        assert_eq!(ty.base_name(), "Post");
        assert!(ty.is_list());
        assert!(!TypeRef::non_null(TypeRef::named("Int")).is_list());
    }

    #[test]
    fn test_query_root_created_on_demand() {
        let mut doc = Document::default();
        assert!(doc.add_query_field(FieldDefinition::new("countFoo", TypeRef::named("Int"))));
        assert!(!doc.add_query_field(FieldDefinition::new("countFoo", TypeRef::named("Int"))));
        assert_eq!(doc.object("Query").unwrap().fields.len(), 1);
    }

    #[test]
    fn test_add_field_to_non_object_fails() {
        let mut doc = Document::default();
        doc.add_type_if_absent(TypeDefinition::new("Color", TypeKind::Enum(vec![])));
        let result = doc.add_field_if_absent("Color", FieldDefinition::new("x", TypeRef::named("Int")));
        assert_eq!(result, None);
    }
}
