//! Conversion from the `async-graphql` parser AST into the owned schema model.

use async_graphql::parser::types::{
    BaseType, ConstDirective, EnumValueDefinition, FieldDefinition as AstField,
    InputValueDefinition, Type, TypeDefinition as AstType, TypeKind as AstKind,
    TypeSystemDefinition,
};
use async_graphql::parser::{Positioned, parse_schema};
use tracing::debug;

use super::{
    Directive, Document, EnumValue, FieldDefinition, InputValue, ObjectType, SchemaRoots,
    TypeDefinition, TypeKind, TypeRef,
};
use crate::error::{TransformError, TransformResult};

/// Parse SDL into a [`Document`].
///
/// Directive definitions are dropped: the transform works from directive usages and the
/// gateway does not accept transformer directive declarations in the deployed schema.
pub fn parse_document(sdl: &str) -> TransformResult<Document> {
    let service = parse_schema(sdl).map_err(|e| TransformError::Parse(e.to_string()))?;

    let mut document = Document::default();
    for definition in service.definitions {
        match definition {
            TypeSystemDefinition::Type(ty) => document.types.push(convert_type(ty.node)),
            TypeSystemDefinition::Schema(schema) => {
                let schema = schema.node;
                let roots = SchemaRoots {
                    query: schema.query.map(|n| n.node.to_string()),
                    mutation: schema.mutation.map(|n| n.node.to_string()),
                    subscription: schema.subscription.map(|n| n.node.to_string()),
                };
                if let Some(query) = &roots.query {
                    document.query_type = query.clone();
                }
                document.explicit_schema = Some(roots);
            }
            TypeSystemDefinition::Directive(directive) => {
                debug!(directive = %directive.node.name.node, "Dropping directive definition");
            }
        }
    }

    Ok(document)
}

fn convert_type(ty: AstType) -> TypeDefinition {
    let kind = match ty.kind {
        AstKind::Scalar => TypeKind::Scalar,
        AstKind::Object(object) => TypeKind::Object(ObjectType {
            implements: object.implements.into_iter().map(|n| n.node.to_string()).collect(),
            fields: object.fields.into_iter().map(|f| convert_field(f.node)).collect(),
        }),
        AstKind::Interface(interface) => TypeKind::Interface(ObjectType {
            implements: interface
                .implements
                .into_iter()
                .map(|n| n.node.to_string())
                .collect(),
            fields: interface.fields.into_iter().map(|f| convert_field(f.node)).collect(),
        }),
        AstKind::Union(union) => {
            TypeKind::Union(union.members.into_iter().map(|n| n.node.to_string()).collect())
        }
        AstKind::Enum(enumeration) => TypeKind::Enum(
            enumeration
                .values
                .into_iter()
                .map(|v| convert_enum_value(v.node))
                .collect(),
        ),
        AstKind::InputObject(input) => TypeKind::InputObject(
            input
                .fields
                .into_iter()
                .map(|f| convert_input_value(f.node))
                .collect(),
        ),
    };

    TypeDefinition {
        name: ty.name.node.to_string(),
        description: ty.description.map(|d| d.node),
        extend: ty.extend,
        directives: convert_directives(ty.directives),
        kind,
    }
}

fn convert_field(field: AstField) -> FieldDefinition {
    FieldDefinition {
        name: field.name.node.to_string(),
        description: field.description.map(|d| d.node),
        arguments: field
            .arguments
            .into_iter()
            .map(|a| convert_input_value(a.node))
            .collect(),
        ty: convert_type_ref(&field.ty.node),
        directives: convert_directives(field.directives),
    }
}

fn convert_input_value(value: InputValueDefinition) -> InputValue {
    InputValue {
        name: value.name.node.to_string(),
        description: value.description.map(|d| d.node),
        ty: convert_type_ref(&value.ty.node),
        default_value: value.default_value.map(|v| v.node),
        directives: convert_directives(value.directives),
    }
}

fn convert_enum_value(value: EnumValueDefinition) -> EnumValue {
    EnumValue {
        name: value.value.node.to_string(),
        description: value.description.map(|d| d.node),
        directives: convert_directives(value.directives),
    }
}

fn convert_directives(directives: Vec<Positioned<ConstDirective>>) -> Vec<Directive> {
    directives
        .into_iter()
        .map(|d| Directive {
            name: d.node.name.node.to_string(),
            arguments: d
                .node
                .arguments
                .into_iter()
                .map(|(name, value)| (name.node.to_string(), value.node))
                .collect(),
        })
        .collect()
}

fn convert_type_ref(ty: &Type) -> TypeRef {
    let inner = match &ty.base {
        BaseType::Named(name) => TypeRef::Named(name.to_string()),
        BaseType::List(inner) => TypeRef::List(Box::new(convert_type_ref(inner))),
    };
    if ty.nullable {
        inner
    } else {
        TypeRef::NonNull(Box::new(inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::HasDirectives;

    #[test]
    fn test_parse_model_with_directives() {
        let doc = parse_document(
            r#"
            type Blog @model @count {
                id: ID!
                posts: [Post!]! @hasMany(indexName: "byBlog", fields: ["id"])
            }
            type Post @model { id: ID! }
            "#,
        )
        .unwrap();

        let blog = doc.get_type("Blog").unwrap();
        assert!(blog.has_directive("model"));
        assert!(blog.has_directive("count"));

        let posts = blog.as_object().unwrap().field("posts").unwrap();
        assert_eq!(posts.ty.to_string(), "[Post!]!");
        let has_many = posts.directive("hasMany").unwrap();
        assert!(has_many.argument("indexName").is_some());
    }

    #[test]
    fn test_schema_block_sets_query_root() {
        let doc = parse_document(
            r#"
            schema { query: RootQuery }
            type RootQuery { ping: String }
            "#,
        )
        .unwrap();
        assert_eq!(doc.query_type, "RootQuery");
        assert!(doc.explicit_schema.is_some());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = parse_document("type {").unwrap_err();
        assert!(matches!(err, TransformError::Parse(_)));
    }
}
