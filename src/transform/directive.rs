//! Directive processor: collects and validates every `@count` occurrence.
//!
//! Object-level occurrences are only recorded here; their `@model` companion is checked
//! by the synthesizer before it touches the document. Field-level occurrences are
//! validated eagerly and resolved into a [`CountFieldConfig`].

use std::fmt;

use tracing::debug;

use super::bindings::TableRef;
use super::{BindingStrategy, COUNT_DIRECTIVE, MODEL_DIRECTIVE, TransformOptions};
use crate::error::{TransformError, TransformResult};
use crate::schema::{
    Document, FieldDefinition, HasDirectives, ObjectType, TypeDefinition, TypeKind, Value,
    is_builtin_scalar, to_camel_case,
};

/// Counting semantics requested by `@count(type: ...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountType {
    #[default]
    Scan,
    /// Reserved. Rejected at validation time.
    Distinct,
}

impl fmt::Display for CountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountType::Scan => write!(f, "scan"),
            CountType::Distinct => write!(f, "distinct"),
        }
    }
}

/// Object-level `@count` on a model type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCount {
    pub type_name: String,
}

/// Where the counted value is exposed for a field-level `@count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Counter {
    /// Synthesized field on the related type.
    Shadow(String),
    /// Existing fields on the owning type named by `@count(fields: [...])`.
    Explicit(Vec<String>),
}

/// Resolved configuration for one field-level `@count`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountFieldConfig {
    pub owner_type: String,
    pub field_name: String,
    pub count_type: CountType,
    pub related_type: String,
    pub table: TableRef,
    pub counter: Counter,
}

impl CountFieldConfig {
    /// `(type, field)` pairs that receive a count resolver.
    pub fn bound_fields(&self) -> Vec<(String, String)> {
        match &self.counter {
            Counter::Shadow(name) => vec![(self.related_type.clone(), name.clone())],
            Counter::Explicit(names) => names
                .iter()
                .map(|name| (self.owner_type.clone(), name.clone()))
                .collect(),
        }
    }
}

/// One validated `@count` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountAnnotation {
    Object(ModelCount),
    Field(CountFieldConfig),
}

/// Shadow counter field name for `owner.field`: `<owner><Field>Id`.
///
/// The `Id` suffix matches the foreign-key naming the relationship transformer uses for
/// the same pair, even though the field holds a count.
pub fn shadow_field_name(owner: &str, field: &str) -> String {
    format!("{}Id", to_camel_case(&[owner, field]))
}

pub struct DirectiveProcessor<'a> {
    options: &'a TransformOptions,
}

impl<'a> DirectiveProcessor<'a> {
    pub fn new(options: &'a TransformOptions) -> Self {
        Self { options }
    }

    /// Visit every object type and collect its `@count` occurrences in document order.
    pub fn visit(&self, document: &Document) -> TransformResult<Vec<CountAnnotation>> {
        let mut annotations = Vec::new();

        for (definition, object) in document.objects() {
            if definition.has_directive(COUNT_DIRECTIVE) {
                debug!(type_name = %definition.name, "Found object-level @count");
                annotations.push(CountAnnotation::Object(ModelCount {
                    type_name: definition.name.clone(),
                }));
            }

            for field in object.fields.iter().filter(|f| f.has_directive(COUNT_DIRECTIVE)) {
                let config = self.visit_field(document, definition, object, field)?;
                debug!(
                    owner = %config.owner_type,
                    field = %config.field_name,
                    related = %config.related_type,
                    table = %config.table.table_name,
                    "Found field-level @count"
                );
                annotations.push(CountAnnotation::Field(config));
            }
        }

        Ok(annotations)
    }

    fn visit_field(
        &self,
        document: &Document,
        owner: &TypeDefinition,
        object: &ObjectType,
        field: &FieldDefinition,
    ) -> TransformResult<CountFieldConfig> {
        validate_model_presence(owner)?;

        let count_type = parse_count_type(owner, field)?;
        if count_type == CountType::Distinct {
            return Err(TransformError::UnsupportedCountType {
                type_name: owner.name.clone(),
                field_name: field.name.clone(),
                count_type: count_type.to_string(),
            });
        }

        let index_name = validate_relationship_or_index(owner, field, self.options.binding_strategy)?;
        validate_list_type(owner, field)?;

        let related_type = field.ty.base_name().to_string();
        if document.object(&related_type).is_none() {
            return Err(TransformError::UnresolvableRelatedType {
                type_name: owner.name.clone(),
                field_name: field.name.clone(),
                related: related_type,
            });
        }

        let counter = match parse_fields_argument(owner, field)? {
            Some(names) => {
                validate_explicit_fields(document, owner, object, field, &names)?;
                Counter::Explicit(names)
            }
            None => Counter::Shadow(shadow_field_name(&owner.name, &field.name)),
        };

        let table = TableRef::new(&related_type, self.options.table_name(&related_type), index_name);

        Ok(CountFieldConfig {
            owner_type: owner.name.clone(),
            field_name: field.name.clone(),
            count_type,
            related_type,
            table,
            counter,
        })
    }
}

pub fn validate_model_presence(definition: &TypeDefinition) -> TransformResult<()> {
    if definition.has_directive(MODEL_DIRECTIVE) {
        Ok(())
    } else {
        Err(TransformError::MissingModelAnnotation {
            type_name: definition.name.clone(),
        })
    }
}

/// Check the field carries the active strategy's directive.
///
/// Returns the index name under [`BindingStrategy::Index`].
pub fn validate_relationship_or_index(
    owner: &TypeDefinition,
    field: &FieldDefinition,
    strategy: BindingStrategy,
) -> TransformResult<Option<String>> {
    let missing = || TransformError::MissingRelationshipAnnotation {
        type_name: owner.name.clone(),
        field_name: field.name.clone(),
        expected: match strategy {
            BindingStrategy::Relationship => "@hasMany",
            BindingStrategy::Index => "@index",
        },
    };

    let directive = field.directive(strategy.directive()).ok_or_else(missing)?;
    match strategy {
        BindingStrategy::Relationship => Ok(None),
        BindingStrategy::Index => match directive.argument("name") {
            Some(Value::String(name)) if !name.is_empty() => Ok(Some(name.clone())),
            _ => Err(TransformError::InvalidArgument {
                type_name: owner.name.clone(),
                field_name: field.name.clone(),
                argument: "name".to_string(),
                reason: "@index needs a non-empty string name".to_string(),
            }),
        },
    }
}

pub fn validate_list_type(owner: &TypeDefinition, field: &FieldDefinition) -> TransformResult<()> {
    if field.ty.is_list() {
        Ok(())
    } else {
        Err(TransformError::NotAListType {
            type_name: owner.name.clone(),
            field_name: field.name.clone(),
            found: field.ty.to_string(),
        })
    }
}

/// Explicit counter fields must be non-empty, exist on the owner, and be scalar or enum
/// valued. The annotated relationship field itself is never a counter.
pub fn validate_explicit_fields(
    document: &Document,
    owner: &TypeDefinition,
    object: &ObjectType,
    field: &FieldDefinition,
    names: &[String],
) -> TransformResult<()> {
    if names.is_empty() {
        return Err(TransformError::EmptyFieldList {
            type_name: owner.name.clone(),
            field_name: field.name.clone(),
        });
    }

    for name in names {
        let Some(counter) = object.field(name) else {
            return Err(TransformError::UnknownField {
                type_name: owner.name.clone(),
                field_name: field.name.clone(),
                unknown: name.clone(),
            });
        };
        let invalid = |reason: String| TransformError::InvalidCounterField {
            type_name: owner.name.clone(),
            field_name: field.name.clone(),
            counter: name.clone(),
            reason,
        };

        if counter.name == field.name {
            return Err(invalid("it is the annotated field itself".to_string()));
        }
        if counter.ty.is_list() {
            return Err(invalid(format!("its type '{}' is a list", counter.ty)));
        }
        let base = counter.ty.base_name();
        let is_leaf = is_builtin_scalar(base)
            || document
                .get_type(base)
                .is_some_and(|t| matches!(t.kind, TypeKind::Scalar | TypeKind::Enum(_)));
        if !is_leaf {
            return Err(invalid(format!("its type '{}' is not a scalar or enum", counter.ty)));
        }
    }
    Ok(())
}

fn parse_count_type(owner: &TypeDefinition, field: &FieldDefinition) -> TransformResult<CountType> {
    let Some(directive) = field.directive(COUNT_DIRECTIVE) else {
        return Ok(CountType::default());
    };
    let raw = match directive.argument("type") {
        None | Some(Value::Null) => return Ok(CountType::default()),
        Some(Value::Enum(name)) => name.as_str().to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => {
            return Err(invalid_argument(owner, field, "type", format!("unexpected value {other}")));
        }
    };
    match raw.as_str() {
        "scan" => Ok(CountType::Scan),
        "distinct" => Ok(CountType::Distinct),
        other => Err(invalid_argument(
            owner,
            field,
            "type",
            format!("'{other}' is not one of scan, distinct"),
        )),
    }
}

/// Read `@count(fields: [...])`; a bare string is coerced to a one-element list.
fn parse_fields_argument(
    owner: &TypeDefinition,
    field: &FieldDefinition,
) -> TransformResult<Option<Vec<String>>> {
    let Some(directive) = field.directive(COUNT_DIRECTIVE) else {
        return Ok(None);
    };
    match directive.argument("fields") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(name)) => Ok(Some(vec![name.clone()])),
        Some(Value::List(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(name) => Ok(name.clone()),
                other => Err(invalid_argument(
                    owner,
                    field,
                    "fields",
                    format!("expected field names, found {other}"),
                )),
            })
            .collect::<TransformResult<Vec<_>>>()
            .map(Some),
        Some(other) => Err(invalid_argument(
            owner,
            field,
            "fields",
            format!("expected a list of field names, found {other}"),
        )),
    }
}

fn invalid_argument(
    owner: &TypeDefinition,
    field: &FieldDefinition,
    argument: &str,
    reason: String,
) -> TransformError {
    TransformError::InvalidArgument {
        type_name: owner.name.clone(),
        field_name: field.name.clone(),
        argument: argument.to_string(),
        reason,
    }
}
