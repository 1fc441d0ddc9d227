//! Filter-input synthesis.
//!
//! Shapes follow the inputs the model transformer generates so a schema that already
//! carries them is left untouched: every definition is created only if no type of that
//! name exists yet.

use tracing::debug;

use crate::schema::{
    Document, EnumValue, InputValue, TypeDefinition, TypeKind, TypeRef, to_pascal_case,
};

const ATTRIBUTE_TYPES: &str = "ModelAttributeTypes";
const SIZE_INPUT: &str = "ModelSizeInput";

const ATTRIBUTE_TYPE_VALUES: &[&str] = &[
    "binary",
    "binarySet",
    "bool",
    "list",
    "map",
    "number",
    "numberSet",
    "string",
    "stringSet",
    "_null",
];

/// `Model<Type>FilterInput`.
pub fn model_filter_input_name(type_name: &str) -> String {
    to_pascal_case(&["Model", type_name, "FilterInput"])
}

/// Create `input_name` from the filterable fields of `source_type` unless it exists.
///
/// Returns `true` when the input was created.
pub fn ensure_filter_input(document: &mut Document, source_type: &str, input_name: &str) -> bool {
    if document.has_type(input_name) {
        return false;
    }

    let mut fields = Vec::new();
    let mut wanted = Vec::new();
    if let Some(object) = document.object(source_type) {
        for field in object.fields.iter().filter(|f| f.arguments.is_empty()) {
            if let Some(scalar_input) = scalar_input_name(document, field.ty.base_name()) {
                fields.push(InputValue::new(&field.name, TypeRef::named(&scalar_input)));
                wanted.push((scalar_input, field.ty.base_name().to_string()));
            }
        }
    }
    fields.push(InputValue::new("and", TypeRef::list(TypeRef::named(input_name))));
    fields.push(InputValue::new("or", TypeRef::list(TypeRef::named(input_name))));
    fields.push(InputValue::new("not", TypeRef::named(input_name)));

    for (scalar_input, base) in wanted {
        ensure_scalar_input(document, &scalar_input, &base);
    }
    debug!(input = %input_name, source = %source_type, "Synthesized filter input");
    document.add_type_if_absent(TypeDefinition::new(input_name, TypeKind::InputObject(fields)))
}

/// Scalar filter input used for a field whose base type is `base`, if it is filterable.
fn scalar_input_name(document: &Document, base: &str) -> Option<String> {
    let name = match base {
        "ID" => "ModelIDInput",
        "Int" | "AWSTimestamp" => "ModelIntInput",
        "Float" => "ModelFloatInput",
        "Boolean" => "ModelBooleanInput",
        "String" | "AWSDate" | "AWSTime" | "AWSDateTime" | "AWSEmail" | "AWSJSON" | "AWSURL"
        | "AWSPhone" | "AWSIPAddress" => "ModelStringInput",
        other => {
            let definition = document.get_type(other)?;
            return match definition.kind {
                TypeKind::Enum(_) => Some(to_pascal_case(&["Model", other, "Input"])),
                TypeKind::Scalar => Some("ModelStringInput".to_string()),
                _ => None,
            };
        }
    };
    Some(name.to_string())
}

fn ensure_scalar_input(document: &mut Document, input_name: &str, base: &str) {
    if document.has_type(input_name) {
        return;
    }

    let fields = match input_name {
        "ModelStringInput" | "ModelIDInput" => {
            let scalar = if input_name == "ModelIDInput" { "ID" } else { "String" };
            let mut fields = string_like_fields(scalar);
            fields.extend(attribute_fields(document));
            ensure_size_input(document);
            fields.push(InputValue::new("size", TypeRef::named(SIZE_INPUT)));
            fields
        }
        "ModelIntInput" | "ModelFloatInput" => {
            let mut fields = numeric_fields(base_scalar(input_name));
            fields.extend(attribute_fields(document));
            fields
        }
        "ModelBooleanInput" => {
            let mut fields = comparison_fields("Boolean", &["ne", "eq"]);
            fields.extend(attribute_fields(document));
            fields
        }
        // Model<Enum>Input
        _ => comparison_fields(base, &["eq", "ne"]),
    };

    document.add_type_if_absent(TypeDefinition::new(input_name, TypeKind::InputObject(fields)));
}

fn base_scalar(input_name: &str) -> &'static str {
    if input_name == "ModelFloatInput" { "Float" } else { "Int" }
}

fn comparison_fields(scalar: &str, operators: &[&str]) -> Vec<InputValue> {
    operators
        .iter()
        .map(|op| InputValue::new(*op, TypeRef::named(scalar)))
        .collect()
}

fn numeric_fields(scalar: &str) -> Vec<InputValue> {
    let mut fields = comparison_fields(scalar, &["ne", "eq", "le", "lt", "ge", "gt"]);
    fields.push(InputValue::new("between", TypeRef::list(TypeRef::named(scalar))));
    fields
}

fn string_like_fields(scalar: &str) -> Vec<InputValue> {
    let mut fields = numeric_fields(scalar);
    fields.push(InputValue::new("contains", TypeRef::named(scalar)));
    fields.push(InputValue::new("notContains", TypeRef::named(scalar)));
    fields.push(InputValue::new("beginsWith", TypeRef::named(scalar)));
    fields
}

fn attribute_fields(document: &mut Document) -> Vec<InputValue> {
    document.add_type_if_absent(TypeDefinition::new(
        ATTRIBUTE_TYPES,
        TypeKind::Enum(ATTRIBUTE_TYPE_VALUES.iter().map(|v| EnumValue::new(*v)).collect()),
    ));
    vec![
        InputValue::new("attributeExists", TypeRef::named("Boolean")),
        InputValue::new("attributeType", TypeRef::named(ATTRIBUTE_TYPES)),
    ]
}

fn ensure_size_input(document: &mut Document) {
    document.add_type_if_absent(TypeDefinition::new(
        SIZE_INPUT,
        TypeKind::InputObject(numeric_fields("Int")),
    ));
}
