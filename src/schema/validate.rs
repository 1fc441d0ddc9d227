//! Structural well-formedness checks for a generated schema.

use std::collections::{BTreeSet, HashSet};

use super::{Document, TypeKind, TypeRef, is_builtin_scalar, parse_document, print_document};
use crate::error::{TransformError, TransformResult};

/// Check that `document` prints to SDL the parser accepts, that type and field names are
/// unique, and that every referenced type is either declared or a built-in scalar.
pub fn validate_document(document: &Document) -> TransformResult<()> {
    let printed = print_document(document);
    parse_document(&printed).map_err(|e| TransformError::InvalidOutputSchema(e.to_string()))?;

    let mut problems = BTreeSet::new();
    let mut declared = HashSet::new();
    for definition in document.types.iter().filter(|t| !t.extend) {
        if !declared.insert(definition.name.as_str()) {
            problems.insert(format!("type '{}' is declared more than once", definition.name));
        }
    }

    let check_ref = |owner: &str, ty: &TypeRef, problems: &mut BTreeSet<String>| {
        let base = ty.base_name();
        if !declared.contains(base) && !is_builtin_scalar(base) {
            problems.insert(format!("'{owner}' references undefined type '{base}'"));
        }
    };

    for definition in &document.types {
        let name = definition.name.as_str();
        match &definition.kind {
            TypeKind::Object(object) | TypeKind::Interface(object) => {
                let mut seen = HashSet::new();
                for field in &object.fields {
                    if !seen.insert(field.name.as_str()) {
                        problems.insert(format!("field '{name}.{}' is declared more than once", field.name));
                    }
                    let owner = format!("{name}.{}", field.name);
                    check_ref(&owner, &field.ty, &mut problems);
                    for argument in &field.arguments {
                        check_ref(&format!("{owner}({})", argument.name), &argument.ty, &mut problems);
                    }
                }
                for interface in &object.implements {
                    check_ref(name, &TypeRef::named(interface.clone()), &mut problems);
                }
            }
            TypeKind::InputObject(fields) => {
                let mut seen = HashSet::new();
                for field in fields {
                    if !seen.insert(field.name.as_str()) {
                        problems.insert(format!("field '{name}.{}' is declared more than once", field.name));
                    }
                    check_ref(&format!("{name}.{}", field.name), &field.ty, &mut problems);
                }
            }
            TypeKind::Union(members) => {
                for member in members {
                    check_ref(name, &TypeRef::named(member.clone()), &mut problems);
                }
            }
            TypeKind::Scalar | TypeKind::Enum(_) => {}
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(TransformError::InvalidOutputSchema(
            problems.into_iter().collect::<Vec<_>>().join("; "),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_document() {
        let doc = parse_document("type Query { foo: Foo } type Foo { id: ID! at: AWSDateTime }").unwrap();
        assert!(validate_document(&doc).is_ok());
    }

    #[test]
    fn test_undefined_reference() {
        let doc = parse_document("type Query { countFoo(filter: ModelFooFilterInput): Int }").unwrap();
        let err = validate_document(&doc).unwrap_err().to_string();
        assert!(err.contains("ModelFooFilterInput"), "{err}");
    }

    #[test]
    fn test_duplicate_field() {
        let mut doc = parse_document("type Query { a: Int }").unwrap();
        let query = doc.query_type_mut();
        query.fields.push(query.fields[0].clone());
        assert!(matches!(
            validate_document(&doc),
            Err(TransformError::InvalidOutputSchema(_))
        ));
    }
}
