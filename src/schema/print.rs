//! SDL printer for the owned schema model.

use std::fmt::Write as _;

use super::{Directive, Document, FieldDefinition, InputValue, TypeDefinition, TypeKind};

const INDENT: &str = "  ";

/// Render a document as SDL, one blank line between definitions.
pub fn print_document(document: &Document) -> String {
    let mut blocks = Vec::with_capacity(document.types.len() + 1);

    if let Some(roots) = &document.explicit_schema {
        let mut block = String::from("schema {\n");
        for (operation, root) in [
            ("query", &roots.query),
            ("mutation", &roots.mutation),
            ("subscription", &roots.subscription),
        ] {
            if let Some(root) = root {
                let _ = writeln!(block, "{INDENT}{operation}: {root}");
            }
        }
        block.push('}');
        blocks.push(block);
    }

    for definition in &document.types {
        blocks.push(print_type(definition));
    }

    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn print_type(definition: &TypeDefinition) -> String {
    let mut out = String::new();
    print_description(&mut out, definition.description.as_deref(), "");
    if definition.extend {
        out.push_str("extend ");
    }

    let keyword = match &definition.kind {
        TypeKind::Scalar => "scalar",
        TypeKind::Object(_) => "type",
        TypeKind::Interface(_) => "interface",
        TypeKind::Union(_) => "union",
        TypeKind::Enum(_) => "enum",
        TypeKind::InputObject(_) => "input",
    };
    let _ = write!(out, "{keyword} {}", definition.name);

    match &definition.kind {
        TypeKind::Object(object) | TypeKind::Interface(object) => {
            if !object.implements.is_empty() {
                let _ = write!(out, " implements {}", object.implements.join(" & "));
            }
            print_directives(&mut out, &definition.directives);
            if !object.fields.is_empty() {
                out.push_str(" {\n");
                for field in &object.fields {
                    print_field(&mut out, field);
                }
                out.push('}');
            }
        }
        TypeKind::Union(members) => {
            print_directives(&mut out, &definition.directives);
            if !members.is_empty() {
                let _ = write!(out, " = {}", members.join(" | "));
            }
        }
        TypeKind::Enum(values) => {
            print_directives(&mut out, &definition.directives);
            out.push_str(" {\n");
            for value in values {
                print_description(&mut out, value.description.as_deref(), INDENT);
                let _ = write!(out, "{INDENT}{}", value.name);
                print_directives(&mut out, &value.directives);
                out.push('\n');
            }
            out.push('}');
        }
        TypeKind::InputObject(fields) => {
            print_directives(&mut out, &definition.directives);
            out.push_str(" {\n");
            for field in fields {
                print_description(&mut out, field.description.as_deref(), INDENT);
                out.push_str(INDENT);
                print_input_value(&mut out, field);
                out.push('\n');
            }
            out.push('}');
        }
        TypeKind::Scalar => print_directives(&mut out, &definition.directives),
    }

    out
}

fn print_field(out: &mut String, field: &FieldDefinition) {
    print_description(out, field.description.as_deref(), INDENT);
    let _ = write!(out, "{INDENT}{}", field.name);
    if !field.arguments.is_empty() {
        out.push('(');
        for (i, argument) in field.arguments.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            print_input_value(out, argument);
        }
        out.push(')');
    }
    let _ = write!(out, ": {}", field.ty);
    print_directives(out, &field.directives);
    out.push('\n');
}

fn print_input_value(out: &mut String, value: &InputValue) {
    let _ = write!(out, "{}: {}", value.name, value.ty);
    if let Some(default) = &value.default_value {
        let _ = write!(out, " = {default}");
    }
    print_directives(out, &value.directives);
}

fn print_directives(out: &mut String, directives: &[Directive]) {
    for directive in directives {
        let _ = write!(out, " @{}", directive.name);
        if !directive.arguments.is_empty() {
            let args: Vec<String> = directive
                .arguments
                .iter()
                .map(|(name, value)| format!("{name}: {value}"))
                .collect();
            let _ = write!(out, "({})", args.join(", "));
        }
    }
}

fn print_description(out: &mut String, description: Option<&str>, indent: &str) {
    if let Some(description) = description {
        let escaped = description.replace("\"\"\"", "\\\"\"\"");
        let _ = writeln!(out, "{indent}\"\"\"");
        for line in escaped.lines() {
            let _ = writeln!(out, "{indent}{line}");
        }
        let _ = writeln!(out, "{indent}\"\"\"");
    }
}
