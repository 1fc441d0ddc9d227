use serde_json::Value as JsonValue;

use crate::error::ErrorObject;

/// Maps the executor's result (or error) back onto the resolved field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseTransform;

impl ResponseTransform {
    /// A non-null `error` in the context is surfaced as the field error with its message
    /// and type intact; otherwise `result` passes through unchanged.
    pub fn apply(&self, context: &JsonValue) -> Result<JsonValue, ErrorObject> {
        match context.get("error") {
            Some(error) if !error.is_null() => Err(ErrorObject {
                message: error
                    .get("message")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string(),
                error_type: error
                    .get("type")
                    .and_then(JsonValue::as_str)
                    .unwrap_or_default()
                    .to_string(),
            }),
            _ => Ok(context.get("result").cloned().unwrap_or(JsonValue::Null)),
        }
    }

    pub fn render(&self) -> String {
        "#if( $ctx.error )\n  $util.error($ctx.error.message, $ctx.error.type)\n#end\n$util.toJson($ctx.result)"
            .to_string()
    }
}
