use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::ErrorObject;
use crate::executor::{CountEvent, DynamoFilter};

/// Translates a caller's structured `filter` argument into a store filter expression.
///
/// Implemented by the gateway in deployment; filter semantics are not part of this crate.
pub trait FilterCompiler: Send + Sync {
    fn compile(&self, filter: &JsonValue) -> Result<DynamoFilter, ErrorObject>;
}

/// Builds the executor invocation payload for one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTransform {
    pub table_name: String,
    pub index_name: Option<String>,
}

impl RequestTransform {
    pub fn new(table_name: String, index_name: Option<String>) -> Self {
        Self {
            table_name,
            index_name,
        }
    }

    /// Evaluate the transform against an incoming resolver context.
    ///
    /// The `dynamo` member is `None` when the caller passed no filter, an empty filter, or
    /// one that compiles to a blank expression.
    pub fn build_payload(
        &self,
        context: &JsonValue,
        compiler: &dyn FilterCompiler,
    ) -> Result<CountEvent, ErrorObject> {
        let filter = context.get("arguments").and_then(|args| args.get("filter"));

        let dynamo = match filter {
            Some(filter) if !is_null_or_empty(filter) => {
                let compiled = compiler.compile(filter)?;
                if compiled.expression.trim().is_empty() {
                    None
                } else {
                    Some(compiled)
                }
            }
            _ => None,
        };
        debug!(
            table = %self.table_name,
            has_filter = dynamo.is_some(),
            "Built count invocation payload"
        );

        Ok(CountEvent {
            context: context.clone(),
            dynamo,
            table_name: self.table_name.clone(),
            index_name: self.index_name.clone(),
        })
    }

    /// Render the gateway request mapping template.
    pub fn render(&self, data_source: &str) -> String {
        let table = JsonValue::String(self.table_name.clone());
        let index = match &self.index_name {
            Some(index) => format!(
                ",\n    \"indexName\": {}",
                JsonValue::String(index.clone())
            ),
            None => String::new(),
        };

        format!(
            r#"## [Start] Invoke AWS Lambda data source: {data_source}. **
#set( $dynamo = $util.toJson(null) )
#if( !$util.isNullOrEmpty($ctx.args.filter) )
  #set( $filterExpression = $util.parseJson($util.transform.toDynamoDBFilterExpression($ctx.args.filter)) )
  #if( !$util.isNullOrBlank($filterExpression.expression) )
    #if( $filterExpression.expressionValues.size() == 0 )
      $util.qr($filterExpression.remove("expressionValues"))
    #end
    #set( $dynamo = $util.toJson($filterExpression) )
  #end
#end
{{
  "version": "2018-05-29",
  "operation": "Invoke",
  "payload": {{
    "context": $util.toJson($ctx),
    "dynamo": $dynamo,
    "tableName": {table}{index}
  }}
}}
## [End] Invoke AWS Lambda data source: {data_source}. **"#
        )
    }
}

fn is_null_or_empty(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Bool(_) | JsonValue::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    /// Compiles `{field: {eq: value}}` into an equality expression.
    struct EqCompiler;

    impl FilterCompiler for EqCompiler {
        fn compile(&self, filter: &JsonValue) -> Result<DynamoFilter, ErrorObject> {
            let Some((field, condition)) = filter.as_object().and_then(|m| m.iter().next()) else {
                return Ok(DynamoFilter::default());
            };
            let value = condition.get("eq").cloned().unwrap_or(JsonValue::Null);
            Ok(DynamoFilter {
                expression: format!("(#{field} = :{field}_eq)"),
                expression_names: BTreeMap::from([(format!("#{field}"), field.clone())]),
                expression_values: serde_json::Map::from_iter([(
                    format!(":{field}_eq"),
                    json!({ "S": value }),
                )]),
            })
        }
    }

    struct BlankCompiler;

    impl FilterCompiler for BlankCompiler {
        fn compile(&self, _filter: &JsonValue) -> Result<DynamoFilter, ErrorObject> {
            Ok(DynamoFilter::default())
        }
    }

    fn transform() -> RequestTransform {
        RequestTransform::new("Foo-local-NONE".into(), None)
    }

    #[test]
    fn test_payload_without_filter() {
        let context = json!({ "arguments": {} });
        let payload = transform().build_payload(&context, &EqCompiler).unwrap();
        assert_eq!(payload.table_name, "Foo-local-NONE");
        assert!(payload.dynamo.is_none());
        assert_eq!(payload.context, context);
    }

    #[test]
    fn test_payload_with_empty_filter() {
        let context = json!({ "arguments": { "filter": {} } });
        let payload = transform().build_payload(&context, &EqCompiler).unwrap();
        assert!(payload.dynamo.is_none());
    }

    #[test]
    fn test_payload_with_filter() {
        let context = json!({ "arguments": { "filter": { "name": { "eq": "x" } } } });
        let payload = transform().build_payload(&context, &EqCompiler).unwrap();
        let dynamo = payload.dynamo.unwrap();
        assert_eq!(dynamo.expression, "(#name = :name_eq)");
        assert_eq!(dynamo.expression_names["#name"], "name");
    }

    #[test]
    fn test_blank_expression_means_no_filter() {
        let context = json!({ "arguments": { "filter": { "name": { "eq": "x" } } } });
        let payload = transform().build_payload(&context, &BlankCompiler).unwrap();
        assert!(payload.dynamo.is_none());
    }

    #[test]
    fn test_render_mentions_table_and_index() {
        let rendered = RequestTransform::new("Post-api-dev".into(), Some("byBlog".into()))
            .render("countResolverDataSource");
        assert!(rendered.contains("\"tableName\": \"Post-api-dev\""));
        assert!(rendered.contains("\"indexName\": \"byBlog\""));
        assert!(rendered.contains("toDynamoDBFilterExpression"));
        assert!(rendered.starts_with("## [Start] Invoke AWS Lambda data source: countResolverDataSource."));
    }
}
