//! Wire types for a count invocation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Compiled filter as produced by the gateway's filter compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamoFilter {
    #[serde(default)]
    pub expression: String,
    #[serde(default)]
    pub expression_names: BTreeMap<String, String>,
    #[serde(default)]
    pub expression_values: Map<String, Value>,
}

/// Payload the count executor is invoked with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountEvent {
    /// Opaque resolver context, carried for diagnostics.
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub dynamo: Option<DynamoFilter>,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
}

impl CountEvent {
    pub fn new(table_name: impl Into<String>, dynamo: Option<DynamoFilter>) -> Self {
        Self {
            context: Value::Null,
            dynamo,
            table_name: table_name.into(),
            index_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_deserialize_null_filter() {
        let event: CountEvent =
            serde_json::from_value(json!({ "context": {}, "dynamo": null, "tableName": "Foo" }))
                .unwrap();
        assert_eq!(event.table_name, "Foo");
        assert!(event.dynamo.is_none());
        assert!(event.index_name.is_none());
    }

    #[test]
    fn test_deserialize_names_only_filter() {
        let event: CountEvent = serde_json::from_value(json!({
            "tableName": "Foo",
            "indexName": "byOwner",
            "dynamo": { "expression": "attribute_exists(#a)", "expressionNames": { "#a": "a" } }
        }))
        .unwrap();
        let dynamo = event.dynamo.unwrap();
        assert_eq!(dynamo.expression_names["#a"], "a");
        assert!(dynamo.expression_values.is_empty());
        assert_eq!(event.index_name.as_deref(), Some("byOwner"));
    }

    #[test]
    fn test_missing_table_name_is_rejected() {
        let result = serde_json::from_value::<CountEvent>(json!({ "dynamo": null }));
        assert!(result.is_err());
    }
}
