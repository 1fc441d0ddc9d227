use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::event::CountEvent;
use super::normalize::normalize_map;
use crate::error::EncodingError;

pub const SELECT_COUNT: &str = "COUNT";

/// One count-only scan request, in the store's request shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanRequest {
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    pub select: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_attribute_names: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_attribute_values: Option<Map<String, Value>>,
}

/// Build the scan request for `event`, starting at `start_key`.
///
/// Names and values are attached only when non-empty; values are normalized first.
pub fn make_scan_request(
    event: &CountEvent,
    start_key: Option<Map<String, Value>>,
) -> Result<ScanRequest, EncodingError> {
    let mut request = ScanRequest {
        table_name: event.table_name.clone(),
        index_name: event.index_name.clone(),
        select: SELECT_COUNT.to_string(),
        exclusive_start_key: start_key,
        filter_expression: None,
        expression_attribute_names: None,
        expression_attribute_values: None,
    };

    if let Some(filter) = &event.dynamo {
        if !filter.expression.is_empty() {
            request.filter_expression = Some(filter.expression.clone());
        }
        if !filter.expression_names.is_empty() {
            request.expression_attribute_names = Some(filter.expression_names.clone());
        }
        if !filter.expression_values.is_empty() {
            request.expression_attribute_values = Some(normalize_map(&filter.expression_values)?);
        }
    }

    Ok(request)
}
