//! DynamoDB-backed scan store.
//!
//! Scan requests carry attribute values in the DynamoDB JSON form (`{"S": "x"}`,
//! `{"N": "5"}`). They are converted to SDK `AttributeValue`s on the way out and the
//! `LastEvaluatedKey` is converted back so the executor can hand it to the next page.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, Select};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use tracing::debug;

use super::scan::ScanRequest;
use super::store::{ScanPage, ScanStore};
use crate::error::StoreError;

/// Error codes DynamoDB uses when a request is rate limited.
const THROTTLING_CODES: &[&str] = &[
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ThrottlingException",
];

#[derive(Clone)]
pub struct DynamoScanStore {
    client: Client,
}

impl std::fmt::Debug for DynamoScanStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoScanStore").finish_non_exhaustive()
    }
}

impl DynamoScanStore {
    /// Build a store from a loaded SDK config.
    ///
    /// SDK-level retries are turned off; throttled pages are retried by the executor.
    pub fn new(sdk_config: &aws_config::SdkConfig, endpoint: Option<&str>) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config)
            .retry_config(aws_sdk_dynamodb::config::retry::RetryConfig::disabled());

        // e.g. DynamoDB Local or LocalStack
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_client(Client::from_conf(builder.build()))
    }

    /// Load credentials and region from the standard AWS environment.
    pub async fn from_env(endpoint: Option<&str>) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(&sdk_config, endpoint)
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ScanStore for DynamoScanStore {
    async fn scan(&self, request: ScanRequest) -> Result<ScanPage, StoreError> {
        let table = request.table_name.clone();
        let invalid = |message: String| StoreError::Rejected {
            table: table.clone(),
            code: "ValidationException".to_string(),
            message,
        };

        let exclusive_start_key = request
            .exclusive_start_key
            .as_ref()
            .map(to_item)
            .transpose()
            .map_err(invalid)?;
        let values = request
            .expression_attribute_values
            .as_ref()
            .map(to_item)
            .transpose()
            .map_err(invalid)?;
        let names = request
            .expression_attribute_names
            .map(|names| names.into_iter().collect::<HashMap<_, _>>());

        let output = self
            .client
            .scan()
            .table_name(&request.table_name)
            .set_index_name(request.index_name)
            .select(Select::from(request.select.as_str()))
            .set_exclusive_start_key(exclusive_start_key)
            .set_filter_expression(request.filter_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(values)
            .send()
            .await
            .map_err(|e| scan_error(&table, e))?;

        debug!(
            table = %table,
            count = output.count(),
            scanned = output.scanned_count(),
            "Scan page returned"
        );

        Ok(ScanPage {
            count: u64::try_from(output.count()).unwrap_or_default(),
            last_evaluated_key: output.last_evaluated_key().map(from_item),
        })
    }
}

fn scan_error(table: &str, err: SdkError<ScanError>) -> StoreError {
    match &err {
        SdkError::ServiceError(service_err) => {
            let scan_err = service_err.err();
            if matches!(
                scan_err,
                ScanError::ProvisionedThroughputExceededException(_)
                    | ScanError::RequestLimitExceeded(_)
            ) {
                return StoreError::Throttled {
                    table: table.to_string(),
                    message: scan_err.message().unwrap_or_default().to_string(),
                };
            }
            classify_service_error(table, scan_err.code(), scan_err.message())
        }
        _ => StoreError::Unavailable(DisplayErrorContext(&err).to_string()),
    }
}

/// Map a service error code to the executor's error classes.
fn classify_service_error(table: &str, code: Option<&str>, message: Option<&str>) -> StoreError {
    let message = message.unwrap_or_default().to_string();
    match code {
        Some(code) if THROTTLING_CODES.contains(&code) => StoreError::Throttled {
            table: table.to_string(),
            message,
        },
        Some("InternalServerError" | "ServiceUnavailable") => {
            StoreError::Unavailable(format!("{table}: {message}"))
        }
        code => StoreError::Rejected {
            table: table.to_string(),
            code: code.unwrap_or("UnknownError").to_string(),
            message,
        },
    }
}

fn to_item(map: &Map<String, Value>) -> Result<HashMap<String, AttributeValue>, String> {
    map.iter()
        .map(|(name, value)| {
            to_attribute_value(value)
                .map(|attribute| (name.clone(), attribute))
                .map_err(|e| format!("{name}: {e}"))
        })
        .collect()
}

fn from_item(item: &HashMap<String, AttributeValue>) -> Map<String, Value> {
    item.iter()
        .map(|(name, attribute)| (name.clone(), from_attribute_value(attribute)))
        .collect()
}

fn to_attribute_value(value: &Value) -> Result<AttributeValue, String> {
    let Some((tag, inner)) = value
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.iter().next())
    else {
        return Err(format!("expected a single-key attribute value, got {value}"));
    };

    let attribute = match (tag.as_str(), inner) {
        ("S", Value::String(s)) => AttributeValue::S(s.clone()),
        ("N", Value::String(n)) => AttributeValue::N(n.clone()),
        ("B", Value::String(b)) => AttributeValue::B(decode_blob(b)?),
        ("BOOL", flag) => AttributeValue::Bool(parse_flag(flag)?),
        ("NULL", flag) => AttributeValue::Null(parse_flag(flag)?),
        ("SS", Value::Array(items)) => AttributeValue::Ss(strings(items)?),
        ("NS", Value::Array(items)) => AttributeValue::Ns(strings(items)?),
        ("BS", Value::Array(items)) => AttributeValue::Bs(
            strings(items)?
                .iter()
                .map(|b| decode_blob(b))
                .collect::<Result<_, _>>()?,
        ),
        ("L", Value::Array(items)) => AttributeValue::L(
            items
                .iter()
                .map(to_attribute_value)
                .collect::<Result<_, _>>()?,
        ),
        ("M", Value::Object(map)) => AttributeValue::M(to_item(map)?),
        (tag, inner) => return Err(format!("unsupported attribute value {tag}: {inner}")),
    };
    Ok(attribute)
}

fn from_attribute_value(attribute: &AttributeValue) -> Value {
    match attribute {
        AttributeValue::S(s) => json!({ "S": s }),
        AttributeValue::N(n) => json!({ "N": n }),
        AttributeValue::B(b) => json!({ "B": STANDARD.encode(b.as_ref()) }),
        AttributeValue::Bool(b) => json!({ "BOOL": b }),
        AttributeValue::Null(b) => json!({ "NULL": b }),
        AttributeValue::Ss(items) => json!({ "SS": items }),
        AttributeValue::Ns(items) => json!({ "NS": items }),
        AttributeValue::Bs(items) => {
            let encoded: Vec<String> = items.iter().map(|b| STANDARD.encode(b.as_ref())).collect();
            json!({ "BS": encoded })
        }
        AttributeValue::L(items) => {
            json!({ "L": items.iter().map(from_attribute_value).collect::<Vec<_>>() })
        }
        AttributeValue::M(map) => json!({ "M": from_item(map) }),
        _ => Value::Null,
    }
}

// Normalized filter values arrive as strings, so flags may be "true" as well as true.
fn parse_flag(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::String(s) => s.parse().map_err(|_| format!("'{s}' is not a boolean")),
        other => Err(format!("{other} is not a boolean")),
    }
}

fn strings(items: &[Value]) -> Result<Vec<String>, String> {
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(format!("expected a string set member, got {other}")),
        })
        .collect()
}

fn decode_blob(encoded: &str) -> Result<Blob, String> {
    STANDARD
        .decode(encoded)
        .map(Blob::new)
        .map_err(|e| format!("invalid base64 binary value: {e}"))
}
