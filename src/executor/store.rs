use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::scan::ScanRequest;
use crate::error::StoreError;

/// One page of a count-only scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanPage {
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Map<String, Value>>,
}

/// A store that can run count-only scans.
#[async_trait]
pub trait ScanStore: Send + Sync {
    async fn scan(&self, request: ScanRequest) -> Result<ScanPage, StoreError>;
}

#[async_trait]
impl<T: ScanStore + ?Sized> ScanStore for Arc<T> {
    async fn scan(&self, request: ScanRequest) -> Result<ScanPage, StoreError> {
        (**self).scan(request).await
    }
}
