//! Count executor.
//!
//! Answers a count query by running a paginated, count-only scan against the backing
//! table and summing the per-page counts. Each invocation is independent: pages are
//! fetched strictly in sequence and nothing is shared between invocations.

mod dynamo;
mod event;
mod normalize;
mod retry;
mod scan;
mod store;

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{ErrorObject, ExecutorError, StoreError};

pub use dynamo::DynamoScanStore;
pub use event::{CountEvent, DynamoFilter};
pub use normalize::{normalize, normalize_map};
pub use retry::{RetryConfig, retry_async};
pub use scan::{SELECT_COUNT, ScanRequest, make_scan_request};
pub use store::{ScanPage, ScanStore};

/// Operational bounds for one count invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanLimits {
    /// Pages fetched before giving up; `None` scans to the end.
    pub max_pages: Option<u32>,
    pub deadline: Option<Duration>,
    pub retry: RetryConfig,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_pages: Some(10_000),
            deadline: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Progress of a scan across pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanState {
    pub accumulated_count: u64,
    pub continuation_token: Option<Map<String, Value>>,
    pub pages: u32,
}

pub struct CountExecutor<S> {
    store: S,
    limits: ScanLimits,
}

impl<S: ScanStore> CountExecutor<S> {
    pub fn new(store: S) -> Self {
        Self::with_limits(store, ScanLimits::default())
    }

    pub fn with_limits(store: S, limits: ScanLimits) -> Self {
        Self { store, limits }
    }

    /// Count the items of `event.table_name` matching its filter.
    pub async fn count(&self, event: &CountEvent) -> Result<u64, ExecutorError> {
        let started = Instant::now();
        let mut request = make_scan_request(event, None)?;
        let mut state = ScanState::default();

        loop {
            if let Some(max_pages) = self.limits.max_pages {
                if state.pages >= max_pages {
                    return Err(ExecutorError::PageLimitExceeded {
                        table: event.table_name.clone(),
                        pages: state.pages,
                        partial_count: state.accumulated_count,
                    });
                }
            }

            request.exclusive_start_key = state.continuation_token.take();
            debug!(
                table = %request.table_name,
                page = state.pages + 1,
                request = ?request,
                "Issuing count scan"
            );

            let page = self.scan_page(&request, started, &state).await?;
            state.pages += 1;
            state.accumulated_count += page.count;

            match page.last_evaluated_key {
                Some(key) if !key.is_empty() => state.continuation_token = Some(key),
                _ => {
                    info!(
                        table = %event.table_name,
                        pages = state.pages,
                        count = state.accumulated_count,
                        "Count scan complete"
                    );
                    return Ok(state.accumulated_count);
                }
            }
        }
    }

    async fn scan_page(
        &self,
        request: &ScanRequest,
        started: Instant,
        state: &ScanState,
    ) -> Result<ScanPage, ExecutorError> {
        let scan = retry_async(
            || self.store.scan(request.clone()),
            &self.limits.retry,
            "count_scan",
            StoreError::is_throttling,
        );

        let Some(deadline) = self.limits.deadline else {
            return Ok(scan.await?);
        };

        let deadline_exceeded = || ExecutorError::DeadlineExceeded {
            table: request.table_name.clone(),
            deadline_ms: deadline.as_millis(),
            partial_count: state.accumulated_count,
        };
        let remaining = deadline
            .checked_sub(started.elapsed())
            .filter(|remaining| !remaining.is_zero())
            .ok_or_else(deadline_exceeded)?;
        match tokio::time::timeout(remaining, scan).await {
            Ok(page) => Ok(page?),
            Err(_) => Err(deadline_exceeded()),
        }
    }

    /// Wire entry point: decode the payload, count, and answer with the integer or an
    /// error object.
    pub async fn handle(&self, payload: Value) -> Result<Value, ErrorObject> {
        let result = match serde_json::from_value::<CountEvent>(payload) {
            Ok(event) => self.count(&event).await,
            Err(e) => Err(ExecutorError::MalformedEvent(e.to_string())),
        };

        result.map(Value::from).map_err(|e| {
            warn!(error = %e, error_type = e.error_type(), "Count invocation failed");
            e.to_error_object()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyStore;

    #[async_trait::async_trait]
    impl ScanStore for EmptyStore {
        async fn scan(&self, _request: ScanRequest) -> Result<ScanPage, StoreError> {
            Ok(ScanPage::default())
        }
    }

    #[test]
    fn test_handle_empty_table() {
        let executor = CountExecutor::new(EmptyStore);
        let result = tokio_test::block_on(executor.handle(serde_json::json!({ "tableName": "Foo" })));
        assert_eq!(result, Ok(Value::from(0u64)));
    }

    #[test]
    fn test_deadline_already_spent() {
        let limits = ScanLimits {
            deadline: Some(Duration::ZERO),
            ..ScanLimits::default()
        };
        let executor = CountExecutor::with_limits(EmptyStore, limits);
        let result = tokio_test::block_on(executor.count(&CountEvent::new("Foo", None)));
        assert!(matches!(result, Err(ExecutorError::DeadlineExceeded { partial_count: 0, .. })));
    }

    struct SlowStore;

    #[async_trait::async_trait]
    impl ScanStore for SlowStore {
        async fn scan(&self, _request: ScanRequest) -> Result<ScanPage, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ScanPage::default())
        }
    }

    #[test]
    fn test_sub_second_deadline_is_reported_in_millis() {
        let limits = ScanLimits {
            deadline: Some(Duration::from_millis(50)),
            ..ScanLimits::default()
        };
        let executor = CountExecutor::with_limits(SlowStore, limits);
        let err = tokio_test::block_on(executor.count(&CountEvent::new("Foo", None))).unwrap_err();
        assert!(matches!(err, ExecutorError::DeadlineExceeded { deadline_ms: 50, .. }));
        assert!(err.to_string().contains("50ms"));
    }

    #[test]
    fn test_default_limits() {
        let limits = ScanLimits::default();
        assert_eq!(limits.max_pages, Some(10_000));
        assert!(limits.deadline.is_none());
    }
}
