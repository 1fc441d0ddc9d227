//! `@count` schema transform and count executor.
//!
//! The transform augments a GraphQL schema whose types and relationship fields carry
//! `@count`, producing count query fields, resolver bindings and an infrastructure plan.
//! The executor answers those queries with a paginated count-only scan of the backing
//! table.

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod schema;
pub mod transform;

pub use error::{EncodingError, ErrorObject, ExecutorError, StoreError, TransformError};
pub use executor::{CountEvent, CountExecutor, ScanLimits, ScanStore};
pub use transform::{BindingStrategy, CountTransformer, TransformOptions, TransformOutput};
