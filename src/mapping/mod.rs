//! Request/response transforms attached to every count resolver.
//!
//! Each transform exists in two forms that share one contract: rendered as a gateway
//! mapping template for deployment, and evaluated in Rust for local runs and tests.

mod request;
mod response;

pub use request::{FilterCompiler, RequestTransform};
pub use response::ResponseTransform;
