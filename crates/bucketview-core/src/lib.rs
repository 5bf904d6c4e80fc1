//! Core types, configuration, and errors for bucketview.
//!
//! This crate holds the process-wide [`BucketViewConfig`] loaded from the
//! environment, its [`BucketViewError`] type, and the [`AwsRegion`] identifier.

mod config;
mod error;
mod types;

pub use config::BucketViewConfig;
pub use error::{BucketViewError, BucketViewResult};
pub use types::AwsRegion;
