//! Signed bucket listing for bucketview.
//!
//! This crate lists a bucket through the S3 `ListObjectsV2` API, signing each
//! request with [`bucketview_auth::Authorizer`], and turns the XML response
//! into the keys of the image objects it contains.
//!
//! # Modules
//!
//! - [`client`] - The signed listing client and the [`ObjectLister`] seam
//! - [`error`] - Listing error types
//! - [`keys`] - Streaming key extraction and image classification

pub mod client;
pub mod error;
pub mod keys;

pub use client::{ListingClient, ListingFuture, ObjectLister};
pub use error::ListingError;
pub use keys::{ObjectKeys, extract_keys, is_image_file};
