//! Storage module for S3-compatible backends
//!
//! Documents and stored OCR results are addressed by bucket and key. The
//! `ObjectStore` trait is the only surface the extractors see.

mod s3_client;
mod types;

pub use s3_client::S3Client;
pub use types::*;
