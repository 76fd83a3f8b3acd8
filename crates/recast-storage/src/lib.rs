//! Recast Storage Library
//!
//! Storage sink abstraction and backends. The sink persists binary artifacts
//! (generated images) and returns a stable locator that a separate serving
//! component can resolve.
//!
//! # Storage key format
//!
//! Keys are `{folder}/{filename}`, where the folder is the content-type hint
//! supplied by the caller (e.g. `thumbnails/`). Keys must not contain `..`
//! or a leading `/`. Key generation is centralized in the `keys` module so
//! all backends stay consistent.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use recast_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
