//! Aura Storage Library
//!
//! This crate provides the object store gateway used by the conversion pipeline.
//! It includes the Storage trait, implementations for S3-compatible stores and the
//! local filesystem, and the key allocator for extracted assets.
//!
//! # Storage key format
//!
//! Extracted assets are stored under a dated namespace:
//!
//! `{namespace}/YYYY/MM/DD/{base}[-vN]-YYYYMMDD-HHMMSS-{random}.{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use aura_core::StorageBackend;
pub use factory::create_storage;
pub use keys::{
    allocate_key, asset_base_name, document_token, sanitize_token, validate_storage_key,
};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{
    ListPage, ObjectEntry, ObjectVersion, PutCondition, Storage, StorageError, StorageResult,
    StoredObject,
};
