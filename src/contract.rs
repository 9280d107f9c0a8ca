//! # contract: vendor interfaces behind the utilities facade
//!
//! This module defines the traits the rest of the crate talks to when it needs
//! a cloud object store, a document database or a place to persist generated
//! files, plus the plain data types that cross those seams.
//!
//! ## Interface & Extensibility
//! - [`VendorApp`] is the application handle the facade is initialised with;
//!   it derives the [`DocumentStore`] and [`ObjectStore`] handles.
//! - [`ObjectStore`] writes payloads and resolves download URLs.
//! - [`DocumentStore`] applies partial updates to documents.
//! - [`BlobSink`] persists a named blob (e.g. a CSV export) for the user.
//! - All I/O methods are async and return boxed `Send + Sync` errors, so vendor
//!   failures reach the caller without translation.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`; the mocks are exported under the
//!   default `test-export-mocks` feature so downstream crates can script them.
//!
//! ## Implementations
//! - [`crate::firebase`] ships a REST client for Firebase Storage and Firestore.
//! - [`crate::sink`] ships a filesystem sink and an in-memory sink.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Error type crossing every vendor seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Optional object metadata forwarded verbatim to the object store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    /// User-defined key/value pairs stored alongside the object.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_metadata: BTreeMap<String, String>,
}

impl UploadMetadata {
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }
}

/// Location of an object written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    /// Full object path inside the bucket, e.g. `avatars/u1.png`.
    pub full_path: String,
}

/// A generated file handed to a [`BlobSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBlob {
    /// Destination name: a filesystem path for file sinks, a download name otherwise.
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Cloud object store (Firebase Storage or equivalent).
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `bytes` at `path`, replacing any existing object there.
    async fn put_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        metadata: Option<UploadMetadata>,
    ) -> Result<ObjectRef, BoxError>;

    /// Resolve a URL from which the object's content can be fetched.
    async fn download_url(&self, object: &ObjectRef) -> Result<String, BoxError>;
}

/// Document database (Cloud Firestore or equivalent).
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Apply a partial update: only the given fields change.
    ///
    /// Implementors must fail when the document at `path` does not exist.
    async fn update_document(&self, path: &str, fields: Record) -> Result<(), BoxError>;
}

/// Application handle from which the database and storage handles are derived.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
pub trait VendorApp: Send + Sync {
    fn document_store(&self) -> Arc<dyn DocumentStore>;

    fn object_store(&self) -> Arc<dyn ObjectStore>;
}

/// Persists a named blob for user consumption (file write, browser download, ...).
///
/// The hosting environment picks the implementation and injects it; nothing in
/// this crate detects the environment at runtime.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait BlobSink: Send + Sync {
    async fn persist(&self, blob: NamedBlob) -> Result<(), BoxError>;
}
