#![doc = "Firebase REST client: implements the vendor contracts against Firebase Storage and Cloud Firestore."]
//
//! # Firebase REST client
//!
//! [`FirebaseApp`] is the [`VendorApp`] handed to
//! [`Utilities::init`](crate::utilities::Utilities::init). It derives a
//! [`StorageClient`] (object store) and a [`FirestoreClient`] (document store)
//! that share one `reqwest` connection pool.
//!
//! - Construct with [`FirebaseApp::new`] from a [`FirebaseConfig`], or build the
//!   config with [`FirebaseConfig::from_env`] (`FIREBASE_PROJECT_ID`,
//!   `FIREBASE_STORAGE_BUCKET`, optional `FIREBASE_AUTH_TOKEN`,
//!   `FIREBASE_STORAGE_ENDPOINT`, `FIRESTORE_ENDPOINT`, `FIRESTORE_DATABASE_ID`).
//! - Endpoint overrides point the clients at an emulator or a test server.
//! - The auth token is passed through as-is; it is never fetched or refreshed.
//! - Nothing is retried: every transport or status failure is returned as a
//!   [`FirebaseError`].

mod firestore;
mod storage;

pub use firestore::{encode_fields, encode_value, field_path, update_mask, FirestoreClient};
pub use storage::StorageClient;

use std::env;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contract::{DocumentStore, ObjectStore, VendorApp};

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://firebasestorage.googleapis.com";
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";
pub const DEFAULT_DATABASE_ID: &str = "(default)";

/// Errors produced by the REST clients.
#[derive(Debug, Error)]
pub enum FirebaseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no download token available for {path}")]
    MissingDownloadToken { path: String },

    #[error("invalid document reference {path:?}: document paths need an even number of segments")]
    InvalidDocumentPath { path: String },

    #[error("invalid field path {path:?}: segments separated by `.` must not be empty")]
    InvalidFieldPath { path: String },

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("missing configuration: {0}")]
    MissingConfig(String),
}

/// Connection settings for one Firebase project.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub storage_bucket: String,
    #[serde(default = "default_storage_endpoint")]
    pub storage_endpoint: String,
    #[serde(default = "default_firestore_endpoint")]
    pub firestore_endpoint: String,
    #[serde(default = "default_database_id")]
    pub database_id: String,
    /// Caller-supplied ID token; never serialised.
    #[serde(skip)]
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("storage_endpoint", &self.storage_endpoint)
            .field("firestore_endpoint", &self.firestore_endpoint)
            .field("database_id", &self.database_id)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_storage_endpoint() -> String {
    DEFAULT_STORAGE_ENDPOINT.to_string()
}

fn default_firestore_endpoint() -> String {
    DEFAULT_FIRESTORE_ENDPOINT.to_string()
}

fn default_database_id() -> String {
    DEFAULT_DATABASE_ID.to_string()
}

impl FirebaseConfig {
    pub fn new(project_id: impl Into<String>, storage_bucket: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            storage_bucket: storage_bucket.into(),
            storage_endpoint: default_storage_endpoint(),
            firestore_endpoint: default_firestore_endpoint(),
            database_id: default_database_id(),
            auth_token: None,
        }
    }

    pub fn from_env() -> Result<Self, FirebaseError> {
        dotenvy::dotenv().ok(); // loads environment variables from .env if present
        let required = |key: &str| {
            env::var(key).map_err(|e| {
                tracing::error!(error = ?e, key, "Required Firebase variable missing in environment");
                FirebaseError::MissingConfig(format!("{key} environment variable not set"))
            })
        };

        let mut config = Self::new(
            required("FIREBASE_PROJECT_ID")?,
            required("FIREBASE_STORAGE_BUCKET")?,
        );
        if let Ok(endpoint) = env::var("FIREBASE_STORAGE_ENDPOINT") {
            config.storage_endpoint = endpoint;
        }
        if let Ok(endpoint) = env::var("FIRESTORE_ENDPOINT") {
            config.firestore_endpoint = endpoint;
        }
        if let Ok(database_id) = env::var("FIRESTORE_DATABASE_ID") {
            config.database_id = database_id;
        }
        config.auth_token = env::var("FIREBASE_AUTH_TOKEN").ok();

        tracing::info!(
            project_id = %config.project_id,
            storage_bucket = %config.storage_bucket,
            auth_token_set = config.auth_token.is_some(),
            "Loaded Firebase config from environment"
        );
        Ok(config)
    }
}

/// Application handle for one Firebase project.
pub struct FirebaseApp {
    config: FirebaseConfig,
    http: reqwest::Client,
}

impl FirebaseApp {
    pub fn new(config: FirebaseConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Use a preconfigured `reqwest` client (proxies, timeouts, ...).
    pub fn with_client(config: FirebaseConfig, http: reqwest::Client) -> Self {
        tracing::info!(
            project_id = %config.project_id,
            storage_bucket = %config.storage_bucket,
            "Initialized FirebaseApp"
        );
        Self { config, http }
    }

    pub fn storage(&self) -> StorageClient {
        StorageClient::new(self.http.clone(), &self.config)
    }

    pub fn firestore(&self) -> FirestoreClient {
        FirestoreClient::new(self.http.clone(), &self.config)
    }
}

impl VendorApp for FirebaseApp {
    fn document_store(&self) -> Arc<dyn DocumentStore> {
        Arc::new(self.firestore())
    }

    fn object_store(&self) -> Arc<dyn ObjectStore> {
        Arc::new(self.storage())
    }
}

/// Parse `endpoint` as a base URL.
fn base_url(endpoint: &str) -> Result<reqwest::Url, FirebaseError> {
    reqwest::Url::parse(endpoint).map_err(|e| FirebaseError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

/// Append path segments to `url`, percent-encoding each one (including `/`).
fn push_segments<'a>(
    url: &mut reqwest::Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<(), FirebaseError> {
    let endpoint = url.to_string();
    let mut path = url
        .path_segments_mut()
        .map_err(|()| FirebaseError::InvalidEndpoint {
            endpoint,
            reason: "endpoint cannot be a base URL".to_string(),
        })?;
    path.pop_if_empty().extend(segments);
    Ok(())
}

/// Turn a non-success response into [`FirebaseError::Status`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FirebaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(%url, status = status.as_u16(), %body, "Firebase request rejected");
    Err(FirebaseError::Status {
        url,
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_segments_encodes_slashes() {
        let mut url = base_url("http://localhost:9199").unwrap();
        push_segments(&mut url, ["v0", "b", "demo.appspot.com", "o", "avatars/u 1.png"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9199/v0/b/demo.appspot.com/o/avatars%2Fu%201.png"
        );
    }

    #[test]
    fn push_segments_keeps_endpoint_prefix() {
        let mut url = base_url("http://localhost:8080/emulator/").unwrap();
        push_segments(&mut url, ["v1", "projects"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/emulator/v1/projects");
    }

    #[test]
    fn rejects_unparseable_endpoint() {
        assert!(matches!(
            base_url("not a url"),
            Err(FirebaseError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn config_defaults_point_at_production() {
        let config = FirebaseConfig::new("demo", "demo.appspot.com");
        assert_eq!(config.storage_endpoint, DEFAULT_STORAGE_ENDPOINT);
        assert_eq!(config.firestore_endpoint, DEFAULT_FIRESTORE_ENDPOINT);
        assert_eq!(config.database_id, "(default)");
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn debug_output_redacts_token() {
        let mut config = FirebaseConfig::new("demo", "demo.appspot.com");
        config.auth_token = Some("s3cr3t".into());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("<redacted>"));
    }
}
