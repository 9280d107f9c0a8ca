//! The utilities facade.
//!
//! [`Utilities`] is an explicit context value: construct it once, call
//! [`Utilities::init`] with a vendor app to enable the storage and database
//! helpers, then share it (e.g. behind an `Arc`) with whatever needs it.
//!
//! Two states:
//! - **Uninitialized**: no vendor handles; [`Utilities::upload_file`] and
//!   [`Utilities::update_user`] fail without touching the network.
//! - **Initialized**: `{app, db, storage}` present, set by `init`.
//!
//! `init` without a Firebase app is a no-op, and there is no way back to
//! Uninitialized. Sorting and CSV conversion never need vendor handles.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::contract::{BlobSink, DocumentStore, NamedBlob, ObjectStore, UploadMetadata, VendorApp};
use crate::csv::{self, CSV_CONTENT_TYPE};
use crate::error::{UtilitiesError, UtilitiesResult};
use crate::gateway;
use crate::record::{self, Record};
use crate::sink::FileSink;

/// Collection used by [`Utilities::update_user`] when none is given.
pub const DEFAULT_USER_COLLECTION: &str = "users/";

/// Firebase part of the initialisation options.
#[derive(Clone)]
pub struct FirebaseOptions {
    pub app: Arc<dyn VendorApp>,
}

/// Initialisation options; without `firebase` the vendor helpers stay disabled.
#[derive(Clone, Default)]
pub struct Options {
    pub firebase: Option<FirebaseOptions>,
}

impl Options {
    pub fn with_app(app: Arc<dyn VendorApp>) -> Self {
        Self {
            firebase: Some(FirebaseOptions { app }),
        }
    }
}

/// Vendor handles derived from one app.
#[derive(Clone)]
pub struct VendorHandles {
    pub app: Arc<dyn VendorApp>,
    pub db: Arc<dyn DocumentStore>,
    pub storage: Arc<dyn ObjectStore>,
}

impl VendorHandles {
    pub fn from_app(app: Arc<dyn VendorApp>) -> Self {
        let db = app.document_store();
        let storage = app.object_store();
        Self { app, db, storage }
    }
}

pub struct Utilities {
    firebase: Option<VendorHandles>,
    sink: Arc<dyn BlobSink>,
}

impl Default for Utilities {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Utilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Utilities")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Utilities {
    /// Uninitialized facade whose CSV downloads are written to the filesystem.
    pub fn new() -> Self {
        Self::with_sink(Arc::new(FileSink::new()))
    }

    /// Uninitialized facade persisting CSV downloads through `sink`.
    pub fn with_sink(sink: Arc<dyn BlobSink>) -> Self {
        Self {
            firebase: None,
            sink,
        }
    }

    /// Store the handles derived from `options.firebase.app`, replacing any
    /// previous ones. Without a Firebase app the facade is left as it is.
    pub fn init(&mut self, options: Option<Options>) {
        match options.and_then(|o| o.firebase) {
            Some(FirebaseOptions { app }) => {
                let replaced = self.firebase.is_some();
                self.firebase = Some(VendorHandles::from_app(app));
                info!(replaced, "Utilities initialised with Firebase app");
            }
            None => {
                debug!("Utilities init called without Firebase options, vendor helpers stay disabled");
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.firebase.is_some()
    }

    /// The current vendor handles, if initialised.
    pub fn firebase(&self) -> Option<&VendorHandles> {
        self.firebase.as_ref()
    }

    /// See [`record::sort_by`].
    pub fn sort_by<'a>(&self, items: &'a mut [Record]) -> UtilitiesResult<&'a mut [Record]> {
        record::sort_by(items)
    }

    /// Convert `items` to CSV text; when `download` is set the text is also
    /// persisted through the facade's sink under `filename`.
    pub async fn json_to_csv(
        &self,
        items: &[Record],
        filename: &str,
        download: bool,
    ) -> UtilitiesResult<String> {
        let csv = csv::records_to_csv(items)?;
        if !download {
            return Ok(csv);
        }

        let blob = NamedBlob {
            filename: filename.to_string(),
            content_type: CSV_CONTENT_TYPE.to_string(),
            bytes: csv.clone().into_bytes(),
        };
        if let Err(source) = self.sink.persist(blob).await {
            error!(filename, error = ?source, "Persisting CSV failed");
            return Err(UtilitiesError::Persist {
                filename: filename.to_string(),
                source,
            });
        }
        info!(filename, rows = items.len(), "CSV persisted");
        Ok(csv)
    }

    /// See [`csv::csv_to_records`].
    pub fn csv_to_json(&self, data: &str, delimiter: &str) -> Vec<Record> {
        csv::csv_to_records(data, delimiter)
    }

    /// Upload `file` to `path` in cloud storage and return its download URL.
    pub async fn upload_file(
        &self,
        path: &str,
        file: impl Into<Vec<u8>>,
        metadata: Option<UploadMetadata>,
    ) -> UtilitiesResult<String> {
        let storage = match &self.firebase {
            Some(handles) => &handles.storage,
            None => {
                error!(path, "upload_file called before init");
                return Err(UtilitiesError::StorageNotInitialized);
            }
        };
        gateway::upload(storage.as_ref(), path, file.into(), metadata)
            .await
            .map_err(UtilitiesError::Vendor)
    }

    /// Partially update the user document `<collection>/<uid>`.
    ///
    /// `collection` defaults to [`DEFAULT_USER_COLLECTION`]; the path is built
    /// verbatim, so the default yields `users//<uid>`.
    pub async fn update_user(
        &self,
        uid: &str,
        data: Record,
        collection: Option<&str>,
    ) -> UtilitiesResult<()> {
        let db = match &self.firebase {
            Some(handles) => &handles.db,
            None => {
                error!(uid, "update_user called before init");
                return Err(UtilitiesError::DatabaseNotInitialized);
            }
        };
        let path = format!("{}/{}", collection.unwrap_or(DEFAULT_USER_COLLECTION), uid);
        gateway::update_document(db.as_ref(), &path, data)
            .await
            .map_err(UtilitiesError::Vendor)
    }
}
