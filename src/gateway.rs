//! Stateless storage/document helpers: every call forwards to a vendor handle.
//!
//! Failures from the handles are returned as-is; nothing here retries,
//! translates or rolls back.

use tracing::{debug, error, info};

use crate::contract::{BoxError, DocumentStore, ObjectStore, UploadMetadata};
use crate::record::Record;

/// Upload `payload` to `path` and return a URL that resolves to its content.
///
/// An existing object at `path` is overwritten.
pub async fn upload<S>(
    storage: &S,
    path: &str,
    payload: Vec<u8>,
    metadata: Option<UploadMetadata>,
) -> Result<String, BoxError>
where
    S: ObjectStore + ?Sized,
{
    info!(path, bytes = payload.len(), "[GATEWAY] Uploading object");
    debug!(?metadata, "[GATEWAY] Upload metadata");

    let object = match storage.put_object(path, payload, metadata).await {
        Ok(object) => object,
        Err(e) => {
            error!(path, error = ?e, "[GATEWAY][ERROR] Object write failed");
            return Err(e);
        }
    };

    match storage.download_url(&object).await {
        Ok(url) => {
            info!(
                bucket = %object.bucket,
                full_path = %object.full_path,
                "[GATEWAY] Upload complete, download URL resolved"
            );
            Ok(url)
        }
        Err(e) => {
            error!(full_path = %object.full_path, error = ?e, "[GATEWAY][ERROR] Download URL resolution failed");
            Err(e)
        }
    }
}

/// Apply a partial update to the document at `path`.
pub async fn update_document<D>(db: &D, path: &str, fields: Record) -> Result<(), BoxError>
where
    D: DocumentStore + ?Sized,
{
    info!(path, fields = fields.len(), "[GATEWAY] Updating document");

    db.update_document(path, fields).await.map_err(|e| {
        error!(path, error = ?e, "[GATEWAY][ERROR] Document update failed");
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockDocumentStore, MockObjectStore, ObjectRef};
    use mockall::predicate::eq;
    use mockall::Sequence;
    use serde_json::json;

    #[tokio::test]
    async fn upload_writes_then_resolves_url_of_written_object() {
        let mut storage = MockObjectStore::new();
        let mut seq = Sequence::new();

        storage
            .expect_put_object()
            .withf(|path, bytes, metadata| {
                path == "avatars/u1.png" && bytes == b"png" && metadata.is_none()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|path, _, _| {
                Ok(ObjectRef {
                    bucket: "demo.appspot.com".into(),
                    full_path: path.to_string(),
                })
            });
        storage
            .expect_download_url()
            .with(eq(ObjectRef {
                bucket: "demo.appspot.com".into(),
                full_path: "avatars/u1.png".into(),
            }))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|object| Ok(format!("https://cdn.test/{}", object.full_path)));

        let url = upload(&storage, "avatars/u1.png", b"png".to_vec(), None)
            .await
            .expect("upload should succeed");
        assert_eq!(url, "https://cdn.test/avatars/u1.png");
    }

    #[tokio::test]
    async fn upload_propagates_write_failure_without_resolving_url() {
        let mut storage = MockObjectStore::new();
        storage
            .expect_put_object()
            .returning(|_, _, _| Err("permission denied".into()));
        storage.expect_download_url().never();

        let err = upload(&storage, "x", vec![1, 2, 3], None).await.unwrap_err();
        assert_eq!(err.to_string(), "permission denied");
    }

    #[tokio::test]
    async fn update_document_forwards_path_and_fields() {
        let mut db = MockDocumentStore::new();
        db.expect_update_document()
            .withf(|path, fields| path == "users/u1" && fields.get("age") == Some(&json!(30)))
            .times(1)
            .returning(|_, _| Ok(()));

        let mut fields = Record::new();
        fields.insert("age".into(), json!(30));
        update_document(&db, "users/u1", fields)
            .await
            .expect("update should succeed");
    }

    #[tokio::test]
    async fn update_document_propagates_missing_document_error() {
        let mut db = MockDocumentStore::new();
        db.expect_update_document()
            .returning(|_, _| Err("NOT_FOUND: no document to update".into()));

        let err = update_document(&db, "users/ghost", Record::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("NOT_FOUND"));
    }
}
