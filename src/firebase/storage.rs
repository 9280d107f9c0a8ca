//! Firebase Storage over its REST endpoint (`/v0/b/{bucket}/o`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info};

use super::{base_url, check_status, push_segments, FirebaseConfig, FirebaseError};
use crate::contract::{BoxError, ObjectRef, ObjectStore, UploadMetadata};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Object resource as returned by the Storage API (only the fields we read).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageObject {
    name: String,
    bucket: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

impl StorageObject {
    fn first_download_token(&self) -> Option<&str> {
        self.download_tokens
            .as_deref()?
            .split(',')
            .map(str::trim)
            .find(|token| !token.is_empty())
    }
}

/// Object store backed by one Firebase Storage bucket.
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    endpoint: String,
    bucket: String,
    auth_token: Option<String>,
}

impl StorageClient {
    pub fn new(http: reqwest::Client, config: &FirebaseConfig) -> Self {
        Self {
            http,
            endpoint: config.storage_endpoint.clone(),
            bucket: config.storage_bucket.clone(),
            auth_token: config.auth_token.clone(),
        }
    }

    /// `{endpoint}/v0/b/{bucket}/o[/{object}]`
    fn object_url(&self, bucket: &str, object: Option<&str>) -> Result<reqwest::Url, FirebaseError> {
        let mut url = base_url(&self.endpoint)?;
        push_segments(&mut url, ["v0", "b", bucket, "o"])?;
        if let Some(object) = object {
            push_segments(&mut url, [object])?;
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("Firebase {token}")),
            None => request,
        }
    }

    /// Multipart upload: JSON resource part followed by the payload part.
    async fn upload_multipart(
        &self,
        path: &str,
        bytes: Vec<u8>,
        metadata: Option<UploadMetadata>,
    ) -> Result<StorageObject, FirebaseError> {
        let metadata = metadata.unwrap_or_default();
        let content_type = metadata
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let mut resource = serde_json::to_value(&metadata)?;
        if let Value::Object(fields) = &mut resource {
            fields.insert("name".into(), Value::String(path.to_string()));
            fields.insert("fullPath".into(), Value::String(path.to_string()));
            fields.insert("contentType".into(), Value::String(content_type.clone()));
        }
        debug!(%resource, "[STORAGE] Upload resource metadata");

        let boundary = uuid::Uuid::new_v4().simple().to_string();
        let mut body = Vec::with_capacity(bytes.len() + 512);
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Type: application/json; charset=utf-8\r\n\r\n{resource}\r\n\
                 --{boundary}\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--").as_bytes());

        let mut url = self.object_url(&self.bucket, None)?;
        url.query_pairs_mut().append_pair("name", path);

        let request = self
            .http
            .post(url)
            .header("X-Goog-Upload-Protocol", "multipart")
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);
        let response = check_status(self.authorize(request).send().await?).await?;
        Ok(response.json::<StorageObject>().await?)
    }

    async fn fetch_object(&self, object: &ObjectRef) -> Result<StorageObject, FirebaseError> {
        let url = self.object_url(&object.bucket, Some(&object.full_path))?;
        let response = check_status(self.authorize(self.http.get(url)).send().await?).await?;
        Ok(response.json::<StorageObject>().await?)
    }

    async fn resolve_download_url(&self, object: &ObjectRef) -> Result<String, FirebaseError> {
        let resource = self.fetch_object(object).await?;
        let token = resource
            .first_download_token()
            .ok_or_else(|| FirebaseError::MissingDownloadToken {
                path: object.full_path.clone(),
            })?;

        let mut url = self.object_url(&resource.bucket, Some(&resource.name))?;
        url.query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", token);
        Ok(url.to_string())
    }
}

#[async_trait]
impl ObjectStore for StorageClient {
    async fn put_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        metadata: Option<UploadMetadata>,
    ) -> Result<ObjectRef, BoxError> {
        info!(bucket = %self.bucket, path, bytes = bytes.len(), "[STORAGE] Uploading object");
        match self.upload_multipart(path, bytes, metadata).await {
            Ok(object) => {
                info!(bucket = %object.bucket, name = %object.name, "[STORAGE] Object stored");
                Ok(ObjectRef {
                    bucket: object.bucket,
                    full_path: object.name,
                })
            }
            Err(e) => {
                error!(bucket = %self.bucket, path, error = ?e, "[STORAGE][ERROR] Upload failed");
                Err(Box::new(e))
            }
        }
    }

    async fn download_url(&self, object: &ObjectRef) -> Result<String, BoxError> {
        match self.resolve_download_url(object).await {
            Ok(url) => {
                debug!(full_path = %object.full_path, "[STORAGE] Download URL resolved");
                Ok(url)
            }
            Err(e) => {
                error!(full_path = %object.full_path, error = ?e, "[STORAGE][ERROR] Download URL resolution failed");
                Err(Box::new(e))
            }
        }
    }
}
