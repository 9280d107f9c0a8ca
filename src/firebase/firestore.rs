//! Cloud Firestore over its REST endpoint (`documents.patch`, `documents:commit`).

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use super::{base_url, check_status, push_segments, FirebaseConfig, FirebaseError};
use crate::contract::{BoxError, DocumentStore};
use crate::record::Record;

/// Document store backed by one Firestore database.
#[derive(Clone)]
pub struct FirestoreClient {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    database_id: String,
    auth_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(http: reqwest::Client, config: &FirebaseConfig) -> Self {
        Self {
            http,
            endpoint: config.firestore_endpoint.clone(),
            project_id: config.project_id.clone(),
            database_id: config.database_id.clone(),
            auth_token: config.auth_token.clone(),
        }
    }

    /// Non-empty segments of a document path; `users//u1` addresses `users/u1`.
    fn document_segments<'p>(&self, path: &'p str) -> Result<Vec<&'p str>, FirebaseError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() || segments.len() % 2 != 0 {
            return Err(FirebaseError::InvalidDocumentPath {
                path: path.to_string(),
            });
        }
        Ok(segments)
    }

    /// `{endpoint}/v1/projects/{project}/databases/{database}/{last}`
    fn database_url(&self, last: &str) -> Result<reqwest::Url, FirebaseError> {
        let mut url = base_url(&self.endpoint)?;
        push_segments(
            &mut url,
            [
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                self.database_id.as_str(),
                last,
            ],
        )?;
        Ok(url)
    }

    /// `{endpoint}/v1/projects/{project}/databases/{database}/documents/{path}`
    fn document_url(&self, path: &str) -> Result<reqwest::Url, FirebaseError> {
        let segments = self.document_segments(path)?;
        let mut url = self.database_url("documents")?;
        push_segments(&mut url, segments)?;
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn patch(&self, path: &str, fields: &Record) -> Result<(), FirebaseError> {
        let (mask, document) = update_mask(fields)?;
        let mut url = self.document_url(path)?;
        {
            let mut query = url.query_pairs_mut();
            for field in &mask {
                query.append_pair("updateMask.fieldPaths", field);
            }
            query.append_pair("currentDocument.exists", "true");
        }

        let body = json!({ "fields": encode_fields(&document) });
        debug!(%url, %body, "[FIRESTORE] Patching document");

        check_status(self.authorize(self.http.patch(url).json(&body)).send().await?).await?;
        Ok(())
    }

    /// An update with no fields still requires the document to exist. The
    /// PATCH query cannot carry an empty mask (no mask means "replace the
    /// whole document"), so the write goes through `documents:commit`.
    async fn touch(&self, path: &str) -> Result<(), FirebaseError> {
        let name = format!(
            "projects/{}/databases/{}/documents/{}",
            self.project_id,
            self.database_id,
            self.document_segments(path)?.join("/")
        );
        let url = self.database_url("documents:commit")?;
        let body = json!({
            "writes": [{
                "update": { "name": name },
                "updateMask": { "fieldPaths": [] },
                "currentDocument": { "exists": true }
            }]
        });
        debug!(%url, %body, "[FIRESTORE] Committing empty update");

        check_status(self.authorize(self.http.post(url).json(&body)).send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    async fn update_document(&self, path: &str, fields: Record) -> Result<(), BoxError> {
        info!(project_id = %self.project_id, path, fields = fields.len(), "[FIRESTORE] Updating document");
        let outcome = if fields.is_empty() {
            self.touch(path).await
        } else {
            self.patch(path, &fields).await
        };
        match outcome {
            Ok(()) => {
                info!(path, "[FIRESTORE] Document updated");
                Ok(())
            }
            Err(e) => {
                error!(path, error = ?e, "[FIRESTORE][ERROR] Document update failed");
                Err(Box::new(e))
            }
        }
    }
}

/// Quote `key` as a Firestore field path segment when it is not a plain identifier.
pub fn field_path(key: &str) -> String {
    static SIMPLE: OnceLock<Regex> = OnceLock::new();
    let simple = SIMPLE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z_0-9]*$").expect("static field path pattern is valid")
    });
    if simple.is_match(key) {
        return key.to_string();
    }
    format!("`{}`", key.replace('\\', "\\\\").replace('`', "\\`"))
}

/// Mask paths and nested document body for an update.
///
/// A key such as `address.city` addresses the `city` field inside the
/// `address` map and leaves its other fields alone. Each segment is quoted
/// with [`field_path`] on its own.
pub fn update_mask(fields: &Record) -> Result<(Vec<String>, Record), FirebaseError> {
    let mut mask = Vec::with_capacity(fields.len());
    let mut document = Record::new();
    for (key, value) in fields {
        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(FirebaseError::InvalidFieldPath { path: key.clone() });
        }
        mask.push(
            segments
                .iter()
                .map(|segment| field_path(segment))
                .collect::<Vec<_>>()
                .join("."),
        );
        insert_nested(&mut document, &segments, value.clone());
    }
    Ok((mask, document))
}

fn insert_nested(target: &mut Record, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = target
                .entry(*head)
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                insert_nested(inner, rest, value);
            }
        }
    }
}

/// Encode a record as the `fields` map of a Firestore document.
pub fn encode_fields(fields: &Record) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), encode_value(value)))
        .collect()
}

/// Encode one JSON value as a Firestore `Value`.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}
