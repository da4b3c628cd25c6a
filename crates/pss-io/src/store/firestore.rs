//! Firestore REST v1 client over `ureq`.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;
use ureq::{Agent, AgentBuilder, Request, Response};
use url::Url;

use pss_core::{
    Document, FieldPath, FieldValue, Fields, PssError, PssResult, StoreError, StoreErrorKind,
};

use super::DocumentStore;
use crate::wire::{decode_document, encode_document, encode_patch};

const PAGE_SIZE: &str = "300";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// How requests are authorized.
#[derive(Clone)]
pub enum StoreAuth {
    /// OAuth access token sent as `Authorization: Bearer`
    Bearer(String),
    /// Web API key sent as the `x-goog-api-key` header, never in the URL
    ApiKey(String),
}

impl fmt::Debug for StoreAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreAuth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            StoreAuth::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub base_url: String,
    /// Applied to every request, connect through body read
    pub timeout: Duration,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: "(default)".to_string(),
            base_url: "https://firestore.googleapis.com/v1".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct FirestoreStore {
    agent: Agent,
    /// `base_url` with the project/database/documents prefix appended
    documents: Url,
    auth: StoreAuth,
}

impl FirestoreStore {
    /// Fails when `base_url` is not an absolute URL that can carry a path.
    pub fn new(config: FirestoreConfig, auth: StoreAuth) -> PssResult<Self> {
        let mut documents = Url::parse(&config.base_url)
            .map_err(|e| PssError::Config(format!("invalid store base_url '{}': {e}", config.base_url)))?;
        documents
            .path_segments_mut()
            .map_err(|()| PssError::Config(format!("store base_url '{}' cannot carry a path", config.base_url)))?
            .pop_if_empty()
            .extend([
                "projects",
                config.project_id.as_str(),
                "databases",
                config.database.as_str(),
                "documents",
            ]);
        let agent = AgentBuilder::new().timeout(config.timeout).build();
        Ok(Self {
            agent,
            documents,
            auth,
        })
    }

    fn url_with(&self, segments: &[&str]) -> Url {
        let mut url = self.documents.clone();
        // `new` only accepts URLs that can carry a path.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn collection_url(&self, collection: &str) -> Url {
        self.url_with(&[collection])
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, StoreError> {
        if id.is_empty() || id.contains('/') || id == "." || id == ".." {
            return Err(StoreError::new(
                StoreErrorKind::Rejected,
                format!("invalid document id '{id}'"),
            ));
        }
        Ok(self.url_with(&[collection, id]))
    }

    fn request(&self, method: &str, url: &Url) -> Request {
        let request = self.agent.request_url(method, url);
        match &self.auth {
            StoreAuth::Bearer(token) => request.set("Authorization", &format!("Bearer {token}")),
            StoreAuth::ApiKey(key) => request.set(API_KEY_HEADER, key),
        }
    }
}

impl DocumentStore for FirestoreStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let url = self.document_url(collection, id)?;
        debug!(%collection, %id, "GET document");
        match self.request("GET", &url).call() {
            Ok(response) => read_json(response).and_then(|body| decode_document(&body)).map(Some),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(err) => Err(map_error(err)),
        }
    }

    fn upsert(&self, collection: &str, id: &str, fields: &Fields) -> Result<(), StoreError> {
        let url = self.document_url(collection, id)?;
        debug!(%collection, %id, fields = fields.len(), "PATCH document (replace)");
        self.request("PATCH", &url)
            .send_json(encode_document(fields))
            .map(drop)
            .map_err(map_error)
    }

    fn patch(
        &self,
        collection: &str,
        id: &str,
        updates: &[(FieldPath, FieldValue)],
    ) -> Result<(), StoreError> {
        if updates.is_empty() {
            return Ok(());
        }
        let url = self.document_url(collection, id)?;
        let (body, mask) = encode_patch(updates);
        debug!(%collection, %id, mask = ?mask, "PATCH document (masked)");
        let mut request = self
            .request("PATCH", &url)
            .query("currentDocument.exists", "true");
        for path in &mask {
            request = request.query("updateMask.fieldPaths", path);
        }
        request.send_json(body).map(drop).map_err(map_error)
    }

    fn ping(&self, collection: &str) -> Result<(), StoreError> {
        let url = self.collection_url(collection);
        debug!(%collection, "LIST documents (ping)");
        self.request("GET", &url)
            .query("pageSize", "1")
            .call()
            .map_err(map_error)
            .and_then(read_json)
            .map(drop)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let url = self.collection_url(collection);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut request = self.request("GET", &url).query("pageSize", PAGE_SIZE);
            if let Some(token) = &page_token {
                request = request.query("pageToken", token);
            }
            debug!(%collection, page = ?page_token, "LIST documents");
            let body = request.call().map_err(map_error).and_then(read_json)?;
            if let Some(items) = body.get("documents").and_then(Value::as_array) {
                for item in items {
                    documents.push(decode_document(item)?);
                }
            }
            page_token = body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if page_token.is_none() {
                return Ok(documents);
            }
        }
    }
}

fn read_json(response: Response) -> Result<Value, StoreError> {
    response.into_json::<Value>().map_err(|e| {
        if is_timeout(&e) {
            StoreError::new(StoreErrorKind::Timeout, format!("reading response: {e}"))
        } else {
            StoreError::new(StoreErrorKind::Malformed, format!("invalid response body: {e}"))
        }
    })
}

/// HTTP status -> failure class.
pub(crate) fn kind_for_status(status: u16) -> StoreErrorKind {
    match status {
        401 | 403 => StoreErrorKind::PermissionDenied,
        404 => StoreErrorKind::NotFound,
        409 | 412 => StoreErrorKind::Conflict,
        408 | 504 => StoreErrorKind::Timeout,
        429 | 500 | 502 | 503 => StoreErrorKind::Unavailable,
        400..=499 => StoreErrorKind::Rejected,
        _ => StoreErrorKind::Unavailable,
    }
}

fn map_error(err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(status, response) => {
            let detail = error_detail(response);
            StoreError::new(kind_for_status(status), format!("HTTP {status}: {detail}"))
        }
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            let timed_out = std::error::Error::source(&transport)
                .and_then(|src| src.downcast_ref::<std::io::Error>())
                .is_some_and(is_timeout)
                || message.contains("timed out");
            let kind = if timed_out {
                StoreErrorKind::Timeout
            } else {
                StoreErrorKind::Unavailable
            };
            StoreError::new(kind, message)
        }
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

/// `error.message` from a Google API error body, else the raw body.
fn error_detail(response: Response) -> String {
    let raw = response.into_string().unwrap_or_default();
    serde_json::from_str::<Value>(&raw)
        .ok()
        .and_then(|body| {
            body.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(raw)
}
