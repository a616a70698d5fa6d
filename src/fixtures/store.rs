//! File-backed fixture store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::http::Method;
use serde::Deserialize;
use uuid::Uuid;

use crate::fixtures::functions::FunctionRegistry;
use crate::fixtures::headers::FixtureHeaders;
use crate::fixtures::key::{ArtifactType, FixtureKey, LogicalPath, Namespace};
use crate::fixtures::FixtureError;
use crate::http::request::InboundRequest;
use crate::http::response::ResponseEnvelope;
use crate::observability::metrics;

/// Optional `<path>.json` definition file.
#[derive(Debug, Default, Deserialize)]
struct ResponseDefinition {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseKind {
    Data,
    Func,
}

/// Headers and body loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureResponse {
    pub headers: FixtureHeaders,
    pub body: Bytes,
}

/// Result of a fixture lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedResponse {
    Fixture(FixtureResponse),
    /// No usable fixture. Rendered as the 504 `Mock data fail` envelope.
    Missing,
}

impl LoadedResponse {
    pub fn is_missing(&self) -> bool {
        matches!(self, LoadedResponse::Missing)
    }

    pub fn into_envelope(self) -> ResponseEnvelope {
        match self {
            LoadedResponse::Fixture(fixture) => ResponseEnvelope::from_fixture(&fixture.headers, fixture.body),
            LoadedResponse::Missing => ResponseEnvelope::mock_failure(),
        }
    }
}

/// Reads and writes fixtures under a root directory.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    root: PathBuf,
    functions: FunctionRegistry,
}

impl FixtureStore {
    /// Create a store with the built-in response functions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            functions: FunctionRegistry::with_builtins(),
        }
    }

    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Read an artifact for the request.
    ///
    /// A body-specific file wins; when it is absent the generic file for the
    /// same path is used.
    pub async fn get(
        &self,
        artifact: ArtifactType,
        path: &LogicalPath,
        request: &InboundRequest,
    ) -> Option<Vec<u8>> {
        let namespace = Namespace::for_request(request);
        let key = FixtureKey::new(artifact, path.clone(), &request.body);

        if let Some(content) = read_optional(&key.resolve(&self.root, namespace)).await {
            return Some(content);
        }
        if key.body_hash.is_some() {
            return read_optional(&key.generic().resolve(&self.root, namespace)).await;
        }
        None
    }

    /// Write an artifact for the request, replacing any previous file.
    pub async fn put(
        &self,
        artifact: ArtifactType,
        path: &LogicalPath,
        content: &[u8],
        request: &InboundRequest,
    ) -> Result<PathBuf, FixtureError> {
        let namespace = Namespace::for_request(request);
        let target = FixtureKey::new(artifact, path.clone(), &request.body).resolve(&self.root, namespace);
        write_atomic(&target, content).await?;
        tracing::info!(file = %target.display(), artifact = %artifact, "Fixture stored");
        Ok(target)
    }

    /// Load the fixture response for a request.
    pub async fn load_response(&self, request: &InboundRequest) -> LoadedResponse {
        let namespace = Namespace::for_request(request);
        let path = LogicalPath::for_request(request);

        let kind = match self.response_kind(&path, namespace).await {
            Some(kind) => kind,
            None => {
                metrics::record_fixture_lookup(false);
                return LoadedResponse::Missing;
            }
        };

        let artifact = match kind {
            ResponseKind::Data => ArtifactType::Data,
            ResponseKind::Func => ArtifactType::Func,
        };

        let Some(content) = self.get(artifact, &path, request).await else {
            tracing::debug!(path = %path, namespace = %namespace, artifact = %artifact, "No fixture found");
            metrics::record_fixture_lookup(false);
            return LoadedResponse::Missing;
        };

        let body = match kind {
            ResponseKind::Data => content,
            ResponseKind::Func => match self.functions.invoke(&content, request) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Response function failed, sending empty body");
                    Vec::new()
                }
            },
        };

        let headers = match self.get(ArtifactType::Headers, &path, request).await {
            Some(raw) => FixtureHeaders::from_json(&raw).unwrap_or_else(|e| {
                tracing::debug!(path = %path, error = %e, "Unreadable headers fixture, using defaults");
                FixtureHeaders::new()
            }),
            None => FixtureHeaders::new(),
        };

        metrics::record_fixture_lookup(true);
        tracing::debug!(path = %path, namespace = %namespace, "Fixture hit");
        LoadedResponse::Fixture(FixtureResponse {
            headers,
            body: Bytes::from(body),
        })
    }

    /// Persist an upstream response as fixtures for the request.
    ///
    /// POST requests with body data also get a `request` artifact holding the
    /// canonical request body.
    pub async fn capture(
        &self,
        request: &InboundRequest,
        headers: &FixtureHeaders,
        body: &[u8],
    ) -> Result<(), FixtureError> {
        let path = LogicalPath::for_request(request);
        self.put(ArtifactType::Headers, &path, &headers.to_json(), request).await?;
        self.put(ArtifactType::Data, &path, body, request).await?;
        if request.method == Method::POST && request.body.has_data() {
            self.put(ArtifactType::RequestBody, &path, &request.body.canonical_bytes(), request)
                .await?;
        }
        Ok(())
    }

    async fn response_kind(&self, path: &LogicalPath, namespace: Namespace) -> Option<ResponseKind> {
        let definition_path = path.definition_path(&self.root, namespace);
        let Some(raw) = read_optional(&definition_path).await else {
            return Some(ResponseKind::Data);
        };

        let definition: ResponseDefinition = match serde_json::from_slice(&raw) {
            Ok(definition) => definition,
            Err(e) => {
                tracing::warn!(file = %definition_path.display(), error = %e, "Invalid definition file");
                return None;
            }
        };

        match definition.kind.as_deref() {
            None | Some("data") => Some(ResponseKind::Data),
            Some("func") => Some(ResponseKind::Func),
            Some(other) => {
                tracing::warn!(file = %definition_path.display(), kind = other, "Unknown response type");
                None
            }
        }
    }
}

async fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match tokio::fs::read(path).await {
        Ok(content) => {
            tracing::debug!(file = %path.display(), "Reading fixture file");
            Some(content)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "Failed to read fixture file");
            None
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> FixtureError {
    let path = path.to_path_buf();
    move |source| FixtureError::Io { path, source }
}

async fn write_atomic(target: &Path, content: &[u8]) -> Result<(), FixtureError> {
    let dir = target.parent().unwrap_or(Path::new("."));
    tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;

    // Fixed-length name: the target may already be close to NAME_MAX.
    let temp = dir.join(format!(".{}.tmp", Uuid::new_v4().simple()));

    tokio::fs::write(&temp, content).await.map_err(io_error(&temp))?;
    if let Err(e) = tokio::fs::rename(&temp, target).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(FixtureError::Io {
            path: target.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestBody;
    use serde_json::json;
    use tempfile::TempDir;

    fn get(path: &str) -> InboundRequest {
        InboundRequest::new(Method::GET, path)
    }

    async fn write(root: &Path, relative: &str, content: &[u8]) {
        let path = root.join(relative);
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_fixture() {
        let dir = TempDir::new().unwrap();
        let store = FixtureStore::new(dir.path());
        assert!(store.load_response(&get("/users/1")).await.is_missing());
    }

    #[tokio::test]
    async fn test_put_then_load_is_stable() {
        let dir = TempDir::new().unwrap();
        let store = FixtureStore::new(dir.path());
        let request = get("/items");
        let headers = FixtureHeaders::new().with_status(201);

        store.capture(&request, &headers, br#"{"a":1}"#).await.unwrap();
        assert!(dir.path().join("public/items.headers.json").exists());
        assert!(dir.path().join("public/items.data.raw").exists());

        for _ in 0..3 {
            let LoadedResponse::Fixture(fixture) = store.load_response(&request).await else {
                panic!("fixture expected");
            };
            assert_eq!(fixture.body, Bytes::from_static(br#"{"a":1}"#));
            assert_eq!(fixture.headers, headers);
        }
    }

    #[tokio::test]
    async fn test_body_specific_and_fallback() {
        let dir = TempDir::new().unwrap();
        let store = FixtureStore::new(dir.path());
        let path = LogicalPath::new("/search", None);

        let b1 = get("/search").with_body(RequestBody::Json(json!({"q": 1})));
        let b2 = get("/search").with_body(RequestBody::Json(json!({"q": 2})));
        let plain = get("/search");

        store.put(ArtifactType::Data, &path, b"generic", &plain).await.unwrap();
        store.put(ArtifactType::Data, &path, b"for-b1", &b1).await.unwrap();

        assert_eq!(store.get(ArtifactType::Data, &path, &b1).await.unwrap(), b"for-b1");
        // b2 has no specific fixture and must never see b1's.
        assert_eq!(store.get(ArtifactType::Data, &path, &b2).await.unwrap(), b"generic");
        assert_eq!(store.get(ArtifactType::Data, &path, &plain).await.unwrap(), b"generic");
    }

    #[tokio::test]
    async fn test_namespace_partition() {
        let dir = TempDir::new().unwrap();
        let store = FixtureStore::new(dir.path());
        let private = get("/me").with_header("authorization", "Bearer t");
        let public = get("/me");

        store.capture(&private, &FixtureHeaders::new(), b"secret").await.unwrap();
        assert!(store.load_response(&public).await.is_missing());
        assert!(!store.load_response(&private).await.is_missing());

        store.capture(&public, &FixtureHeaders::new(), b"open").await.unwrap();
        let LoadedResponse::Fixture(fixture) = store.load_response(&private).await else {
            panic!("fixture expected");
        };
        assert_eq!(fixture.body, Bytes::from_static(b"secret"));
    }

    #[tokio::test]
    async fn test_post_capture_stores_request_body() {
        let dir = TempDir::new().unwrap();
        let store = FixtureStore::new(dir.path());
        let body = RequestBody::Json(json!({"b": 2, "a": 1}));
        let request = InboundRequest::new(Method::POST, "/orders").with_body(body.clone());

        store.capture(&request, &FixtureHeaders::new(), b"ok").await.unwrap();

        let hash = crate::fixtures::key::body_hash(&body).unwrap();
        let stored = tokio::fs::read(dir.path().join(format!("public/orders.request.{hash}.json")))
            .await
            .unwrap();
        assert_eq!(stored, br#"{"a":1,"b":2}"#.to_vec());
        assert!(dir.path().join(format!("public/orders.data.{hash}.raw")).exists());
    }

    #[tokio::test]
    async fn test_put_near_name_length_limit() {
        let dir = TempDir::new().unwrap();
        let store = FixtureStore::new(dir.path());
        // 240 + ".data.raw" stays under the usual 255-byte file name limit.
        let long = format!("/{}", "q".repeat(240));
        let request = get(&long);
        let path = LogicalPath::for_request(&request);

        let written = store.put(ArtifactType::Data, &path, b"long", &request).await.unwrap();
        assert_eq!(written.file_name().unwrap().len(), 249);
        assert_eq!(store.get(ArtifactType::Data, &path, &request).await.unwrap(), b"long");

        let mut entries = tokio::fs::read_dir(dir.path().join("public")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name());
        }
        assert_eq!(names.len(), 1, "temp file left behind: {names:?}");
    }

    #[tokio::test]
    async fn test_func_definition() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "public/echo.json", br#"{"type": "func"}"#).await;
        write(dir.path(), "public/echo.func.js", b"echo_body").await;
        let store = FixtureStore::new(dir.path());

        let request = InboundRequest::new(Method::POST, "/echo").with_body(RequestBody::Text("ping".into()));
        let LoadedResponse::Fixture(fixture) = store.load_response(&request).await else {
            panic!("fixture expected");
        };
        assert_eq!(fixture.body, Bytes::from_static(b"ping"));
        assert!(fixture.headers.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_function_yields_empty_body() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "public/f.json", br#"{"type": "func"}"#).await;
        write(dir.path(), "public/f.func.js", b"not_registered").await;
        let store = FixtureStore::new(dir.path());

        let LoadedResponse::Fixture(fixture) = store.load_response(&get("/f")).await else {
            panic!("fixture expected");
        };
        assert!(fixture.body.is_empty());
    }

    #[tokio::test]
    async fn test_bad_definition_or_headers() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "public/broken.json", b"{oops").await;
        write(dir.path(), "public/broken.data.raw", b"x").await;
        write(dir.path(), "public/ok.data.raw", b"y").await;
        write(dir.path(), "public/ok.headers.json", b"not json").await;
        let store = FixtureStore::new(dir.path());

        assert!(store.load_response(&get("/broken")).await.is_missing());
        let LoadedResponse::Fixture(fixture) = store.load_response(&get("/ok")).await else {
            panic!("fixture expected");
        };
        assert!(fixture.headers.is_empty());
    }
}
