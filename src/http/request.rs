//! Inbound request model.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client did not send one
//! - Buffer and parse the request body once, by content type
//! - Expose what fixture lookup and forwarding need (method, path, query,
//!   headers, parsed body)
//!
//! # Design Decisions
//! - JSON bodies that fail to parse are kept as raw bytes, not rejected
//! - The parsed body is immutable; forwarding re-serializes it

use axum::body::Bytes;
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use serde_json::{Map, Value};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Read the request ID set by the middleware, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// A parsed request body.
///
/// Only JSON and text bodies take part in fixture keys. Any other content
/// type (form data, binary uploads) is kept as `Raw` for forwarding and
/// resolves to the generic fixture.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Raw(Bytes),
}

impl RequestBody {
    /// Parse a buffered body according to its `Content-Type`.
    pub fn parse(content_type: Option<&str>, bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return RequestBody::Empty;
        }

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if mime == "application/json" || mime.ends_with("+json") {
            match serde_json::from_slice(&bytes) {
                Ok(value) => RequestBody::Json(value),
                Err(_) => RequestBody::Raw(bytes),
            }
        } else if mime.starts_with("text/") {
            match String::from_utf8(bytes.to_vec()) {
                Ok(text) => RequestBody::Text(text),
                Err(_) => RequestBody::Raw(bytes),
            }
        } else {
            RequestBody::Raw(bytes)
        }
    }

    /// True when the body carries data worth keying fixtures on.
    ///
    /// JSON scalars (numbers, booleans, null) and `Raw` bodies do not count.
    pub fn has_data(&self) -> bool {
        match self {
            RequestBody::Empty => false,
            RequestBody::Json(Value::Object(map)) => !map.is_empty(),
            RequestBody::Json(Value::Array(items)) => !items.is_empty(),
            RequestBody::Json(Value::String(s)) => !s.is_empty(),
            RequestBody::Json(_) => false,
            RequestBody::Text(text) => !text.is_empty(),
            RequestBody::Raw(_) => false,
        }
    }

    /// Canonical serialization used for hashing and for `request` fixtures.
    ///
    /// JSON objects are emitted with keys sorted at every level; text is
    /// emitted as a JSON string literal; raw bytes verbatim.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            RequestBody::Empty => Vec::new(),
            RequestBody::Json(value) => {
                serde_json::to_vec(&canonicalize(value)).unwrap_or_default()
            }
            RequestBody::Text(text) => {
                serde_json::to_vec(&Value::String(text.clone())).unwrap_or_default()
            }
            RequestBody::Raw(bytes) => bytes.to_vec(),
        }
    }

    /// Bytes to send upstream, `None` for an empty body.
    pub fn wire_bytes(&self) -> Option<Bytes> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Json(value) => serde_json::to_vec(value).ok().map(Bytes::from),
            RequestBody::Text(text) => Some(Bytes::from(text.clone())),
            RequestBody::Raw(bytes) => Some(bytes.clone()),
        }
    }

    /// Structured view handed to response functions.
    pub fn to_value(&self) -> Value {
        match self {
            RequestBody::Empty => Value::Null,
            RequestBody::Json(value) => value.clone(),
            RequestBody::Text(text) => Value::String(text.clone()),
            RequestBody::Raw(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, item) in entries {
                sorted.insert(key.clone(), canonicalize(item));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// A fully buffered inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl InboundRequest {
    /// Build a request with no headers and no body.
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (path_and_query, None),
        };
        Self {
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: query.filter(|q| !q.is_empty()),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Build from axum request parts and the buffered body.
    pub fn from_parts(parts: &Parts, bytes: Bytes) -> Self {
        Self::from_uri(parts.method.clone(), &parts.uri, parts.headers.clone(), bytes)
    }

    pub fn from_uri(method: Method, uri: &Uri, headers: HeaderMap, bytes: Bytes) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        let body = RequestBody::parse(content_type, bytes);
        Self {
            method,
            path: uri.path().to_string(),
            query: uri.query().filter(|q| !q.is_empty()).map(str::to_string),
            headers,
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Presence of an `Authorization` header, regardless of its value.
    pub fn is_authorized(&self) -> bool {
        self.headers.contains_key(header::AUTHORIZATION)
    }
}
