//! Fixture keys and on-disk path resolution.
//!
//! # Layout
//! ```text
//! <root>/<public|private>/<logical path>.<type>[.<body hash>].<ext>
//! <root>/<public|private>/<logical path>.json          (definition file)
//! ```
//!
//! # Design Decisions
//! - The body hash is SHA-256 over the canonical (key-sorted) body
//! - The namespace comes from the current request, never from the fixture
//! - Logical paths are normalized so `..` cannot leave the namespace root

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::http::request::{InboundRequest, RequestBody};

/// Kind of artifact stored for a logical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactType {
    Data,
    Headers,
    Func,
    RequestBody,
}

impl ArtifactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Data => "data",
            ArtifactType::Headers => "headers",
            ArtifactType::Func => "func",
            ArtifactType::RequestBody => "request",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactType::Data => "raw",
            ArtifactType::Headers | ArtifactType::RequestBody => "json",
            ArtifactType::Func => "js",
        }
    }
}

impl FromStr for ArtifactType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(ArtifactType::Data),
            "headers" => Ok(ArtifactType::Headers),
            "func" => Ok(ArtifactType::Func),
            "request" => Ok(ArtifactType::RequestBody),
            other => Err(format!("unknown artifact type `{other}`")),
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage partition selected by `Authorization` header presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Private,
    Public,
}

impl Namespace {
    pub fn for_request(request: &InboundRequest) -> Self {
        if request.is_authorized() {
            Namespace::Private
        } else {
            Namespace::Public
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Private => "private",
            Namespace::Public => "public",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized request path used as the fixture stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalPath {
    segments: Vec<String>,
}

impl LogicalPath {
    /// Normalize a URL path (and optional query) into path segments.
    ///
    /// The query is appended to the last segment as `?query`, with `/`
    /// escaped. The root path becomes `index`.
    pub fn new(path: &str, query: Option<&str>) -> Self {
        let mut segments: Vec<String> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other.to_string()),
            }
        }

        if segments.is_empty() {
            segments.push("index".to_string());
        }

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            if let Some(last) = segments.last_mut() {
                last.push('?');
                last.push_str(&query.replace('/', "%2F"));
            }
        }

        Self { segments }
    }

    pub fn for_request(request: &InboundRequest) -> Self {
        Self::new(&request.path, request.query.as_deref())
    }

    fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("index")
    }

    fn parent_segments(&self) -> &[String] {
        &self.segments[..self.segments.len().saturating_sub(1)]
    }

    /// Directory holding this path's fixtures.
    pub fn directory(&self, root: &Path, namespace: Namespace) -> PathBuf {
        let mut dir = root.join(namespace.as_str());
        for segment in self.parent_segments() {
            dir.push(segment);
        }
        dir
    }

    /// `<root>/<ns>/<path>.json`, the optional response definition.
    pub fn definition_path(&self, root: &Path, namespace: Namespace) -> PathBuf {
        self.directory(root, namespace)
            .join(format!("{}.json", self.leaf()))
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

/// Hex SHA-256 of the canonical body, or `None` when the body has no data.
pub fn body_hash(body: &RequestBody) -> Option<String> {
    if !body.has_data() {
        return None;
    }
    let digest = Sha256::digest(body.canonical_bytes());
    Some(hex::encode(digest))
}

/// Deterministic identifier of one fixture file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FixtureKey {
    pub artifact: ArtifactType,
    pub path: LogicalPath,
    pub body_hash: Option<String>,
}

impl FixtureKey {
    pub fn new(artifact: ArtifactType, path: LogicalPath, body: &RequestBody) -> Self {
        Self {
            artifact,
            path,
            body_hash: body_hash(body),
        }
    }

    /// Same key without the body hash.
    pub fn generic(&self) -> Self {
        Self {
            artifact: self.artifact,
            path: self.path.clone(),
            body_hash: None,
        }
    }

    pub fn file_name(&self) -> String {
        match &self.body_hash {
            Some(hash) => format!(
                "{}.{}.{}.{}",
                self.path.leaf(),
                self.artifact.as_str(),
                hash,
                self.artifact.extension()
            ),
            None => format!(
                "{}.{}.{}",
                self.path.leaf(),
                self.artifact.as_str(),
                self.artifact.extension()
            ),
        }
    }

    pub fn resolve(&self, root: &Path, namespace: Namespace) -> PathBuf {
        self.path.directory(root, namespace).join(self.file_name())
    }
}
