//! Response functions for `func` fixtures.
//!
//! A `func` fixture does not contain code. It names a function registered in
//! a [`FunctionRegistry`], either as a bare name or as
//! `{"function": "<name>", "args": {...}}`. The function is a pure transform
//! from a read-only view of the request (plus the fixture's args) to the
//! response body; it has no access to the filesystem, network or server
//! state.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::request::InboundRequest;

/// Read-only request view handed to response functions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl FunctionRequest {
    pub fn from_inbound(request: &InboundRequest) -> Self {
        let headers = request
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        Self {
            method: request.method.to_string(),
            path: request.path.clone(),
            query: request.query.clone(),
            headers,
            body: request.body.to_value(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    #[error("unknown response function `{0}`")]
    Unknown(String),
    #[error("invalid function fixture: {0}")]
    InvalidCall(String),
    #[error("response function failed: {0}")]
    Failed(String),
}

/// A registered response function.
pub trait ResponseFunction: Send + Sync {
    fn call(&self, request: &FunctionRequest, args: &Value) -> Result<Vec<u8>, FunctionError>;
}

impl<F> ResponseFunction for F
where
    F: Fn(&FunctionRequest, &Value) -> Result<Vec<u8>, FunctionError> + Send + Sync,
{
    fn call(&self, request: &FunctionRequest, args: &Value) -> Result<Vec<u8>, FunctionError> {
        self(request, args)
    }
}

/// Parsed content of a `func` fixture.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    #[serde(rename = "function")]
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    pub fn parse(source: &[u8]) -> Result<Self, FunctionError> {
        let text = std::str::from_utf8(source)
            .map_err(|e| FunctionError::InvalidCall(e.to_string()))?
            .trim();

        if text.starts_with('{') {
            return serde_json::from_str(text).map_err(|e| FunctionError::InvalidCall(e.to_string()));
        }
        if text.is_empty() || text.contains(char::is_whitespace) {
            return Err(FunctionError::InvalidCall(format!("`{text}` is not a function name")));
        }
        Ok(Self {
            name: text.to_string(),
            args: Value::Null,
        })
    }
}

/// Named response functions available to `func` fixtures.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn ResponseFunction>>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `echo_body` and `echo_request`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("echo_body", echo_body);
        registry.register("echo_request", echo_request);
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: ResponseFunction + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    /// Run the function named by a `func` fixture against a request.
    pub fn invoke(&self, source: &[u8], request: &InboundRequest) -> Result<Vec<u8>, FunctionError> {
        let call = FunctionCall::parse(source)?;
        let function = self
            .functions
            .get(&call.name)
            .ok_or_else(|| FunctionError::Unknown(call.name.clone()))?;
        function.call(&FunctionRequest::from_inbound(request), &call.args)
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry").field("functions", &names).finish()
    }
}

fn echo_body(request: &FunctionRequest, _args: &Value) -> Result<Vec<u8>, FunctionError> {
    match &request.body {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(s.clone().into_bytes()),
        other => serde_json::to_vec(other).map_err(|e| FunctionError::Failed(e.to_string())),
    }
}

fn echo_request(request: &FunctionRequest, _args: &Value) -> Result<Vec<u8>, FunctionError> {
    serde_json::to_vec(request).map_err(|e| FunctionError::Failed(e.to_string()))
}
