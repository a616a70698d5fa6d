//! Headers fixture (`<path>.headers.json`).
//!
//! A JSON object mapping header name to a string, number or array of
//! strings, plus a `status` field carrying the HTTP status code.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};

use crate::fixtures::FixtureError;

const STATUS_FIELD: &str = "status";

/// Stored response headers. Names are kept lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixtureHeaders {
    status: Option<u16>,
    fields: BTreeMap<String, Vec<String>>,
}

impl FixtureHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a headers fixture file.
    pub fn from_json(bytes: &[u8]) -> Result<Self, FixtureError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(object) = value else {
            return Err(FixtureError::NotAnObject);
        };

        let mut headers = Self::new();
        for (name, value) in object {
            let name = name.to_ascii_lowercase();
            if name == STATUS_FIELD {
                headers.status = parse_status(&value);
                continue;
            }
            let values = match value {
                Value::String(s) => vec![s],
                Value::Number(n) => vec![n.to_string()],
                Value::Bool(b) => vec![b.to_string()],
                Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
                Value::Null | Value::Object(_) => continue,
            };
            if !values.is_empty() {
                headers.fields.entry(name).or_default().extend(values);
            }
        }
        Ok(headers)
    }

    /// Snapshot an upstream response for capture.
    pub fn from_response(status: StatusCode, headers: &HeaderMap) -> Self {
        let mut fixture = Self::new().with_status(status.as_u16());
        for (name, value) in headers.iter() {
            if let Ok(value) = value.to_str() {
                fixture.append(name.as_str(), value);
            }
        }
        fixture
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn append(&mut self, name: &str, value: &str) {
        self.fields
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.to_string());
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.fields.is_empty()
    }

    /// Serialize back to the fixture format. Single values are written as
    /// strings, repeated headers as arrays.
    pub fn to_json(&self) -> Vec<u8> {
        let mut object = Map::new();
        if let Some(status) = self.status {
            object.insert(STATUS_FIELD.to_string(), Value::from(status));
        }
        for (name, values) in &self.fields {
            let value = match values.as_slice() {
                [single] => Value::String(single.clone()),
                many => Value::Array(many.iter().cloned().map(Value::String).collect()),
            };
            object.insert(name.clone(), value);
        }
        serde_json::to_vec(&Value::Object(object)).unwrap_or_default()
    }
}

fn parse_status(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_fixture() {
        let raw = br#"{"status": 201, "Content-Type": "text/html", "X-Count": 3, "Set-Cookie": ["a=1", "b=2"]}"#;
        let headers = FixtureHeaders::from_json(raw).unwrap();
        assert_eq!(headers.status(), Some(201));
        assert_eq!(headers.get("content-type").unwrap(), ["text/html"]);
        assert_eq!(headers.get("x-count").unwrap(), ["3"]);
        assert_eq!(headers.get("SET-COOKIE").unwrap().len(), 2);
    }

    #[test]
    fn test_string_status_and_rejects() {
        let headers = FixtureHeaders::from_json(br#"{"status": "404"}"#).unwrap();
        assert_eq!(headers.status(), Some(404));
        assert!(FixtureHeaders::from_json(b"[1,2]").is_err());
        assert!(FixtureHeaders::from_json(b"not json").is_err());
    }

    #[test]
    fn test_from_response_round_trip() {
        let mut map = HeaderMap::new();
        map.insert("content-type", HeaderValue::from_static("application/json"));
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));

        let captured = FixtureHeaders::from_response(StatusCode::OK, &map);
        let reloaded = FixtureHeaders::from_json(&captured.to_json()).unwrap();
        assert_eq!(captured, reloaded);
        assert_eq!(reloaded.status(), Some(200));
    }
}
