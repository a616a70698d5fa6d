//! Configuration validation and serving-mode resolution.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Resolve the initial serving mode from upstream/directory/flags
//! - Produce the `CoreConfig` the dispatcher is built from
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: MockProxyConfig → Result<CoreConfig, Vec<ValidationError>>

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::config::schema::MockProxyConfig;
use crate::resilience::ServingMode;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a fixture directory is required unless an upstream is configured")]
    MissingFixtureDirectory,

    #[error("recording requires a fixture directory")]
    RecordWithoutDirectory,

    #[error("invalid upstream URL `{0}`")]
    InvalidUpstreamUrl(String),

    #[error("unsupported upstream scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),

    #[error("upstream timeout must be greater than zero")]
    ZeroTimeout,

    #[error("invalid listen address `{0}`")]
    InvalidListenAddress(String),

    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),
}

/// What the core needs once configuration is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub mode: ServingMode,
    pub upstream: Option<Url>,
    pub timeout: Duration,
    pub capture: bool,
    pub fixture_root: Option<PathBuf>,
}

/// Initial serving mode.
///
/// No upstream means FULL_MOCK. With an upstream: `proxy_full` or a missing
/// fixture directory means FULL_PROXY, then `proxy_first` means PROXY_FIRST,
/// otherwise MOCK_FIRST.
pub fn resolve_mode(has_upstream: bool, has_directory: bool, proxy_full: bool, proxy_first: bool) -> ServingMode {
    if !has_upstream {
        ServingMode::FullMock
    } else if proxy_full || !has_directory {
        ServingMode::FullProxy
    } else if proxy_first {
        ServingMode::ProxyFirst
    } else {
        ServingMode::MockFirst
    }
}

/// Validate the configuration and resolve it into a `CoreConfig`.
pub fn validate_config(config: &MockProxyConfig) -> Result<CoreConfig, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let upstream_cfg = &config.upstream;
    let directory = config.fixtures.directory.clone();

    let upstream = match upstream_cfg.url.as_deref() {
        None => None,
        Some(raw) => match Url::parse(raw) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url),
            Ok(url) => {
                errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string()));
                None
            }
            Err(_) => {
                errors.push(ValidationError::InvalidUpstreamUrl(raw.to_string()));
                None
            }
        },
    };

    if upstream_cfg.url.is_none() && directory.is_none() {
        errors.push(ValidationError::MissingFixtureDirectory);
    }

    if upstream_cfg.url.is_some() && upstream_cfg.record && directory.is_none() {
        errors.push(ValidationError::RecordWithoutDirectory);
    }

    if upstream_cfg.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    let listen = config.listener.socket_address();
    if listen.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidListenAddress(listen));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mode = resolve_mode(
        upstream.is_some(),
        directory.is_some(),
        upstream_cfg.proxy_full,
        upstream_cfg.proxy_first,
    );

    Ok(CoreConfig {
        mode,
        capture: upstream.is_some() && upstream_cfg.record,
        upstream,
        timeout: Duration::from_secs(upstream_cfg.timeout_secs),
        fixture_root: directory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>, dir: Option<&str>) -> MockProxyConfig {
        let mut config = MockProxyConfig::default();
        config.upstream.url = url.map(str::to_string);
        config.fixtures.directory = dir.map(PathBuf::from);
        config
    }

    #[test]
    fn test_mode_resolution() {
        assert_eq!(resolve_mode(false, true, false, false), ServingMode::FullMock);
        assert_eq!(resolve_mode(true, true, false, false), ServingMode::MockFirst);
        assert_eq!(resolve_mode(true, true, false, true), ServingMode::ProxyFirst);
        assert_eq!(resolve_mode(true, true, true, true), ServingMode::FullProxy);
        assert_eq!(resolve_mode(true, false, false, true), ServingMode::FullProxy);
    }

    #[test]
    fn test_valid_mock_only() {
        let core = validate_config(&config(None, Some("./mocks"))).unwrap();
        assert_eq!(core.mode, ServingMode::FullMock);
        assert!(core.upstream.is_none());
        assert!(!core.capture);
        assert_eq!(core.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_record_requires_directory() {
        let mut cfg = config(Some("http://up:8080"), None);
        cfg.upstream.record = true;
        let errors = validate_config(&cfg).unwrap_err();
        assert_eq!(errors, vec![ValidationError::RecordWithoutDirectory]);
    }

    #[test]
    fn test_collects_all_errors() {
        let mut cfg = config(Some("ftp://up"), None);
        cfg.upstream.timeout_secs = 0;
        cfg.listener.bind_address = "not an ip".into();
        let errors = validate_config(&cfg).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::UnsupportedScheme("ftp".into())));
    }

    #[test]
    fn test_nothing_configured() {
        let errors = validate_config(&MockProxyConfig::default()).unwrap_err();
        assert_eq!(errors, vec![ValidationError::MissingFixtureDirectory]);
    }
}
