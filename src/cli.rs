//! Command-line surface for the `mock-proxy` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{load_config, ConfigError, MockProxyConfig};

#[derive(Debug, Parser)]
#[command(name = "mock-proxy")]
#[command(about = "Serve HTTP fixtures from disk, proxy to an upstream, or both", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Fixture directory
    pub directory: Option<PathBuf>,

    /// Upstream base URL; enables mock-first mode with proxy fallback
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Save proxied 200 responses as fixtures
    #[arg(short, long)]
    pub record: bool,

    /// Ask the upstream first, then serve fixtures
    #[arg(long)]
    pub proxy_first: bool,

    /// Proxy everything to the upstream
    #[arg(long)]
    pub proxy_full: bool,

    /// Upstream timeout in seconds (default 10)
    #[arg(long, value_name = "SECS")]
    pub proxy_timeout: Option<u64>,

    /// Local port (default 3000)
    #[arg(long)]
    pub port: Option<u16>,

    /// TOML config file; flags override its values
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Load the config file (if any) and apply the flags on top.
    pub fn resolve_config(&self) -> Result<MockProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => MockProxyConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Override config values with the flags that were given.
    pub fn apply(&self, config: &mut MockProxyConfig) {
        if let Some(directory) = &self.directory {
            config.fixtures.directory = Some(directory.clone());
        }
        if let Some(proxy) = &self.proxy {
            config.upstream.url = Some(proxy.clone());
        }
        if let Some(timeout) = self.proxy_timeout {
            config.upstream.timeout_secs = timeout;
        }
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        config.upstream.record |= self.record;
        config.upstream.proxy_first |= self.proxy_first;
        config.upstream.proxy_full |= self.proxy_full;
    }
}
