use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime settings, read from `ARCHIVIST_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub frontend_url: String,
    pub ipfs_bin: PathBuf,
    pub ipfs_api: Option<String>,
    pub ipfs_probe_timeout: Duration,
    pub max_upload_bytes: u64,
    pub trust_proxy: bool,
    /// `ARCHIVIST_ENV=development` puts error causes in 500 bodies.
    pub development: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port: u16 = var("ARCHIVIST_PORT", "3001")
            .parse()
            .context("ARCHIVIST_PORT must be a port number")?;
        let probe_secs: u64 = var("ARCHIVIST_IPFS_PROBE_TIMEOUT_SECS", "5")
            .parse()
            .context("ARCHIVIST_IPFS_PROBE_TIMEOUT_SECS must be a whole number of seconds")?;
        let max_upload_mb: u64 = var("ARCHIVIST_MAX_UPLOAD_MB", "4096")
            .parse()
            .context("ARCHIVIST_MAX_UPLOAD_MB must be a whole number")?;
        let trust_proxy = parse_bool(&var("ARCHIVIST_TRUST_PROXY", "true"))
            .context("ARCHIVIST_TRUST_PROXY must be true or false")?;

        Ok(Self {
            host: var("ARCHIVIST_HOST", "0.0.0.0"),
            port,
            db_path: var("ARCHIVIST_DB_PATH", "./data/media.db").into(),
            frontend_url: var("ARCHIVIST_FRONTEND_URL", "http://localhost:5173"),
            ipfs_bin: var("ARCHIVIST_IPFS_BIN", "ipfs").into(),
            ipfs_api: lookup("ARCHIVIST_IPFS_API").filter(|v| !v.trim().is_empty()),
            ipfs_probe_timeout: Duration::from_secs(probe_secs),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            trust_proxy,
            development: var("ARCHIVIST_ENV", "production").eq_ignore_ascii_case("development"),
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 3001);
        assert_eq!(cfg.db_path, PathBuf::from("./data/media.db"));
        assert_eq!(cfg.frontend_url, "http://localhost:5173");
        assert_eq!(cfg.ipfs_bin, PathBuf::from("ipfs"));
        assert_eq!(cfg.ipfs_api, None);
        assert_eq!(cfg.ipfs_probe_timeout, Duration::from_secs(5));
        assert_eq!(cfg.max_upload_bytes, 4096 * 1024 * 1024);
        assert!(cfg.trust_proxy);
        assert!(!cfg.development);
        assert_eq!(cfg.listen_addr().unwrap(), "0.0.0.0:3001".parse().unwrap());
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("ARCHIVIST_PORT", "8080"),
            ("ARCHIVIST_IPFS_API", "/ip4/127.0.0.1/tcp/5001"),
            ("ARCHIVIST_MAX_UPLOAD_MB", "10"),
            ("ARCHIVIST_TRUST_PROXY", "off"),
            ("ARCHIVIST_ENV", "Development"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.ipfs_api.as_deref(), Some("/ip4/127.0.0.1/tcp/5001"));
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
        assert!(!cfg.trust_proxy);
        assert!(cfg.development);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(config(&[("ARCHIVIST_PORT", "http")]).is_err());
        assert!(config(&[("ARCHIVIST_TRUST_PROXY", "maybe")]).is_err());
        assert!(config(&[("ARCHIVIST_MAX_UPLOAD_MB", "-1")]).is_err());
    }
}
