use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Runtime settings, read from `GIFTLIST_*` environment variables
/// (a `.env` file is loaded first when present).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub session_ttl_hours: i64,
    pub cookie_secure: bool,
    /// Built frontend served for every non-`/api` path.
    pub static_dir: Option<PathBuf>,
    pub cleanup_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("GIFTLIST_PORT") {
            Some(v) => v.trim().parse().with_context(|| format!("GIFTLIST_PORT={v} is not a port"))?,
            None => 3000,
        };

        let session_ttl_hours = match var("GIFTLIST_SESSION_TTL_HOURS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("GIFTLIST_SESSION_TTL_HOURS={v} is not a number"))?,
            None => 24 * 7,
        };
        if session_ttl_hours <= 0 {
            bail!("GIFTLIST_SESSION_TTL_HOURS must be positive");
        }

        let cookie_secure = match var("GIFTLIST_COOKIE_SECURE").as_deref().map(str::trim) {
            None => false,
            Some("1" | "true" | "yes" | "on") => true,
            Some("0" | "false" | "no" | "off") => false,
            Some(other) => bail!("GIFTLIST_COOKIE_SECURE={other} is not a boolean"),
        };

        let cleanup_interval_secs = match var("GIFTLIST_CLEANUP_INTERVAL_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("GIFTLIST_CLEANUP_INTERVAL_SECS={v} is not a number"))?,
            None => 3600,
        };
        if cleanup_interval_secs == 0 {
            bail!("GIFTLIST_CLEANUP_INTERVAL_SECS must be positive");
        }

        Ok(Self {
            db_path: var("GIFTLIST_DB_PATH").unwrap_or_else(|| "giftlist.db".into()).into(),
            host: var("GIFTLIST_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            session_ttl_hours,
            cookie_secure,
            static_dir: var("GIFTLIST_STATIC_DIR").map(PathBuf::from),
            cleanup_interval_secs,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("giftlist.db"));
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.session_ttl_hours, 168);
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.static_dir, None);
        assert_eq!(cfg.addr().unwrap(), "0.0.0.0:3000".parse().unwrap());
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("GIFTLIST_PORT", "8080"),
            ("GIFTLIST_HOST", "127.0.0.1"),
            ("GIFTLIST_COOKIE_SECURE", "true"),
            ("GIFTLIST_STATIC_DIR", "./dist"),
            ("GIFTLIST_SESSION_TTL_HOURS", "12"),
        ])
        .unwrap();
        assert_eq!(cfg.addr().unwrap(), "127.0.0.1:8080".parse().unwrap());
        assert!(cfg.cookie_secure);
        assert_eq!(cfg.static_dir, Some(PathBuf::from("./dist")));
        assert_eq!(cfg.session_ttl_hours, 12);
    }

    #[test]
    fn blank_values_fall_back() {
        let cfg = config(&[("GIFTLIST_PORT", "  "), ("GIFTLIST_STATIC_DIR", "")]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.static_dir, None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(config(&[("GIFTLIST_PORT", "http")]).is_err());
        assert!(config(&[("GIFTLIST_PORT", "70000")]).is_err());
        assert!(config(&[("GIFTLIST_COOKIE_SECURE", "maybe")]).is_err());
        assert!(config(&[("GIFTLIST_SESSION_TTL_HOURS", "0")]).is_err());
        assert!(config(&[("GIFTLIST_CLEANUP_INTERVAL_SECS", "0")]).is_err());
    }
}
