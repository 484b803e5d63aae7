use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key",
];

/// Origins the browser client is served from during development.
const DEFAULT_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:3001"];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub token_ttl_days: i64,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("TRACKER_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("TRACKER_JWT_SECRET is unset or still a placeholder; set it in your .env file and restart");
        }

        let db_path: PathBuf = var("TRACKER_DB_PATH").unwrap_or_else(|| "tracker.db".into()).into();
        let host = var("TRACKER_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = var("TRACKER_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse()
            .context("TRACKER_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

        let token_ttl_days: i64 = match var("TRACKER_TOKEN_TTL_DAYS") {
            Some(raw) => raw.parse().context("TRACKER_TOKEN_TTL_DAYS must be a whole number of days")?,
            None => 7,
        };
        if token_ttl_days < 1 {
            bail!("TRACKER_TOKEN_TTL_DAYS must be at least 1");
        }

        let mut allowed_origins: Vec<String> = DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect();
        if let Some(client) = var("TRACKER_CLIENT_URL").filter(|u| !u.trim().is_empty()) {
            let client = client.trim().trim_end_matches('/').to_string();
            if !allowed_origins.contains(&client) {
                allowed_origins.push(client);
            }
        }

        Ok(Self {
            jwt_secret,
            db_path,
            addr,
            token_ttl_days,
            allowed_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("TRACKER_JWT_SECRET", "s3cr3t")])).unwrap();
        assert_eq!(config.addr, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("tracker.db"));
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.allowed_origins.len(), 2);
    }

    #[test]
    fn placeholder_secret_is_refused() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("TRACKER_JWT_SECRET", "dev-secret-change-me")])).is_err());
    }

    #[test]
    fn client_url_extends_cors_origins() {
        let config = Config::from_lookup(lookup(&[
            ("TRACKER_JWT_SECRET", "s3cr3t"),
            ("TRACKER_CLIENT_URL", "https://tracker.example.com/"),
            ("TRACKER_PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.allowed_origins.last().unwrap(), "https://tracker.example.com");
    }

    #[test]
    fn bad_port_is_an_error() {
        let result = Config::from_lookup(lookup(&[("TRACKER_JWT_SECRET", "s3cr3t"), ("TRACKER_PORT", "http")]));
        assert!(result.is_err());
    }
}
