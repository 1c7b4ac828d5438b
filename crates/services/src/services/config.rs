//! Process configuration, read once from the environment at startup.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use secrecy::SecretString;
use thiserror::Error;

use super::field_cipher::{CipherError, FieldCipher};

const DEFAULT_DATABASE_URL: &str = "sqlite://questlog.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub cipher: Arc<FieldCipher>,
    pub auth_jwt_secret: SecretString,
    pub anthropic_api_key: Option<SecretString>,
    pub claude_model: Option<String>,
    pub allow_guest_chests: bool,
    pub sentry_dsn: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let host: IpAddr = get("HOST")
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "HOST",
                reason: e.to_string(),
            })?;
        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let allow_guest_chests = match get("ALLOW_GUEST_CHESTS") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "ALLOW_GUEST_CHESTS",
                reason: format!("expected true/false, got {raw:?}"),
            })?,
            None => true,
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: SocketAddr::new(host, port),
            cipher: Arc::new(FieldCipher::from_lookup(&lookup)?),
            auth_jwt_secret: SecretString::from(require("AUTH_JWT_SECRET")?),
            anthropic_api_key: get("ANTHROPIC_API_KEY").map(SecretString::from),
            claude_model: get("CLAUDE_MODEL"),
            allow_guest_chests,
            sentry_dsn: get("SENTRY_DSN"),
        })
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
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_values_are_absent() {
        let config =
            AppConfig::from_lookup(lookup(&[("ENCRYPTION_KEY", "k"), ("AUTH_JWT_SECRET", "j")]))
                .unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert!(config.allow_guest_chests);
        assert!(config.anthropic_api_key.is_none());
        assert_eq!(config.auth_jwt_secret.expose_secret(), "j");
    }

    #[test]
    fn missing_encryption_key_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[("AUTH_JWT_SECRET", "j")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Cipher(CipherError::Configuration("ENCRYPTION_KEY"))
        ));

        let err = AppConfig::from_lookup(lookup(&[("ENCRYPTION_KEY", "  "), ("AUTH_JWT_SECRET", "j")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Cipher(CipherError::Configuration("ENCRYPTION_KEY"))
        ));
    }

    #[test]
    fn malformed_values_are_reported() {
        let base = [("ENCRYPTION_KEY", "k"), ("AUTH_JWT_SECRET", "j")];

        let mut pairs = base.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));

        let mut pairs = base.to_vec();
        pairs.push(("ALLOW_GUEST_CHESTS", "maybe"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "ALLOW_GUEST_CHESTS", .. })
        ));

        let mut pairs = base.to_vec();
        pairs.push(("ALLOW_GUEST_CHESTS", "off"));
        pairs.push(("PORT", "8080"));
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert!(!config.allow_guest_chests);
        assert_eq!(config.bind_addr.port(), 8080);
    }
}
