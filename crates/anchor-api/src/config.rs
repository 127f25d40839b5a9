//! Service configuration.
//!
//! Everything is read from the environment once at startup. Required
//! variables have no defaults; a missing or unparsable value aborts startup
//! as a configuration error.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anchor_chain::abi::is_valid_eth_address;
use anchor_chain::Passphrase;
use anchor_core::AnchorError;
use anchor_store::StoreConfig;
use url::Url;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Read `ANCHOR_LOG_FORMAT`. Anything other than `json` means text.
    pub fn from_env() -> Self {
        Self::parse(std::env::var("ANCHOR_LOG_FORMAT").ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Service configuration.
///
/// `Debug` is safe to log: the keystore passphrase is redacted.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// JSON-RPC endpoint of the ledger node.
    pub rpc_url: Url,
    /// Encrypted JSON keystore of the signing account.
    pub keystore_path: PathBuf,
    /// Passphrase used to unlock the account on the node.
    pub keystore_password: Passphrase,
    /// Deployed anchor contract address.
    pub proxy_address: String,
    /// Listen address.
    pub bind: IpAddr,
    /// Listen port.
    pub port: u16,
    /// Audit database settings.
    pub store: StoreConfig,
    /// Upper bound on one ledger submission (nonce read plus broadcast).
    pub submit_timeout: Duration,
    /// How long the node keeps the account unlocked. Zero means until restart.
    pub unlock_duration_secs: u64,
    /// Relay requests allowed per client per minute.
    pub relay_rate_limit_per_minute: u64,
    /// Whether `/metrics` is mounted.
    pub metrics_enabled: bool,
    /// Log output format.
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `RPC_URL` (required)
    /// - `KEYSTORE_PATH` (required)
    /// - `KEYSTORE_PASSWORD` (required)
    /// - `PROXY_ADDRESS` (required, `0x` + 40 hex digits)
    /// - `PORT` (default: 20371)
    /// - `BIND` (default: 0.0.0.0)
    /// - `DATABASE_PATH` (default: `./validator_audit.db`)
    /// - `DATABASE_MAX_CONNECTIONS` (default: 8)
    /// - `SUBMIT_TIMEOUT_SECS` (default: 30)
    /// - `UNLOCK_DURATION_SECS` (default: 0)
    /// - `RELAY_RATE_LIMIT_PER_MINUTE` (default: 5)
    /// - `ANCHOR_METRICS_ENABLED` (default: true)
    /// - `ANCHOR_LOG_FORMAT` (default: text)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let rpc_url = {
            let raw = required("RPC_URL")?;
            Url::parse(&raw).map_err(|e| ConfigError::invalid("RPC_URL", &raw, e.to_string()))?
        };

        let proxy_address = required("PROXY_ADDRESS")?;
        if !is_valid_eth_address(&proxy_address) {
            return Err(ConfigError::invalid(
                "PROXY_ADDRESS",
                &proxy_address,
                "expected 0x followed by 40 hex digits",
            ));
        }

        let mut store = StoreConfig::new(
            get("DATABASE_PATH").unwrap_or_else(|| "./validator_audit.db".to_string()),
        );
        store.max_connections = parse_or(&get, "DATABASE_MAX_CONNECTIONS", 8)?;

        Ok(Self {
            rpc_url,
            keystore_path: PathBuf::from(required("KEYSTORE_PATH")?),
            keystore_password: Passphrase::new(required("KEYSTORE_PASSWORD")?),
            proxy_address: proxy_address.to_ascii_lowercase(),
            bind: parse_or(&get, "BIND", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&get, "PORT", 20371)?,
            store,
            submit_timeout: Duration::from_secs(parse_or(&get, "SUBMIT_TIMEOUT_SECS", 30)?),
            unlock_duration_secs: parse_or(&get, "UNLOCK_DURATION_SECS", 0)?,
            relay_rate_limit_per_minute: parse_or(&get, "RELAY_RATE_LIMIT_PER_MINUTE", 5)?,
            metrics_enabled: get("ANCHOR_METRICS_ENABLED")
                .map(|v| v.to_lowercase() != "false")
                .unwrap_or(true),
            log_format: LogFormat::parse(get("ANCHOR_LOG_FORMAT").as_deref()),
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(var, &raw, e.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    /// A variable is set but cannot be used.
    #[error("invalid {var}={value:?}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<ConfigError> for AnchorError {
    fn from(err: ConfigError) -> Self {
        AnchorError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("RPC_URL", "http://127.0.0.1:8545"),
        ("KEYSTORE_PATH", "/secrets/keystore.json"),
        ("KEYSTORE_PASSWORD", "correct horse"),
        ("PROXY_ADDRESS", "0x00000000000000000000000000000000000000AA"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(cfg.port, 20371);
        assert_eq!(cfg.bind.to_string(), "0.0.0.0");
        assert_eq!(cfg.store.path, PathBuf::from("./validator_audit.db"));
        assert_eq!(cfg.store.max_connections, 8);
        assert_eq!(cfg.submit_timeout, Duration::from_secs(30));
        assert_eq!(cfg.unlock_duration_secs, 0);
        assert_eq!(cfg.relay_rate_limit_per_minute, 5);
        assert!(cfg.metrics_enabled);
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert_eq!(cfg.proxy_address, "0x00000000000000000000000000000000000000aa");
    }

    #[test]
    fn overrides_apply() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PORT", "8080"),
            ("BIND", "127.0.0.1"),
            ("DATABASE_PATH", "/data/audit.db"),
            ("SUBMIT_TIMEOUT_SECS", "5"),
            ("ANCHOR_METRICS_ENABLED", "FALSE"),
            ("ANCHOR_LOG_FORMAT", "json"),
        ]);
        let cfg = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.bind.to_string(), "127.0.0.1");
        assert_eq!(cfg.store.path, PathBuf::from("/data/audit.db"));
        assert_eq!(cfg.submit_timeout, Duration::from_secs(5));
        assert!(!cfg.metrics_enabled);
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn each_required_variable_is_enforced() {
        for (missing, _) in REQUIRED {
            let pairs: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = AppConfig::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::Missing(var) if var == missing));
        }
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT", "eighty"));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs[3] = ("PROXY_ADDRESS", "0x1234");
        assert!(matches!(
            AppConfig::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { var: "PROXY_ADDRESS", .. })
        ));
    }

    #[test]
    fn debug_redacts_passphrase() {
        let cfg = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert!(!format!("{cfg:?}").contains("correct horse"));
    }

    #[test]
    fn config_errors_are_configuration_kind() {
        let err = AnchorError::from(ConfigError::Missing("RPC_URL"));
        assert_eq!(err.kind(), "CONFIGURATION_ERROR");
    }
}
