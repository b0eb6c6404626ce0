//! Environment-driven store configuration.
//!
//! # Responsibility
//! - Parse `SMALLPRESS_DB_*` variables into a typed store configuration.
//! - Select between the embedded file store and the networked store.
//!
//! # Invariants
//! - Setting `SMALLPRESS_DB_HOST` selects the networked store; otherwise
//!   the embedded store is used.
//! - Malformed values are configuration errors, fatal at startup, never
//!   silently defaulted.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "SMALLPRESS_DB_PATH";
pub const ENV_DB_HOST: &str = "SMALLPRESS_DB_HOST";
pub const ENV_DB_PORT: &str = "SMALLPRESS_DB_PORT";
pub const ENV_DB_USER: &str = "SMALLPRESS_DB_USER";
pub const ENV_DB_PASSWORD: &str = "SMALLPRESS_DB_PASSWORD";
pub const ENV_DB_NAME: &str = "SMALLPRESS_DB_NAME";
pub const ENV_DB_POOL_SIZE: &str = "SMALLPRESS_DB_POOL_SIZE";
pub const ENV_DB_TLS: &str = "SMALLPRESS_DB_TLS";
pub const ENV_DB_TLS_CA: &str = "SMALLPRESS_DB_TLS_CA";

const DEFAULT_DB_PATH: &str = "var/smallpress.db";
const DEFAULT_PORT: u16 = 3306;
const DEFAULT_USER: &str = "root";
const DEFAULT_DATABASE: &str = "smallpress";
const DEFAULT_POOL_SIZE: u32 = 10;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "invalid {key} value `{value}`; expected {expected}"),
        }
    }
}

impl Error for ConfigError {}

/// Encryption-in-transit mode for the networked store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
    /// Plaintext connection.
    Disabled,
    /// Encrypted but the server certificate is not verified. The default:
    /// convenience deployments get transport encryption without CA setup.
    #[default]
    Required,
    /// Encrypted and verified against the trust roots, plus the configured
    /// CA certificate when one is given.
    VerifyCa,
}

/// Connection settings for the networked store variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Upper bound on pooled connections.
    pub pool_size: u32,
    pub tls: TlsMode,
    pub ca_cert_path: Option<PathBuf>,
}

/// Fully resolved store selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Embedded SQLite file database.
    Embedded { path: PathBuf },
    /// Networked MySQL database behind a connection pool.
    Network(NetworkConfig),
}

impl StoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration from an arbitrary key lookup.
    ///
    /// Split out from [`Self::from_env`] so parsing is testable without
    /// mutating process-global environment state.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let Some(host) = non_empty(lookup(ENV_DB_HOST)) else {
            let path = non_empty(lookup(ENV_DB_PATH)).unwrap_or_else(|| DEFAULT_DB_PATH.into());
            return Ok(Self::Embedded { path: path.into() });
        };

        let port = match non_empty(lookup(ENV_DB_PORT)) {
            Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: ENV_DB_PORT,
                value: raw,
                expected: "a TCP port number",
            })?,
            None => DEFAULT_PORT,
        };

        let pool_size = match non_empty(lookup(ENV_DB_POOL_SIZE)) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(size) if size >= 1 => size,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_DB_POOL_SIZE,
                        value: raw,
                        expected: "a positive connection count",
                    })
                }
            },
            None => DEFAULT_POOL_SIZE,
        };

        let tls = match non_empty(lookup(ENV_DB_TLS)) {
            Some(raw) => parse_tls_mode(&raw)?,
            None => TlsMode::default(),
        };

        Ok(Self::Network(NetworkConfig {
            host,
            port,
            user: non_empty(lookup(ENV_DB_USER)).unwrap_or_else(|| DEFAULT_USER.into()),
            password: lookup(ENV_DB_PASSWORD).unwrap_or_default(),
            database: non_empty(lookup(ENV_DB_NAME)).unwrap_or_else(|| DEFAULT_DATABASE.into()),
            pool_size,
            tls,
            ca_cert_path: non_empty(lookup(ENV_DB_TLS_CA)).map(PathBuf::from),
        }))
    }
}

fn parse_tls_mode(raw: &str) -> ConfigResult<TlsMode> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "disabled" | "off" => Ok(TlsMode::Disabled),
        "required" => Ok(TlsMode::Required),
        "verify-ca" | "verify_ca" => Ok(TlsMode::VerifyCa),
        _ => Err(ConfigError::InvalidValue {
            key: ENV_DB_TLS,
            value: raw.to_string(),
            expected: "disabled|required|verify-ca",
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig, TlsMode, ENV_DB_TLS};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn parse(vars: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_embedded_store() {
        let config = parse(&[]).unwrap();
        assert_eq!(
            config,
            StoreConfig::Embedded {
                path: PathBuf::from("var/smallpress.db")
            }
        );
    }

    #[test]
    fn db_path_overrides_embedded_location() {
        let config = parse(&[("SMALLPRESS_DB_PATH", "/srv/blog/press.db")]).unwrap();
        assert_eq!(
            config,
            StoreConfig::Embedded {
                path: PathBuf::from("/srv/blog/press.db")
            }
        );
    }

    #[test]
    fn host_selects_networked_store_with_defaults() {
        let StoreConfig::Network(network) = parse(&[("SMALLPRESS_DB_HOST", "db.internal")]).unwrap()
        else {
            panic!("expected networked store");
        };
        assert_eq!(network.host, "db.internal");
        assert_eq!(network.port, 3306);
        assert_eq!(network.user, "root");
        assert_eq!(network.password, "");
        assert_eq!(network.database, "smallpress");
        assert_eq!(network.pool_size, 10);
        assert_eq!(network.tls, TlsMode::Required);
        assert_eq!(network.ca_cert_path, None);
    }

    #[test]
    fn networked_store_reads_every_option() {
        let StoreConfig::Network(network) = parse(&[
            ("SMALLPRESS_DB_HOST", "db.internal"),
            ("SMALLPRESS_DB_PORT", "3307"),
            ("SMALLPRESS_DB_USER", "press"),
            ("SMALLPRESS_DB_PASSWORD", "secret"),
            ("SMALLPRESS_DB_NAME", "blog"),
            ("SMALLPRESS_DB_POOL_SIZE", "4"),
            ("SMALLPRESS_DB_TLS", "verify-ca"),
            ("SMALLPRESS_DB_TLS_CA", "/etc/ssl/ca.pem"),
        ])
        .unwrap()
        else {
            panic!("expected networked store");
        };
        assert_eq!(network.port, 3307);
        assert_eq!(network.user, "press");
        assert_eq!(network.password, "secret");
        assert_eq!(network.database, "blog");
        assert_eq!(network.pool_size, 4);
        assert_eq!(network.tls, TlsMode::VerifyCa);
        assert_eq!(network.ca_cert_path, Some(PathBuf::from("/etc/ssl/ca.pem")));
    }

    #[test]
    fn rejects_malformed_port_pool_and_tls() {
        assert!(parse(&[
            ("SMALLPRESS_DB_HOST", "db"),
            ("SMALLPRESS_DB_PORT", "not-a-port")
        ])
        .is_err());
        assert!(parse(&[
            ("SMALLPRESS_DB_HOST", "db"),
            ("SMALLPRESS_DB_POOL_SIZE", "0")
        ])
        .is_err());
        let err = parse(&[("SMALLPRESS_DB_HOST", "db"), ("SMALLPRESS_DB_TLS", "maybe")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { key, .. } if key == ENV_DB_TLS
        ));
    }
}
