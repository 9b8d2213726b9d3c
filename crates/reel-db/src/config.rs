//! Store configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                | Default        | Meaning                        |
//! |-------------------------|----------------|--------------------------------|
//! | `REEL_DB_PATH`          | `./reel.db`    | SQLite database file           |
//! | `REEL_MAX_CONNECTIONS`  | `5`            | Pool size                      |
//! | `REEL_LATE_FEE_CENTS`   | `500`          | Late fee per day               |
//! | `REEL_LATE_FEE_MODE`    | `uniform`      | `uniform` or `per_line`        |
//! | `REEL_PICKUP_LEAD_DAYS` | `1`            | Cart pickup date offset        |
//! | `REEL_MAX_RENTAL_DAYS`  | `90`           | Longest rental period          |

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

use reel_core::{LateFeeMode, Money, RentalPolicy};

use crate::pool::DbConfig;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,reel=debug,sqlx=warn";

/// Everything a storefront process needs to open the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub policy: RentalPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_path: PathBuf::from("./reel.db"),
            max_connections: 5,
            policy: RentalPolicy::default(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = StoreConfig::default();
        let policy = defaults.policy;

        let late_fee_cents: i64 = parse_or(&lookup, "REEL_LATE_FEE_CENTS", policy.late_fee_per_day.cents())?;
        let late_fee_mode: LateFeeMode = parse_or(&lookup, "REEL_LATE_FEE_MODE", policy.late_fee_mode)?;
        let pickup_lead_days: i64 = parse_or(&lookup, "REEL_PICKUP_LEAD_DAYS", policy.pickup_lead_days)?;
        let max_rental_days: i64 = parse_or(&lookup, "REEL_MAX_RENTAL_DAYS", policy.max_rental_days)?;

        let config = StoreConfig {
            database_path: lookup("REEL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            max_connections: parse_or(&lookup, "REEL_MAX_CONNECTIONS", defaults.max_connections)?,
            policy: RentalPolicy::default()
                .late_fee_per_day(Money::from_cents(late_fee_cents))
                .late_fee_mode(late_fee_mode)
                .pickup_lead_days(pickup_lead_days)
                .max_rental_days(max_rental_days),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("REEL_MAX_CONNECTIONS".to_string()));
        }
        config
            .policy
            .validate()
            .map_err(|e| ConfigError::InvalidPolicy(e.to_string()))?;

        Ok(config)
    }

    /// Pool settings derived from this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone()).max_connections(self.max_connections)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Installs the global tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=reel=trace` - Show trace for reel crates only
/// - Default: [`DEFAULT_LOG_FILTER`]
pub fn init_tracing() {
    let directives = env::var(EnvFilter::DEFAULT_ENV).ok();

    // a second call (tests, embedding apps) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .try_init();
}

/// `RUST_LOG`-style directives, falling back to [`DEFAULT_LOG_FILTER`] when
/// they are absent or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Invalid rental policy: {0}")]
    InvalidPolicy(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tracing::Level;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./reel.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.policy, RentalPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("REEL_DB_PATH", "/srv/reel/store.db"),
            ("REEL_LATE_FEE_CENTS", "250"),
            ("REEL_LATE_FEE_MODE", "per_line"),
            ("REEL_PICKUP_LEAD_DAYS", "0"),
            ("REEL_MAX_RENTAL_DAYS", "14"),
            ("REEL_MAX_CONNECTIONS", "8"),
        ]))
        .unwrap();

        assert_eq!(config.policy.late_fee_per_day.cents(), 250);
        assert_eq!(config.policy.late_fee_mode, LateFeeMode::PerLine);
        assert_eq!(config.policy.pickup_lead_days, 0);
        assert_eq!(config.policy.max_rental_days, 14);

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/srv/reel/store.db"));
        assert_eq!(db.max_connections, 8);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            StoreConfig::from_lookup(lookup(&[("REEL_LATE_FEE_CENTS", "five")])),
            Err(ConfigError::InvalidValue(key)) if key == "REEL_LATE_FEE_CENTS"
        ));
        assert!(matches!(
            StoreConfig::from_lookup(lookup(&[("REEL_LATE_FEE_MODE", "hourly")])),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            StoreConfig::from_lookup(lookup(&[("REEL_MAX_CONNECTIONS", "0")])),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            StoreConfig::from_lookup(lookup(&[("REEL_MAX_RENTAL_DAYS", "0")])),
            Err(ConfigError::InvalidPolicy(_))
        ));
    }

    fn with_filter(directives: Option<&str>, check: impl FnOnce()) {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(log_filter(directives))
            .finish();
        tracing::subscriber::with_default(subscriber, check);
    }

    #[test]
    fn test_default_log_filter() {
        with_filter(None, || {
            assert!(!tracing::enabled!(target: "sqlx::query", Level::DEBUG));
            assert!(tracing::enabled!(target: "sqlx::query", Level::WARN));
            assert!(tracing::enabled!(target: "reel_db::repository::order", Level::DEBUG));
            assert!(!tracing::enabled!(target: "reel_db::repository::order", Level::TRACE));
            assert!(!tracing::enabled!(target: "hyper", Level::TRACE));
            assert!(tracing::enabled!(target: "hyper", Level::INFO));
        });
    }

    #[test]
    fn test_log_filter_directives() {
        with_filter(Some("sqlx=debug"), || {
            assert!(tracing::enabled!(target: "sqlx::query", Level::DEBUG));
            assert!(!tracing::enabled!(target: "reel_db::pool", Level::INFO));
        });

        with_filter(Some("sqlx=loud"), || {
            assert!(!tracing::enabled!(target: "sqlx::query", Level::DEBUG));
            assert!(tracing::enabled!(target: "reel_core", Level::DEBUG));
        });
    }
}
