//! [`Config`]-related definitions.

use std::time;

use common::{money::Currency, Money};
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use rust_decimal::Decimal;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Number of seconds in an hour.
const HOUR: u64 = 60 * 60;

/// Number of seconds in a day.
const DAY: u64 = 24 * HOUR;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,

    /// [CORS] configuration.
    ///
    /// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
    pub cors: Cors,
}

/// [CORS] configuration.
///
/// [CORS]: https://developer.mozilla.org/en-US/docs/Web/HTTP/CORS
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Cors {
    /// List of allowed origins.
    #[default(vec!["*".to_owned()])]
    pub origins: Vec<String>,
}

/// Service configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// [JWT] secret.
    ///
    /// [JWT]: https://wikipedia.org/wiki/JSON_Web_Token
    #[default("secret".to_owned())]
    pub jwt_secret: String,

    /// Duration a login session stays valid for.
    #[default(time::Duration::from_secs(24 * HOUR))]
    #[serde(with = "humantime_serde")]
    pub session_ttl: time::Duration,

    /// Lending policy.
    pub policy: Policy,

    /// Service tasks configuration.
    pub tasks: Tasks,
}

impl From<Service> for service::Config {
    fn from(value: Service) -> Self {
        let Service {
            jwt_secret,
            session_ttl,
            policy,
            tasks:
                Tasks {
                    materialize_fines,
                    expire_reservations,
                },
        } = value;
        Self {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                jwt_secret.as_bytes(),
            ),
            session_ttl,
            policy: policy.into(),
            materialize_fines: service::task::materialize_fines::Config {
                interval: materialize_fines.interval,
            },
            expire_reservations: service::task::expire_reservations::Config {
                interval: expire_reservations.interval,
            },
        }
    }
}

/// Lending policy configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Policy {
    /// Duration a book is lent for.
    #[default(time::Duration::from_secs(14 * DAY))]
    #[serde(with = "humantime_serde")]
    pub loan_duration: time::Duration,

    /// Maximum number of times a loan may be renewed.
    #[default(2)]
    pub max_renewals: u8,

    /// Fine charged for every day of delay (e.g. `50AOA`).
    #[default(Money { amount: Decimal::from(50), currency: Currency::Aoa })]
    pub fine_per_day: Money,

    /// Duration a free copy is held for a promoted reservation holder.
    #[default(time::Duration::from_secs(48 * HOUR))]
    #[serde(with = "humantime_serde")]
    pub reservation_expiry: time::Duration,

    /// Unpaid fines amount above which a member can't borrow.
    #[default(Money::zero(Currency::Aoa))]
    pub max_unpaid_fine: Money,
}

impl From<Policy> for service::domain::Policy {
    fn from(value: Policy) -> Self {
        let Policy {
            loan_duration,
            max_renewals,
            fine_per_day,
            reservation_expiry,
            max_unpaid_fine,
        } = value;
        Self {
            loan_duration,
            max_renewals,
            fine_per_day,
            reservation_expiry,
            max_unpaid_fine,
        }
    }
}

/// Service tasks configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tasks {
    /// `MaterializeFines` task configuration.
    pub materialize_fines: Task,

    /// `ExpireReservations` task configuration.
    pub expire_reservations: Task,
}

/// Service task configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Task {
    /// Task execution interval.
    #[default(time::Duration::from_secs(15 * 60))]
    #[serde(with = "humantime_serde")]
    pub interval: time::Duration,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use service::domain;

    use super::{Config, Policy};

    #[test]
    fn defaults_to_library_policy() {
        let config = Config::default();
        let policy = domain::Policy::from(config.service.policy);
        let expected = domain::Policy::default();

        assert_eq!(policy.loan_duration, expected.loan_duration);
        assert_eq!(policy.max_renewals, expected.max_renewals);
        assert_eq!(policy.fine_per_day, expected.fine_per_day);
        assert_eq!(policy.reservation_expiry, expected.reservation_expiry);
        assert_eq!(policy.max_unpaid_fine, expected.max_unpaid_fine);

        assert_eq!(config.service.session_ttl.as_secs(), 24 * 60 * 60);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn parses_human_durations_and_money() {
        let policy = serde_json::from_str::<Policy>(
            r#"{
                "loan_duration": "7days",
                "fine_per_day": "100AOA",
                "reservation_expiry": "24h"
            }"#,
        )
        .unwrap();

        assert_eq!(policy.loan_duration.as_secs(), 7 * 24 * 60 * 60);
        assert_eq!(policy.fine_per_day.to_string(), "100AOA");
        assert_eq!(policy.reservation_expiry.as_secs(), 24 * 60 * 60);
        assert_eq!(policy.max_renewals, 2);
    }
}
