//! `PostgreSQL` connection pool and configuration.
//!
//! `PostgreSQL` is the single persistent store for Reverie: worlds, areas,
//! characters, items, and the narrative tables all live here. Uses [`sqlx`]
//! with runtime query construction (not compile-time checked) to avoid
//! requiring a live database at build time. All queries are parameterized.

use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::error::DbError;

/// Default maximum number of connections in the pool.
const DEFAULT_POOL_MAX: u32 = 10;

/// Default idle timeout in milliseconds.
const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;

/// Default connection timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

/// Configuration for the `PostgreSQL` connection pool.
///
/// Loaded from discrete environment variables rather than a URL so each
/// part can be injected independently by the deployment environment.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database host (`DB_HOST`).
    pub host: String,
    /// Database port (`DB_PORT`).
    pub port: u16,
    /// Database name (`DB_NAME`).
    pub database: String,
    /// Database user (`DB_USER`).
    pub user: String,
    /// Database password (`DB_PASSWORD`).
    pub password: String,
    /// Maximum number of pooled connections (`DB_POOL_MAX`).
    pub pool_max: u32,
    /// Idle connection timeout (`DB_IDLE_TIMEOUT`, milliseconds).
    pub idle_timeout: Duration,
    /// Connection acquire timeout (`DB_CONNECT_TIMEOUT`, milliseconds).
    pub connect_timeout: Duration,
    /// When true, executed statements are logged at info level
    /// (`LOG_QUERIES`).
    pub log_queries: bool,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: String::from("localhost"),
            port: 5432,
            database: String::from("reverie"),
            user: String::from("reverie"),
            password: String::new(),
            pool_max: DEFAULT_POOL_MAX,
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            log_queries: false,
        }
    }
}

impl PostgresConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, DbError> {
        let defaults = Self::default();
        Ok(Self {
            host: env_or("DB_HOST", &defaults.host),
            port: parse_env("DB_PORT", defaults.port)?,
            database: env_or("DB_NAME", &defaults.database),
            user: env_or("DB_USER", &defaults.user),
            password: env_or("DB_PASSWORD", &defaults.password),
            pool_max: parse_env("DB_POOL_MAX", defaults.pool_max)?,
            idle_timeout: Duration::from_millis(parse_env(
                "DB_IDLE_TIMEOUT",
                DEFAULT_IDLE_TIMEOUT_MS,
            )?),
            connect_timeout: Duration::from_millis(parse_env(
                "DB_CONNECT_TIMEOUT",
                DEFAULT_CONNECT_TIMEOUT_MS,
            )?),
            log_queries: parse_env("LOG_QUERIES", false)?,
        })
    }
}

/// Read an environment variable with a default.
fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable with a default.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, DbError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|e| DbError::Config(format!("invalid {name}: {e}"))),
        _ => Ok(default),
    }
}

/// Connection pool handle to `PostgreSQL`.
///
/// Initialised once at startup and shared process-wide; closed on
/// shutdown. Wraps a [`sqlx::PgPool`].
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Connect to `PostgreSQL` using the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the connection fails.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, DbError> {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password);

        options = if config.log_queries {
            options.log_statements(log::LevelFilter::Info)
        } else {
            options.log_statements(log::LevelFilter::Trace)
        };

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_max)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(options)
            .await?;

        tracing::info!(
            host = config.host,
            database = config.database,
            pool_max = config.pool_max,
            "Connected to PostgreSQL"
        );

        Ok(Self { pool })
    }

    /// Return a reference to the underlying [`PgPool`].
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close all connections in the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL pool closed");
    }
}
