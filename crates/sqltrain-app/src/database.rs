//! Postgres pool handle owned by the service container.

use std::time::{Duration, Instant};

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqltrain_config::DatabaseSettings;
use tracing::info;

/// Connection options derived from settings; `application_name` tags server sessions.
#[must_use]
pub fn connect_options(settings: &DatabaseSettings, application_name: &str) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .database(&settings.name)
        .application_name(application_name);
    match &settings.password {
        Some(password) => options.password(password.expose()),
        None => options,
    }
}

/// Lazily connecting pool shared by request handlers.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create the pool without opening a connection.
    #[must_use]
    pub fn connect_lazy(options: PgConnectOptions, settings: &DatabaseSettings) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections())
            .acquire_timeout(settings.connect_timeout)
            .connect_lazy_with(options);
        info!(
            url = %settings.redacted_url(),
            max_connections = settings.max_connections(),
            "database pool created"
        );
        Self { pool }
    }

    /// Underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `SELECT 1` and report the round-trip time.
    ///
    /// # Errors
    ///
    /// Returns the driver error when no connection can be acquired or the query fails.
    pub async fn ping(&self) -> Result<Duration, sqlx::Error> {
        let started = Instant::now();
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(started.elapsed())
    }

    /// Close every pooled connection and reject new acquisitions.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }

    /// Whether [`Database::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqltrain_config::Secret;

    fn settings() -> DatabaseSettings {
        DatabaseSettings {
            host: "db.internal".to_string(),
            port: 6543,
            user: "trainer".to_string(),
            password: Some(Secret::new("hunter2")),
            name: "training".to_string(),
            pool_size: 3,
            max_overflow: 2,
            connect_timeout: Duration::from_millis(250),
        }
    }

    #[test]
    fn connect_options_carry_settings() {
        let options = connect_options(&settings(), "sql-training");
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_username(), "trainer");
        assert_eq!(options.get_database(), Some("training"));
        assert_eq!(options.get_application_name(), Some("sql-training"));
    }

    #[tokio::test]
    async fn lazy_pool_opens_nothing_until_used() {
        let settings = settings();
        let database = Database::connect_lazy(connect_options(&settings, "sql-training"), &settings);
        assert_eq!(database.pool().size(), 0);
        assert_eq!(database.pool().options().get_max_connections(), 5);
        database.close().await;
        assert!(database.is_closed());
    }
}
