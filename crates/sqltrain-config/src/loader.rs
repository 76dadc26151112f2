//! Layered settings loader.
//!
//! # Design
//! - Merge sources per field: the last source that supplies a key wins.
//! - Validate every field before returning, collecting all issues into one report.
//! - Pure function of its inputs; no environment or filesystem access.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::defaults;
use crate::error::{ConfigError, ConfigErrors};
use crate::model::{
    AppSettings, DatabaseSettings, HardDependency, HttpSettings, LogLevel, LoggingSettings,
    ReadinessSettings, Settings,
};
use crate::schema::{self, FieldSpec};
use crate::source::{ConfigSource, Supplied};
use crate::validate;

/// Knobs for a load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Reject unknown keys instead of ignoring them.
    pub strict: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// Load settings from ordered sources in strict mode.
///
/// # Errors
///
/// Returns every configuration issue found across all sources.
pub fn load(sources: &[ConfigSource]) -> Result<Settings, ConfigErrors> {
    load_with(sources, LoaderOptions::default())
}

/// Load settings from ordered sources with explicit options.
///
/// # Errors
///
/// Returns every configuration issue found across all sources.
pub fn load_with(
    sources: &[ConfigSource],
    options: LoaderOptions,
) -> Result<Settings, ConfigErrors> {
    let mut errors = Vec::new();
    let mut merged: BTreeMap<&'static str, Supplied> = BTreeMap::new();

    for source in sources {
        for (spec, supplied) in source.entries(options.strict, &mut errors) {
            debug!(field = spec.key, origin = %supplied.origin, "configuration value supplied");
            merged.insert(spec.key, supplied);
        }
    }

    let mut resolver = Resolver {
        merged: &merged,
        errors,
    };
    let settings = resolver.settings();

    if resolver.errors.is_empty() {
        Ok(settings)
    } else {
        Err(ConfigErrors::new(resolver.errors))
    }
}

enum Fallback<T> {
    Value(T),
    Required,
}

struct Resolver<'a> {
    merged: &'a BTreeMap<&'static str, Supplied>,
    errors: Vec<ConfigError>,
}

impl Resolver<'_> {
    /// Resolve one field; failures are recorded and a placeholder is returned.
    fn field<T: Default>(
        &mut self,
        key: &'static str,
        fallback: Fallback<T>,
        convert: fn(&Supplied) -> Result<T, ConfigError>,
    ) -> T {
        match self.merged.get(key) {
            Some(entry) => match convert(entry) {
                Ok(value) => value,
                Err(err) => {
                    self.errors.push(err);
                    T::default()
                }
            },
            None => match fallback {
                Fallback::Value(value) => value,
                Fallback::Required => {
                    let env = schema::by_key(key).map_or("", |spec: &FieldSpec| spec.env);
                    self.errors
                        .push(ConfigError::MissingRequired { field: key, env });
                    T::default()
                }
            },
        }
    }

    fn supplied_key(&self, key: &'static str) -> String {
        self.merged
            .get(key)
            .map_or_else(|| key.to_string(), |entry| entry.key.clone())
    }

    fn settings(&mut self) -> Settings {
        let app = AppSettings {
            name: self.field(
                "app_name",
                Fallback::Value(defaults::APP_NAME.to_string()),
                validate::non_empty_text,
            ),
            host: self.field(
                "app_host",
                Fallback::Value(defaults::APP_HOST.to_string()),
                validate::non_empty_text,
            ),
            port: self.field("app_port", Fallback::Value(defaults::APP_PORT), validate::port),
        };

        let logging = LoggingSettings {
            level: self.field("log_level", Fallback::Value(LogLevel::Info), validate::log_level),
            format: self.field("log_format", Fallback::Value(None), validate::log_format),
        };

        let database = DatabaseSettings {
            host: self.field("db_host", Fallback::Required, validate::non_empty_text),
            port: self.field("db_port", Fallback::Value(defaults::DB_PORT), validate::port),
            user: self.field(
                "db_user",
                Fallback::Value(defaults::DB_USER.to_string()),
                validate::non_empty_text,
            ),
            password: self.field("db_password", Fallback::Value(None), validate::secret),
            name: self.field(
                "db_name",
                Fallback::Value(defaults::DB_NAME.to_string()),
                validate::non_empty_text,
            ),
            pool_size: self.field(
                "db_pool_size",
                Fallback::Value(defaults::DB_POOL_SIZE),
                validate::positive_count,
            ),
            max_overflow: self.field(
                "db_max_overflow",
                Fallback::Value(defaults::DB_MAX_OVERFLOW),
                validate::count,
            ),
            connect_timeout: self.field(
                "db_connect_timeout_ms",
                Fallback::Value(Duration::from_millis(defaults::DB_CONNECT_TIMEOUT_MS)),
                validate::positive_millis,
            ),
        };

        let errors_before_readiness = self.errors.len();
        let timeout = self.field(
            "readiness_timeout_ms",
            Fallback::Value(Duration::from_millis(defaults::READINESS_TIMEOUT_MS)),
            validate::positive_millis,
        );
        let poll_interval = self.field(
            "readiness_poll_interval_ms",
            Fallback::Value(Duration::from_millis(defaults::READINESS_POLL_INTERVAL_MS)),
            validate::positive_millis,
        );
        if self.errors.len() == errors_before_readiness && poll_interval > timeout {
            let field = self.supplied_key("readiness_poll_interval_ms");
            self.errors.push(ConfigError::ConstraintViolation {
                field,
                rule: "must not exceed readiness_timeout_ms",
            });
        }
        let readiness = ReadinessSettings {
            timeout,
            poll_interval,
            dependencies: self.field(
                "readiness_dependencies",
                Fallback::Value(vec![HardDependency::Database]),
                validate::dependencies,
            ),
        };

        let http = HttpSettings {
            cors_allow_any_origin: self.field(
                "cors_allow_any_origin",
                Fallback::Value(true),
                validate::boolean,
            ),
            request_timing: self.field("request_timing", Fallback::Value(true), validate::boolean),
        };

        let shutdown_timeout = self.field(
            "shutdown_timeout_ms",
            Fallback::Value(Duration::from_millis(defaults::SHUTDOWN_TIMEOUT_MS)),
            validate::positive_millis,
        );

        Settings {
            app,
            logging,
            database,
            readiness,
            http,
            shutdown_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValueKind;

    fn env(vars: &[(&str, &str)]) -> ConfigSource {
        ConfigSource::environment(vars.iter().copied())
    }

    #[test]
    fn minimal_environment_uses_typed_defaults() {
        let settings = load(&[env(&[("DB_HOST", "localhost"), ("DB_PORT", "5432")])])
            .expect("settings should load");

        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.database.user, "postgres");
        assert!(settings.database.password.is_none());
        assert_eq!(settings.database.pool_size, 5);
        assert_eq!(settings.database.max_overflow, 10);
        assert_eq!(settings.app.name, "sql-training");
        assert_eq!(settings.app.port, 8000);
        assert_eq!(settings.logging.level, LogLevel::Info);
        assert_eq!(settings.readiness.timeout, Duration::from_secs(15));
        assert_eq!(settings.readiness.poll_interval, Duration::from_millis(500));
        assert_eq!(settings.readiness.dependencies, vec![HardDependency::Database]);
        assert!(settings.http.cors_allow_any_origin);
        assert_eq!(settings.bind_address(), "0.0.0.0:8000");
        assert_eq!(settings.database_target(), ("localhost", 5432));
    }

    #[test]
    fn missing_required_field_is_named() {
        let err = load(&[env(&[])]).expect_err("db_host is required");
        assert_eq!(err.len(), 1);
        assert!(matches!(
            err.issues(),
            [ConfigError::MissingRequired { field: "db_host", env: "DB_HOST" }]
        ));
    }

    #[test]
    fn non_numeric_port_reports_type_mismatch_with_env_name() {
        let err = load(&[env(&[("DB_HOST", "localhost"), ("DB_PORT", "abc")])])
            .expect_err("port must be numeric");
        assert!(matches!(
            err.issues(),
            [ConfigError::TypeMismatch { field, expected: ValueKind::Integer, got }]
                if field == "DB_PORT" && got == "abc"
        ));
    }

    #[test]
    fn all_issues_are_reported_together() {
        let yaml = ConfigSource::yaml("config.yml", "app_port: 70000\nunknown_field: 1\n");
        let err = load(&[
            yaml,
            env(&[("DB_PORT", "abc"), ("DB_POOL_SIZE", "0"), ("DB_PROT", "1")]),
        ])
        .expect_err("several problems");

        let fields: Vec<_> = err.issues().iter().filter_map(ConfigError::field).collect();
        assert!(fields.contains(&"unknown_field"));
        assert!(fields.contains(&"DB_PROT"));
        assert!(fields.contains(&"app_port"));
        assert!(fields.contains(&"DB_PORT"));
        assert!(fields.contains(&"DB_POOL_SIZE"));
        assert!(fields.contains(&"db_host"));
        assert_eq!(err.len(), 6);
    }

    #[test]
    fn later_sources_override_per_field() {
        let yaml = ConfigSource::yaml(
            "config.yml",
            "db_host: yaml-db\ndb_port: 6000\napp_name: from-yaml\n",
        );
        let environment = env(&[("DB_PORT", "7000")]);
        let cli = ConfigSource::overrides("cli", [("app_name", "from-cli")]);

        let settings = load(&[yaml, environment, cli]).expect("settings should load");
        assert_eq!(settings.database.host, "yaml-db");
        assert_eq!(settings.database.port, 7000);
        assert_eq!(settings.app.name, "from-cli");
    }

    #[test]
    fn poll_interval_cannot_exceed_timeout() {
        let err = load(&[env(&[
            ("DB_HOST", "db"),
            ("READINESS_TIMEOUT_MS", "100"),
            ("READINESS_POLL_INTERVAL_MS", "200"),
        ])])
        .expect_err("poll interval too large");
        assert!(matches!(
            err.issues(),
            [ConfigError::ConstraintViolation { field, .. }] if field == "READINESS_POLL_INTERVAL_MS"
        ));
    }

    #[test]
    fn invalid_timeout_does_not_add_cross_field_noise() {
        let err = load(&[env(&[("DB_HOST", "db"), ("READINESS_TIMEOUT_MS", "-5")])])
            .expect_err("negative timeout");
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn lenient_mode_ignores_unknown_keys() {
        let yaml = ConfigSource::yaml("config.yml", "db_host: db\nextra: true\n");
        let settings = load_with(&[yaml], LoaderOptions { strict: false })
            .expect("lenient load should succeed");
        assert_eq!(settings.database.host, "db");
    }

    #[test]
    fn empty_dependency_list_disables_probing() {
        let settings = load(&[env(&[("DB_HOST", "db"), ("READINESS_DEPENDENCIES", "")])])
            .expect("settings should load");
        assert!(settings.readiness.dependencies.is_empty());
    }

    #[test]
    fn loading_twice_yields_equal_but_independent_values() {
        let sources = [env(&[("DB_HOST", "db")])];
        let first = load(&sources).expect("first load");
        let second = load(&sources).expect("second load");
        assert_eq!(first, second);
    }
}
