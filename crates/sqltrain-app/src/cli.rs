//! Command-line flags and source ordering.

use std::path::PathBuf;

use clap::Parser;
use sqltrain_config::{ConfigError, ConfigSource};

/// Bootstrap the SQL training service.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "sqltrain", version, about)]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, value_name = "PATH", env = "APPLICATION_CONFIG")]
    pub config: Option<PathBuf>,
    /// Interface the HTTP listener binds to.
    #[arg(long, value_name = "HOST")]
    pub app_host: Option<String>,
    /// Port the HTTP listener binds to.
    #[arg(long, value_name = "PORT")]
    pub app_port: Option<String>,
    /// Default log filter level.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
    /// Database server host.
    #[arg(long, value_name = "HOST")]
    pub db_host: Option<String>,
    /// Database server port.
    #[arg(long, value_name = "PORT")]
    pub db_port: Option<String>,
}

impl Cli {
    /// Flags that were given, keyed by configuration field.
    #[must_use]
    pub fn overrides(&self) -> ConfigSource {
        let flags = [
            ("app_host", &self.app_host),
            ("app_port", &self.app_port),
            ("log_level", &self.log_level),
            ("db_host", &self.db_host),
            ("db_port", &self.db_port),
        ];
        ConfigSource::overrides(
            "cli",
            flags
                .into_iter()
                .filter_map(|(key, value)| value.as_ref().map(|value| (key, value.clone()))),
        )
    }

    /// Sources in precedence order: YAML file, process environment, then flags.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unreadable`] when the YAML file cannot be read and
    /// [`ConfigError::MalformedSource`] when an owned variable is not Unicode.
    pub fn sources(&self) -> Result<Vec<ConfigSource>, ConfigError> {
        let mut sources = Vec::with_capacity(3);
        if let Some(path) = &self.config {
            sources.push(ConfigSource::yaml_file(path)?);
        }
        sources.push(ConfigSource::process_env()?);
        sources.push(self.overrides());
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqltrain_config::load;

    #[test]
    fn flags_become_overrides() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["sqltrain", "--db-port", "6000", "--log-level", "debug"])?;
        match cli.overrides() {
            ConfigSource::Overrides { origin, values } => {
                assert_eq!(origin, "cli");
                assert_eq!(values.len(), 2);
                assert_eq!(values.get("db_port").map(String::as_str), Some("6000"));
                assert_eq!(values.get("log_level").map(String::as_str), Some("debug"));
            }
            other => panic!("unexpected source: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn flags_override_yaml_and_environment() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["sqltrain", "--db-port", "7000"])?;
        let settings = load(&[
            ConfigSource::yaml("config.yaml", "db_host: yaml-host\ndb_port: 5000\n"),
            ConfigSource::environment([("DB_PORT", "6000"), ("DB_HOST", "env-host")]),
            cli.overrides(),
        ])?;
        assert_eq!(settings.database.port, 7000);
        assert_eq!(settings.database.host, "env-host");
        Ok(())
    }

    #[test]
    fn unreadable_config_file_is_reported() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/sqltrain.yaml")),
            ..Cli::default()
        };
        let err = cli.sources().expect_err("missing file");
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
