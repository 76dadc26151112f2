use std::io::Write;
use std::time::Duration;

use sqltrain_config::{ConfigError, ConfigSource, HardDependency, LogOutput, load};

#[test]
fn yaml_file_environment_and_cli_layer_per_field() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(
        file,
        "app_name: sql-training\n\
         app_port: 9000\n\
         db_host: db\n\
         db_user: trainer\n\
         db_password: from-file\n\
         log_format: json\n\
         readiness_timeout_ms: 2000\n\
         readiness_poll_interval_ms: 100\n\
         readiness_dependencies:\n  - database\n"
    )?;

    let yaml = ConfigSource::yaml_file(file.path())?;
    let environment = ConfigSource::environment([
        ("DB_HOST", "localhost"),
        ("DB_PASSWORD", "from-env"),
        ("HOME", "/root"),
    ]);
    let cli = ConfigSource::overrides("cli", [("app_port", "9100")]);

    let settings = load(&[yaml, environment, cli]).map_err(|err| anyhow::anyhow!(err.summary()))?;

    assert_eq!(settings.database.host, "localhost");
    assert_eq!(settings.database.user, "trainer");
    assert_eq!(
        settings.database.password.as_ref().map(|secret| secret.expose()),
        Some("from-env")
    );
    assert_eq!(settings.app.port, 9100);
    assert_eq!(settings.logging.format, Some(LogOutput::Json));
    assert_eq!(settings.readiness_timeout(), Duration::from_secs(2));
    assert_eq!(settings.readiness_poll_interval(), Duration::from_millis(100));
    assert_eq!(settings.database_url_redacted(), "postgres://trainer@localhost:5432/postgres");
    assert_eq!(settings.bind_address(), "0.0.0.0:9100");
    assert_eq!(settings.readiness.dependencies, vec![HardDependency::Database]);

    let rendered = serde_json::to_string(&settings)?;
    assert!(!rendered.contains("from-env"));
    Ok(())
}

#[test]
fn unreadable_yaml_file_is_reported() {
    let missing = std::env::temp_dir().join("sqltrain-config-does-not-exist.yml");
    let err = ConfigSource::yaml_file(&missing).expect_err("file is missing");
    assert!(matches!(err, ConfigError::Unreadable { .. }));
}

#[test]
fn unknown_yaml_keys_fail_in_strict_mode() {
    let yaml = ConfigSource::yaml("config.yml", "db_host: db\ndb_hots: typo\n");
    let err = load(&[yaml]).expect_err("typo should be rejected");
    assert!(matches!(
        err.issues(),
        [ConfigError::UnknownKey { key, origin }] if key == "db_hots" && origin == "config.yml"
    ));
}
