#![cfg(unix)]

use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;

use sqltrain_config::{ConfigError, ConfigSource};

#[test]
fn process_environment_with_non_unicode_variables() -> anyhow::Result<()> {
    let garbage = OsString::from_vec(vec![0xff, 0xfe]);
    // Only test in this binary, so no other thread reads the environment.
    unsafe {
        std::env::set_var("SQLTRAIN_FOREIGN_BYTES", &garbage);
        std::env::set_var("DB_HOST", "db.internal");
    }

    let ConfigSource::Environment(vars) = ConfigSource::process_env()? else {
        anyhow::bail!("process environment must be an environment source");
    };
    assert_eq!(vars.get("DB_HOST").map(String::as_str), Some("db.internal"));
    assert!(!vars.contains_key("SQLTRAIN_FOREIGN_BYTES"));

    unsafe {
        std::env::set_var("DB_NAME", &garbage);
    }
    let err = match ConfigSource::process_env() {
        Ok(_) => anyhow::bail!("owned non-unicode variable must be rejected"),
        Err(err) => err,
    };
    assert!(matches!(err, ConfigError::MalformedSource { .. }));
    Ok(())
}
