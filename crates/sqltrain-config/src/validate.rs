//! Coercion and constraint helpers applied to supplied values.

use std::time::Duration;

use crate::error::{ConfigError, ValueKind};
use crate::model::{HardDependency, LogLevel, LogOutput, Secret};
use crate::source::{RawValue, Supplied};

fn mismatch(entry: &Supplied, expected: ValueKind) -> ConfigError {
    ConfigError::TypeMismatch {
        field: entry.key.clone(),
        expected,
        got: entry.value.to_string(),
    }
}

fn violation(entry: &Supplied, rule: &'static str) -> ConfigError {
    ConfigError::ConstraintViolation {
        field: entry.key.clone(),
        rule,
    }
}

fn integer(entry: &Supplied) -> Result<i64, ConfigError> {
    match &entry.value {
        RawValue::Integer(value) => Ok(*value),
        RawValue::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| mismatch(entry, ValueKind::Integer)),
        _ => Err(mismatch(entry, ValueKind::Integer)),
    }
}

fn scalar_text(entry: &Supplied) -> Result<String, ConfigError> {
    match &entry.value {
        RawValue::Text(text) => Ok(text.clone()),
        RawValue::Integer(_) | RawValue::Float(_) | RawValue::Bool(_) => {
            Ok(entry.value.to_string())
        }
        RawValue::List(_) | RawValue::Mapping => Err(mismatch(entry, ValueKind::String)),
    }
}

pub(crate) fn non_empty_text(entry: &Supplied) -> Result<String, ConfigError> {
    let text = scalar_text(entry)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(violation(entry, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn secret(entry: &Supplied) -> Result<Option<Secret>, ConfigError> {
    let text = scalar_text(entry)?;
    Ok((!text.is_empty()).then(|| Secret::new(text)))
}

pub(crate) fn port(entry: &Supplied) -> Result<u16, ConfigError> {
    let value = integer(entry)?;
    if !(1..=65_535).contains(&value) {
        return Err(violation(entry, "must be between 1 and 65535"));
    }
    u16::try_from(value).map_err(|_| violation(entry, "must be between 1 and 65535"))
}

pub(crate) fn positive_millis(entry: &Supplied) -> Result<Duration, ConfigError> {
    let value = integer(entry)?;
    if value <= 0 {
        return Err(violation(entry, "must be positive"));
    }
    let millis = u64::try_from(value).map_err(|_| violation(entry, "must be positive"))?;
    Ok(Duration::from_millis(millis))
}

pub(crate) fn positive_count(entry: &Supplied) -> Result<u32, ConfigError> {
    let value = integer(entry)?;
    if value <= 0 {
        return Err(violation(entry, "must be positive"));
    }
    u32::try_from(value).map_err(|_| violation(entry, "must fit in 32 bits"))
}

pub(crate) fn count(entry: &Supplied) -> Result<u32, ConfigError> {
    let value = integer(entry)?;
    if value < 0 {
        return Err(violation(entry, "must not be negative"));
    }
    u32::try_from(value).map_err(|_| violation(entry, "must fit in 32 bits"))
}

pub(crate) fn boolean(entry: &Supplied) -> Result<bool, ConfigError> {
    match &entry.value {
        RawValue::Bool(flag) => Ok(*flag),
        RawValue::Integer(0) => Ok(false),
        RawValue::Integer(1) => Ok(true),
        RawValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(mismatch(entry, ValueKind::Boolean)),
        },
        _ => Err(mismatch(entry, ValueKind::Boolean)),
    }
}

pub(crate) fn log_level(entry: &Supplied) -> Result<LogLevel, ConfigError> {
    let text = non_empty_text(entry)?;
    text.parse()
        .map_err(|()| violation(entry, "must be one of trace, debug, info, warn, error"))
}

pub(crate) fn log_format(entry: &Supplied) -> Result<Option<LogOutput>, ConfigError> {
    let text = non_empty_text(entry)?;
    text.parse()
        .map(Some)
        .map_err(|()| violation(entry, "must be json or pretty"))
}

pub(crate) fn dependencies(entry: &Supplied) -> Result<Vec<HardDependency>, ConfigError> {
    let names: Vec<String> = match &entry.value {
        RawValue::Text(text) => text
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        RawValue::List(items) => items
            .iter()
            .map(|item| match item {
                RawValue::Text(text) => Ok(text.trim().to_string()),
                _ => Err(mismatch(entry, ValueKind::List)),
            })
            .collect::<Result<_, _>>()?,
        _ => return Err(mismatch(entry, ValueKind::List)),
    };

    let mut parsed = Vec::with_capacity(names.len());
    for name in names {
        let dependency = name
            .parse::<HardDependency>()
            .map_err(|()| violation(entry, "entries must name a known dependency (database)"))?;
        if !parsed.contains(&dependency) {
            parsed.push(dependency);
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(key: &str, value: &str) -> Supplied {
        Supplied {
            key: key.to_string(),
            origin: "test".to_string(),
            value: RawValue::Text(value.to_string()),
        }
    }

    fn raw(key: &str, value: RawValue) -> Supplied {
        Supplied {
            key: key.to_string(),
            origin: "test".to_string(),
            value,
        }
    }

    #[test]
    fn port_accepts_valid_range() {
        assert_eq!(port(&text("DB_PORT", "5432")).expect("port"), 5432);
        assert_eq!(port(&raw("db_port", RawValue::Integer(65_535))).expect("port"), 65_535);
    }

    #[test]
    fn port_rejects_out_of_range_and_non_numeric() {
        let err = port(&text("APP_PORT", "0")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ConstraintViolation { ref field, rule } if field == "APP_PORT" && rule.contains("between 1 and 65535")
        ));

        let err = port(&text("DB_PORT", "abc")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TypeMismatch { ref field, expected: ValueKind::Integer, ref got }
                if field == "DB_PORT" && got == "abc"
        ));
    }

    #[test]
    fn quoted_yaml_numbers_are_accepted() {
        assert_eq!(
            positive_millis(&raw("readiness_timeout_ms", RawValue::Text("250".into())))
                .expect("millis"),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn durations_and_counts_must_be_positive() {
        assert!(positive_millis(&text("READINESS_TIMEOUT_MS", "0")).is_err());
        assert!(positive_count(&text("DB_POOL_SIZE", "-1")).is_err());
        assert_eq!(count(&text("DB_MAX_OVERFLOW", "0")).expect("count"), 0);
        assert!(count(&text("DB_MAX_OVERFLOW", "-3")).is_err());
    }

    #[test]
    fn booleans_accept_common_spellings() {
        assert!(boolean(&text("REQUEST_TIMING", "Yes")).expect("bool"));
        assert!(!boolean(&text("REQUEST_TIMING", "off")).expect("bool"));
        assert!(boolean(&raw("request_timing", RawValue::Bool(true))).expect("bool"));
        assert!(boolean(&text("REQUEST_TIMING", "maybe")).is_err());
    }

    #[test]
    fn text_fields_reject_blank_and_structured_values() {
        assert!(matches!(
            non_empty_text(&text("DB_HOST", "  ")),
            Err(ConfigError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            non_empty_text(&raw("db_host", RawValue::Mapping)),
            Err(ConfigError::TypeMismatch { .. })
        ));
        assert_eq!(
            non_empty_text(&raw("db_user", RawValue::Integer(42))).expect("text"),
            "42"
        );
    }

    #[test]
    fn empty_password_means_none() {
        assert!(secret(&text("DB_PASSWORD", "")).expect("secret").is_none());
        assert_eq!(
            secret(&text("DB_PASSWORD", "pw"))
                .expect("secret")
                .map(|value| value.expose().to_string()),
            Some("pw".to_string())
        );
    }

    #[test]
    fn dependencies_parse_lists_and_text() {
        assert_eq!(
            dependencies(&text("READINESS_DEPENDENCIES", "database, database")).expect("deps"),
            vec![HardDependency::Database]
        );
        assert!(
            dependencies(&text("READINESS_DEPENDENCIES", ""))
                .expect("deps")
                .is_empty()
        );
        assert!(dependencies(&text("READINESS_DEPENDENCIES", "redis")).is_err());
    }

    #[test]
    fn log_settings_are_validated() {
        assert_eq!(log_level(&text("LOG_LEVEL", "DEBUG")).expect("level"), LogLevel::Debug);
        assert!(log_level(&text("LOG_LEVEL", "chatty")).is_err());
        assert_eq!(
            log_format(&text("LOG_FORMAT", "json")).expect("format"),
            Some(LogOutput::Json)
        );
    }
}
