//! Configuration sources and their raw, untyped entries.
//!
//! # Design
//! - Sources are plain data; reading the process environment or a file happens in the
//!   convenience constructors, never inside the loader.
//! - Each source flattens into `Supplied` entries keyed by canonical field key.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

use serde_yaml::Value as YamlValue;

use crate::defaults::OWNED_ENV_PREFIXES;
use crate::error::ConfigError;
use crate::schema::{self, FieldSpec};

/// Untyped value as provided by a source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Text (environment variables, CLI flags, YAML strings).
    Text(String),
    /// YAML integer.
    Integer(i64),
    /// YAML floating point number.
    Float(f64),
    /// YAML boolean.
    Bool(bool),
    /// YAML sequence.
    List(Vec<RawValue>),
    /// YAML mapping; never valid for a flat settings field.
    Mapping,
}

impl Display for RawValue {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => formatter.write_str(text),
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
            Self::Bool(value) => write!(formatter, "{value}"),
            Self::List(items) => {
                formatter.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        formatter.write_str(", ")?;
                    }
                    write!(formatter, "{item}")?;
                }
                formatter.write_str("]")
            }
            Self::Mapping => formatter.write_str("{..}"),
        }
    }
}

/// A raw value together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Supplied {
    /// Key exactly as written by the source (`DB_PORT`, `db_port`, ...).
    pub key: String,
    /// Source label.
    pub origin: String,
    /// Raw value.
    pub value: RawValue,
}

/// Ordered input to the loader. Later sources override earlier ones per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Environment variables, matched by upper-cased field key.
    Environment(BTreeMap<String, String>),
    /// YAML document whose top-level keys mirror field keys.
    Yaml {
        /// File path or label used in error reports.
        origin: String,
        /// Document text.
        document: String,
    },
    /// Explicit overrides keyed by field key (CLI flags).
    Overrides {
        /// Label used in error reports.
        origin: String,
        /// Field key to text value.
        values: BTreeMap<String, String>,
    },
}

impl ConfigSource {
    /// Build an environment source from any iterator of name/value pairs.
    pub fn environment<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Environment(
            vars.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }

    /// Snapshot the current process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedSource`] when a variable under an owned
    /// prefix is not valid Unicode.
    pub fn process_env() -> Result<Self, ConfigError> {
        Self::environment_os(std::env::vars_os())
    }

    /// Build an environment source from OS strings.
    ///
    /// Non-Unicode variables outside the owned prefixes are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedSource`] when a variable under an owned
    /// prefix has a non-Unicode name or value.
    pub fn environment_os<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut decoded = BTreeMap::new();
        for (name, value) in vars {
            let owned = is_owned(&name.to_string_lossy());
            match (name.into_string(), value.into_string()) {
                (Ok(name), Ok(value)) => {
                    decoded.insert(name, value);
                }
                (name, _) if owned => {
                    let name = name.unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
                    return Err(ConfigError::MalformedSource {
                        origin: "environment".to_string(),
                        reason: format!("{name} is not valid unicode"),
                    });
                }
                _ => {}
            }
        }
        Ok(Self::Environment(decoded))
    }

    /// Build a YAML source from in-memory text.
    pub fn yaml(origin: impl Into<String>, document: impl Into<String>) -> Self {
        Self::Yaml {
            origin: origin.into(),
            document: document.into(),
        }
    }

    /// Read a YAML source from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unreadable`] when the file cannot be read.
    pub fn yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let document = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            origin: origin.clone(),
            source,
        })?;
        Ok(Self::Yaml { origin, document })
    }

    /// Build an override source (typically CLI flags).
    pub fn overrides<I, K, V>(origin: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Overrides {
            origin: origin.into(),
            values: values
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// Label used for this source in error reports.
    #[must_use]
    pub fn origin(&self) -> &str {
        match self {
            Self::Environment(_) => "environment",
            Self::Yaml { origin, .. } | Self::Overrides { origin, .. } => origin,
        }
    }

    /// Flatten the source into entries for known fields, pushing issues into `errors`.
    pub(crate) fn entries(
        &self,
        strict: bool,
        errors: &mut Vec<ConfigError>,
    ) -> Vec<(&'static FieldSpec, Supplied)> {
        match self {
            Self::Environment(vars) => environment_entries(vars, strict, errors),
            Self::Yaml { origin, document } => yaml_entries(origin, document, strict, errors),
            Self::Overrides { origin, values } => {
                override_entries(origin, values, strict, errors)
            }
        }
    }
}

fn environment_entries(
    vars: &BTreeMap<String, String>,
    strict: bool,
    errors: &mut Vec<ConfigError>,
) -> Vec<(&'static FieldSpec, Supplied)> {
    let mut entries = Vec::new();
    for (name, value) in vars {
        if let Some(spec) = schema::by_env(name) {
            entries.push((
                spec,
                Supplied {
                    key: name.clone(),
                    origin: "environment".to_string(),
                    value: RawValue::Text(value.clone()),
                },
            ));
        } else if strict && is_owned(name) {
            errors.push(ConfigError::UnknownKey {
                key: name.clone(),
                origin: "environment".to_string(),
            });
        }
    }
    entries
}

fn is_owned(name: &str) -> bool {
    OWNED_ENV_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

fn override_entries(
    origin: &str,
    values: &BTreeMap<String, String>,
    strict: bool,
    errors: &mut Vec<ConfigError>,
) -> Vec<(&'static FieldSpec, Supplied)> {
    let mut entries = Vec::new();
    for (key, value) in values {
        match schema::by_key(key) {
            Some(spec) => entries.push((
                spec,
                Supplied {
                    key: key.clone(),
                    origin: origin.to_string(),
                    value: RawValue::Text(value.clone()),
                },
            )),
            None if strict => errors.push(ConfigError::UnknownKey {
                key: key.clone(),
                origin: origin.to_string(),
            }),
            None => {}
        }
    }
    entries
}

fn yaml_entries(
    origin: &str,
    document: &str,
    strict: bool,
    errors: &mut Vec<ConfigError>,
) -> Vec<(&'static FieldSpec, Supplied)> {
    let parsed: YamlValue = match serde_yaml::from_str(document) {
        Ok(value) => value,
        Err(err) => {
            errors.push(ConfigError::MalformedSource {
                origin: origin.to_string(),
                reason: err.to_string(),
            });
            return Vec::new();
        }
    };

    let mapping = match parsed {
        YamlValue::Null => return Vec::new(),
        YamlValue::Mapping(mapping) => mapping,
        _ => {
            errors.push(ConfigError::MalformedSource {
                origin: origin.to_string(),
                reason: "top level must be a mapping".to_string(),
            });
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    for (key, value) in mapping {
        let Some(key) = key.as_str().map(str::to_string) else {
            errors.push(ConfigError::MalformedSource {
                origin: origin.to_string(),
                reason: "top-level keys must be strings".to_string(),
            });
            continue;
        };
        let Some(spec) = schema::by_key(&key) else {
            if strict {
                errors.push(ConfigError::UnknownKey {
                    key,
                    origin: origin.to_string(),
                });
            }
            continue;
        };
        // An explicit null leaves the field to lower layers.
        let Some(value) = raw_from_yaml(value) else {
            continue;
        };
        entries.push((
            spec,
            Supplied {
                key,
                origin: origin.to_string(),
                value,
            },
        ));
    }
    entries
}

fn raw_from_yaml(value: YamlValue) -> Option<RawValue> {
    match value {
        YamlValue::Null => None,
        YamlValue::Bool(flag) => Some(RawValue::Bool(flag)),
        YamlValue::Number(number) => Some(
            number
                .as_i64()
                .map_or_else(|| RawValue::Float(number.as_f64().unwrap_or(f64::NAN)), RawValue::Integer),
        ),
        YamlValue::String(text) => Some(RawValue::Text(text)),
        YamlValue::Sequence(items) => Some(RawValue::List(
            items.into_iter().filter_map(raw_from_yaml).collect(),
        )),
        YamlValue::Mapping(_) => Some(RawValue::Mapping),
        YamlValue::Tagged(tagged) => raw_from_yaml(tagged.value),
    }
}
