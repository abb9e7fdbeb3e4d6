use crate::core::{DriverError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A backend-specific option value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl OptionValue {
    /// Parses a command-line style value: booleans, then integers, then text.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "true" | "on" | "yes" => OptionValue::Bool(true),
            "false" | "off" | "no" => OptionValue::Bool(false),
            _ => raw
                .parse::<i64>()
                .map(OptionValue::Integer)
                .unwrap_or_else(|_| OptionValue::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Integer(i) => write!(f, "{}", i),
            OptionValue::Text(s) => f.write_str(s),
        }
    }
}

/// Connection settings with aliases resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriverConfig {
    /// Backend connection string, `<scheme>:<rest>`
    pub dsn: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Backend-specific options
    pub options: BTreeMap<String, OptionValue>,
    /// Defer the physical connect until first use
    pub lazy: bool,
}

/// Configuration as written by users, before aliases are resolved.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    dsn: Option<String>,
    username: Option<String>,
    user: Option<String>,
    password: Option<String>,
    pass: Option<String>,
    #[serde(default)]
    options: BTreeMap<String, OptionValue>,
    #[serde(default)]
    lazy: bool,
}

impl RawConfig {
    /// The canonical key wins when both it and its alias are present.
    fn resolve(self) -> Result<DriverConfig> {
        let dsn = self
            .dsn
            .filter(|dsn| !dsn.trim().is_empty())
            .ok_or_else(|| DriverError::Configuration("missing required key 'dsn'".to_string()))?;

        Ok(DriverConfig {
            dsn,
            username: self.username.or(self.user),
            password: self.password.or(self.pass),
            options: self.options,
            lazy: self.lazy,
        })
    }
}

impl DriverConfig {
    pub fn from_dsn(dsn: impl Into<String>) -> Self {
        DriverConfig {
            dsn: dsn.into(),
            ..Default::default()
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: OptionValue) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Parses a TOML document. Settings may sit at the top level or under a
    /// `[database]` table.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut document: toml::Value = toml::from_str(content)?;
        let section = document.as_table_mut().and_then(|t| t.remove("database"));
        let raw: RawConfig = section
            .unwrap_or(document)
            .try_into()
            .map_err(|e: toml::de::Error| DriverError::Configuration(e.to_string()))?;
        raw.resolve()
    }

    /// Builds a configuration from `key=value` style pairs. Option keys take
    /// the form `options.<name>`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = RawConfig::default();
        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "dsn" => raw.dsn = Some(value.to_string()),
                "username" => raw.username = Some(value.to_string()),
                "user" => raw.user = Some(value.to_string()),
                "password" => raw.password = Some(value.to_string()),
                "pass" => raw.pass = Some(value.to_string()),
                "lazy" => {
                    raw.lazy = match OptionValue::parse(value) {
                        OptionValue::Bool(b) => b,
                        OptionValue::Integer(i) => i != 0,
                        OptionValue::Text(_) => {
                            return Err(DriverError::Configuration(format!(
                                "'lazy' expects a boolean, got '{}'",
                                value
                            )))
                        }
                    }
                }
                _ => match key.strip_prefix("options.") {
                    Some(option) if !option.is_empty() => {
                        raw.options
                            .insert(option.to_string(), OptionValue::parse(value));
                    }
                    _ => {
                        return Err(DriverError::Configuration(format!(
                            "unknown configuration key '{}'",
                            key
                        )))
                    }
                },
            }
        }
        raw.resolve()
    }

    /// The `<scheme>` part of the DSN.
    pub fn scheme(&self) -> Result<&str> {
        match self.dsn.split_once(':') {
            Some((scheme, _)) if !scheme.is_empty() => Ok(scheme),
            _ => Err(DriverError::Configuration(format!(
                "DSN '{}' has no '<driver>:' prefix",
                self.dsn
            ))),
        }
    }
}

/// Loads configuration from a TOML file at the given path.
///
/// # Example
///
/// ```no_run
/// let config = dbadapter::config::load_config("database.toml").expect("Failed to load config");
/// println!("{:?}", config);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<DriverConfig> {
    let content = fs::read_to_string(path)?;
    DriverConfig::from_toml_str(&content)
}

/// `<config dir>/dbadapter/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dbadapter").join("config.toml"))
}
