use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::error::ConfigError;

pub const ENA_FTP_HOST: &str = "enaFtpHost";
pub const ENA_FTP_PORT: &str = "enaFtpPort";
pub const ENA_FTP_USER_ID: &str = "enaFtpUserId";
pub const ENA_FTP_PASSWORD: &str = "enaFtpPassword";

/// Environment variable name -> bundle key.
const ENV_KEYS: [(&str, &str); 4] = [
    ("ENA_FTP_HOST", ENA_FTP_HOST),
    ("ENA_FTP_PORT", ENA_FTP_PORT),
    ("ENA_FTP_USER_ID", ENA_FTP_USER_ID),
    ("ENA_FTP_PASSWORD", ENA_FTP_PASSWORD),
];

/// Key-value startup parameters. Values are strings or integers.
#[derive(Debug, Clone, Default)]
pub struct ConfigBundle {
    values: HashMap<String, Value>,
}

impl ConfigBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get_str(&self, key: &'static str) -> Result<&str, ConfigError> {
        match self.values.get(key) {
            None => Err(ConfigError::MissingKey { key }),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(ConfigError::InvalidValue {
                key,
                reason: format!("expected a string, found {}", kind_of(other)),
            }),
        }
    }

    /// Integers may arrive as JSON numbers or, from the environment, as decimal strings.
    pub fn get_int(&self, key: &'static str) -> Result<i64, ConfigError> {
        match self.values.get(key) {
            None => Err(ConfigError::MissingKey { key }),
            Some(Value::Number(n)) => n.as_i64().ok_or_else(|| ConfigError::InvalidValue {
                key,
                reason: format!("{n} is not an integer"),
            }),
            Some(Value::String(s)) => {
                s.trim()
                    .parse::<i64>()
                    .map_err(|e| ConfigError::InvalidValue {
                        key,
                        reason: format!("{s:?} is not an integer: {e}"),
                    })
            }
            Some(other) => Err(ConfigError::InvalidValue {
                key,
                reason: format!("expected an integer, found {}", kind_of(other)),
            }),
        }
    }

    /// Picks the ENA FTP variables out of `vars`; everything else is ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut bundle = Self::new();
        for (name, value) in vars {
            if let Some((_, key)) = ENV_KEYS.iter().find(|(env, _)| *env == name.as_ref()) {
                bundle.insert(*key, Value::String(value.into()));
            }
        }
        bundle
    }

    pub fn from_env() -> Self {
        // a missing .env file is not an error
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("no .env loaded: {e}");
        }
        Self::from_vars(std::env::vars())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str::<Value>(raw).map_err(ConfigError::Parse)? {
            Value::Object(map) => Ok(Self {
                values: map.into_iter().collect(),
            }),
            other => Err(ConfigError::InvalidValue {
                key: "<root>",
                reason: format!("expected a JSON object, found {}", kind_of(&other)),
            }),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::from_json_str(&raw)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
