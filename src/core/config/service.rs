use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::settings::Settings;
use super::validation::validate_config;
use crate::core::errors::ApiError;

const REDACT_PLACEHOLDER: &str = "****";

/// Substrings marking a key whose value must not reach the logs.
const SENSITIVE_PATTERNS: [&str; 5] = ["api_key", "secret", "password", "_token", "credential"];

/// Keys that match a pattern above but hold plain limits.
const NON_SECRET_KEYS: [&str; 2] = ["max_tokens", "max_turns"];

/// Environment variables that override a config path, in the order they are applied.
const ENV_OVERRIDES: [(&str, &[&str]); 5] = [
    ("OPENAI_API_KEY", &["llm", "api_key"]),
    ("OPENAI_BASE_URL", &["llm", "base_url"]),
    ("PINECONE_API_KEY", &["vector_index", "api_key"]),
    ("PINECONE_INDEX_NAME", &["vector_index", "index_name"]),
    ("PINECONE_INDEX_HOST", &["vector_index", "host"]),
];

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self { paths }
    }

    /// `LEASEBOT_CONFIG_PATH`, else `config.yml` in the data dir, else the shipped one.
    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = env::var_os("LEASEBOT_CONFIG_PATH") {
            return PathBuf::from(path);
        }

        let local = self.paths.data_dir.join("config.yml");
        if local.is_file() {
            local
        } else {
            self.paths.project_root.join("config.yml")
        }
    }

    pub fn secrets_path(&self) -> &Path {
        &self.paths.secrets_path
    }

    /// Loads `config.yml` merged with the secrets file and the process environment.
    pub fn load_config(&self) -> Result<Value, ApiError> {
        let mut config = load_yaml_file(&self.config_path())?;
        merge_into(&mut config, load_yaml_file(self.secrets_path())?);
        apply_env_overrides(&mut config, |key| env::var(key).ok());
        validate_config(&config)?;
        Ok(config)
    }

    pub fn load_settings(&self) -> Result<Settings, ApiError> {
        let config = self.load_config()?;

        let mut shown = config.clone();
        redact_secrets(&mut shown);
        tracing::debug!("Effective config: {}", shown);

        Settings::from_config(&config)
    }
}

fn load_yaml_file(path: &Path) -> Result<Value, ApiError> {
    if !path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(path)
        .map_err(|err| ApiError::Config(format!("failed to read {}: {}", path.display(), err)))?;
    let value = serde_yaml::from_str::<Value>(&contents)
        .map_err(|err| ApiError::Config(format!("failed to parse {}: {}", path.display(), err)))?;

    match value {
        Value::Object(_) => Ok(value),
        Value::Null => Ok(Value::Object(Map::new())),
        _ => Err(ApiError::Config(format!(
            "{} must contain a mapping at the top level",
            path.display()
        ))),
    }
}

pub(crate) fn apply_env_overrides<F>(config: &mut Value, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for (var, path) in ENV_OVERRIDES {
        if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
            merge_into(config, nested(path, Value::String(value)));
        }
    }

    if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
        merge_into(config, nested(&["server", "port"], Value::from(port)));
    }
}

/// Wraps `leaf` in one single-key object per path segment.
fn nested(path: &[&str], leaf: Value) -> Value {
    path.iter().rev().fold(leaf, |inner, key| {
        let mut map = Map::new();
        map.insert((*key).to_string(), inner);
        Value::Object(map)
    })
}

/// Recursively overlays `overlay` onto `target`; non-object values replace.
fn merge_into(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Object(base), Value::Object(over)) => {
            for (key, value) in over {
                match base.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (target, overlay) => *target = overlay,
    }
}

pub(crate) fn redact_secrets(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if is_sensitive_key(key) && !field.is_null() {
                    *field = Value::String(REDACT_PLACEHOLDER.to_string());
                } else {
                    redact_secrets(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_secrets),
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    !NON_SECRET_KEYS.contains(&key.as_str())
        && SENSITIVE_PATTERNS.iter().any(|pattern| key.contains(pattern))
}
