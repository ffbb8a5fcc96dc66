use std::ops::RangeInclusive;

use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config.as_object().ok_or_else(|| type_error("root", "object"))?;

    if let Some(server) = Section::optional(root, "server")? {
        server.string("host")?;
        server.integer("port", 0..=65_535)?;
        server.string_list("cors_allowed_origins")?;
    }

    if let Some(llm) = Section::optional(root, "llm")? {
        for key in ["base_url", "model", "api_key"] {
            llm.string(key)?;
        }
        llm.number("temperature", 0.0..=2.0)?;
        llm.integer("max_tokens", 1..=128_000)?;
        llm.integer("request_timeout_secs", 1..=3_600)?;
    }

    if let Some(embedding) = Section::optional(root, "embedding")? {
        embedding.string("model")?;
    }

    if let Some(index) = Section::optional(root, "vector_index")? {
        for key in [
            "index_name",
            "host",
            "api_key",
            "control_plane_url",
            "namespace",
            "text_key",
        ] {
            index.string(key)?;
        }
        index.integer("top_k", 1..=100)?;
    }

    if let Some(history) = Section::optional(root, "chat_history")? {
        history.integer("max_turns", 2..=10_000)?;
        history.integer("max_sessions", 1..=1_000_000)?;
    }

    Ok(())
}

/// A top-level config mapping; every check is a no-op for absent or null keys.
struct Section<'a> {
    name: &'static str,
    fields: &'a Map<String, Value>,
}

impl<'a> Section<'a> {
    fn optional(
        root: &'a Map<String, Value>,
        name: &'static str,
    ) -> Result<Option<Self>, ApiError> {
        match root.get(name) {
            Some(Value::Object(fields)) => Ok(Some(Self { name, fields })),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(type_error(name, "object")),
        }
    }

    fn path(&self, key: &str) -> String {
        format!("{}.{}", self.name, key)
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key).filter(|value| !value.is_null())
    }

    fn string(&self, key: &str) -> Result<(), ApiError> {
        match self.present(key) {
            Some(value) if !value.is_string() => Err(type_error(&self.path(key), "string")),
            _ => Ok(()),
        }
    }

    fn integer(&self, key: &str, range: RangeInclusive<u64>) -> Result<(), ApiError> {
        let Some(value) = self.present(key) else {
            return Ok(());
        };
        let number = value
            .as_u64()
            .ok_or_else(|| type_error(&self.path(key), "integer"))?;
        if !range.contains(&number) {
            return Err(range_error(&self.path(key), range.start(), range.end()));
        }
        Ok(())
    }

    fn number(&self, key: &str, range: RangeInclusive<f64>) -> Result<(), ApiError> {
        let Some(value) = self.present(key) else {
            return Ok(());
        };
        let number = value
            .as_f64()
            .ok_or_else(|| type_error(&self.path(key), "number"))?;
        if !range.contains(&number) {
            return Err(range_error(&self.path(key), range.start(), range.end()));
        }
        Ok(())
    }

    fn string_list(&self, key: &str) -> Result<(), ApiError> {
        let Some(value) = self.present(key) else {
            return Ok(());
        };
        let items = value
            .as_array()
            .ok_or_else(|| type_error(&self.path(key), "array of strings"))?;
        for (index, item) in items.iter().enumerate() {
            let item_path = format!("{}[{}]", self.path(key), index);
            match item.as_str() {
                None => return Err(type_error(&item_path, "string")),
                Some(text) if text.trim().is_empty() => {
                    return Err(ApiError::Config(format!(
                        "Invalid config at '{}': value cannot be empty",
                        item_path
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn type_error(path: &str, expected: &str) -> ApiError {
    ApiError::Config(format!("Invalid config at '{}': expected {}", path, expected))
}

fn range_error<T: std::fmt::Display>(path: &str, min: T, max: T) -> ApiError {
    ApiError::Config(format!(
        "Invalid config at '{}': must be between {} and {}",
        path, min, max
    ))
}
