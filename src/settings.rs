//! Run Settings

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid settings: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings must be a JSON object")]
    NotAnObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_true")]
    pub allow_additional_properties: bool,
    /// Injects the `template:HeaderTabs` navigation helper.
    #[serde(default)]
    pub header_tabs: bool,
    #[serde(default)]
    pub upload_outline: bool,
    #[serde(default)]
    pub outline_title: Option<String>,
    #[serde(default)]
    pub mw_username: String,
    #[serde(default = "default_true")]
    pub display_todos: bool,
    #[serde(default)]
    pub generated_notice: bool,
    #[serde(default)]
    pub generated_notice_text: String,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub build_graph: bool,
}

fn default_true() -> bool { true }

impl Default for Settings {
    fn default() -> Self {
        Self {
            allow_additional_properties: true,
            header_tabs: false,
            upload_outline: false,
            outline_title: None,
            mw_username: String::new(),
            display_todos: true,
            generated_notice: false,
            generated_notice_text: String::new(),
            verbose: false,
            build_graph: false,
        }
    }
}

impl Settings {
    pub fn from_value(value: &Value) -> Result<Self, SettingsError> {
        Ok(Self::deserialize(value)?)
    }

    /// Like `from_value`, but a key whose value has the wrong shape keeps its default.
    ///
    /// Returns the settings and the keys that fell back. Only a non-object
    /// value is rejected.
    pub fn from_value_lenient(value: &Value) -> Result<(Self, Vec<String>), SettingsError> {
        let entries = value.as_object().ok_or(SettingsError::NotAnObject)?;
        let defaults = match serde_json::to_value(Self::default())? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let mut merged = defaults.clone();
        let mut rejected = Vec::new();
        for (key, entry) in entries {
            let mut candidate = defaults.clone();
            candidate.insert(key.clone(), entry.clone());
            if Self::deserialize(&Value::Object(candidate)).is_ok() {
                merged.insert(key.clone(), entry.clone());
            } else {
                rejected.push(key.clone());
            }
        }

        Ok((Self::deserialize(&Value::Object(merged))?, rejected))
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Title of the generated outline page.
    pub fn outline_page_title(&self) -> String {
        match &self.outline_title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => format!("User:{}/outline", self.mw_username),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_empty_object() {
        let settings = Settings::from_value(&json!({})).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.allow_additional_properties);
        assert!(settings.display_todos);
    }

    #[test]
    fn test_lenient_keeps_valid_keys() {
        let (settings, rejected) =
            Settings::from_value_lenient(&json!({"verbose": "yes", "headerTabs": true})).unwrap();
        assert_eq!(rejected, vec!["verbose"]);
        assert!(!settings.verbose);
        assert!(settings.header_tabs);
    }

    #[test]
    fn test_lenient_rejects_non_object() {
        assert!(matches!(
            Settings::from_value_lenient(&json!(["verbose"])),
            Err(SettingsError::NotAnObject)
        ));
    }

    #[test]
    fn test_outline_title_fallback() {
        let mut settings = Settings::from_value(&json!({"mwUsername": "Bot"})).unwrap();
        assert_eq!(settings.outline_page_title(), "User:Bot/outline");

        settings.outline_title = Some("Model Outline".to_string());
        assert_eq!(settings.outline_page_title(), "Model Outline");
    }
}
