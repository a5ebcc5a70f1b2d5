//! Schema Validation - Conformance as Leveled Issues
//!
//! The generic schema check produces raw errors.
//! Policy maps them to issues: unknown properties warn, everything else errors.
//! Validation never fails; a malformed record always yields a result.

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::log::{LogLevel, RunLog};
use crate::schema::settings_schema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

impl IssueSeverity {
    pub fn log_level(&self) -> LogLevel {
        match self {
            IssueSeverity::Error => LogLevel::Error,
            IssueSeverity::Warning => LogLevel::Warning,
            IssueSeverity::Info => LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub rule: String,
    pub severity: IssueSeverity,
    /// Label of the offending record (`$path`, id or key).
    pub path: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl ValidationIssue {
    pub fn error(rule: &str, path: &str, message: impl Into<String>) -> Self {
        Self::new(rule, IssueSeverity::Error, path, message)
    }

    pub fn warning(rule: &str, path: &str, message: impl Into<String>) -> Self {
        Self::new(rule, IssueSeverity::Warning, path, message)
    }

    fn new(rule: &str, severity: IssueSeverity, path: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            severity,
            path: path.to_string(),
            message: message.into(),
            data_path: None,
            schema_path: None,
            params: None,
        }
    }

    /// Appends this issue to the run log, with schema context for errors.
    pub fn report(&self, log: &mut RunLog) {
        let message = match (&self.data_path, &self.schema_path) {
            (Some(data), Some(schema)) if self.severity == IssueSeverity::Error => format!(
                "{} (data path: {}, schema path: {})",
                self.message,
                display_pointer(data),
                display_pointer(schema)
            ),
            _ => self.message.clone(),
        };
        log.log(self.severity.log_level(), Some(&self.path), message);
    }
}

fn display_pointer(pointer: &str) -> &str {
    if pointer.is_empty() { "/" } else { pointer }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationResult {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let valid = !issues.iter().any(|i| i.severity == IssueSeverity::Error);
        Self { valid, issues }
    }

    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

fn record_label<'a>(record: &'a Value, label: &'a str) -> &'a str {
    record
        .get("$path")
        .and_then(Value::as_str)
        .or_else(|| record.get("id").and_then(Value::as_str))
        .unwrap_or(if label.is_empty() { "(unknown)" } else { label })
}

/// Compiles a schema definition once so it can be applied to many records.
pub fn compile_schema(schema: &Value, label: &str) -> Result<Validator, ValidationIssue> {
    jsonschema::validator_for(schema).map_err(|e| {
        ValidationIssue::error("schema", label, format!("Invalid schema definition: {}", e))
    })
}

/// Validates one record against a schema definition.
///
/// Every issue is also appended to `log` in encounter order.
pub fn validate(record: &Value, schema: &Value, label: &str, log: &mut RunLog) -> ValidationResult {
    match compile_schema(schema, record_label(record, label)) {
        Ok(validator) => validate_with(record, &validator, label, log),
        Err(issue) => {
            issue.report(log);
            ValidationResult::from_issues(vec![issue])
        }
    }
}

/// Validates one record against an already compiled schema.
pub fn validate_with(record: &Value, validator: &Validator, label: &str, log: &mut RunLog) -> ValidationResult {
    let id = record_label(record, label);

    let issues: Vec<ValidationIssue> = validator
        .iter_errors(record)
        .flat_map(|error| {
            let data_path = error.instance_path.to_string();
            let schema_path = error.schema_path.to_string();
            match &error.kind {
                ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
                    .iter()
                    .map(|name| {
                        ValidationIssue::warning(
                            "schema",
                            id,
                            format!("Unsupported property {}/{}", data_path, name),
                        )
                    })
                    .collect::<Vec<_>>(),
                _ => vec![ValidationIssue {
                    data_path: Some(data_path),
                    schema_path: Some(schema_path),
                    params: Some(error.instance.clone().into_owned()),
                    ..ValidationIssue::error("schema", id, error.to_string())
                }],
            }
        })
        .collect();

    for issue in &issues {
        issue.report(log);
    }

    ValidationResult::from_issues(issues)
}

/// Validates the raw run configuration before it is deserialized.
pub fn validate_settings(settings: &Value, log: &mut RunLog) -> ValidationResult {
    validate(settings, &settings_schema(), "settings.json", log)
}
