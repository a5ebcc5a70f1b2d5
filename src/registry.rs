//! Registry - Run-Scoped Model Container
//!
//! One insertion-ordered collection per record type. Order is significant:
//! it drives output ordering and collision tie-breaking.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::statistics::StatisticsSnapshot;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read registry snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid registry snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// One schema-derived definition.
///
/// The record keeps its raw JSON value: bookkeeping keys (`$path`,
/// `$referenceCounter`) live next to the attribute bag, exactly as the
/// expansion stage hands them over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

impl Record {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The attribute bag, or `None` when the record is not an object.
    pub fn attributes(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// Missing or blank records are skipped by every stage.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Attribute lookup; explicit `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn path(&self) -> Option<&str> {
        self.get_str("$path")
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    pub fn reference_counter(&self) -> u64 {
        self.get("$referenceCounter")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn todo(&self) -> Option<&str> {
        self.get_str("todo")
    }

    /// Human label used in diagnostics: `$path`, then `id`, then the key.
    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.path()
            .or_else(|| self.id())
            .or(Some(key).filter(|k| !k.is_empty()))
            .unwrap_or("(unknown)")
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

pub type Collection = IndexMap<String, Record>;

/// Pre-authored wikitext bodies keyed by source file name.
pub type WikitextCollection = IndexMap<String, String>;

/// Final document name -> body.
pub type GeneratedPages = IndexMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Field,
    Model,
    Form,
    ExpandedField,
    ExpandedModel,
    ExpandedForm,
}

impl RecordKind {
    pub const RAW: [RecordKind; 3] = [RecordKind::Field, RecordKind::Model, RecordKind::Form];
    pub const EXPANDED: [RecordKind; 3] = [
        RecordKind::ExpandedField,
        RecordKind::ExpandedModel,
        RecordKind::ExpandedForm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Field => "field",
            RecordKind::Model => "model",
            RecordKind::Form => "form",
            RecordKind::ExpandedField => "expandedField",
            RecordKind::ExpandedModel => "expandedModel",
            RecordKind::ExpandedForm => "expandedForm",
        }
    }

    /// The schema type a record of this kind is validated against.
    pub fn base(&self) -> RecordKind {
        match self {
            RecordKind::Field | RecordKind::ExpandedField => RecordKind::Field,
            RecordKind::Model | RecordKind::ExpandedModel => RecordKind::Model,
            RecordKind::Form | RecordKind::ExpandedForm => RecordKind::Form,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputCategory {
    Property,
    Category,
    Form,
    Template,
    Page,
}

impl OutputCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputCategory::Property => "property",
            OutputCategory::Category => "category",
            OutputCategory::Form => "form",
            OutputCategory::Template => "template",
            OutputCategory::Page => "page",
        }
    }
}

impl fmt::Display for OutputCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produced documents per output category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputStats {
    pub property: u64,
    pub category: u64,
    pub form: u64,
    pub template: u64,
    pub page: u64,
    pub total: u64,
}

impl OutputStats {
    pub fn increment(&mut self, category: OutputCategory) {
        match category {
            OutputCategory::Property => self.property += 1,
            OutputCategory::Category => self.category += 1,
            OutputCategory::Form => self.form += 1,
            OutputCategory::Template => self.template += 1,
            OutputCategory::Page => self.page += 1,
        }
        self.total += 1;
    }

    pub fn category_sum(&self) -> u64 {
        self.property + self.category + self.form + self.template + self.page
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSize {
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    /// Written by the (external) reading stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_size: Option<InputSize>,
    #[serde(default)]
    pub output_stats: OutputStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<StatisticsSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    #[serde(default)]
    pub field: Collection,
    #[serde(default)]
    pub model: Collection,
    #[serde(default)]
    pub form: Collection,
    #[serde(default)]
    pub query: Collection,
    #[serde(default)]
    pub template: WikitextCollection,
    #[serde(default)]
    pub page: WikitextCollection,
    #[serde(default)]
    pub category: WikitextCollection,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_field: Option<Collection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_model: Option<Collection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_form: Option<Collection>,

    /// Dependency graph built by the expansion stage; opaque here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<Value>,

    #[serde(default)]
    pub statistics: Statistics,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedPages>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> Result<Self, RegistryError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn collection(&self, kind: RecordKind) -> Option<&Collection> {
        match kind {
            RecordKind::Field => Some(&self.field),
            RecordKind::Model => Some(&self.model),
            RecordKind::Form => Some(&self.form),
            RecordKind::ExpandedField => self.expanded_field.as_ref(),
            RecordKind::ExpandedModel => self.expanded_model.as_ref(),
            RecordKind::ExpandedForm => self.expanded_form.as_ref(),
        }
    }

    pub fn collection_mut(&mut self, kind: RecordKind) -> &mut Collection {
        match kind {
            RecordKind::Field => &mut self.field,
            RecordKind::Model => &mut self.model,
            RecordKind::Form => &mut self.form,
            RecordKind::ExpandedField => self.expanded_field.get_or_insert_with(Collection::new),
            RecordKind::ExpandedModel => self.expanded_model.get_or_insert_with(Collection::new),
            RecordKind::ExpandedForm => self.expanded_form.get_or_insert_with(Collection::new),
        }
    }

    /// Registers a record under `name`; later inserts replace the body but keep position.
    pub fn register(&mut self, kind: RecordKind, name: impl Into<String>, record: impl Into<Record>) {
        self.collection_mut(kind).insert(name.into(), record.into());
    }
}
