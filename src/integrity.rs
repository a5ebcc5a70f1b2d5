//! Referential Integrity - Checks Beyond Schema Conformance
//!
//! Rules produce structured issues for one record at a time.
//! The checker walks the registry, reports every issue to the run log and
//! never removes or alters a record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::log::RunLog;
use crate::registry::{Record, RecordKind, Registry};
use crate::schema::record_schema;
use crate::settings::Settings;
use crate::validation::{compile_schema, validate_with, IssueSeverity, ValidationIssue};

/// Wildcard accepted in `required` / `recommended` lists.
pub const ANY_PROPERTY: &str = "*";

pub struct RecordContext<'a> {
    pub kind: RecordKind,
    pub name: &'a str,
    pub record: &'a Record,
    pub label: &'a str,
}

/// Integrity rule trait - produces issues for a single expanded record
pub trait IntegrityRule {
    fn name(&self) -> &'static str;

    fn applies_to(&self, _kind: RecordKind) -> bool {
        true
    }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue>;
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => true,
    }
}

fn string_list(value: Option<&Value>) -> Vec<&str> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

// --- General Rules ---

pub struct ArrayItemsRule;

impl IntegrityRule for ArrayItemsRule {
    fn name(&self) -> &'static str { "array_items" }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue> {
        if ctx.record.get_str("type") == Some("array") && !ctx.record.has("items") {
            vec![ValidationIssue::error(
                self.name(),
                ctx.label,
                "If the type is \"array\", \"items\" must be set.",
            )]
        } else {
            vec![]
        }
    }
}

pub struct ExclusivityRule;

impl IntegrityRule for ExclusivityRule {
    fn name(&self) -> &'static str { "exclusivity" }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue> {
        if ctx.record.has("properties") && ctx.record.has("items") {
            vec![ValidationIssue::error(
                self.name(),
                ctx.label,
                "An object cannot have both \"properties\" and \"items\"!",
            )]
        } else {
            vec![]
        }
    }
}

/// Tree shaking diagnostic; forms are entry points and always count as used.
pub struct UsageRule;

impl IntegrityRule for UsageRule {
    fn name(&self) -> &'static str { "usage" }

    fn applies_to(&self, kind: RecordKind) -> bool {
        kind != RecordKind::ExpandedForm
    }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue> {
        if ctx.record.reference_counter() == 0 {
            vec![ValidationIssue::warning(self.name(), ctx.label, "is never used.")]
        } else {
            vec![]
        }
    }
}

// --- Field Rules ---

pub struct DefaultInEnumRule;

impl IntegrityRule for DefaultInEnumRule {
    fn name(&self) -> &'static str { "default_in_enum" }

    fn applies_to(&self, kind: RecordKind) -> bool {
        kind == RecordKind::ExpandedField
    }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue> {
        let (Some(default), Some(allowed)) = (
            ctx.record.get("default"),
            ctx.record.get("enum").and_then(Value::as_array),
        ) else {
            return vec![];
        };

        if allowed.contains(default) {
            return vec![];
        }

        let shown = match default {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        vec![ValidationIssue::error(
            self.name(),
            ctx.label,
            format!("The default value \"{}\" is not part of the enum.", shown),
        )]
    }
}

pub struct FormFormatRule;

impl IntegrityRule for FormFormatRule {
    fn name(&self) -> &'static str { "form_format" }

    fn applies_to(&self, kind: RecordKind) -> bool {
        kind == RecordKind::ExpandedField
    }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue> {
        if !ctx.record.has("form") {
            return vec![];
        }
        match ctx.record.get("format") {
            Some(format) if format.as_str() != Some("Page") => vec![ValidationIssue::warning(
                self.name(),
                ctx.label,
                "If a field defines \"form\", the format must be \"Page\" (or omitted)",
            )],
            _ => vec![],
        }
    }
}

pub struct TokensWidgetRule;

impl IntegrityRule for TokensWidgetRule {
    fn name(&self) -> &'static str { "tokens_widget" }

    fn applies_to(&self, kind: RecordKind) -> bool {
        kind == RecordKind::ExpandedField
    }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue> {
        let widget = ctx
            .record
            .get("sf_form")
            .and_then(|form| form.get("input type"))
            .and_then(Value::as_str);

        // Arrays without items are already reported by `ArrayItemsRule`.
        let is_array = ctx.record.get_str("type") == Some("array");
        if widget == Some("tokens") && !is_array && !ctx.record.has("items") {
            vec![ValidationIssue::error(
                self.name(),
                ctx.label,
                "The tokens widget only makes sense with \"type\": \"array\" and \"items\".",
            )]
        } else {
            vec![]
        }
    }
}

// --- Model Rules ---

/// Every `required` / `recommended` entry must name one of the model's own properties.
pub struct RequirementReferencesRule;

impl IntegrityRule for RequirementReferencesRule {
    fn name(&self) -> &'static str { "requirement_references" }

    fn applies_to(&self, kind: RecordKind) -> bool {
        kind == RecordKind::ExpandedModel
    }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue> {
        let mut issues = vec![];
        let properties = ctx.record.get("properties").and_then(Value::as_object);

        for list_name in ["required", "recommended"] {
            if !ctx.record.has(list_name) {
                continue;
            }
            let Some(properties) = properties else {
                issues.push(ValidationIssue::warning(
                    self.name(),
                    ctx.label,
                    format!("\"{}\" is declared but the model has no \"properties\"", list_name),
                ));
                continue;
            };
            for entry in string_list(ctx.record.get(list_name)) {
                if entry != ANY_PROPERTY && !properties.contains_key(entry) {
                    issues.push(ValidationIssue::warning(
                        self.name(),
                        ctx.label,
                        format!("\"{}\" > Non-existent property \"{}\"!", list_name, entry),
                    ));
                }
            }
        }

        issues
    }
}

pub struct RedundantRequirementRule;

impl IntegrityRule for RedundantRequirementRule {
    fn name(&self) -> &'static str { "redundant_requirement" }

    fn applies_to(&self, kind: RecordKind) -> bool {
        kind == RecordKind::ExpandedModel
    }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue> {
        let required = string_list(ctx.record.get("required"));
        let overlap: Vec<&str> = string_list(ctx.record.get("recommended"))
            .into_iter()
            .filter(|name| required.contains(name))
            .collect();

        if overlap.is_empty() {
            vec![]
        } else {
            vec![ValidationIssue::warning(
                self.name(),
                ctx.label,
                format!(
                    "\"recommended\" and \"required\" define the same fields: {}",
                    overlap.join(", ")
                ),
            )]
        }
    }
}

pub struct SubobjectExtendRule;

impl IntegrityRule for SubobjectExtendRule {
    fn name(&self) -> &'static str { "subobject_extend" }

    fn applies_to(&self, kind: RecordKind) -> bool {
        kind == RecordKind::ExpandedModel
    }

    fn check(&self, ctx: &RecordContext<'_>) -> Vec<ValidationIssue> {
        if ctx.record.has("smw_subobjectExtend") && !is_truthy(ctx.record.get("smw_subobject")) {
            vec![ValidationIssue::warning(
                self.name(),
                ctx.label,
                "Property \"smw_subobjectExtend\" is applied on a model that defines no subobjects!",
            )]
        } else {
            vec![]
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityPass {
    PreExpansion,
    Expanded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub pass: IntegrityPass,
    pub records_checked: usize,
    pub issues: Vec<ValidationIssue>,
}

impl IntegrityReport {
    fn new(pass: IntegrityPass) -> Self {
        Self { pass, records_checked: 0, issues: vec![] }
    }

    pub fn has_errors(&self) -> bool {
        self.count(IssueSeverity::Error) > 0
    }

    pub fn count(&self, severity: IssueSeverity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Checker orchestrates the schema pass and the rule pass
pub struct IntegrityChecker {
    rules: Vec<Box<dyn IntegrityRule>>,
}

impl IntegrityChecker {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ArrayItemsRule),
                Box::new(ExclusivityRule),
                Box::new(UsageRule),
                Box::new(DefaultInEnumRule),
                Box::new(FormFormatRule),
                Box::new(TokensWidgetRule),
                Box::new(RequirementReferencesRule),
                Box::new(RedundantRequirementRule),
                Box::new(SubobjectExtendRule),
            ],
        }
    }

    /// Pre-expansion pass: schema conformance of every raw field, model and form.
    pub fn check_registry(&self, registry: &Registry, settings: &Settings, log: &mut RunLog) -> IntegrityReport {
        let mut report = IntegrityReport::new(IntegrityPass::PreExpansion);

        for kind in RecordKind::RAW {
            let Some(collection) = registry.collection(kind) else {
                continue;
            };
            let schema = record_schema(kind, settings.allow_additional_properties);
            let validator = match compile_schema(&schema, kind.as_str()) {
                Ok(validator) => validator,
                Err(issue) => {
                    issue.report(log);
                    report.issues.push(issue);
                    continue;
                }
            };

            for (name, record) in collection {
                let label = format!("{}/{}", kind, name);
                if record.attributes().is_none() {
                    skip_unusable(&mut report, log, record.label(&label));
                    continue;
                }
                let result = validate_with(record.value(), &validator, &label, log);
                report.records_checked += 1;
                report.issues.extend(result.issues);
            }
        }

        tracing::debug!(
            records = report.records_checked,
            issues = report.issues.len(),
            "pre-expansion check finished"
        );
        report
    }

    /// Post-expansion pass: cross-record and type-specific rules.
    pub fn check_expanded_registry(&self, registry: &Registry, log: &mut RunLog) -> IntegrityReport {
        let mut report = IntegrityReport::new(IntegrityPass::Expanded);

        for kind in RecordKind::EXPANDED {
            let Some(collection) = registry.collection(kind) else {
                log.warn(None, format!("Collection \"{}\" is missing, nothing to check", kind));
                continue;
            };

            for (name, record) in collection {
                let label = record.label(name);
                if record.attributes().is_none() {
                    skip_unusable(&mut report, log, label);
                    continue;
                }

                let issues = self.check_record(kind, name, record);
                for issue in &issues {
                    issue.report(log);
                }
                report.records_checked += 1;
                report.issues.extend(issues);
            }
        }

        tracing::debug!(
            records = report.records_checked,
            issues = report.issues.len(),
            "expanded registry check finished"
        );
        report
    }

    pub fn check_record(&self, kind: RecordKind, name: &str, record: &Record) -> Vec<ValidationIssue> {
        let ctx = RecordContext {
            kind,
            name,
            record,
            label: record.label(name),
        };

        self.rules
            .iter()
            .filter(|rule| rule.applies_to(kind))
            .flat_map(|rule| rule.check(&ctx))
            .collect()
    }
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn skip_unusable(report: &mut IntegrityReport, log: &mut RunLog, label: &str) {
    let issue = ValidationIssue::warning("structure", label, "has no attribute bag and was skipped");
    issue.report(log);
    report.issues.push(issue);
}
