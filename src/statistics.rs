//! Run Statistics - Metrics from a Finished Registry
//!
//! Every calculation is a pure read and tolerates a partially populated
//! registry: absent collections count as zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Command;

use crate::hashing::compute_generated_digest;
use crate::log::{LogLevel, RunLog};
use crate::registry::{Collection, OutputStats, Registry, WikitextCollection};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStats {
    pub field: u64,
    pub model: u64,
    pub form: u64,
    pub template: u64,
    pub query: u64,
    pub page: u64,
    pub category: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: u64,
    pub edges: u64,
}

/// Sizes are counted in characters of the serialized JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityStats {
    pub dev_model_size: u64,
    pub processed_model_size: u64,
    pub generated_size: u64,
    pub processed_model_percentage: f64,
    pub generated_percentage: f64,
    #[serde(default)]
    pub generated_digest: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    pub total: u64,
    pub warning: u64,
    pub error: u64,
    pub todo: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionStats {
    pub log_message: String,
    pub short_hash: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub input_stats: InputStats,
    pub output_stats: OutputStats,
    pub graph_stats: GraphStats,
    pub complexity: ComplexityStats,
    pub log: LogStats,
    pub version: VersionStats,
}

impl StatisticsSnapshot {
    /// One-line summaries for console output.
    pub fn summary_lines(&self, build_graph: bool) -> Vec<String> {
        let i = &self.input_stats;
        let o = &self.output_stats;
        let c = &self.complexity;

        let mut lines = vec![
            summary(" IN:    ", &[
                (i.field.to_string(), "Field"),
                (i.model.to_string(), "Model"),
                (i.form.to_string(), "Form"),
                (i.template.to_string(), "Template"),
                (i.query.to_string(), "Query"),
                (i.page.to_string(), "Page"),
            ]),
            summary(" OUT:   ", &[
                (o.property.to_string(), "Property"),
                (o.template.to_string(), "Template"),
                (o.form.to_string(), "Form"),
                (o.category.to_string(), "Category"),
                (o.page.to_string(), "Page"),
            ]),
            summary(" COMPL: ", &[
                (c.dev_model_size.to_string(), "DevM"),
                (format!("{} ({}%)", c.processed_model_size, c.processed_model_percentage), "ProcM"),
                (format!("{} ({}%)", c.generated_size, c.generated_percentage), "Final"),
            ]),
        ];

        if build_graph {
            lines.push(summary(" GRAPH: ", &[
                (self.graph_stats.nodes.to_string(), "Node"),
                (self.graph_stats.edges.to_string(), "Edge"),
            ]));
        }

        lines
    }
}

fn summary(prefix: &str, values: &[(String, &str)]) -> String {
    let parts: Vec<String> = values
        .iter()
        .map(|(value, label)| format!("{} {}", value, label))
        .collect();
    format!("{}{}", prefix, parts.join(" | "))
}

/// Best-effort revision metadata of the surrounding environment.
pub trait RevisionSource {
    fn revision(&self) -> VersionStats;
}

/// Reads revision metadata from `git`; any failure yields empty strings.
#[derive(Debug, Clone, Default)]
pub struct GitRevision {
    pub work_dir: Option<PathBuf>,
}

impl GitRevision {
    fn git(&self, args: &[&str]) -> String {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = &self.work_dir {
            command.current_dir(dir);
        }
        match command.output() {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).trim().to_string()
            }
            Ok(output) => {
                tracing::debug!(?args, status = %output.status, "git returned an error");
                String::new()
            }
            Err(e) => {
                tracing::debug!(?args, error = %e, "git is not available");
                String::new()
            }
        }
    }
}

impl RevisionSource for GitRevision {
    fn revision(&self) -> VersionStats {
        let timestamp = self.git(&["show", "-s", "--format=%ct"]);
        VersionStats {
            log_message: self.git(&["log", "-1", "--pretty=%B"]),
            short_hash: self.git(&["rev-parse", "--short", "HEAD"]),
            committed_at: parse_commit_timestamp(&timestamp),
            timestamp,
        }
    }
}

pub fn parse_commit_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    let seconds = timestamp.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(seconds, 0)
}

fn count(len: usize) -> u64 {
    len as u64
}

pub fn calculate_input_statistics(registry: &Registry) -> InputStats {
    let mut stats = InputStats {
        field: count(registry.field.len()),
        model: count(registry.model.len()),
        form: count(registry.form.len()),
        template: count(registry.template.len()),
        query: count(registry.query.len()),
        page: count(registry.page.len()),
        category: count(registry.category.len()),
        total: 0,
    };
    stats.total = stats.field
        + stats.model
        + stats.form
        + stats.template
        + stats.query
        + stats.page
        + stats.category;
    stats
}

/// Size of an opaque graph section: entries of an array or object.
fn section_size(section: Option<&Value>) -> u64 {
    match section {
        Some(Value::Array(items)) => count(items.len()),
        Some(Value::Object(entries)) => count(entries.len()),
        _ => 0,
    }
}

pub fn calculate_graph_statistics(registry: &Registry) -> GraphStats {
    let graph = registry.graph.as_ref();
    GraphStats {
        nodes: section_size(graph.and_then(|g| g.get("nodes"))),
        edges: section_size(graph.and_then(|g| g.get("edges"))),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DevModel<'a> {
    field: &'a Collection,
    model: &'a Collection,
    form: &'a Collection,
    template: &'a WikitextCollection,
    query: &'a Collection,
    page: &'a WikitextCollection,
    category: &'a WikitextCollection,
}

/// Expanded forms already embed their fields and models.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessedModel<'a> {
    expanded_form: Option<&'a Collection>,
    template: &'a WikitextCollection,
    query: &'a Collection,
    page: &'a WikitextCollection,
}

fn serialized_len<T: Serialize>(value: &T) -> u64 {
    serde_json::to_string(value)
        .map(|s| count(s.chars().count()))
        .unwrap_or(0)
}

/// Ratio in percent, rounded to one decimal place.
fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 1000.0).round() / 10.0
}

pub fn calculate_complexity(registry: &Registry) -> ComplexityStats {
    let dev_model_size = match &registry.statistics.input_size {
        Some(size) => size.total,
        None => serialized_len(&DevModel {
            field: &registry.field,
            model: &registry.model,
            form: &registry.form,
            template: &registry.template,
            query: &registry.query,
            page: &registry.page,
            category: &registry.category,
        }),
    };

    let processed_model_size = serialized_len(&ProcessedModel {
        expanded_form: registry.expanded_form.as_ref(),
        template: &registry.template,
        query: &registry.query,
        page: &registry.page,
    });

    let generated_size = registry.generated.as_ref().map(serialized_len).unwrap_or(0);
    let generated_digest = registry
        .generated
        .as_ref()
        .and_then(|generated| compute_generated_digest(generated).ok())
        .unwrap_or_default();

    ComplexityStats {
        dev_model_size,
        processed_model_size,
        generated_size,
        processed_model_percentage: percentage(processed_model_size, dev_model_size),
        generated_percentage: percentage(generated_size, dev_model_size),
        generated_digest,
    }
}

/// Counts log lines by their level marker.
pub fn calculate_log_statistics(log: &RunLog) -> LogStats {
    let mut stats = LogStats::default();
    for line in log.lines() {
        stats.total += 1;
        if line.starts_with(LogLevel::Error.marker()) {
            stats.error += 1;
        } else if line.starts_with(LogLevel::Warning.marker()) {
            stats.warning += 1;
        } else if line.starts_with(LogLevel::Todo.marker()) {
            stats.todo += 1;
        }
    }
    stats
}

/// Computes the full snapshot from a registry that has been through generation.
pub fn registry_statistics(
    registry: &Registry,
    log: &RunLog,
    revision: &dyn RevisionSource,
) -> StatisticsSnapshot {
    StatisticsSnapshot {
        input_stats: calculate_input_statistics(registry),
        output_stats: registry.statistics.output_stats.clone(),
        graph_stats: calculate_graph_statistics(registry),
        complexity: calculate_complexity(registry),
        log: calculate_log_statistics(log),
        version: revision.revision(),
    }
}
