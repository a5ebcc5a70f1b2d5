//! Run Pipeline - Single Entry Point
//!
//! validate settings -> pre-expansion check -> expanded check -> generate -> statistics.
//! Validation reports, it never gates generation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::generate::{GenerateError, PageGenerator};
use crate::integrity::{IntegrityChecker, IntegrityReport};
use crate::log::RunLog;
use crate::registry::Registry;
use crate::settings::{Settings, SettingsError};
use crate::statistics::{registry_statistics, GitRevision, RevisionSource, StatisticsSnapshot};
use crate::validation::{validate_settings, ValidationResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub settings: ValidationResult,
    pub pre_expansion: IntegrityReport,
    pub expanded: IntegrityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<StatisticsSnapshot>,
    pub log: RunLog,
}

impl RunReport {
    /// ERROR-level issues were found. The run itself still counts as successful.
    pub fn has_errors(&self) -> bool {
        self.settings.has_errors() || self.pre_expansion.has_errors() || self.expanded.has_errors()
    }
}

/// The run pipeline - validation, generation and statistics over one registry
pub struct Pipeline {
    checker: IntegrityChecker,
    generator: PageGenerator,
    revision: Box<dyn RevisionSource>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            checker: IntegrityChecker::new(),
            generator: PageGenerator::new(),
            revision: Box::new(GitRevision::default()),
        }
    }

    pub fn with_generator(mut self, generator: PageGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_revision(mut self, revision: Box<dyn RevisionSource>) -> Self {
        self.revision = revision;
        self
    }

    /// Runs both integrity passes without generating anything.
    pub fn check(&self, settings: &Value, registry: &Registry) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = tracing::info_span!("check", run_id = %run_id);
        let _enter = span.enter();

        let mut log = RunLog::new();
        let (report, _) = self.check_with_log(run_id, started_at, settings, registry, &mut log)?;
        Ok(RunReport { log, ..report })
    }

    fn check_with_log(
        &self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        settings_json: &Value,
        registry: &Registry,
        log: &mut RunLog,
    ) -> Result<(RunReport, Settings), PipelineError> {
        let settings_result = validate_settings(settings_json, log);
        let (settings, rejected) = Settings::from_value_lenient(settings_json)?;
        for key in rejected {
            log.info(Some("settings.json"), format!("Using the default for \"{}\"", key));
        }

        let pre_expansion = self.checker.check_registry(registry, &settings, log);
        let expanded = self.checker.check_expanded_registry(registry, log);

        let report = RunReport {
            run_id,
            started_at,
            settings: settings_result,
            pre_expansion,
            expanded,
            statistics: None,
            log: RunLog::new(),
        };
        Ok((report, settings))
    }

    /// Full run. Attaches generated pages and statistics to `registry`.
    pub fn run(&self, settings_json: &Value, registry: &mut Registry) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = tracing::info_span!("run", run_id = %run_id);
        let _enter = span.enter();

        let mut log = RunLog::new();
        let (report, settings) = self.check_with_log(run_id, started_at, settings_json, registry, &mut log)?;

        self.generator.generate(&settings, registry, &mut log)?;

        let snapshot = registry_statistics(registry, &log, self.revision.as_ref());
        registry.statistics.snapshot = Some(snapshot.clone());

        tracing::info!(
            documents = snapshot.output_stats.total,
            warnings = snapshot.log.warning,
            errors = snapshot.log.error,
            "run finished"
        );

        Ok(RunReport {
            statistics: Some(snapshot),
            log,
            ..report
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::VersionStats;
    use serde_json::json;

    struct NoRevision;

    impl RevisionSource for NoRevision {
        fn revision(&self) -> VersionStats {
            VersionStats::default()
        }
    }

    fn expanded_registry() -> Registry {
        let mut registry = Registry::new();
        registry.expanded_field = Some(Default::default());
        registry.expanded_model = Some(Default::default());
        registry.expanded_form = Some(Default::default());
        registry
    }

    #[test]
    fn test_started_at_taken_before_checks() {
        let before = Utc::now();
        let report = Pipeline::new().check(&json!({}), &expanded_registry()).unwrap();
        let after = Utc::now();
        assert!(report.started_at >= before && report.started_at <= after);
    }

    #[test]
    fn test_non_object_settings_are_fatal() {
        let mut registry = expanded_registry();
        let result = Pipeline::new()
            .with_revision(Box::new(NoRevision))
            .run(&json!("verbose"), &mut registry);
        assert!(matches!(result, Err(PipelineError::Settings(SettingsError::NotAnObject))));
    }

    #[test]
    fn test_bad_settings_key_falls_back() {
        let mut registry = expanded_registry();
        let report = Pipeline::new()
            .with_revision(Box::new(NoRevision))
            .run(&json!({"verbose": "yes"}), &mut registry)
            .unwrap();
        assert!(report.settings.has_errors());
        assert!(report.log.lines().iter().any(|l| l.contains("Using the default for \"verbose\"")));
        assert!(registry.generated.is_some());
    }
}
