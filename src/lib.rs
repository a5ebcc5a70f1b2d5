//! WikiModel Core - Model-Driven Wiki Generator
//!
//! Takes a fully expanded model registry, checks its referential integrity,
//! renders it into a flat set of wiki documents and derives run statistics.
//!
//! # Guarantees
//! 1. Validation reports, it never gates generation
//! 2. Output is a pure function of the registry
//! 3. Later passes win name collisions, and every overwrite is logged
//! 4. Statistics never fail on a partial registry

pub mod registry;
pub mod settings;
pub mod log;
pub mod schema;
pub mod validation;
pub mod integrity;
pub mod names;
pub mod transform;
pub mod dispatch;
pub mod generate;
pub mod statistics;
pub mod hashing;
pub mod documentation;
pub mod pipeline;

pub use registry::{Collection, GeneratedPages, OutputCategory, OutputStats, Record, RecordKind, Registry};
pub use settings::Settings;
pub use log::{LogEntry, LogLevel, RunLog};
pub use validation::{compile_schema, validate, validate_settings, validate_with, IssueSeverity, ValidationIssue, ValidationResult};
pub use integrity::{IntegrityChecker, IntegrityReport, IntegrityRule};
pub use transform::{OutlineGenerator, TransformError, TransformOutput, Transformer};
pub use dispatch::{dispatch, PageSet};
pub use generate::{GenerateError, PageGenerator};
pub use statistics::{registry_statistics, RevisionSource, StatisticsSnapshot};
pub use hashing::{canonical_json, compute_generated_digest};
pub use pipeline::{Pipeline, PipelineError, RunReport};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
