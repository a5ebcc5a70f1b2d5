//! Transform Dispatch - One Collection into the Page Set
//!
//! Iterates a collection in insertion order, runs the transformer on each
//! record, escapes and prefixes produced names, and counts every page.

use serde::Serialize;

use crate::generate::GenerateError;
use crate::log::{LogLevel, RunLog};
use crate::names::escape_generated_name;
use crate::registry::{Collection, GeneratedPages, OutputCategory, OutputStats, Registry};
use crate::settings::Settings;
use crate::transform::Transformer;

/// How an overwrite of an existing page is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteNotice {
    /// Warning on every overwrite.
    Always,
    /// Warning in verbose mode, silent debug entry otherwise.
    VerboseOnly,
}

/// Output accumulator: final page name -> body, plus per-category counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageSet {
    pages: GeneratedPages,
    stats: OutputStats,
}

impl PageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a page, replacing an existing one in place. Returns `true` on overwrite.
    pub fn insert(
        &mut self,
        name: String,
        body: String,
        category: OutputCategory,
        notice: OverwriteNotice,
        verbose: bool,
        log: &mut RunLog,
    ) -> bool {
        let overwritten = self.pages.contains_key(&name);
        if overwritten {
            let message = format!("Overwriting page {}", name);
            match notice {
                OverwriteNotice::Always => log.warn(None, message),
                OverwriteNotice::VerboseOnly if verbose => log.warn(None, message),
                OverwriteNotice::VerboseOnly => log.log_silent(LogLevel::Debug, None, message),
            }
        }
        self.pages.insert(name, body);
        self.stats.increment(category);
        overwritten
    }

    /// Prepends `text` to every body outside the reserved `MediaWiki` namespace.
    pub fn prepend_notice(&mut self, text: &str) {
        for (name, body) in self.pages.iter_mut() {
            if !name.contains(RESERVED_NAMESPACE) {
                body.insert_str(0, text);
            }
        }
    }

    pub fn pages(&self) -> &GeneratedPages {
        &self.pages
    }

    pub fn stats(&self) -> &OutputStats {
        &self.stats
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.pages.get(name)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn into_parts(self) -> (GeneratedPages, OutputStats) {
        (self.pages, self.stats)
    }
}

pub const RESERVED_NAMESPACE: &str = "MediaWiki";

/// Runs `transformer` over every record of `collection` and merges the result into `pages`.
///
/// Empty records are skipped with a warning. A transformer failure is a
/// contract violation and aborts the dispatch.
pub fn dispatch<'p>(
    settings: &Settings,
    transformer: &dyn Transformer,
    collection: &Collection,
    registry: &Registry,
    pages: &'p mut PageSet,
    log: &mut RunLog,
) -> Result<&'p mut PageSet, GenerateError> {
    for (name, record) in collection {
        if record.is_empty() {
            log.warn(None, format!("File {} is empty, will not be parsed!", name));
            continue;
        }

        if let Some(todo) = record.todo() {
            let label = record.label(name);
            if settings.display_todos {
                log.log(LogLevel::Todo, Some(label), todo);
            } else {
                log.log_silent(LogLevel::Todo, Some(label), todo);
            }
        }

        let output = transformer
            .transform(settings, record, name, registry)
            .map_err(|source| GenerateError::Transform {
                transformer: transformer.name(),
                source,
            })?;

        for (category, produced) in output {
            for (page_name, body) in produced {
                let key = format!("{}:{}", category, escape_generated_name(&page_name));
                pages.insert(
                    key,
                    body,
                    category,
                    OverwriteNotice::VerboseOnly,
                    settings.verbose,
                    log,
                );
            }
        }
    }

    tracing::debug!(
        transformer = transformer.name(),
        records = collection.len(),
        pages = pages.len(),
        "dispatch finished"
    );
    Ok(pages)
}
