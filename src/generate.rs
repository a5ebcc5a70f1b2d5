//! Page Generation - Fixed-Order Passes into One Namespace
//!
//! Passes run in a fixed order and later passes win name collisions:
//! fields, models, forms, queries, helper pages, categories, templates,
//! pages. The optional notice is applied last.

use thiserror::Error;

use crate::dispatch::{dispatch, OverwriteNotice, PageSet};
use crate::log::RunLog;
use crate::names::{category_page_name, decode_page_name, template_page_name};
use crate::registry::{Collection, OutputCategory, Registry, WikitextCollection};
use crate::settings::Settings;
use crate::transform::{
    DefaultOutline, FieldTransformer, FormTransformer, ModelTransformer, OutlineGenerator,
    QueryTransformer, TransformError, Transformer,
};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Registry is missing the \"{0}\" collection")]
    MissingCollection(&'static str),

    #[error("Transformer \"{transformer}\" failed: {source}")]
    Transform {
        transformer: &'static str,
        source: TransformError,
    },

    #[error("Outline generation failed: {0}")]
    Outline(#[source] TransformError),
}

pub const HEADER_TABS_PAGE: &str = "template:HeaderTabs";
pub const HEADER_TABS_BODY: &str = "<headertabs />";

/// Helper properties that make subobject queries simpler.
pub const HELPER_PROPERTIES: [&str; 2] = ["property:subobject", "property:superobject"];
pub const HELPER_PROPERTY_BODY: &str = "This is an attribute of the datatype [[Has type::Page]]";

pub struct PageGenerator {
    field: Box<dyn Transformer>,
    model: Box<dyn Transformer>,
    form: Box<dyn Transformer>,
    query: Box<dyn Transformer>,
    outline: Box<dyn OutlineGenerator>,
}

impl PageGenerator {
    pub fn new() -> Self {
        Self {
            field: Box::new(FieldTransformer),
            model: Box::new(ModelTransformer),
            form: Box::new(FormTransformer),
            query: Box::new(QueryTransformer),
            outline: Box::new(DefaultOutline),
        }
    }

    pub fn with_transformers(
        field: Box<dyn Transformer>,
        model: Box<dyn Transformer>,
        form: Box<dyn Transformer>,
        query: Box<dyn Transformer>,
    ) -> Self {
        Self {
            field,
            model,
            form,
            query,
            outline: Box::new(DefaultOutline),
        }
    }

    pub fn with_outline(mut self, outline: Box<dyn OutlineGenerator>) -> Self {
        self.outline = outline;
        self
    }

    /// Builds the full page set without touching the registry.
    pub fn generate_pages(
        &self,
        settings: &Settings,
        registry: &Registry,
        log: &mut RunLog,
    ) -> Result<PageSet, GenerateError> {
        let fields = expanded(registry.expanded_field.as_ref(), "expandedField")?;
        let models = expanded(registry.expanded_model.as_ref(), "expandedModel")?;
        let forms = expanded(registry.expanded_form.as_ref(), "expandedForm")?;

        let mut pages = PageSet::new();

        dispatch(settings, self.field.as_ref(), fields, registry, &mut pages, log)?;
        dispatch(settings, self.model.as_ref(), models, registry, &mut pages, log)?;
        dispatch(settings, self.form.as_ref(), forms, registry, &mut pages, log)?;
        dispatch(settings, self.query.as_ref(), &registry.query, registry, &mut pages, log)?;

        self.insert_helper_pages(settings, registry, &mut pages, log)?;

        insert_authored(
            &mut pages,
            &registry.category,
            category_page_name,
            OutputCategory::Category,
            OverwriteNotice::VerboseOnly,
            settings,
            log,
        );
        insert_authored(
            &mut pages,
            &registry.template,
            template_page_name,
            OutputCategory::Template,
            OverwriteNotice::VerboseOnly,
            settings,
            log,
        );
        // Site pages override generated content.
        insert_authored(
            &mut pages,
            &registry.page,
            decode_page_name,
            OutputCategory::Page,
            OverwriteNotice::Always,
            settings,
            log,
        );

        if settings.generated_notice {
            pages.prepend_notice(&settings.generated_notice_text);
        }

        tracing::info!(
            pages = pages.len(),
            total = pages.stats().total,
            "page generation finished"
        );
        Ok(pages)
    }

    /// Generates all pages and attaches them and their counters to the registry.
    pub fn generate(
        &self,
        settings: &Settings,
        registry: &mut Registry,
        log: &mut RunLog,
    ) -> Result<(), GenerateError> {
        let pages = self.generate_pages(settings, registry, log)?;
        let (generated, stats) = pages.into_parts();
        registry.statistics.output_stats = stats;
        registry.generated = Some(generated);
        Ok(())
    }

    fn insert_helper_pages(
        &self,
        settings: &Settings,
        registry: &Registry,
        pages: &mut PageSet,
        log: &mut RunLog,
    ) -> Result<(), GenerateError> {
        if settings.header_tabs {
            pages.insert(
                HEADER_TABS_PAGE.to_string(),
                HEADER_TABS_BODY.to_string(),
                OutputCategory::Template,
                OverwriteNotice::VerboseOnly,
                settings.verbose,
                log,
            );
        }

        for name in HELPER_PROPERTIES {
            pages.insert(
                name.to_string(),
                HELPER_PROPERTY_BODY.to_string(),
                OutputCategory::Property,
                OverwriteNotice::VerboseOnly,
                settings.verbose,
                log,
            );
        }

        if settings.upload_outline {
            let body = self
                .outline
                .generate(settings, registry)
                .map_err(GenerateError::Outline)?;
            pages.insert(
                settings.outline_page_title(),
                body,
                OutputCategory::Page,
                OverwriteNotice::VerboseOnly,
                settings.verbose,
                log,
            );
        }

        Ok(())
    }
}

impl Default for PageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies pre-authored wikitext into `pages`; empty bodies are skipped with a warning.
fn insert_authored(
    pages: &mut PageSet,
    sources: &WikitextCollection,
    page_name: fn(&str) -> String,
    category: OutputCategory,
    notice: OverwriteNotice,
    settings: &Settings,
    log: &mut RunLog,
) {
    for (name, body) in sources {
        if body.is_empty() {
            log.warn(None, format!("File {} is empty, will not be parsed!", name));
            continue;
        }
        pages.insert(page_name(name), body.clone(), category, notice, settings.verbose, log);
    }
}

fn expanded<'a>(collection: Option<&'a Collection>, name: &'static str) -> Result<&'a Collection, GenerateError> {
    collection.ok_or(GenerateError::MissingCollection(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogLevel;
    use crate::registry::RecordKind;
    use serde_json::json;

    fn minimal_registry() -> Registry {
        let mut registry = Registry::new();
        registry.expanded_field = Some(Collection::new());
        registry.expanded_model = Some(Collection::new());
        registry.expanded_form = Some(Collection::new());
        registry
    }

    #[test]
    fn test_missing_expanded_collection_is_fatal() {
        let mut registry = minimal_registry();
        registry.expanded_model = None;
        let mut log = RunLog::new();

        let result = PageGenerator::new().generate(&Settings::default(), &mut registry, &mut log);
        assert!(matches!(result, Err(GenerateError::MissingCollection("expandedModel"))));
        assert!(registry.generated.is_none());
    }

    #[test]
    fn test_helper_pages_always_present() {
        let mut log = RunLog::new();
        let pages = PageGenerator::new()
            .generate_pages(&Settings::default(), &minimal_registry(), &mut log)
            .unwrap();

        assert_eq!(pages.len(), 2);
        assert!(pages.get("property:subobject").is_some());
        assert!(pages.get("property:superobject").is_some());
        assert!(pages.get(HEADER_TABS_PAGE).is_none());
        assert_eq!(pages.stats().property, 2);
    }

    #[test]
    fn test_flagged_helper_pages() {
        let settings = Settings {
            header_tabs: true,
            upload_outline: true,
            mw_username: "Bot".to_string(),
            ..Settings::default()
        };
        let mut registry = minimal_registry();
        registry.register(RecordKind::ExpandedForm, "PersonForm", json!({"properties": {}}));
        let mut log = RunLog::new();

        let pages = PageGenerator::new().generate_pages(&settings, &registry, &mut log).unwrap();
        assert_eq!(pages.get(HEADER_TABS_PAGE).map(String::as_str), Some(HEADER_TABS_BODY));
        let outline = pages.get("User:Bot/outline").unwrap();
        assert!(outline.contains("[[form:PersonForm|PersonForm]]"));
    }

    #[test]
    fn test_pre_authored_names_decoded() {
        let mut registry = minimal_registry();
        registry.category.insert("Person---Archive.wikitext".into(), "cat".into());
        registry.template.insert("Infobox.wikitext".into(), "tpl".into());
        registry.page.insert("Help___Editing---Forms.wikitext".into(), "help".into());
        let mut log = RunLog::new();

        let pages = PageGenerator::new()
            .generate_pages(&Settings::default(), &registry, &mut log)
            .unwrap();
        assert_eq!(pages.get("category:Person/Archive").map(String::as_str), Some("cat"));
        assert_eq!(pages.get("template:Infobox").map(String::as_str), Some("tpl"));
        assert_eq!(pages.get("Help:Editing/Forms").map(String::as_str), Some("help"));
    }

    #[test]
    fn test_template_overwrite_visible_only_when_verbose() {
        let mut registry = minimal_registry();
        registry.template.insert("HeaderTabs.wikitext".into(), "custom".into());
        let mut log = RunLog::new();
        let quiet = Settings { header_tabs: true, ..Settings::default() };

        let pages = PageGenerator::new().generate_pages(&quiet, &registry, &mut log).unwrap();
        assert_eq!(pages.get(HEADER_TABS_PAGE).map(String::as_str), Some("custom"));
        assert_eq!(log.count(LogLevel::Warning), 0);

        let mut log = RunLog::new();
        let verbose = Settings { verbose: true, ..quiet };
        PageGenerator::new().generate_pages(&verbose, &registry, &mut log).unwrap();
        assert_eq!(log.count(LogLevel::Warning), 1);
    }

    #[test]
    fn test_generated_notice_prepended() {
        let mut registry = minimal_registry();
        registry.page.insert("MediaWiki___Sidebar.wikitext".into(), "nav".into());
        let settings = Settings {
            generated_notice: true,
            generated_notice_text: "<!-- generated -->\n".to_string(),
            ..Settings::default()
        };
        let mut log = RunLog::new();

        let pages = PageGenerator::new().generate_pages(&settings, &registry, &mut log).unwrap();
        assert_eq!(pages.get("MediaWiki:Sidebar").map(String::as_str), Some("nav"));
        assert!(pages.get("property:subobject").unwrap().starts_with("<!-- generated -->\n"));
    }

    #[test]
    fn test_empty_authored_bodies_skipped() {
        let mut registry = minimal_registry();
        registry.page.insert("Empty.wikitext".into(), String::new());
        registry.category.insert("Blank.wikitext".into(), String::new());
        registry.template.insert("Infobox.wikitext".into(), "tpl".into());
        let mut log = RunLog::new();

        let pages = PageGenerator::new()
            .generate_pages(&Settings::default(), &registry, &mut log)
            .unwrap();
        assert!(pages.get("Empty").is_none());
        assert!(pages.get("category:Blank").is_none());
        assert_eq!(pages.stats().page, 0);
        assert_eq!(pages.stats().category, 0);
        assert_eq!(pages.stats().template, 1);
        assert_eq!(log.count(LogLevel::Warning), 2);
        assert!(log.lines().iter().any(|l| l.contains("File Empty.wikitext is empty")));
    }
}
