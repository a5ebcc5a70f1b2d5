//! Contract Invariant Tests
//!
//! These tests verify the guarantees the pipeline makes about validation,
//! naming, collisions and statistics.

use serde_json::{json, Value};
use std::io::Write;

use wikimodel_core::{
    generate::GenerateError,
    statistics::VersionStats,
    IntegrityChecker, IssueSeverity, LogLevel, PageGenerator, Pipeline, PipelineError, Record,
    RecordKind, Registry, RevisionSource, RunLog, Settings,
};

struct FixedRevision;

impl RevisionSource for FixedRevision {
    fn revision(&self) -> VersionStats {
        VersionStats {
            log_message: "Test revision".to_string(),
            short_hash: "0000000".to_string(),
            timestamp: String::new(),
            committed_at: None,
        }
    }
}

fn create_pipeline() -> Pipeline {
    Pipeline::new().with_revision(Box::new(FixedRevision))
}

fn empty_expanded_registry() -> Registry {
    let mut registry = Registry::new();
    registry.expanded_field = Some(Default::default());
    registry.expanded_model = Some(Default::default());
    registry.expanded_form = Some(Default::default());
    registry
}

/// One field, one model using it, one form using the model.
fn create_person_registry() -> Registry {
    let mut registry = Registry::new();

    registry.register(
        RecordKind::Field,
        "Name",
        json!({"$path": "/field/Name.json", "type": "string"}),
    );
    registry.register(
        RecordKind::Model,
        "Person",
        json!({
            "$path": "/model/Person.json",
            "type": "object",
            "properties": {"Name": {"$extend": "/field/Name"}},
            "required": ["Name"]
        }),
    );
    registry.register(
        RecordKind::Form,
        "PersonForm",
        json!({
            "$path": "/form/PersonForm.json",
            "type": "object",
            "properties": {"Person": {"$extend": "/model/Person"}}
        }),
    );

    let expanded_name = json!({
        "$path": "/field/Name.json",
        "id": "Name",
        "type": "string",
        "$referenceCounter": 1
    });
    let expanded_person = json!({
        "$path": "/model/Person.json",
        "id": "Person",
        "type": "object",
        "properties": {"Name": expanded_name.clone()},
        "required": ["Name"],
        "$referenceCounter": 1
    });
    registry.register(RecordKind::ExpandedField, "Name", expanded_name);
    registry.register(RecordKind::ExpandedModel, "Person", expanded_person.clone());
    registry.register(
        RecordKind::ExpandedForm,
        "PersonForm",
        json!({
            "$path": "/form/PersonForm.json",
            "id": "PersonForm",
            "type": "object",
            "properties": {"Person": expanded_person}
        }),
    );

    registry
}

fn check_one(kind: RecordKind, value: Value) -> Vec<wikimodel_core::ValidationIssue> {
    IntegrityChecker::new().check_record(kind, "Sample", &Record::new(value))
}

fn errors(issues: &[wikimodel_core::ValidationIssue]) -> Vec<&wikimodel_core::ValidationIssue> {
    issues.iter().filter(|i| i.severity == IssueSeverity::Error).collect()
}

#[test]
fn invariant_array_without_items_is_one_error() {
    for kind in [RecordKind::ExpandedField, RecordKind::ExpandedModel, RecordKind::ExpandedForm] {
        let issues = check_one(
            kind,
            json!({"$path": "/x/Tags.json", "type": "array", "$referenceCounter": 2}),
        );
        let found = errors(&issues);
        assert_eq!(found.len(), 1, "{kind}");
        assert_eq!(found[0].path, "/x/Tags.json");
    }

    let tokens = check_one(
        RecordKind::ExpandedField,
        json!({
            "$path": "/field/Tags.json",
            "type": "array",
            "sf_form": {"input type": "tokens"},
            "$referenceCounter": 1
        }),
    );
    let found = errors(&tokens);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].rule, "array_items");

    let with_items = check_one(
        RecordKind::ExpandedField,
        json!({"type": "array", "items": {"type": "string"}, "$referenceCounter": 2}),
    );
    assert!(errors(&with_items).is_empty());
}

#[test]
fn invariant_properties_items_exclusive() {
    let issues = check_one(
        RecordKind::ExpandedModel,
        json!({
            "$path": "/model/Both.json",
            "type": "object",
            "properties": {"a": {}},
            "items": {"type": "string"},
            "$referenceCounter": 1
        }),
    );
    let found = errors(&issues);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].rule, "exclusivity");
}

#[test]
fn invariant_default_must_be_enum_member() {
    let outside = check_one(
        RecordKind::ExpandedField,
        json!({"type": "string", "enum": ["red", "green"], "default": "blue", "$referenceCounter": 1}),
    );
    assert_eq!(errors(&outside).len(), 1);

    let inside = check_one(
        RecordKind::ExpandedField,
        json!({"type": "string", "enum": ["red", "green"], "default": "green", "$referenceCounter": 1}),
    );
    assert!(errors(&inside).is_empty());

    let numeric = check_one(
        RecordKind::ExpandedField,
        json!({"type": "integer", "enum": [1, 2, 3], "default": 0, "$referenceCounter": 1}),
    );
    assert_eq!(errors(&numeric).len(), 1);
}

#[test]
fn invariant_page_name_decoding() {
    let mut registry = empty_expanded_registry();
    registry.page.insert("Foo___Bar---Baz.wikitext".into(), "content".into());
    let mut log = RunLog::new();

    let pages = PageGenerator::new()
        .generate_pages(&Settings::default(), &registry, &mut log)
        .unwrap();
    assert_eq!(pages.get("Foo:Bar/Baz").map(String::as_str), Some("content"));
}

#[test]
fn invariant_later_pass_wins_collision() {
    let mut registry = empty_expanded_registry();
    registry.category.insert("Shared.wikitext".into(), "from category".into());
    registry.page.insert("category___Shared.wikitext".into(), "from page".into());
    let mut log = RunLog::new();

    let pages = PageGenerator::new()
        .generate_pages(&Settings::default(), &registry, &mut log)
        .unwrap();

    assert_eq!(pages.get("category:Shared").map(String::as_str), Some("from page"));
    assert_eq!(log.count(LogLevel::Warning), 1);
    assert!(log.lines()[0].contains("Overwriting page category:Shared"));
}

#[test]
fn invariant_generation_idempotent() {
    let settings = Settings {
        header_tabs: true,
        upload_outline: true,
        mw_username: "Bot".to_string(),
        ..Settings::default()
    };
    let generator = PageGenerator::new();

    let mut first = create_person_registry();
    first.page.insert("Main_Page.wikitext".into(), "Welcome".into());
    let mut second = create_person_registry();
    second.page.insert("Main_Page.wikitext".into(), "Welcome".into());

    generator.generate(&settings, &mut first, &mut RunLog::new()).unwrap();
    generator.generate(&settings, &mut second, &mut RunLog::new()).unwrap();

    let first_pages = serde_json::to_string(&first.generated).unwrap();
    let second_pages = serde_json::to_string(&second.generated).unwrap();
    assert_eq!(first_pages, second_pages);
    assert_eq!(first.statistics.output_stats, second.statistics.output_stats);
}

#[test]
fn invariant_output_total_is_category_sum() {
    let settings = json!({"headerTabs": true, "uploadOutline": true, "mwUsername": "Bot"});
    let mut registry = create_person_registry();
    registry.category.insert("Person.wikitext".into(), "cat".into());
    registry.template.insert("Person.wikitext".into(), "override".into());
    registry.page.insert("Main_Page.wikitext".into(), "Welcome".into());
    registry.query.insert(
        "People".into(),
        Record::new(json!({"query": "[[Category:Person]]", "printouts": ["Name"]})),
    );

    let report = create_pipeline().run(&settings, &mut registry).unwrap();
    let stats = report.statistics.unwrap().output_stats;
    assert_eq!(stats.total, stats.category_sum());
    assert_eq!(stats, registry.statistics.output_stats);
}

#[test]
fn invariant_tree_shaking_warnings() {
    let unused = check_one(
        RecordKind::ExpandedModel,
        json!({"$path": "/model/Orphan.json", "type": "object", "properties": {}, "$referenceCounter": 0}),
    );
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].severity, IssueSeverity::Warning);
    assert!(unused[0].message.contains("never used"));

    let used = check_one(
        RecordKind::ExpandedModel,
        json!({"type": "object", "properties": {}, "$referenceCounter": 1}),
    );
    assert!(used.is_empty());

    for counter in [0, 5] {
        let form = check_one(
            RecordKind::ExpandedForm,
            json!({"type": "object", "properties": {}, "$referenceCounter": counter}),
        );
        assert!(form.is_empty());
    }
}

#[test]
fn invariant_end_to_end_person() {
    let mut registry = create_person_registry();
    let report = create_pipeline().run(&json!({}), &mut registry).unwrap();

    assert!(!report.has_errors());
    assert_eq!(report.log.count(LogLevel::Error), 0);
    assert!(!report.log.lines().iter().any(|l| l.contains("never used")));

    let generated = registry.generated.as_ref().unwrap();
    assert!(generated.contains_key("property:Name"));
    assert!(generated.contains_key("template:Person"));
    assert!(generated.contains_key("form:PersonForm"));
    assert!(generated["form:PersonForm"].contains("{{{field|Name|mandatory}}}"));

    let statistics = registry.statistics.snapshot.as_ref().unwrap();
    assert_eq!(statistics.input_stats.total, 3);
    assert_eq!(statistics.output_stats.total, generated.len() as u64);
    assert_eq!(statistics.log.error, 0);
    assert_eq!(statistics.version.short_hash, "0000000");
}

#[test]
fn invariant_warnings_do_not_fail_run() {
    let mut registry = create_person_registry();
    registry.register(
        RecordKind::ExpandedModel,
        "Orphan",
        json!({"$path": "/model/Orphan.json", "type": "object", "properties": {}}),
    );

    let report = create_pipeline().run(&json!({}), &mut registry).unwrap();
    assert!(!report.has_errors());
    assert_eq!(report.statistics.unwrap().log.warning, 1);
    assert!(registry.generated.unwrap().contains_key("template:Orphan"));
}

#[test]
fn invariant_errors_still_generate() {
    let mut registry = create_person_registry();
    registry.register(
        RecordKind::ExpandedField,
        "Color",
        json!({
            "$path": "/field/Color.json",
            "type": "string",
            "enum": ["red"],
            "default": "blue",
            "$referenceCounter": 1
        }),
    );

    let report = create_pipeline().run(&json!({}), &mut registry).unwrap();
    assert!(report.has_errors());
    assert!(registry.generated.unwrap().contains_key("property:Color"));
}

#[test]
fn invariant_malformed_settings_still_generate() {
    let mut registry = create_person_registry();
    let report = create_pipeline()
        .run(&json!({"verbose": "yes", "headerTabs": true}), &mut registry)
        .unwrap();

    assert!(report.settings.has_errors());
    assert!(report.has_errors());
    let generated = registry.generated.unwrap();
    assert!(generated.contains_key("template:Person"));
    assert!(generated.contains_key("template:HeaderTabs"));
}

#[test]
fn invariant_missing_collection_is_fatal() {
    let mut registry = create_person_registry();
    registry.expanded_form = None;

    let result = create_pipeline().run(&json!({}), &mut registry);
    assert!(matches!(
        result,
        Err(PipelineError::Generate(GenerateError::MissingCollection("expandedForm")))
    ));
    assert!(registry.generated.is_none());
}

#[test]
fn invariant_closed_schema_warns_on_unknown_property() {
    let mut registry = create_person_registry();
    registry.register(
        RecordKind::Field,
        "Name",
        json!({"$path": "/field/Name.json", "type": "string", "colour": "red"}),
    );

    let open = create_pipeline().check(&json!({}), &registry).unwrap();
    assert_eq!(open.pre_expansion.count(IssueSeverity::Warning), 0);

    let closed = create_pipeline()
        .check(&json!({"allowAdditionalProperties": false}), &registry)
        .unwrap();
    assert_eq!(closed.pre_expansion.count(IssueSeverity::Warning), 1);
    assert!(!closed.pre_expansion.has_errors());
}

#[test]
fn invariant_registry_snapshot_from_disk() {
    let registry = create_person_registry();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(serde_json::to_string(&registry).unwrap().as_bytes())
        .unwrap();

    let loaded = Registry::load_from_file(file.path()).unwrap();
    assert_eq!(loaded, registry);
    let keys: Vec<_> = loaded.expanded_form.unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["PersonForm"]);
}
