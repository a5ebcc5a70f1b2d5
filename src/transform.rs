//! Transformers - Record to Wikitext
//!
//! A transformer turns one record into pages grouped by output category.
//! Page names returned here are raw; escaping and prefixing is the
//! dispatcher's job.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::registry::{OutputCategory, Record, Registry};
use crate::settings::Settings;

/// Output category -> page name -> body.
pub type TransformOutput = IndexMap<OutputCategory, IndexMap<String, String>>;

/// Nesting limit for walking attribute trees (outline, nested models).
pub const MAX_NESTING_DEPTH: usize = 8;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("{transformer} could not transform \"{name}\": {reason}")]
    Failed {
        transformer: &'static str,
        name: String,
        reason: String,
    },
}

pub trait Transformer {
    fn name(&self) -> &'static str;

    fn transform(
        &self,
        settings: &Settings,
        record: &Record,
        name: &str,
        registry: &Registry,
    ) -> Result<TransformOutput, TransformError>;
}

/// Produces the body of the optional outline page.
pub trait OutlineGenerator {
    fn generate(&self, settings: &Settings, registry: &Registry) -> Result<String, TransformError>;
}

pub fn single_page(category: OutputCategory, name: &str, body: String) -> TransformOutput {
    let mut pages = IndexMap::new();
    pages.insert(name.to_string(), body);
    let mut output = TransformOutput::new();
    output.insert(category, pages);
    output
}

fn properties_of(record: &Value) -> Option<&Map<String, Value>> {
    record.get("properties").and_then(Value::as_object)
}

fn string_list(record: &Value, key: &str) -> Vec<String> {
    record
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// Display name of a nested definition: its id, falling back to the key.
fn definition_name<'a>(key: &'a str, definition: &'a Value) -> &'a str {
    definition.get("id").and_then(Value::as_str).unwrap_or(key)
}

// --- Field ---

pub struct FieldTransformer;

impl FieldTransformer {
    fn datatype(record: &Record) -> String {
        if let Some(format) = record.get_str("format") {
            return format.to_string();
        }
        let items_format = record
            .get("items")
            .and_then(|items| items.get("format"))
            .and_then(Value::as_str);
        match (record.get_str("type"), items_format) {
            (Some("array"), Some(format)) => format.to_string(),
            (Some("number"), _) | (Some("integer"), _) => "Number".to_string(),
            (Some("boolean"), _) => "Boolean".to_string(),
            _ => "Text".to_string(),
        }
    }
}

impl Transformer for FieldTransformer {
    fn name(&self) -> &'static str { "field" }

    fn transform(
        &self,
        _settings: &Settings,
        record: &Record,
        name: &str,
        _registry: &Registry,
    ) -> Result<TransformOutput, TransformError> {
        let mut body = format!(
            "This is a property of type [[Has type::{}]].\n",
            Self::datatype(record)
        );

        if let Some(title) = record.get_str("title") {
            body.push_str(&format!("[[Has title::{}]]\n", title));
        }
        if let Some(description) = record.get_str("description") {
            body.push_str(&format!("[[Has description::{}]]\n", description));
        }
        if let Some(allowed) = record.get("enum").and_then(Value::as_array) {
            for value in allowed {
                let shown = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                body.push_str(&format!("* [[Allows value::{}]]\n", shown));
            }
        }

        Ok(single_page(OutputCategory::Property, name, body))
    }
}

// --- Model ---

pub struct ModelTransformer;

impl Transformer for ModelTransformer {
    fn name(&self) -> &'static str { "model" }

    fn transform(
        &self,
        _settings: &Settings,
        record: &Record,
        name: &str,
        _registry: &Registry,
    ) -> Result<TransformOutput, TransformError> {
        let empty = Map::new();
        let properties = properties_of(record.value()).unwrap_or(&empty);

        let store = if record.get("smw_subobject").and_then(Value::as_bool) == Some(true) {
            "#subobject:-"
        } else {
            "#set:"
        };

        let mut body = format!(
            "<noinclude>Template of the model [[{}]].</noinclude><includeonly>\n{{{{{}\n",
            name, store
        );
        for (key, definition) in properties {
            let property = definition_name(key, definition);
            body.push_str(&format!("|{}={{{{{{{}|}}}}}}\n", property, key));
        }
        body.push_str("}}\n");
        body.push_str(&format!("[[Category:{}]]\n</includeonly>", name));

        let mut output = single_page(OutputCategory::Template, name, body);
        output.entry(OutputCategory::Category).or_default().insert(
            name.to_string(),
            format!("Instances of the model [[template:{}|{}]].", name, name),
        );
        Ok(output)
    }
}

// --- Form ---

pub struct FormTransformer;

impl Transformer for FormTransformer {
    fn name(&self) -> &'static str { "form" }

    fn transform(
        &self,
        _settings: &Settings,
        record: &Record,
        name: &str,
        _registry: &Registry,
    ) -> Result<TransformOutput, TransformError> {
        let empty = Map::new();
        let models = properties_of(record.value()).unwrap_or(&empty);

        let mut body = format!(
            "<noinclude>{{{{#forminput:form={}}}}}</noinclude><includeonly>\n",
            name
        );
        if let Some(naming) = record.get_str("naming") {
            body.push_str(&format!("{{{{{{info|page name={}}}}}}}\n", naming));
        }

        for (key, model) in models {
            let template = definition_name(key, model);
            let required = string_list(model, "required");
            body.push_str(&format!("{{{{{{for template|{}}}}}}}\n{{| class=\"formtable\"\n", template));
            if let Some(fields) = properties_of(model) {
                for field in fields.keys() {
                    let mandatory = if required.iter().any(|r| r == field) { "|mandatory" } else { "" };
                    body.push_str(&format!("! {}:\n| {{{{{{field|{}{}}}}}}}\n|-\n", field, field, mandatory));
                }
            }
            body.push_str("|}\n{{{end template}}}\n");
        }
        body.push_str("{{{standard input|save}}}\n</includeonly>");

        Ok(single_page(OutputCategory::Form, name, body))
    }
}

// --- Query ---

pub struct QueryTransformer;

impl Transformer for QueryTransformer {
    fn name(&self) -> &'static str { "query" }

    fn transform(
        &self,
        _settings: &Settings,
        record: &Record,
        name: &str,
        _registry: &Registry,
    ) -> Result<TransformOutput, TransformError> {
        let query = record.get_str("query").ok_or_else(|| TransformError::Failed {
            transformer: self.name(),
            name: name.to_string(),
            reason: "query has no \"query\" condition".to_string(),
        })?;

        let mut body = format!("{{{{#ask: {}\n", query);
        for printout in string_list(record.value(), "printouts") {
            body.push_str(&format!("|?{}\n", printout));
        }
        body.push_str("}}");

        Ok(single_page(OutputCategory::Template, name, body))
    }
}

// --- Outline ---

/// Bulleted tree of forms, their models and fields.
pub struct DefaultOutline;

impl DefaultOutline {
    fn walk(properties: &Map<String, Value>, depth: usize, out: &mut String) {
        if depth > MAX_NESTING_DEPTH {
            return;
        }
        let bullets = "*".repeat(depth);
        for (key, definition) in properties {
            let name = definition_name(key, definition);
            match properties_of(definition) {
                Some(nested) => {
                    out.push_str(&format!("{} [[template:{}|{}]]\n", bullets, name, name));
                    Self::walk(nested, depth + 1, out);
                }
                None => out.push_str(&format!("{} [[property:{}|{}]]\n", bullets, name, name)),
            }
        }
    }
}

impl OutlineGenerator for DefaultOutline {
    fn generate(&self, _settings: &Settings, registry: &Registry) -> Result<String, TransformError> {
        let mut out = String::from("== Model Outline ==\n");
        for (name, form) in registry.expanded_form.iter().flatten() {
            out.push_str(&format!("* [[form:{}|{}]]\n", name, name));
            if let Some(models) = properties_of(form.value()) {
                Self::walk(models, 2, &mut out);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(transformer: &dyn Transformer, name: &str, value: Value) -> TransformOutput {
        transformer
            .transform(&Settings::default(), &Record::new(value), name, &Registry::new())
            .unwrap()
    }

    #[test]
    fn test_field_property_page() {
        let output = run(
            &FieldTransformer,
            "Status",
            json!({"type": "string", "enum": ["open", "closed"]}),
        );
        let body = &output[&OutputCategory::Property]["Status"];
        assert!(body.contains("[[Has type::Text]]"));
        assert!(body.contains("[[Allows value::closed]]"));
    }

    #[test]
    fn test_model_template_sets_each_property() {
        let output = run(
            &ModelTransformer,
            "Person",
            json!({"type": "object", "properties": {"Name": {"type": "string"}}}),
        );
        let body = &output[&OutputCategory::Template]["Person"];
        assert!(body.contains("{{#set:"));
        assert!(body.contains("|Name={{{Name|}}}"));
        assert!(body.contains("[[Category:Person]]"));
        assert!(output[&OutputCategory::Category].contains_key("Person"));
    }

    #[test]
    fn test_model_without_properties_still_renders() {
        let output = run(&ModelTransformer, "Empty", json!({"type": "object"}));
        assert!(output[&OutputCategory::Template]["Empty"].contains("[[Category:Empty]]"));
    }

    #[test]
    fn test_query_without_condition_fails() {
        let result = QueryTransformer.transform(
            &Settings::default(),
            &Record::new(json!({"printouts": ["Name"]})),
            "Broken",
            &Registry::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_form_marks_required_fields() {
        let output = run(
            &FormTransformer,
            "PersonForm",
            json!({
                "properties": {
                    "person": {"id": "Person", "properties": {"Name": {}}, "required": ["Name"]}
                }
            }),
        );
        let body = &output[&OutputCategory::Form]["PersonForm"];
        assert!(body.contains("{{{for template|Person}}}"));
        assert!(body.contains("{{{field|Name|mandatory}}}"));
    }

    #[test]
    fn test_query_template() {
        let output = run(
            &QueryTransformer,
            "People",
            json!({"query": "[[Category:Person]]", "printouts": ["Name"]}),
        );
        assert_eq!(
            output[&OutputCategory::Template]["People"],
            "{{#ask: [[Category:Person]]\n|?Name\n}}"
        );
    }

    #[test]
    fn test_outline_depth_is_bounded() {
        let mut nested = json!({"type": "string"});
        for level in 0..(MAX_NESTING_DEPTH + 4) {
            nested = json!({"properties": {format!("L{}", level): nested}});
        }
        let mut registry = Registry::new();
        registry.expanded_form = Some(
            [("Deep".to_string(), Record::new(nested))].into_iter().collect(),
        );

        let outline = DefaultOutline.generate(&Settings::default(), &registry).unwrap();
        let deepest = outline.lines().map(|l| l.chars().take_while(|c| *c == '*').count()).max();
        assert_eq!(deepest, Some(MAX_NESTING_DEPTH));
    }
}
