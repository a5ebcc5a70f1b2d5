//! Schema Documentation
//!
//! Renders the `properties` of a JSON schema as an HTML table. Nested
//! object properties become nested tables, down to `MAX_TABLE_DEPTH`.

use serde_json::Value;

pub const MAX_TABLE_DEPTH: usize = 4;

/// Column value for properties that do not declare `specific`.
const DEFAULT_SPECIFIC: &str = "domain";

pub fn schema_to_table(schema: &Value, record_type: Option<&str>) -> String {
    render_table(schema, record_type, 0)
}

fn flag(property: &Value, key: &str) -> bool {
    property.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string_or_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => vec![],
    }
}

fn render_table(schema: &Value, record_type: Option<&str>, depth: usize) -> String {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return String::new();
    };
    if depth > MAX_TABLE_DEPTH {
        return String::new();
    }

    let mut order: Vec<&String> = properties.keys().collect();
    order.sort();
    let specific_column = properties.values().any(|p| p.get("specific").is_some());

    let mut html = String::from(
        "<table class=\"schema-table\" style=\"font-size: 0.75em;\">\n   <thead>\n       <tr>\n",
    );
    html.push_str("           <th>ID</th>\n");
    html.push_str("           <th>Description</th>\n");
    html.push_str("       </tr>\n   </thead>\n   <tbody>\n");

    for name in order {
        let property = &properties[name.as_str()];

        if name == "additionalProperties" || flag(property, "internal") {
            continue;
        }
        if let Some(record_type) = record_type {
            if string_or_list(property.get("appliesNot")).iter().any(|t| t == record_type) {
                continue;
            }
        }

        let mut id = name.clone();
        if flag(property, "important") {
            id = format!("<strong>{}</strong>", id);
        }
        if flag(property, "unsupported") {
            id = format!("<i class=\"fade\">{}</i>", id);
        }

        let mut types = string_or_list(property.get("type"));
        types.sort();
        let type_html: String = types
            .iter()
            .map(|t| format!("<span class=\"schema-type schema-type-{}\">{}</span>", t, t))
            .collect();

        let mut description = String::new();
        if let Some(text) = property.get("description").and_then(Value::as_str) {
            description.push_str(&format!("<p class=\"schema-description\">{}</p>", text));
        }
        if !type_html.is_empty() {
            description.push_str(&format!(
                "<p class=\"schema-types\"><strong>Type(s)</strong>: {}</p>",
                type_html
            ));
        }
        if specific_column {
            let specific = property
                .get("specific")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_SPECIFIC);
            description.push_str(&format!(
                "<p class=\"schema-specifics\"><strong>Specific to</strong>: <span class=\"schema-specific schema-specific-{}\">{}</span></p>",
                specific, specific
            ));
        }
        if let Some(default) = property.get("default").filter(|d| !d.is_null()) {
            let shown = serde_json::to_string_pretty(default).unwrap_or_default();
            description.push_str(&format!(
                "<p class=\"schema-default\"><strong>Default</strong>: {}</p>",
                shown
            ));
        }
        if let Some(link) = property.get("link").and_then(Value::as_str) {
            description.push_str(&format!(
                "<p class=\"schema-link\"><strong>External Link</strong>: <a href=\"{}\" target=\"_blank\">Documentation</a></p>",
                link
            ));
        }
        let allowed = string_or_list(property.get("enum"));
        if !allowed.is_empty() {
            description.push_str(&format!(
                "<p class=\"schema-enum\"><strong>Valid entries</strong>: {}</p>",
                allowed.join(", ")
            ));
        }
        if flag(property, "unsupported") {
            description.push_str(
                "<p class=\"schema-unsupported\"><strong>Unsupported</strong>: This property is currently unsupported by the end-system.</p>",
            );
        }
        for example in string_or_list(property.get("example")) {
            description.push_str("<p class=\"schema-example-header\"><strong>Example</strong>:</p>");
            description.push_str(&format!(
                "<pre class=\"schema-example\"><code>{}</code></pre>",
                example
            ));
        }
        if property.get("properties").is_some() {
            let nested = render_table(property, None, depth + 1);
            if !nested.is_empty() {
                description.push_str("<p class=\"schema-subobject-header\"><strong>Contains</strong>:</p>");
                description.push_str(&nested);
            }
        }

        html.push_str("       <tr>\n");
        html.push_str(&format!("           <td class=\"schema-propertyId\">{}</td>\n", id));
        html.push_str(&format!("           <td class=\"schema-description\">{}</td>\n", description));
        html.push_str("       </tr>\n");
    }

    html.push_str("   </tbody>\n</table>\n");
    html
}
