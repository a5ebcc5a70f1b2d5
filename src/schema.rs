//! Built-in Record Schemas
//!
//! JSON schemas the pre-expansion pass validates raw records against.
//! Bookkeeping keys written by the expansion stage start with `$`.

use serde_json::{json, Value};

use crate::registry::RecordKind;

fn bookkeeping_properties() -> Value {
    json!({
        "$extend": {"type": "string", "internal": true},
        "$path": {"type": "string", "internal": true},
        "$filepath": {"type": "string", "internal": true},
        "$referenceCounter": {"type": "integer", "minimum": 0, "internal": true},
        "id": {"type": "string", "description": "Stable identifier of the record"},
        "title": {"type": "string", "description": "Human readable title", "important": true},
        "description": {"type": "string", "description": "Free text description"},
        "todo": {"type": "string", "description": "Open to-do note, reported during generation"}
    })
}

fn with_bookkeeping(specific: Value) -> Value {
    let mut properties = bookkeeping_properties();
    if let (Some(base), Value::Object(extra)) = (properties.as_object_mut(), specific) {
        base.extend(extra);
    }
    properties
}

pub fn field_schema() -> Value {
    json!({
        "type": "object",
        "properties": with_bookkeeping(json!({
            "type": {
                "type": "string",
                "enum": ["string", "number", "integer", "boolean", "array", "object"],
                "description": "Data type of the field",
                "important": true
            },
            "format": {
                "type": "string",
                "description": "Semantic format, maps to the property datatype",
                "example": ["\"format\": \"Page\""]
            },
            "enum": {"type": "array", "description": "Allowed values"},
            "default": {"description": "Default value, must be part of enum if both are given"},
            "items": {"type": "object", "description": "Item definition of an array field"},
            "form": {
                "type": ["string", "array"],
                "description": "Form used to create the referenced page",
                "specific": "semantic"
            },
            "sf_form": {
                "type": "object",
                "description": "Form widget options",
                "specific": "forms",
                "properties": {
                    "input type": {"type": "string", "description": "Widget, e.g. tokens"}
                }
            },
            "smw_property": {"type": "object", "specific": "semantic"}
        }))
    })
}

pub fn model_schema() -> Value {
    json!({
        "type": "object",
        "properties": with_bookkeeping(json!({
            "type": {"type": "string", "enum": ["object"], "important": true},
            "properties": {"type": "object", "description": "Fields and nested models"},
            "items": {"type": "object", "appliesNot": ["model"]},
            "required": {"type": "array", "items": {"type": "string"}},
            "recommended": {"type": "array", "items": {"type": "string"}},
            "smw_subobject": {"type": "boolean", "specific": "semantic"},
            "smw_subobjectExtend": {"type": "object", "specific": "semantic"},
            "smw_category": {"type": ["boolean", "array"], "specific": "semantic"}
        }))
    })
}

pub fn form_schema() -> Value {
    json!({
        "type": "object",
        "properties": with_bookkeeping(json!({
            "type": {"type": "string", "enum": ["object"], "important": true},
            "properties": {"type": "object", "description": "Models contained in the form"},
            "items": {"type": "object", "appliesNot": ["form"]},
            "required": {"type": "array", "items": {"type": "string"}},
            "recommended": {"type": "array", "items": {"type": "string"}},
            "naming": {"type": "string", "description": "Page naming pattern", "specific": "forms"},
            "sf_form": {"type": "object", "specific": "forms"}
        }))
    })
}

pub fn settings_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "allowAdditionalProperties": {"type": "boolean", "default": true},
            "headerTabs": {"type": "boolean", "default": false},
            "uploadOutline": {"type": "boolean", "default": false},
            "outlineTitle": {"type": ["string", "null"]},
            "mwUsername": {"type": "string", "default": ""},
            "displayTodos": {"type": "boolean", "default": true},
            "generatedNotice": {"type": "boolean", "default": false},
            "generatedNoticeText": {"type": "string", "default": ""},
            "verbose": {"type": "boolean", "default": false},
            "buildGraph": {"type": "boolean", "default": false}
        },
        "additionalProperties": true
    })
}

pub fn schema_for(kind: RecordKind) -> Value {
    match kind.base() {
        RecordKind::Model => model_schema(),
        RecordKind::Form => form_schema(),
        _ => field_schema(),
    }
}

/// Schema used by the pre-expansion pass, closed when unknown properties are disallowed.
pub fn record_schema(kind: RecordKind, allow_additional_properties: bool) -> Value {
    let mut schema = schema_for(kind);
    if !allow_additional_properties {
        close_additional_properties(&mut schema);
    }
    schema
}

pub fn close_additional_properties(schema: &mut Value) {
    if let Some(obj) = schema.as_object_mut() {
        obj.insert("additionalProperties".to_string(), Value::Bool(false));
    }
}
