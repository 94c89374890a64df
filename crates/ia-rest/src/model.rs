//! Object model types returned by the model endpoint.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of envelope and metadata keys. Never part of a schema or a row.
pub const RESERVED_PREFIX: &str = "ia::";

/// Model endpoint path.
pub const MODEL_PATH: &str = "/services/core/model";

/// Returns true for `ia::` envelope keys.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Declared role of an object in the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ObjectRole {
    RootObject,
    OwnedObject,
    Object,
    Other(String),
}

impl From<String> for ObjectRole {
    fn from(value: String) -> Self {
        match value.as_str() {
            "rootObject" => ObjectRole::RootObject,
            "ownedObject" => ObjectRole::OwnedObject,
            "object" => ObjectRole::Object,
            _ => ObjectRole::Other(value),
        }
    }
}

impl Default for ObjectRole {
    fn default() -> Self {
        ObjectRole::Other(String::new())
    }
}

/// HTTP capabilities, sent either as `"GET,POST"` or `["GET", "POST"]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum HttpMethods {
    List(Vec<String>),
    Text(String),
}

fn deserialize_http_methods<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let methods = Option::<HttpMethods>::deserialize(deserializer)?;
    Ok(match methods {
        Some(HttpMethods::List(list)) => list,
        Some(HttpMethods::Text(text)) => text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    })
}

/// One entry of the object model listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDescriptor {
    #[serde(default)]
    pub api_object: String,
    #[serde(rename = "type", default)]
    pub role: ObjectRole,
    #[serde(default, deserialize_with = "deserialize_http_methods")]
    pub http_methods: Vec<String>,
}

impl ObjectDescriptor {
    /// Readable entity: a root, owned or plain object that supports GET.
    pub fn is_extractable(&self) -> bool {
        let role_ok = matches!(
            self.role,
            ObjectRole::RootObject | ObjectRole::OwnedObject | ObjectRole::Object
        );
        let readable = self
            .http_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case("GET"));

        !self.api_object.is_empty() && role_ok && readable
    }
}

/// A field and its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: String,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
        }
    }
}

/// Type assumed when the model says nothing.
pub const DEFAULT_FIELD_TYPE: &str = "string";

/// Parse the object listing, keeping only extractable objects.
pub(crate) fn parse_object_list(body: &Value) -> Vec<ObjectDescriptor> {
    let Some(items) = body.get("ia::result").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| ObjectDescriptor::deserialize(item).ok())
        .filter(ObjectDescriptor::is_extractable)
        .collect()
}

/// Parse a per-object schema response into its fields.
///
/// Top-level fields come first, then each group's fields in order. Reserved
/// names are dropped and a name seen twice keeps its first declaration.
pub(crate) fn parse_object_fields(body: &Value) -> Vec<FieldDescriptor> {
    let result = match body.get("ia::result") {
        Some(Value::Array(items)) => items.first(),
        Some(value @ Value::Object(_)) => Some(value),
        _ => None,
    };
    let Some(result) = result else {
        return Vec::new();
    };

    let top_level = result.get("fields").and_then(Value::as_object).into_iter();
    let grouped = result
        .get("groups")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|groups| groups.values())
        .filter_map(|group| group.get("fields").and_then(Value::as_object));

    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for map in top_level.chain(grouped) {
        for (name, info) in map {
            if is_reserved(name) || !seen.insert(name.clone()) {
                continue;
            }
            let field_type = info
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_FIELD_TYPE);
            fields.push(FieldDescriptor::new(name, field_type));
        }
    }

    fields
}
