//! Query endpoint request and result envelope.
//!
//! Request: `{object, start, size, fields?, filters?, filterExpression?}`.
//! Response: `{"ia::result": [...] | {"ia::error": {...}}, "ia::meta": {"next": ...}}`.

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::extract::Record;

/// Query endpoint path.
pub const QUERY_PATH: &str = "/services/core/query";

/// Position of the first record.
pub const INITIAL_START: u64 = 1;

/// Body of a query request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub object: String,
    /// Pagination cursor: the initial position, then whatever `ia::meta.next` returned.
    pub start: Value,
    pub size: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
}

impl QueryRequest {
    pub fn new(object: impl Into<String>, size: u32) -> Self {
        Self {
            object: object.into(),
            start: Value::from(INITIAL_START),
            size,
            fields: Vec::new(),
            filters: None,
            filter_expression: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    /// Restrict to records where `field >= value`.
    pub fn with_gte_filter(mut self, field: &str, value: &str) -> Self {
        let mut condition = serde_json::Map::new();
        condition.insert(field.to_string(), Value::from(value));
        self.filters = Some(vec![serde_json::json!({ "$gte": condition })]);
        self.filter_expression = Some("1".to_string());
        self
    }
}

/// A page of records and the cursor for the next one.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub records: Vec<Record>,
    pub next: Option<Value>,
}

/// What a query response envelope carried.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Page(QueryPage),
    Error(EmbeddedError),
}

/// Error reported inside a 2xx query response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedError {
    pub code: String,
    pub message: String,
    pub details: Vec<String>,
}

const UNKNOWN_FIELD_PATTERNS: &[&str] = &[
    r#"(?i)field\s+['"]?([A-Za-z0-9_.:]+)['"]?\s+(?:does not exist|doesn't exist|is not found|not found|is unknown|is invalid|is not valid)"#,
    r#"(?i)(?:unknown|invalid)\s+field(?:\s+name)?[:\s]+['"]?([A-Za-z0-9_.]+)"#,
];

static UNKNOWN_FIELD: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    UNKNOWN_FIELD_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

impl EmbeddedError {
    fn from_value(value: &Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

        let code = text("code")
            .or_else(|| text("errorId"))
            .unwrap_or_else(|| "unknown".to_string());
        let message = text("message").unwrap_or_else(|| value.to_string());
        let details = value
            .get("details")
            .and_then(Value::as_array)
            .map(|details| {
                details
                    .iter()
                    .map(|detail| match detail {
                        Value::String(s) => s.clone(),
                        other => other
                            .get("message")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| other.to_string()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            code,
            message,
            details,
        }
    }

    /// Name of the field the server says does not exist, if that is the error.
    pub fn unknown_field(&self) -> Option<String> {
        std::iter::once(&self.message)
            .chain(&self.details)
            .find_map(|text| {
                UNKNOWN_FIELD
                    .iter()
                    .find_map(|re| re.captures(text)?.get(1))
                    .map(|m| m.as_str().to_string())
            })
    }

    /// Message plus details, as surfaced to the operator.
    pub fn full_message(&self) -> String {
        if self.details.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, self.details.join("; "))
        }
    }
}

/// Read a query response envelope.
pub(crate) fn parse_query_response(body: Value) -> QueryOutcome {
    let Value::Object(mut body) = body else {
        return QueryOutcome::Page(QueryPage::default());
    };

    if let Some(error) = body.get("ia::error") {
        return QueryOutcome::Error(EmbeddedError::from_value(error));
    }

    let next = body
        .get("ia::meta")
        .and_then(|meta| meta.get("next"))
        .cloned()
        .filter(is_cursor);

    match body.remove("ia::result") {
        Some(Value::Array(items)) => {
            let records = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(record) => Some(record),
                    _ => None,
                })
                .collect();
            QueryOutcome::Page(QueryPage { records, next })
        }
        Some(Value::Object(result)) => match result.get("ia::error") {
            Some(error) => QueryOutcome::Error(EmbeddedError::from_value(error)),
            None => QueryOutcome::Page(QueryPage::default()),
        },
        _ => QueryOutcome::Page(QueryPage::default()),
    }
}

/// Null, zero and empty cursors all mean "no more pages".
fn is_cursor(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        _ => true,
    }
}
