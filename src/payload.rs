//! Chat payload types — the uniform message record produced by normalization.
//!
//! DESIGN
//! ======
//! The webhook backend returns ad hoc JSON in several generations of shapes.
//! Everything the rendering layer touches is funneled into `Message`, whose
//! `solutions` list is always a real vector (possibly empty) — downstream
//! consumers index into it unconditionally.
//!
//! `Solution` and `DocSummary` are built leniently from arbitrary JSON
//! records: missing or mistyped fields default, nothing panics.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// =============================================================================
// ROLE & DISPLAY MODE
// =============================================================================

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// Which UI variant the client should render for an assistant reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Ai,
    Search,
    AiEnhanced,
}

impl DisplayMode {
    /// Parse an upstream mode string. Unknown values map to `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ai" => Some(Self::Ai),
            "search" => Some(Self::Search),
            "ai_enhanced" => Some(Self::AiEnhanced),
            _ => None,
        }
    }
}

// =============================================================================
// CONFIDENCE COERCION
// =============================================================================

/// Coerce an upstream confidence value to a float.
///
/// Accepts JSON numbers and numeric strings (the backend has shipped both);
/// anything else is 0.0.
#[must_use]
pub fn coerce_confidence(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn first_confidence(record: &Value, keys: &[&str]) -> f64 {
    keys.iter()
        .find_map(|key| {
            let v = record.get(key)?;
            if v.is_null() { None } else { Some(coerce_confidence(Some(v))) }
        })
        .unwrap_or(0.0)
}

/// Ranking score for a document record: `match_ratio` first, then
/// `relevance_score`, then `confidence`, defaulting to 0.
#[must_use]
pub fn document_rank(record: &Value) -> f64 {
    first_confidence(record, &["match_ratio", "relevance_score", "confidence"])
}

// =============================================================================
// SOLUTION
// =============================================================================

/// One candidate answer or document snippet surfaced to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub id: String,
    pub title: String,
    pub confidence: f64,
    pub steps: Vec<String>,
    pub content: Option<String>,
    pub source: Option<String>,
    pub doc_link: Option<String>,
}

impl Solution {
    /// Build a solution from an arbitrary upstream record.
    ///
    /// Email records carry `subject`/`bodyPreview`/`webLink` (Graph shapes),
    /// document chunks carry `title`/`content`/`doc_link`. All accesses fall
    /// back rather than fail.
    #[must_use]
    pub fn from_value(record: &Value) -> Self {
        let id = match record.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let title = str_field(record, "title")
            .or_else(|| str_field(record, "subject"))
            .unwrap_or_default();
        let steps = record
            .get("steps")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let content = str_field(record, "content")
            .or_else(|| str_field(record, "text"))
            .or_else(|| str_field(record, "bodyPreview"));

        Self {
            id,
            title,
            confidence: first_confidence(record, &["confidence", "match_ratio", "relevance_score"]),
            steps,
            content,
            source: str_field(record, "source"),
            doc_link: str_field(record, "doc_link").or_else(|| str_field(record, "webLink")),
        }
    }
}

// =============================================================================
// DOC SUMMARY
// =============================================================================

/// Sidebar entry for a related document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSummary {
    pub title: String,
    pub doc_link: Option<String>,
    pub confidence: f64,
}

impl DocSummary {
    #[must_use]
    pub fn from_value(record: &Value) -> Self {
        Self {
            title: str_field(record, "title").unwrap_or_default(),
            doc_link: str_field(record, "doc_link"),
            confidence: first_confidence(record, &["confidence", "match_ratio", "relevance_score"]),
        }
    }
}

// =============================================================================
// MESSAGE
// =============================================================================

/// One entry in a session's ordered message list. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    /// Milliseconds since Unix epoch. Set at construction.
    pub ts: i64,
    pub mode: DisplayMode,
    pub show_ai_summary: bool,
    pub ai_summary: Option<Value>,
    pub handover_section: Option<Value>,
    pub solutions: Vec<Solution>,
    pub other_docs: Vec<DocSummary>,
    pub all_docs: Vec<DocSummary>,
    pub query_id: Option<String>,
    pub conversation_id: Option<String>,
    pub search_type: Option<String>,
    pub ui_payload: Value,
    pub original_query: Option<String>,
    pub search_strategy: Option<String>,
}

impl Message {
    /// Create a message with default presentation fields.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            ts: now_ms(),
            mode: DisplayMode::Search,
            show_ai_summary: false,
            ai_summary: None,
            handover_section: None,
            solutions: Vec::new(),
            other_docs: Vec::new(),
            all_docs: Vec::new(),
            query_id: None,
            conversation_id: None,
            search_type: None,
            ui_payload: Value::Null,
            original_query: None,
            search_strategy: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

pub(crate) fn str_field(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(String::from)
}

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// TESTS
// =============================================================================
