//! Response normalizer — raw webhook JSON → uniform `Message` record.
//!
//! DESIGN
//! ======
//! The chat webhook has shipped five generations of response shapes (email
//! search, document search, a legacy document list, a flat solutions list,
//! and the original primary/other solution pair). Shape is inferred from
//! field presence, priority-ordered and first-match-wins: the branches are
//! checked most-specific first, and that order must not change — several
//! payloads match more than one branch.
//!
//! ERROR HANDLING
//! ==============
//! Normalization never fails. Every field access is optional with a
//! fallback; a payload that matches no known shape yields an assistant
//! message with an empty (never missing) solutions list.

use serde_json::Value;
use uuid::Uuid;

use crate::payload::{
    DisplayMode, DocSummary, Message, Role, Solution, document_rank, now_ms, str_field,
};

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Normalize a raw webhook response body into an assistant message.
///
/// Pure and synchronous: no I/O, no state across calls. Persisting the
/// result is the caller's job.
#[must_use]
pub fn normalize_response(body: &Value) -> Message {
    // Responses usually arrive wrapped in a `data` envelope; older deploys
    // returned the envelope fields at the top level.
    let data = body.get("data").unwrap_or(body);
    let ui_payload = data
        .get("ui_payload")
        .or_else(|| data.get("webhook_payload"))
        .cloned()
        .unwrap_or(Value::Null);

    let (mode, show_ai_summary) = select_display(data, &ui_payload);
    // A summary suppressed by the display mode stays suppressed even when
    // upstream mistakenly included one.
    let ai_summary = if show_ai_summary { non_null(ui_payload.get("ai_summary")) } else { None };

    let solutions = collect_solution_records(&ui_payload)
        .iter()
        .map(Solution::from_value)
        .collect();

    Message {
        id: Uuid::new_v4(),
        role: Role::Assistant,
        content: data
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        ts: now_ms(),
        mode,
        show_ai_summary,
        ai_summary,
        handover_section: non_null(ui_payload.get("handover_section")),
        solutions,
        other_docs: doc_summaries(data.get("other_docs")),
        all_docs: doc_summaries(data.get("all_docs")),
        query_id: str_field(data, "query_id"),
        conversation_id: str_field(data, "conversation_id"),
        search_type: str_field(data, "search_type"),
        ui_payload,
        original_query: str_field(data, "original_query"),
        search_strategy: str_field(data, "search_strategy"),
    }
}

// =============================================================================
// DISPLAY MODE SELECTION
// =============================================================================

/// Pick the display mode and summary visibility.
///
/// `ux_display` is read from the envelope first, then from the payload.
/// Unknown or absent values fall back to the payload's own `mode` /
/// `show_ai_summary` fields.
#[must_use]
pub fn select_display(envelope: &Value, ui_payload: &Value) -> (DisplayMode, bool) {
    let ux_display = envelope
        .get("ux_display")
        .and_then(Value::as_str)
        .or_else(|| ui_payload.get("ux_display").and_then(Value::as_str));

    match ux_display {
        Some("search_mode") => (DisplayMode::Search, false),
        Some("ai_summary") => (DisplayMode::AiEnhanced, true),
        _ => {
            let mode = ui_payload
                .get("mode")
                .and_then(Value::as_str)
                .and_then(DisplayMode::parse)
                .unwrap_or(DisplayMode::Search);
            let show = ui_payload
                .get("show_ai_summary")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            (mode, show)
        }
    }
}

// =============================================================================
// SOLUTION EXTRACTION
// =============================================================================

/// Flatten the payload's solution-like records into one ordered list.
///
/// Branches, first match wins (a present-but-non-array field counts as
/// absent):
/// 1. email search: `primary_findings` + `other_emails` + `all_emails`,
///    input order preserved;
/// 2. document search: chunks of `primary_documents`, then
///    `other_documents`, then `all_documents`;
/// 3. legacy document list: `all_documents` sorted descending by rank, then
///    flattened (a chunkless document stands in for its own chunks);
/// 4. flat `solutions` list, used as-is;
/// 5. oldest shape: `primary_solution` followed by `other_solutions`.
#[must_use]
pub fn collect_solution_records(ui_payload: &Value) -> Vec<Value> {
    if let Some(findings) = as_array(ui_payload, "primary_findings") {
        let mut records = findings.to_vec();
        if let Some(other) = as_array(ui_payload, "other_emails") {
            records.extend(other.iter().cloned());
        }
        if let Some(all) = as_array(ui_payload, "all_emails") {
            records.extend(all.iter().cloned());
        }
        return records;
    }

    if let Some(primary) = as_array(ui_payload, "primary_documents") {
        let mut records = Vec::new();
        flatten_chunks(&mut records, primary);
        if let Some(other) = as_array(ui_payload, "other_documents") {
            flatten_chunks(&mut records, other);
        }
        if let Some(all) = as_array(ui_payload, "all_documents") {
            flatten_chunks(&mut records, all);
        }
        return records;
    }

    if let Some(all) = as_array(ui_payload, "all_documents") {
        // Stable sort: ties keep their original relative order.
        let mut docs = all.to_vec();
        docs.sort_by(|a, b| {
            document_rank(b)
                .partial_cmp(&document_rank(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut records = Vec::new();
        for doc in &docs {
            match doc.get("chunks").and_then(Value::as_array) {
                Some(chunks) => records.extend(chunks.iter().cloned()),
                None => records.push(doc.clone()),
            }
        }
        return records;
    }

    if let Some(solutions) = as_array(ui_payload, "solutions") {
        return solutions.to_vec();
    }

    let mut records = Vec::new();
    if let Some(primary) = ui_payload.get("primary_solution") {
        if !primary.is_null() {
            records.push(primary.clone());
        }
    }
    if let Some(other) = as_array(ui_payload, "other_solutions") {
        records.extend(other.iter().cloned());
    }
    records
}

// =============================================================================
// HELPERS
// =============================================================================

fn as_array<'a>(value: &'a Value, key: &str) -> Option<&'a [Value]> {
    value.get(key).and_then(Value::as_array).map(Vec::as_slice)
}

fn flatten_chunks(out: &mut Vec<Value>, docs: &[Value]) {
    for doc in docs {
        if let Some(chunks) = doc.get("chunks").and_then(Value::as_array) {
            out.extend(chunks.iter().cloned());
        }
    }
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    match value {
        Some(Value::Null) | None => None,
        Some(v) => Some(v.clone()),
    }
}

fn doc_summaries(value: Option<&Value>) -> Vec<DocSummary> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().map(DocSummary::from_value).collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
