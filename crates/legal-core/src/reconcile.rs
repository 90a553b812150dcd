//! Turns the model's JSON-ish clause reply into validated records.
//!
//! Never fails: output that is not a JSON array becomes [`Reconciled::Unparsed`]
//! carrying the single sentinel record, so an empty result (`[]`) stays
//! distinguishable from garbage without looking at record contents.

use serde_json::{Map, Value};
use tracing::warn;

use crate::types::{ClauseCandidate, RiskLevel};

/// Outcome of reconciling one model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// The reply was a JSON array; possibly empty.
    Parsed(Vec<ClauseCandidate>),
    /// The reply could not be read as a JSON array.
    Unparsed(ClauseCandidate),
}

impl Reconciled {
    pub fn is_unparsed(&self) -> bool {
        matches!(self, Self::Unparsed(_))
    }

    /// Records to show: the parsed clauses, or the single sentinel.
    pub fn into_clauses(self) -> Vec<ClauseCandidate> {
        match self {
            Self::Parsed(clauses) => clauses,
            Self::Unparsed(sentinel) => vec![sentinel],
        }
    }
}

pub fn reconcile(raw: &str, max_clauses: usize) -> Reconciled {
    let value: Value = match serde_json::from_str(strip_fences(raw)) {
        Ok(v) => v,
        Err(e) => {
            warn!(raw_len = raw.len(), "clause reply is not JSON: {e}");
            return Reconciled::Unparsed(ClauseCandidate::sentinel(raw));
        },
    };

    let Value::Array(items) = value else {
        warn!(raw_len = raw.len(), "clause reply is JSON but not an array");
        return Reconciled::Unparsed(ClauseCandidate::sentinel(raw));
    };

    let total = items.len();
    let clauses: Vec<ClauseCandidate> = items
        .iter()
        .filter_map(|item| match item.as_object() {
            Some(obj) => Some(record_from_object(obj)),
            None => {
                warn!("skipping non-object clause record: {item}");
                None
            },
        })
        .take(max_clauses)
        .collect();

    if total > clauses.len() {
        tracing::debug!(total, kept = clauses.len(), "clause records dropped or capped");
    }
    Reconciled::Parsed(clauses)
}

fn record_from_object(obj: &Map<String, Value>) -> ClauseCandidate {
    ClauseCandidate {
        clause_text: field_text(obj.get("clause")),
        explanation: field_text(obj.get("explanation")),
        risk_level: obj
            .get("risk")
            .and_then(Value::as_str)
            .map(RiskLevel::from_label)
            .unwrap_or(RiskLevel::Unknown),
    }
}

fn field_text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Strip a surrounding Markdown code fence (```` ```json ... ``` ````), if any.
pub fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    if !t.starts_with("```") {
        return t;
    }
    let nl = match t.find('\n') {
        Some(i) => i,
        None => return t,
    };
    let inner = &t[nl + 1..];
    match inner.strip_suffix("```") {
        Some(body) => body.trim(),
        None => inner.trim(),
    }
}
