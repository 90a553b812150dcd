use serde::{Deserialize, Deserializer, Serialize};

use crate::completion::CompletionError;

// ── Document ─────────────────────────────────────────────────────────────

/// An uploaded document after text extraction. Lives for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub declared_filename: String,
    pub text: String,
    /// Number of pages in the source PDF; `None` for plain text.
    pub page_count: Option<usize>,
}

impl Document {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

// ── Risk ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    /// Parse a canonical level. Case-insensitive, surrounding whitespace ignored;
    /// anything outside Low/Medium/High is `Unknown`.
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Unknown => "Unknown",
        }
    }
}

impl Default for RiskLevel {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_label(&raw))
    }
}

// ── Clauses ──────────────────────────────────────────────────────────────

pub const SENTINEL_CLAUSE: &str = "Parsing error";

/// A clause excerpt with a plain-language explanation and a risk verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseCandidate {
    #[serde(rename = "clause")]
    pub clause_text: String,
    pub explanation: String,
    #[serde(rename = "risk", default)]
    pub risk_level: RiskLevel,
}

impl ClauseCandidate {
    /// The single record emitted when the model's clause output could not be parsed.
    pub fn sentinel(raw: &str) -> Self {
        Self {
            clause_text: SENTINEL_CLAUSE.into(),
            explanation: raw.trim().to_string(),
            risk_level: RiskLevel::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseMode {
    /// Keyword filter over split sentences, two follow-up model calls per match.
    Heuristic,
    /// One model call that both selects and explains clauses as JSON.
    Delegated,
}

impl ClauseMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" | "local" => Some(Self::Heuristic),
            "delegated" | "model" => Some(Self::Delegated),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::Delegated => "delegated",
        }
    }
}

impl Default for ClauseMode {
    fn default() -> Self {
        Self::Delegated
    }
}

impl std::fmt::Display for ClauseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the clause pipeline for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseReport {
    pub mode: ClauseMode,
    pub clauses: Vec<ClauseCandidate>,
    /// The model replied but not with a JSON array; `clauses` holds only the
    /// sentinel. Set from the reconciliation outcome, never from record text.
    pub unparsed: bool,
    /// First completion failure seen while building the report, if any.
    pub error: Option<CompletionError>,
}

impl ClauseReport {
    /// True when the model replied but its output could not be interpreted.
    pub fn is_unparsed(&self) -> bool {
        self.unparsed
    }
}

// ── Single-prompt answers ────────────────────────────────────────────────

/// Text returned by a single-prompt operation (summary, answer, definition).
///
/// On failure `text` carries an `"AI Error: ..."` message and `error` the cause,
/// so callers can branch without inspecting the text.
#[derive(Debug, Clone, PartialEq)]
pub struct AiText {
    pub text: String,
    pub error: Option<CompletionError>,
}

impl AiText {
    pub fn ok(text: String) -> Self {
        Self { text, error: None }
    }

    pub fn failed(err: CompletionError) -> Self {
        Self {
            text: err.user_message(),
            error: Some(err),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
