use std::{collections::HashMap, path::Path};

use crate::types::ClauseMode;

/// Full application configuration.
/// Read once at startup from the environment with `.env` as fallback;
/// shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    // Completion backend
    /// "gemini" (default), "ollama" or "anthropic".
    pub backend: String,
    pub model: String,
    pub google_api_key: String,
    pub anthropic_api_key: String,
    pub gemini_base_url: String,
    pub ollama_url: String,
    pub completion_timeout_s: u64,

    // Web
    pub web_bind: String,
    pub web_port: u16,
    pub max_upload_bytes: usize,

    // Prompt budgets (characters)
    /// Characters of document text (or question/term) embedded in any prompt.
    pub doc_char_budget: usize,
    pub max_output_chars: usize,
    pub risk_output_chars: usize,
    pub clause_output_chars: usize,

    // Clauses
    pub max_clauses: usize,
    pub clause_mode: ClauseMode,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Key/value pairs from `path`; a missing or unreadable file yields none.
fn parse_dotenv(path: &Path) -> HashMap<String, String> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    parse_dotenv_str(&contents)
}

fn parse_dotenv_str(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().trim_matches('"');
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

fn get_str(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn get_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn get_u16(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u16) -> u16 {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Zero is treated as unset; every budget must be positive.
fn get_usize(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .filter(|v: &usize| *v > 0)
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let dotenv = parse_dotenv(Path::new(".env"));
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned()))
    }

    /// Build a config from any key lookup. Missing or unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let clause_mode_raw = get_str(&lookup, "CLAUSE_MODE", "delegated");
        let clause_mode = ClauseMode::parse(&clause_mode_raw).unwrap_or_else(|| {
            tracing::warn!(value = %clause_mode_raw, "unknown CLAUSE_MODE, using delegated");
            ClauseMode::Delegated
        });

        Config {
            backend: get_str(&lookup, "BACKEND", "gemini").to_ascii_lowercase(),
            model: get_str(&lookup, "MODEL", "gemini-1.5-flash"),
            google_api_key: get_str(&lookup, "GOOGLE_API_KEY", ""),
            anthropic_api_key: get_str(&lookup, "ANTHROPIC_API_KEY", ""),
            gemini_base_url: get_str(
                &lookup,
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            ollama_url: get_str(&lookup, "OLLAMA_URL", "http://localhost:11434"),
            completion_timeout_s: get_u64(&lookup, "COMPLETION_TIMEOUT_S", 60).max(1),
            web_bind: get_str(&lookup, "WEB_BIND", "127.0.0.1"),
            web_port: get_u16(&lookup, "WEB_PORT", 8000),
            max_upload_bytes: get_usize(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024),
            doc_char_budget: get_usize(&lookup, "DOC_CHAR_BUDGET", 3000),
            max_output_chars: get_usize(&lookup, "MAX_OUTPUT_CHARS", 3000),
            risk_output_chars: get_usize(&lookup, "RISK_OUTPUT_CHARS", 200),
            clause_output_chars: get_usize(&lookup, "CLAUSE_OUTPUT_CHARS", 8000),
            max_clauses: get_usize(&lookup, "MAX_CLAUSES", 12),
            clause_mode,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.web_bind, self.web_port)
    }
}
