//! Local clause selection: sentence-ish splitting plus a keyword filter.

use crate::{prompts::CLAUSE_KEYWORDS, types::RiskLevel};

/// Split text into sentence-like units.
///
/// A boundary falls after `.` or `\n` when the next character is whitespace;
/// the whole whitespace run is dropped. Units are trimmed and empty units
/// removed. Abbreviations ("Ltd. Co") and numbered lists split wrongly.
pub fn split_units<'a>(text: &'a str) -> Vec<&'a str> {
    let mut units = Vec::new();
    let mut push = |s: &'a str| {
        let s = s.trim();
        if !s.is_empty() {
            units.push(s);
        }
    };

    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '.' && c != '\n' {
            continue;
        }
        match chars.peek() {
            Some(&(_, next)) if next.is_whitespace() => {},
            _ => continue,
        }
        push(&text[start..i + c.len_utf8()]);
        while let Some(&(_, w)) = chars.peek() {
            if !w.is_whitespace() {
                break;
            }
            chars.next();
        }
        start = chars.peek().map(|&(j, _)| j).unwrap_or(text.len());
    }
    if start < text.len() {
        push(&text[start..]);
    }
    units
}

pub fn mentions_keyword(unit: &str) -> bool {
    let lower = unit.to_lowercase();
    CLAUSE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Keyword-matching units in document order, capped at `max`.
pub fn select_candidates(text: &str, max: usize) -> Vec<String> {
    split_units(text)
        .into_iter()
        .filter(|u| mentions_keyword(u))
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Read a Low/Medium/High verdict from a risk-rating reply.
///
/// The verdict must be the first word of the reply; surrounding markup and
/// punctuation are ignored. Replies that merely mention a level later on
/// ("this is not high risk") are `Unknown`.
pub fn parse_risk_verdict(reply: &str) -> RiskLevel {
    let first_word = reply
        .split(|c: char| !c.is_alphabetic())
        .find(|w| !w.is_empty())
        .unwrap_or("");
    RiskLevel::from_label(first_word)
}
