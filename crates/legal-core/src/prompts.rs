//! Prompt templates. Every piece of user-supplied text is cut to the
//! character budget before it is embedded.

pub const CLAUSE_KEYWORDS: &[&str] = &[
    "liability",
    "termination",
    "payment",
    "confidential",
    "indemnification",
    "force majeure",
];

/// The first `max_chars` characters of `text`. Never splits a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn summary_prompt(doc: &str, budget: usize) -> String {
    format!(
        "Summarize this legal document in plain English:\n{}",
        truncate_chars(doc, budget)
    )
}

pub fn qa_prompt(doc: &str, question: &str, budget: usize) -> String {
    format!(
        "Answer clearly using the document. If the answer is not in the document, \
         say that it was not found in the document.\n{}\nQuestion: {}",
        truncate_chars(doc, budget),
        truncate_chars(question, budget)
    )
}

pub fn jargon_prompt(term: &str, budget: usize) -> String {
    format!("Explain in plain English: {}", truncate_chars(term, budget))
}

pub fn clause_explanation_prompt(clause: &str, budget: usize) -> String {
    format!(
        "Explain this clause in simple English:\n{}",
        truncate_chars(clause, budget)
    )
}

pub fn clause_risk_prompt(clause: &str, budget: usize) -> String {
    format!(
        "Rate the risk of this clause: {}\nAnswer with exactly one word: Low, Medium or High.",
        truncate_chars(clause, budget)
    )
}

/// Single-call prompt asking the model to select and explain clauses as JSON.
pub fn clause_extraction_prompt(doc: &str, budget: usize) -> String {
    format!(
        "You are reviewing a legal document. Identify the key clauses about {}.\n\
         For each clause return an object with the fields \"clause\" (the clause text), \
         \"explanation\" (a plain English explanation) and \"risk\" (exactly one of \
         \"Low\", \"Medium\" or \"High\").\n\
         Respond ONLY with a JSON array of these objects, no extra text. \
         If there are no such clauses, respond with [].\n\n\
         Document:\n{}",
        CLAUSE_KEYWORDS.join(", "),
        truncate_chars(doc, budget)
    )
}
