use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::{
    clauses,
    completion::{CompletionBackend, CompletionError},
    config::Config,
    prompts::{self, truncate_chars},
    reconcile::reconcile,
    types::{AiText, ClauseCandidate, ClauseMode, ClauseReport, Document, RiskLevel},
};

/// Stateless request pipeline: prompt building, model calls and response shaping.
///
/// Holds only read-only handles, so one instance is shared by every request.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<Config>,
    backend: Arc<dyn CompletionBackend>,
}

impl Pipeline {
    pub fn new(config: Arc<Config>, backend: Arc<dyn CompletionBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &dyn CompletionBackend {
        self.backend.as_ref()
    }

    /// One model call, bounded by the configured timeout. The reply is trimmed
    /// and cut to `max_output_chars` characters.
    pub async fn complete(
        &self,
        prompt: &str,
        max_output_chars: usize,
    ) -> Result<String, CompletionError> {
        let secs = self.config.completion_timeout_s;
        let started = Instant::now();

        let result =
            match tokio::time::timeout(Duration::from_secs(secs), self.backend.generate(prompt))
                .await
            {
                Ok(r) => r,
                Err(_) => Err(CompletionError::Timeout { secs }),
            };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(text) => {
                let text = truncate_chars(text.trim(), max_output_chars).to_string();
                info!(
                    backend = self.backend.name(),
                    prompt_chars = prompt.chars().count(),
                    output_chars = text.chars().count(),
                    elapsed_ms,
                    "completion ok"
                );
                Ok(text)
            },
            Err(e) => {
                warn!(backend = self.backend.name(), elapsed_ms, "completion failed: {e}");
                Err(e)
            },
        }
    }

    async fn ask(&self, prompt: &str) -> AiText {
        match self.complete(prompt, self.config.max_output_chars).await {
            Ok(text) => AiText::ok(text),
            Err(e) => AiText::failed(e),
        }
    }

    pub async fn summarize(&self, doc: &Document) -> AiText {
        let prompt = prompts::summary_prompt(&doc.text, self.config.doc_char_budget);
        self.ask(&prompt).await
    }

    pub async fn answer(&self, doc: &Document, question: &str) -> AiText {
        let prompt = prompts::qa_prompt(&doc.text, question, self.config.doc_char_budget);
        self.ask(&prompt).await
    }

    pub async fn define(&self, term: &str) -> AiText {
        let prompt = prompts::jargon_prompt(term, self.config.doc_char_budget);
        self.ask(&prompt).await
    }

    pub async fn extract_clauses(&self, doc: &Document, mode: ClauseMode) -> ClauseReport {
        let report = match mode {
            ClauseMode::Delegated => self.delegated_clauses(doc).await,
            ClauseMode::Heuristic => self.heuristic_clauses(doc).await,
        };
        info!(
            mode = %mode,
            clauses = report.clauses.len(),
            unparsed = report.is_unparsed(),
            failed = report.error.is_some(),
            "clause report built"
        );
        report
    }

    async fn delegated_clauses(&self, doc: &Document) -> ClauseReport {
        let prompt = prompts::clause_extraction_prompt(&doc.text, self.config.doc_char_budget);
        match self.complete(&prompt, self.config.clause_output_chars).await {
            Ok(raw) => {
                let reconciled = reconcile(&raw, self.config.max_clauses);
                ClauseReport {
                    mode: ClauseMode::Delegated,
                    unparsed: reconciled.is_unparsed(),
                    clauses: reconciled.into_clauses(),
                    error: None,
                }
            },
            Err(e) => ClauseReport {
                mode: ClauseMode::Delegated,
                clauses: Vec::new(),
                unparsed: false,
                error: Some(e),
            },
        }
    }

    async fn heuristic_clauses(&self, doc: &Document) -> ClauseReport {
        let candidates = clauses::select_candidates(&doc.text, self.config.max_clauses);
        let budget = self.config.doc_char_budget;
        let mut first_error = None;
        let mut out = Vec::with_capacity(candidates.len());

        for clause in candidates {
            let explanation = match self
                .complete(
                    &prompts::clause_explanation_prompt(&clause, budget),
                    self.config.max_output_chars,
                )
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    let msg = e.user_message();
                    first_error.get_or_insert(e);
                    msg
                },
            };

            let risk_level = match self
                .complete(
                    &prompts::clause_risk_prompt(&clause, budget),
                    self.config.risk_output_chars,
                )
                .await
            {
                Ok(reply) => clauses::parse_risk_verdict(&reply),
                Err(e) => {
                    first_error.get_or_insert(e);
                    RiskLevel::Unknown
                },
            };

            out.push(ClauseCandidate {
                clause_text: clause,
                explanation,
                risk_level,
            });
        }

        ClauseReport {
            mode: ClauseMode::Heuristic,
            clauses: out,
            unparsed: false,
            error: first_error,
        }
    }
}
