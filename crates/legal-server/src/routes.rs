use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Multipart, Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        Json,
    },
};
use legal_core::{
    completion::ErrorBody,
    extract::{self, extract_text},
    ClauseCandidate, ClauseMode, Document,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tracing::info;

use crate::{error::ApiError, AppState};

const PREVIEW_CHARS: usize = 500;

// ── Multipart ─────────────────────────────────────────────────────────────

struct Upload {
    filename: String,
    bytes: Bytes,
}

/// All parts of a multipart form: the `file` part plus any text fields.
#[derive(Default)]
struct Form {
    file: Option<Upload>,
    fields: HashMap<String, String>,
}

impl Form {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Form::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                form.file = Some(Upload { filename, bytes });
            } else if !name.is_empty() {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn document(&self) -> Result<Document, ApiError> {
        let upload = self
            .file
            .as_ref()
            .ok_or_else(|| ApiError::invalid("missing multipart field `file`"))?;
        info!(file = %upload.filename, bytes = upload.bytes.len(), "upload received");
        Ok(extract_text(&upload.bytes, &upload.filename)?)
    }

    /// A non-blank text field, trimmed.
    fn text(&self, name: &str) -> Result<&str, ApiError> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::invalid(format!("missing or empty field `{name}`")))
    }
}

// ── Response bodies ───────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Serialize)]
pub struct DefinitionResponse {
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Serialize)]
pub struct ClausesResponse {
    pub mode: ClauseMode,
    pub clauses: Vec<ClauseCandidate>,
    /// True when `clauses` is the single "Parsing error" record.
    pub unparsed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub preview: String,
    pub chars: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: String,
    pub model: String,
    pub uptime_s: u64,
}

#[derive(Deserialize)]
pub struct ClausesQuery {
    mode: Option<String>,
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let backend = state.pipeline.backend();
    Json(HealthResponse {
        status: "ok",
        backend: backend.name().to_string(),
        model: backend.model().to_string(),
        uptime_s: state.start_time.elapsed().as_secs(),
    })
}

pub(crate) async fn summary(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<SummaryResponse>, ApiError> {
    let doc = Form::read(multipart).await?.document()?;
    let out = state.pipeline.summarize(&doc).await;
    Ok(Json(SummaryResponse {
        summary: out.text,
        error: out.error.map(|e| e.body()),
    }))
}

pub(crate) async fn clauses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ClausesQuery>,
    multipart: Multipart,
) -> Result<Json<ClausesResponse>, ApiError> {
    let mode = match query.mode.as_deref() {
        None | Some("") => state.pipeline.config().clause_mode,
        Some(raw) => ClauseMode::parse(raw)
            .ok_or_else(|| ApiError::invalid(format!("unknown clause mode `{raw}`")))?,
    };
    let doc = Form::read(multipart).await?.document()?;
    let report = state.pipeline.extract_clauses(&doc, mode).await;
    Ok(Json(ClausesResponse {
        mode: report.mode,
        unparsed: report.unparsed,
        clauses: report.clauses,
        error: report.error.map(|e| e.body()),
    }))
}

pub(crate) async fn qa(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AnswerResponse>, ApiError> {
    let form = Form::read(multipart).await?;
    let question = form.text("question")?;
    let doc = form.document()?;
    let out = state.pipeline.answer(&doc, question).await;
    Ok(Json(AnswerResponse {
        answer: out.text,
        error: out.error.map(|e| e.body()),
    }))
}

pub(crate) async fn jargon(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<DefinitionResponse>, ApiError> {
    let form = Form::read(multipart).await?;
    let out = state.pipeline.define(form.text("term")?).await;
    Ok(Json(DefinitionResponse {
        definition: out.text,
        error: out.error.map(|e| e.body()),
    }))
}

pub(crate) async fn preview(multipart: Multipart) -> Result<Json<PreviewResponse>, ApiError> {
    let doc = Form::read(multipart).await?.document()?;
    Ok(Json(PreviewResponse {
        preview: extract::preview(&doc.text, PREVIEW_CHARS),
        chars: doc.char_count(),
        pages: doc.page_count,
    }))
}

// SSE logs: replays the ring, then streams live lines

pub(crate) async fn sse_logs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    // Subscribe before snapshotting the ring so nothing falls in between.
    let live_rx = state.log_tx.subscribe();
    let history: Vec<String> = state
        .log_ring
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .cloned()
        .collect();
    tokio::spawn(relay_logs(history, live_rx, tx));
    let stream = UnboundedReceiverStream::new(rx)
        .map(|data| Ok::<_, std::convert::Infallible>(Event::default().data(data)));
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}

/// Feed one SSE subscriber: ring history first, then live lines. Returns as
/// soon as the subscriber goes away, even if no new line arrives.
pub(crate) async fn relay_logs(
    history: Vec<String>,
    mut live_rx: broadcast::Receiver<String>,
    tx: tokio::sync::mpsc::UnboundedSender<String>,
) {
    for line in history {
        if tx.send(line).is_err() {
            return;
        }
    }
    loop {
        tokio::select! {
            _ = tx.closed() => return,
            msg = live_rx.recv() => match msg {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        return;
                    }
                },
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return,
            },
        }
    }
}
