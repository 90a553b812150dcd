// HTTP surface driven through the router with a scripted completion backend.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use legal_core::{
    completion::{CompletionBackend, CompletionError},
    config::Config,
    pipeline::Pipeline,
};
use legal_server::{app, AppState};
use serde_json::Value;
use tokio::sync::broadcast;
use tower::ServiceExt;

// ── helpers ──────────────────────────────────────────────────────────────────

const BOUNDARY: &str = "legal-test-boundary";

/// Replies from a fixed script, in order; records every prompt.
struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, CompletionError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<Result<String, CompletionError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn replying(text: &str) -> Arc<Self> {
        Self::new(vec![Ok(text.to_string())])
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Low".to_string()))
    }
}

fn router(backend: Arc<ScriptedBackend>, pairs: &[(&str, &str)]) -> Router {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let config = Arc::new(Config::from_lookup(|k| map.get(k).cloned()));
    let (log_tx, _) = broadcast::channel(16);
    let state = AppState::new(
        Pipeline::new(config, backend),
        log_tx,
        Arc::new(Mutex::new(VecDeque::new())),
    );
    app(Arc::new(state))
}

enum Part<'a> {
    File(&'a str, &'a [u8]),
    Field(&'a str, &'a str),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File(filename, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            },
            Part::Field(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").as_bytes(),
                );
            },
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post(router: Router, uri: &str, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    send(router, request).await
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

const CONTRACT: &[u8] = b"This Agreement starts today. The tenant pays rent. \
Termination requires 30 days notice. Liability is capped at fees paid.";

// ── health / preview ─────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_backend() {
    let app = router(ScriptedBackend::replying("unused"), &[]);
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "scripted");
    assert_eq!(body["model"], "scripted-1");
    assert!(body["uptime_s"].is_u64());
}

#[tokio::test]
async fn preview_cuts_long_text() {
    let backend = ScriptedBackend::replying("unused");
    let text = "a".repeat(600);
    let app = router(backend.clone(), &[]);

    let (status, body) = post(app, "/preview", &[Part::File("long.txt", text.as_bytes())]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chars"], 600);
    assert_eq!(body["preview"].as_str().unwrap().chars().count(), 503);
    assert!(body.get("pages").is_none());
    assert!(backend.prompts().is_empty());
}

// ── summary / qa / jargon ────────────────────────────────────────────────────

#[tokio::test]
async fn summary_returns_model_text() {
    let backend = ScriptedBackend::replying("  A lease with a notice period.  ");
    let app = router(backend.clone(), &[]);

    let (status, body) = post(app, "/summary", &[Part::File("lease.txt", CONTRACT)]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "A lease with a notice period.");
    assert!(body.get("error").is_none());
    assert!(backend.prompts()[0].starts_with("Summarize this legal document in plain English:\n"));
}

#[tokio::test]
async fn completion_failure_still_answers_200() {
    let backend = ScriptedBackend::new(vec![Err(CompletionError::Status {
        status: 503,
        body: "overloaded".into(),
    })]);
    let app = router(backend, &[]);

    let (status, body) = post(app, "/summary", &[Part::File("lease.txt", CONTRACT)]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"], "AI Error: completion service returned 503: overloaded");
    assert_eq!(body["error"]["code"], "COMPLETION_STATUS");
}

#[tokio::test]
async fn qa_embeds_question() {
    let backend = ScriptedBackend::replying("Thirty days.");
    let app = router(backend.clone(), &[]);

    let (status, body) = post(
        app,
        "/qa",
        &[
            Part::Field("question", "How much notice is needed?"),
            Part::File("lease.txt", CONTRACT),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], "Thirty days.");
    assert!(backend.prompts()[0].ends_with("\nQuestion: How much notice is needed?"));
}

#[tokio::test]
async fn qa_without_question_is_400() {
    let backend = ScriptedBackend::replying("unused");
    let app = router(backend.clone(), &[]);

    let (status, body) = post(
        app,
        "/qa",
        &[Part::Field("question", "   "), Part::File("lease.txt", CONTRACT)],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn jargon_defines_term() {
    let backend = ScriptedBackend::replying("Protection against loss.");
    let app = router(backend.clone(), &[]);

    let (status, body) = post(app, "/jargon", &[Part::Field("term", "indemnity")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["definition"], "Protection against loss.");
    assert_eq!(backend.prompts(), vec!["Explain in plain English: indemnity".to_string()]);
}

#[tokio::test]
async fn jargon_without_term_is_400() {
    let app = router(ScriptedBackend::replying("unused"), &[]);

    let (status, body) = post(app, "/jargon", &[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "INVALID_REQUEST");
}

// ── clauses ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delegated_clauses_are_reconciled() {
    let reply = r#"```json
[{"clause":"Liability is capped at fees paid.","explanation":"Limits damages.","risk":"medium"}]
```"#;
    let app = router(ScriptedBackend::replying(reply), &[]);

    let (status, body) = post(app, "/clauses", &[Part::File("lease.txt", CONTRACT)]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "delegated");
    assert_eq!(body["unparsed"], false);
    let clauses = body["clauses"].as_array().unwrap();
    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0]["clause"], "Liability is capped at fees paid.");
    assert_eq!(clauses[0]["risk"], "Medium");
}

#[tokio::test]
async fn clause_titled_parsing_error_is_still_parsed() {
    let reply = r#"[{"clause":"Parsing error","explanation":"Defines what counts as a parsing error.","risk":"low"}]"#;
    let app = router(ScriptedBackend::replying(reply), &[]);

    let (status, body) = post(app, "/clauses", &[Part::File("lease.txt", CONTRACT)]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unparsed"], false);
    let clauses = body["clauses"].as_array().unwrap();
    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0]["clause"], "Parsing error");
    assert_eq!(clauses[0]["risk"], "Low");
}

#[tokio::test]
async fn unparseable_clause_reply_is_one_sentinel() {
    let app = router(ScriptedBackend::replying("Sorry, I can't help with that."), &[]);

    let (status, body) = post(app, "/clauses", &[Part::File("lease.txt", CONTRACT)]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unparsed"], true);
    let clauses = body["clauses"].as_array().unwrap();
    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0]["clause"], "Parsing error");
    assert_eq!(clauses[0]["explanation"], "Sorry, I can't help with that.");
    assert_eq!(clauses[0]["risk"], "Unknown");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn heuristic_mode_from_query() {
    let backend = ScriptedBackend::new(vec![
        Ok("You must warn 30 days ahead.".into()),
        Ok("Medium".into()),
        Ok("Damages are limited.".into()),
        Ok("High.".into()),
    ]);
    let app = router(backend.clone(), &[]);

    let (status, body) = post(
        app,
        "/clauses?mode=heuristic",
        &[Part::File("lease.txt", CONTRACT)],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "heuristic");
    let clauses = body["clauses"].as_array().unwrap();
    assert_eq!(clauses.len(), 2);
    assert_eq!(clauses[0]["clause"], "Termination requires 30 days notice.");
    assert_eq!(clauses[0]["risk"], "Medium");
    assert_eq!(clauses[1]["clause"], "Liability is capped at fees paid.");
    assert_eq!(clauses[1]["risk"], "High");
    assert_eq!(backend.prompts().len(), 4);
}

#[tokio::test]
async fn configured_default_mode_applies() {
    let backend = ScriptedBackend::replying("unused");
    let app = router(backend.clone(), &[("CLAUSE_MODE", "heuristic")]);

    let (status, body) = post(app, "/clauses", &[Part::File("memo.txt", b"Nothing to see here.")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "heuristic");
    assert_eq!(body["clauses"].as_array().unwrap().len(), 0);
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn unknown_mode_is_400() {
    let app = router(ScriptedBackend::replying("unused"), &[]);

    let (status, _) = post(app, "/clauses?mode=psychic", &[Part::File("lease.txt", CONTRACT)]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── upload failures ──────────────────────────────────────────────────────────

#[tokio::test]
async fn undecodable_upload_is_422() {
    let backend = ScriptedBackend::replying("unused");
    let app = router(backend.clone(), &[]);

    let (status, body) = post(app, "/summary", &[Part::File("notes.txt", &[0x66, 0x6f, 0xff, 0xfe])]).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "TEXT_EXTRACTION_FAILED");
    assert!(backend.prompts().is_empty());
}

#[tokio::test]
async fn broken_pdf_is_422() {
    let app = router(ScriptedBackend::replying("unused"), &[]);

    let (status, body) = post(app, "/preview", &[Part::File("scan.pdf", b"%PDF-1.4 garbage")]).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "TEXT_EXTRACTION_FAILED");
}

#[tokio::test]
async fn missing_file_is_400() {
    let app = router(ScriptedBackend::replying("unused"), &[]);

    let (status, _) = post(app, "/summary", &[Part::Field("note", "no file here")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let app = router(ScriptedBackend::replying("unused"), &[("MAX_UPLOAD_BYTES", "1024")]);
    let big = vec![b'a'; 4096];

    let (status, _) = post(app, "/summary", &[Part::File("big.txt", &big)]).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
