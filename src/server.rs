//! HTTP front-end
//!
//! A single-page form plus a JSON endpoint, both driving the same
//! orchestrator. Finished files are served from the output directory
//! under `/videos`.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::downloader::{DownloadOrchestrator, DownloadOutcome, Stage, ToolInfo};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DownloadOrchestrator>,
    /// External tool status captured at startup
    pub tools: Arc<Vec<ToolInfo>>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(rename = "videoUrl", alias = "video_url", default)]
    pub video_url: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub stage: Stage,
    pub message: String,
    pub file_name: Option<String>,
    pub download_url: Option<String>,
}

impl From<&DownloadOutcome> for DownloadResponse {
    fn from(outcome: &DownloadOutcome) -> Self {
        let file_name = outcome.file_name();
        Self {
            success: outcome.is_success(),
            stage: outcome.stage,
            message: outcome.message.clone(),
            download_url: file_name.as_deref().map(video_link),
            file_name,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let videos = ServeDir::new(state.orchestrator.output_dir());

    Router::new()
        .route("/", get(index_page))
        .route("/download", post(download_form))
        .route("/api/download", post(api_download))
        .route("/api/tools", get(api_tools))
        .nest_service("/videos", videos)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_page() -> Html<String> {
    Html(render_page(None))
}

async fn download_form(
    State(state): State<AppState>,
    Form(request): Form<DownloadRequest>,
) -> Html<String> {
    let outcome = state.orchestrator.download(&request.video_url).await;
    Html(render_page(Some(&outcome)))
}

async fn api_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> Json<DownloadResponse> {
    let outcome = state.orchestrator.download(&request.video_url).await;
    Json(DownloadResponse::from(&outcome))
}

async fn api_tools(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    Json(state.tools.as_ref().clone())
}

fn video_link(file_name: &str) -> String {
    format!("/videos/{}", urlencoding::encode(file_name))
}

fn render_page(outcome: Option<&DownloadOutcome>) -> String {
    let status = match outcome {
        Some(outcome) => {
            let class = if outcome.is_success() { "ok" } else { "error" };
            let link = outcome
                .file_name()
                .map(|name| {
                    format!(
                        r#" <a href="{}" download>{}</a>"#,
                        html_escape(&video_link(&name)),
                        html_escape(&name)
                    )
                })
                .unwrap_or_default();
            format!(
                r#"<p class="{}">{}{}</p>"#,
                class,
                html_escape(&outcome.message),
                link
            )
        }
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>YouTube Downloader</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 3rem auto; }}
input[type=text] {{ width: 100%; padding: .5rem; }}
.ok {{ color: #176b2c; }}
.error {{ color: #a4161a; }}
</style>
</head>
<body>
<h1>YouTube Downloader</h1>
<form method="post" action="/download">
<input type="text" name="videoUrl" placeholder="https://www.youtube.com/watch?v=..." autofocus>
<button type="submit">Download</button>
</form>
{}
</body>
</html>
"#,
        status
    )
}

fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
