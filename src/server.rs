//! Dashboard server.
//!
//! Serves a page with a name search box and a label switch; every change
//! fetches a freshly built figure from `/api/figure`.

use crate::reduction::Embedding;
use crate::visualize::{build_figure, escape_html, Figure, PartyPalette, PlotOptions};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8050,
        }
    }
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => {
                tracing::error!(detail = %other, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": true, "message": message }))).into_response()
    }
}

/// Everything the handlers read; computed once before the server starts
#[derive(Debug)]
pub struct AppState {
    pub embedding: Embedding,
    pub palette: PartyPalette,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct FigureQuery {
    search: Option<String>,
    labels: Option<String>,
}

fn parse_flag(raw: Option<&str>) -> Result<bool, ServerError> {
    match raw.map(|s| s.trim().to_lowercase()).as_deref() {
        None | Some("") | Some("true") | Some("1") | Some("on") => Ok(true),
        Some("false") | Some("0") | Some("off") => Ok(false),
        Some(other) => Err(ServerError::BadRequest(format!(
            "labels must be true or false, got '{}'",
            other
        ))),
    }
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(DASHBOARD_PAGE.replace("__TITLE__", &escape_html(&state.title)))
}

async fn figure(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FigureQuery>,
) -> Result<Json<Figure>, ServerError> {
    let options = PlotOptions {
        search: query.search,
        show_labels: parse_flag(query.labels.as_deref())?,
    };
    Ok(Json(build_figure(
        &state.embedding,
        &state.palette,
        &options,
        &state.title,
    )))
}

async fn members(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "method": state.embedding.method,
        "members": state.embedding.points,
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "members": state.embedding.points.len(),
        "parties": state.embedding.parties().len(),
    }))
}

async fn handle_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": true,
            "message": "Not found. Visit / for the dashboard or /api/health to check status.",
        })),
    )
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/figure", get(figure))
        .route("/api/members", get(members))
        .route("/api/health", get(health))
        .fallback(handle_404)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured host, which may be a name, IPv4 or IPv6 address
pub async fn bind(config: &ServerConfig) -> Result<tokio::net::TcpListener, ServerError> {
    Ok(tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?)
}

/// Run the dashboard until ctrl+c
pub async fn serve(state: AppState, config: ServerConfig) -> Result<(), ServerError> {
    let members = state.embedding.points.len();
    let app = create_router(Arc::new(state));

    let listener = bind(&config).await?;
    let addr = listener.local_addr()?;
    info!(address = %addr, members, "Dashboard listening");
    info!(url = %format!("http://{}", addr), "Open in a browser");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;

    info!("Dashboard stopped");
    Ok(())
}

const DASHBOARD_PAGE: &str = r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="UTF-8">
<title>__TITLE__</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
  body { font-family: sans-serif; margin: 1.5rem; }
  .controls { display: flex; gap: 1.5rem; align-items: center; margin-bottom: 0.5rem; }
  #plot { width: 100%; height: 82vh; }
</style>
</head>
<body>
<h1>__TITLE__</h1>
<div class="controls">
  <input id="search" type="search" placeholder="Search lawmaker name" autocomplete="off">
  <label><input id="labels" type="checkbox" checked> Show names</label>
</div>
<div id="plot"></div>
<script>
  const search = document.getElementById("search");
  const labels = document.getElementById("labels");
  let pending = null;
  let clickBound = false;

  async function replot() {
    const params = new URLSearchParams({ search: search.value, labels: labels.checked });
    const res = await fetch("/api/figure?" + params);
    if (!res.ok) return;
    const figure = await res.json();
    const plot = document.getElementById("plot");
    await Plotly.react(plot, figure.data, figure.layout, { responsive: true });
    if (!clickBound) {
      plot.on("plotly_click", (ev) => {
        const url = ev.points[0].customdata;
        if (url) window.open(url, "_blank");
      });
      clickBound = true;
    }
  }

  search.addEventListener("input", () => {
    clearTimeout(pending);
    pending = setTimeout(replot, 150);
  });
  labels.addEventListener("change", replot);

  replot();
</script>
</body>
</html>
"#;
