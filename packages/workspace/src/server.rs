//! HTTP surface of the live editor.

use crate::preview::{PreviewError, PreviewSession};
use crate::publish::Publisher;
use crate::reviews::ReviewSource;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::json;
use sitecraft_editor::{decode_outbound, encode};
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

const EDITOR_SHELL: &str = include_str!("../assets/editor.html");

#[derive(Clone)]
pub struct AppState {
    pub preview: Arc<PreviewSession>,
    pub publisher: Publisher,
    pub reviews: Arc<dyn ReviewSource>,
}

/// Blob directory served under the public URL prefix.
pub struct AssetMount {
    pub prefix: String,
    pub dir: PathBuf,
}

pub fn router(state: AppState, assets: Option<AssetMount>) -> Router {
    let app = Router::new()
        .route("/", get(editor_shell))
        .route("/preview", get(preview_page))
        .route("/api/content", get(content))
        .route("/api/messages", post(message))
        .route("/api/edit-mode", post(edit_mode))
        .route("/api/events", get(events))
        .route("/api/publish", post(publish))
        .route("/api/reviews", get(reviews))
        .with_state(state);

    let app = match assets {
        Some(mount) if mount.prefix.starts_with('/') && mount.prefix.len() > 1 => {
            app.nest_service(mount.prefix.trim_end_matches('/'), ServeDir::new(mount.dir))
        }
        Some(mount) => {
            tracing::warn!(prefix = %mount.prefix, "public URL is not a local path, blobs not served");
            app
        }
        None => app,
    };

    app.layer(CorsLayer::permissive())
}

pub async fn serve(addr: &str, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}

fn error_response(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

fn preview_error(err: PreviewError) -> Response {
    let status = match err {
        PreviewError::Path(_) | PreviewError::Payload(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PreviewError::Storage(_) | PreviewError::Template { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(error = %err, "request failed");
    error_response(status, err)
}

async fn editor_shell() -> Html<&'static str> {
    Html(EDITOR_SHELL)
}

async fn preview_page(State(state): State<AppState>) -> Response {
    match state.preview.render().await {
        Ok(html) => Html(html).into_response(),
        Err(err) => preview_error(err),
    }
}

async fn content(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.preview.tree().await)
}

/// Malformed or unknown messages are dropped with `204 No Content`.
async fn message(State(state): State<AppState>, body: String) -> Response {
    let Some(message) = decode_outbound(&body) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    match state.preview.apply(message).await {
        Ok(applied) => Json(applied).into_response(),
        Err(err) => preview_error(err),
    }
}

#[derive(Debug, Deserialize)]
struct EditModeRequest {
    enabled: bool,
}

async fn edit_mode(State(state): State<AppState>, Json(request): Json<EditModeRequest>) -> StatusCode {
    state.preview.set_edit_mode(request.enabled);
    StatusCode::NO_CONTENT
}

/// Inbound messages for the frame, one SSE event each.
async fn events(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.preview.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let event = Event::default().data(encode(&message));
                    return Some((Ok(event), rx));
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("[SSE] Subscriber lagged by {} messages", n);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
}

async fn publish(State(state): State<AppState>) -> Response {
    match state.publisher.publish().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": err.to_string(),
                "completedStage": err.completed_stage(),
            })),
        )
            .into_response(),
    }
}

async fn reviews(State(state): State<AppState>) -> Json<Vec<crate::reviews::Review>> {
    Json(state.reviews.fetch().await)
}
