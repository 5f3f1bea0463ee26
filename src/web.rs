use crate::api::Download;
use crate::config::AppConfig;
use crate::controller::Controller;
use crate::form::{DataType, QueryForm};
use crate::session::Sessions;
use crate::ui;
use crate::view::Progress;
use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use axum::{
    Form, Router,
    extract::{Query, State, WebSocketUpgrade},
    http::{HeaderName, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::trace::TraceLayer;

const X_FILENAME: HeaderName = HeaderName::from_static("x-filename");
const DEFAULT_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<Sessions>,
}

/// Every field of the page form, posted with each action.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageForm {
    session: String,
    device_mac: String,
    data_type: DataType,
    start_date: String,
    end_date: String,
    hours_from: String,
    hours_to: String,
    new_mac: String,
    new_name: String,
    confirmed: bool,
}

impl PageForm {
    fn query(&self) -> QueryForm {
        QueryForm {
            device_mac: self.device_mac.clone(),
            data_type: self.data_type,
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            hours_from: self.hours_from.clone(),
            hours_to: self.hours_to.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SessionQuery {
    session: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ui/view", get(app_view))
        .route("/ui/session/close", post(close_session))
        .route("/ui/devices/refresh", post(refresh_devices))
        .route("/ui/devices/select", post(select_device))
        .route("/ui/devices/test", post(test_device))
        .route("/ui/devices/save", post(save_device))
        .route("/ui/devices/remove", post(remove_device))
        .route("/ui/preview", post(preview))
        .route("/ui/preview/close", post(close_preview))
        .route("/ui/download", post(download))
        .route("/ws/progress", get(ws_progress))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState) -> Result<()> {
    let addr: SocketAddr = state.config.http_bind.parse()?;
    let router = router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("UI listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(graceful_shutdown())
        .await?;

    Ok(())
}

async fn graceful_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down http server");
}

/// Every page load starts a new session with default state.
async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let (session, controller) = state.sessions.open().await;
    Html(ui::render_html(&controller.view(), &session))
}

async fn app_view(State(state): State<AppState>, Query(query): Query<SessionQuery>) -> Response {
    match state.sessions.get(&query.session) {
        Some(controller) => render_app(&controller).into_response(),
        None => session_gone(),
    }
}

async fn close_session(State(state): State<AppState>, Form(query): Form<SessionQuery>) -> StatusCode {
    if state.sessions.close(&query.session) {
        tracing::debug!("closed page session");
    }
    StatusCode::NO_CONTENT
}

async fn refresh_devices(State(state): State<AppState>, Form(form): Form<PageForm>) -> Response {
    let Some(controller) = remember(&state, &form) else {
        return session_gone();
    };
    controller.load_devices().await;
    render_app(&controller).into_response()
}

async fn select_device(State(state): State<AppState>, Form(form): Form<PageForm>) -> Response {
    let Some(controller) = remember(&state, &form) else {
        return session_gone();
    };
    controller.select_device(&form.device_mac);
    render_app(&controller).into_response()
}

async fn test_device(State(state): State<AppState>, Form(form): Form<PageForm>) -> Response {
    let Some(controller) = remember(&state, &form) else {
        return session_gone();
    };
    let outcome = controller.test_device(&form.new_mac).await;
    tracing::debug!(?outcome, "device test finished");
    render_app(&controller).into_response()
}

async fn save_device(State(state): State<AppState>, Form(form): Form<PageForm>) -> Response {
    let Some(controller) = remember(&state, &form) else {
        return session_gone();
    };
    controller.save_device(&form.new_mac, &form.new_name).await;
    render_app(&controller).into_response()
}

async fn remove_device(State(state): State<AppState>, Form(form): Form<PageForm>) -> Response {
    let Some(controller) = remember(&state, &form) else {
        return session_gone();
    };
    controller
        .remove_device(&form.device_mac, form.confirmed)
        .await;
    render_app(&controller).into_response()
}

async fn preview(State(state): State<AppState>, Form(form): Form<PageForm>) -> Response {
    let Some(controller) = remember(&state, &form) else {
        return session_gone();
    };
    controller.preview(form.query()).await;
    render_app(&controller).into_response()
}

async fn close_preview(State(state): State<AppState>, Form(form): Form<PageForm>) -> Response {
    let Some(controller) = remember(&state, &form) else {
        return session_gone();
    };
    controller.close_preview();
    render_app(&controller).into_response()
}

/// Streams the export file, or re-renders the page when it was refused.
async fn download(State(state): State<AppState>, Form(form): Form<PageForm>) -> Response {
    let Some(controller) = remember(&state, &form) else {
        return session_gone();
    };
    match controller.download(form.query()).await {
        Some(file) => file_response(file),
        None => render_app(&controller).into_response(),
    }
}

fn file_response(file: Download) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    let content_type = file
        .content_type
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    (
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (X_FILENAME, file.filename),
        ],
        file.bytes,
    )
        .into_response()
}

/// Looks up the posting page and stores what it typed.
fn remember(state: &AppState, form: &PageForm) -> Option<Arc<Controller>> {
    let controller = state.sessions.get(&form.session)?;
    controller.update_inputs(form.query(), &form.new_mac, &form.new_name);
    Some(controller)
}

// The page outlived its state (restart or idle expiry); the script reloads.
fn session_gone() -> Response {
    StatusCode::GONE.into_response()
}

fn render_app(controller: &Controller) -> Html<String> {
    Html(ui::render_app(&controller.view()))
}

async fn ws_progress(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(controller) = state.sessions.get(&query.session) else {
        return session_gone();
    };
    let rx = controller.subscribe_progress();
    ws.on_upgrade(move |socket| handle_ws(socket, rx))
}

async fn handle_ws(mut socket: WebSocket, mut rx: broadcast::Receiver<Progress>) {
    loop {
        let progress = match rx.recv().await {
            Ok(progress) => progress,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress listener lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let payload = match serde_json::to_string(&progress) {
            Ok(s) => s,
            Err(_) => continue,
        };
        if socket.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }
}
