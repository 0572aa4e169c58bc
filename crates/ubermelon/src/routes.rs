//! Router, handlers and server entry point.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::AppError;
use crate::pages;
use crate::session::{SessionId, SessionStore};
use crate::store::MelonStore;

/// Server behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Surface internal error details in response bodies.
    pub testing: bool,

    /// Wrap the router in an HTTP trace layer. Production only.
    pub request_tracing: bool,
}

impl AppConfig {
    /// Configuration used when a grader drives the app.
    pub fn testing() -> Self {
        Self {
            testing: true,
            request_tracing: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            testing: false,
            request_tracing: true,
        }
    }
}

/// Everything one app instance owns.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub melons: Arc<RwLock<MelonStore>>,
    pub sessions: Arc<RwLock<SessionStore>>,
}

impl AppState {
    /// Fresh state: the launch melons and no sessions.
    pub fn new(config: AppConfig) -> Self {
        Self::with_melons(config, MelonStore::most_loved())
    }

    pub fn with_melons(config: AppConfig, melons: MelonStore) -> Self {
        Self {
            config,
            melons: Arc::new(RwLock::new(melons)),
            sessions: Arc::new(RwLock::new(SessionStore::new())),
        }
    }
}

/// Build the HTTP router over `state`.
pub fn build_router(state: AppState) -> Router {
    let request_tracing = state.config.request_tracing;

    let router = Router::new()
        .route("/", get(show_homepage))
        .route("/get-name", get(get_name))
        .route("/top-melons", get(show_top_melons))
        .route("/love-melon", post(love_melon))
        .with_state(state);

    if request_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Serve a fresh router over `state` until the listener fails.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, testing = state.config.testing, "UberMelon listening");
    }
    axum::serve(listener, build_router(state)).await
}

impl AppError {
    /// Render this error as an HTML response.
    pub fn into_page(self, testing: bool) -> Response {
        let status = self.status();
        let detail = testing.then(|| self.to_string());
        (status, Html(pages::error_page(status.as_u16(), detail.as_deref()))).into_response()
    }
}

async fn visitor_name(state: &AppState, headers: &HeaderMap) -> Option<String> {
    let id = SessionId::from_headers(headers);
    state
        .sessions
        .read()
        .await
        .visitor_name(id)
        .map(str::to_string)
}

/// Homepage with the name form. Visitors we already know go straight to the melons.
async fn show_homepage(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if visitor_name(&state, &headers).await.is_some() {
        return Redirect::to("/top-melons").into_response();
    }
    Html(pages::homepage()).into_response()
}

#[derive(Debug, Deserialize)]
struct NameQuery {
    name: Option<String>,
}

/// Store the visitor name from the homepage form.
async fn get_name(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NameQuery>,
) -> Response {
    // Stored as given. A missing parameter still names the visitor, just with "".
    let name = query.name.unwrap_or_default();

    let current = SessionId::from_headers(&headers);
    let id = state.sessions.write().await.set_visitor_name(current, &name);
    debug!(session = %id, "visitor name stored");

    let redirect = Redirect::to("/top-melons");
    if current == Some(id) {
        redirect.into_response()
    } else {
        ([(SET_COOKIE, id.to_cookie())], redirect).into_response()
    }
}

/// The melon list, personalised for the visitor.
async fn show_top_melons(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(name) = visitor_name(&state, &headers).await else {
        return Redirect::to("/").into_response();
    };
    let melons = state.melons.read().await;
    Html(pages::top_melons(&name, &melons)).into_response()
}

#[derive(Debug, Deserialize)]
struct LoveForm {
    melon: String,
}

/// Add one love to the posted melon.
async fn love_melon(State(state): State<AppState>, Form(form): Form<LoveForm>) -> Response {
    let mut melons = state.melons.write().await;
    let loves = match melons.love(&form.melon) {
        Ok(loves) => loves,
        Err(e) => return e.into_page(state.config.testing),
    };
    let name = melons
        .get(&form.melon)
        .map(|m| m.name.clone())
        .unwrap_or_default();
    info!(melon = %form.melon, loves, "melon loved");
    (StatusCode::OK, Html(pages::thank_you(&name, loves))).into_response()
}
