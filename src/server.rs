//! HTTP surface: admin routes (API-key protected), the public widget routes
//! and the block render filter.

use crate::actions::{
    ActionError, ActionResult, LanguageActions, LanguageRequest, ADD_LANGUAGE_ACTION,
    REMOVE_LANGUAGE_ACTION,
};
use crate::blocks::annotate_block;
use crate::config::Config;
use crate::defaults::ConfigStore;
use crate::i18n::{select_language, LanguageRegistry};
use crate::payload::{build_payload, style_variables, widget_script};
use crate::sanitize::{sanitize_settings, sanitize_styles};
use crate::security::{is_authorized_admin, NonceIssuer};
use crate::store::{self, DocumentStore, StoreError};
use anyhow::{Context, Result};
use axum::async_trait;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub defaults: Arc<ConfigStore>,
    pub nonces: Arc<NonceIssuer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, defaults: ConfigStore, config: Config) -> Self {
        let ttl = chrono::Duration::hours(config.nonce_ttl_hours);
        Self {
            store,
            defaults: Arc::new(defaults),
            nonces: Arc::new(NonceIssuer::new(ttl)),
            config: Arc::new(config),
        }
    }

    fn is_admin(&self, headers: &HeaderMap) -> bool {
        let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        is_authorized_admin(authorization, &self.config.admin_api_key)
    }

    fn require_admin(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        if self.is_admin(headers) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    fn registry(&self) -> LanguageRegistry {
        LanguageRegistry::from_defaults(&self.defaults)
    }
}

/// Errors of the non-action routes.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    UnknownAction(String),
    Store(StoreError),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::UnknownAction(action) => {
                (StatusCode::NOT_FOUND, format!("Unknown action: {}", action))
            }
            ApiError::Store(e) => {
                error!("Store error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage error".to_string(),
                )
            }
            ApiError::Internal(message) => {
                error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Add/remove submission, accepted as JSON or as a urlencoded form. An
/// unreadable body becomes an empty submission and fails the nonce check.
pub struct LanguageSubmission(pub LanguageRequest);

#[async_trait]
impl<S> FromRequest<S> for LanguageSubmission
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let parsed = if is_json {
            Json::<LanguageRequest>::from_request(req, state)
                .await
                .map(|Json(r)| r)
                .ok()
        } else {
            Form::<LanguageRequest>::from_request(req, state)
                .await
                .map(|Form(r)| r)
                .ok()
        };

        if parsed.is_none() {
            warn!("Unreadable language submission body");
        }
        Ok(LanguageSubmission(parsed.unwrap_or_default()))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/admin/nonce/:action", post(issue_nonce))
        .route("/admin/languages", get(list_languages))
        .route("/admin/languages/add", post(add_language))
        .route("/admin/languages/remove", post(remove_language))
        .route("/admin/settings", get(get_settings).post(update_settings))
        .route("/admin/styles", get(get_styles).post(update_styles))
        .route("/admin/notice", get(take_notice))
        .route("/widget/payload", get(widget_payload))
        .route("/widget/script", get(widget_bootstrap))
        .route("/widget/styles.css", get(widget_styles))
        .route("/blocks/render", post(render_block))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `port` and serve until Ctrl-C.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    info!("Listening on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ==================== Admin ====================

#[derive(Debug, Serialize)]
struct NonceResponse {
    nonce: String,
}

async fn issue_nonce(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(action): Path<String>,
) -> Result<Json<NonceResponse>, ApiError> {
    state.require_admin(&headers)?;
    if action != ADD_LANGUAGE_ACTION && action != REMOVE_LANGUAGE_ACTION {
        return Err(ApiError::UnknownAction(action));
    }
    Ok(Json(NonceResponse {
        nonce: state.nonces.issue(&action),
    }))
}

#[derive(Debug, Serialize)]
struct LanguageEntry {
    code: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct LanguagesResponse {
    active: String,
    available: Vec<LanguageEntry>,
    existing: Vec<LanguageEntry>,
    addable: Vec<LanguageEntry>,
}

async fn list_languages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LanguagesResponse>, ApiError> {
    state.require_admin(&headers)?;
    let settings = store::load_settings(state.store.as_ref(), &state.defaults).await?;
    let registry = state.registry();

    let entry = |code: &str| LanguageEntry {
        code: code.to_string(),
        name: registry.display_name(code).to_string(),
    };

    Ok(Json(LanguagesResponse {
        active: settings.config.language.clone(),
        available: registry
            .list_available()
            .keys()
            .map(|c| entry(c.as_str()))
            .collect(),
        existing: settings.content.keys().map(|c| entry(c.as_str())).collect(),
        addable: registry
            .addable(&settings)
            .into_iter()
            .map(|(code, _)| entry(code))
            .collect(),
    }))
}

async fn add_language(
    State(state): State<AppState>,
    headers: HeaderMap,
    LanguageSubmission(request): LanguageSubmission,
) -> Result<Json<ActionResult>, ActionError> {
    let is_admin = state.is_admin(&headers);
    LanguageActions::new(state.store.as_ref(), &state.defaults, &state.nonces)
        .add_language(&request, is_admin)
        .await?;
    Ok(Json(ActionResult::ok()))
}

async fn remove_language(
    State(state): State<AppState>,
    headers: HeaderMap,
    LanguageSubmission(request): LanguageSubmission,
) -> Result<Json<ActionResult>, ActionError> {
    let is_admin = state.is_admin(&headers);
    LanguageActions::new(state.store.as_ref(), &state.defaults, &state.nonces)
        .remove_language(&request, is_admin)
        .await?;
    Ok(Json(ActionResult::ok()))
}

async fn get_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    state.require_admin(&headers)?;
    let settings = store::load_settings(state.store.as_ref(), &state.defaults).await?;
    Ok(Json(settings))
}

async fn update_settings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(raw): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    state.require_admin(&headers)?;
    let previous = store::load_settings(state.store.as_ref(), &state.defaults).await?;
    let sanitized = sanitize_settings(&raw, &previous, &state.registry());
    store::save_settings(state.store.as_ref(), &sanitized).await?;
    info!("Settings updated ({} languages)", sanitized.content.len());
    Ok(Json(sanitized))
}

async fn get_styles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    state.require_admin(&headers)?;
    let styles = store::load_styles(state.store.as_ref(), &state.defaults).await?;
    Ok(Json(styles))
}

async fn update_styles(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(raw): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    state.require_admin(&headers)?;
    let previous = store::load_styles(state.store.as_ref(), &state.defaults).await?;
    let sanitized = sanitize_styles(&raw, &previous);
    store::save_styles(state.store.as_ref(), &sanitized).await?;
    info!("Styles updated");
    Ok(Json(sanitized))
}

async fn take_notice(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    state.require_admin(&headers)?;
    let notice = store::take_notice(state.store.as_ref()).await?;
    Ok(Json(notice))
}

// ==================== Widget ====================

#[derive(Debug, Deserialize)]
struct PayloadQuery {
    language: Option<String>,
}

async fn selected_payload(
    state: &AppState,
    requested: Option<&str>,
) -> Result<crate::payload::WidgetPayload, ApiError> {
    let settings = store::load_settings(state.store.as_ref(), &state.defaults).await?;
    let language = select_language(requested, &settings);
    Ok(build_payload(&settings).with_language(language))
}

async fn widget_payload(
    State(state): State<AppState>,
    Query(query): Query<PayloadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = selected_payload(&state, query.language.as_deref()).await?;
    Ok(Json(payload))
}

async fn widget_bootstrap(
    State(state): State<AppState>,
    Query(query): Query<PayloadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = selected_payload(&state, query.language.as_deref()).await?;
    let script = widget_script(&payload).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(([(CONTENT_TYPE, "text/html; charset=utf-8")], script))
}

async fn widget_styles(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let styles = store::load_styles(state.store.as_ref(), &state.defaults).await?;
    Ok((
        [(CONTENT_TYPE, "text/css; charset=utf-8")],
        style_variables(&styles),
    ))
}

// ==================== Blocks ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest {
    block_name: String,
    #[serde(default)]
    attrs: Value,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct RenderResponse {
    content: String,
}

async fn render_block(Json(request): Json<RenderRequest>) -> Json<RenderResponse> {
    Json(RenderResponse {
        content: annotate_block(&request.block_name, &request.attrs, &request.content),
    })
}
