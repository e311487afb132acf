//! HTTP surface: Mini App endpoints, the Telegram webhook, and the
//! internal moderation-worker endpoint, all on one axum router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind};
use tokio::net::TcpListener;

use crate::core::config::{jobs, network, Config};
use crate::core::error::{AppError, AppResult};
use crate::sheets::{JobStatus, JobStore, NewJob};
use crate::telegram::auth::{init_data_user, verify_init_data};
use crate::telegram::moderation::{self, InflightGuard, WorkerJob};
use crate::telegram::{notifications, relay};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub bot: Bot,
    pub store: Arc<JobStore>,
    pub http: reqwest::Client,
    pub guard: Arc<InflightGuard>,
}

impl AppState {
    pub fn new(config: Arc<Config>, bot: Bot, store: Arc<JobStore>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(network::timeout())
            .build()
            .map_err(AppError::Http)?;
        Ok(Self {
            config,
            bot,
            store,
            http,
            guard: Arc::new(InflightGuard::new()),
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // 5xx details stay in the logs; clients get the generic tag.
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        }
        (status, Json(json!({ "error": self.tag() }))).into_response()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/jobs", post(create_job_handler))
        .route("/jobs/{id}", get(get_job_handler))
        .route("/applications", post(create_application_handler))
        .route("/telegram/webhook", post(telegram_webhook_handler))
        .route("/internal/callback-worker", post(callback_worker_handler))
        .route("/telegram/set-webhook", post(set_webhook_handler))
        .route("/telegram/webhook-info", get(webhook_info_handler))
        .layer(DefaultBodyLimit::max(jobs::MAX_CV_SIZE_BYTES + 64 * 1024))
        .with_state(state)
}

/// Binds and serves the router until the process exits.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    log::info!("Starting web server on http://{}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// GET /health — simple health check.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[derive(Debug, Deserialize)]
struct CreateJobRequest {
    title: String,
    description: String,
    category: Option<String>,
    salary: Option<String>,
    employer_id: String,
    employer_username: Option<String>,
    tg_init_data: String,
}

/// POST /jobs — verified Mini App job submission.
async fn create_job_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> AppResult<Json<serde_json::Value>> {
    if !verify_init_data(&req.tg_init_data, &state.config.bot_token) {
        return Err(AppError::Authenticity);
    }
    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        return Err(AppError::Validation("title and description are required".into()));
    }

    let job = state
        .store
        .create_job(NewJob {
            employer_id: req.employer_id,
            employer_username: req.employer_username.unwrap_or_default(),
            title: req.title,
            description: req.description,
            category: req.category.filter(|c| !c.trim().is_empty()),
            salary: req.salary.filter(|s| !s.trim().is_empty()),
        })
        .await?;

    notifications::notify_admin(&state.bot, &state.config, &job).await?;

    Ok(Json(json!({ "ok": true, "id": job.id })))
}

/// GET /jobs/{id} — public read of an active job.
async fn get_job_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let job = state.store.get_job_by_id(&id).await?;
    if job.status != JobStatus::Active {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({
        "id": job.id,
        "title": job.title,
        "description": job.description,
        "category": job.category,
        "salary": job.salary,
        "status": job.status,
        "employer": job.employer_id,
        "createdAt": job.created_at,
        "expiresAt": job.expires_at,
    })))
}

/// POST /applications — multipart CV submission.
async fn create_application_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<serde_json::Value>> {
    let mut job_id = String::new();
    let mut init_data = String::new();
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("bad multipart body: {}", e)))?
    {
        match field.name().unwrap_or_default() {
            "job_id" => {
                job_id = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("bad job_id field: {}", e)))?;
            }
            "tg_init_data" => {
                init_data = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("bad init data field: {}", e)))?;
            }
            "file" => {
                let name = field.file_name().unwrap_or("cv").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("bad file field: {}", e)))?;
                if bytes.len() > jobs::MAX_CV_SIZE_BYTES {
                    return Err(AppError::Validation("file too large".into()));
                }
                file = Some((name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    if !verify_init_data(&init_data, &state.config.bot_token) {
        return Err(AppError::Authenticity);
    }
    let Some((file_name, bytes)) = file else {
        return Err(AppError::Validation("missing file".into()));
    };
    if job_id.trim().is_empty() {
        return Err(AppError::Validation("missing job_id".into()));
    }

    let seeker_username = init_data_user(&init_data)
        .and_then(|u| u.username)
        .unwrap_or_default();

    relay::forward_cv(
        &state.bot,
        &state.store,
        &job_id,
        &seeker_username,
        &file_name,
        bytes,
    )
    .await?;

    Ok(Json(json!({ "ok": true })))
}

/// POST /telegram/webhook — inbound Telegram updates, guarded by the
/// secret-token header.
async fn telegram_webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Response {
    let presented = headers
        .get("x-telegram-bot-api-secret-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != state.config.webhook_secret {
        return AppError::Authorization.into_response();
    }

    if let UpdateKind::CallbackQuery(q) = update.kind {
        // Process off the webhook request: Telegram only needs the 200,
        // the outcome is reported through the admin-message edit.
        tokio::spawn(async move {
            if let Err(e) = moderation::handle_callback(
                &state.bot,
                &state.store,
                &state.config,
                &state.http,
                &state.guard,
                q,
            )
            .await
            {
                log::error!("moderation callback failed: {}", e);
            }
        });
    }

    StatusCode::OK.into_response()
}

#[derive(Debug, Deserialize)]
struct SecretQuery {
    secret: Option<String>,
}

fn check_secret(query: &SecretQuery, config: &Config) -> AppResult<()> {
    if query.secret.as_deref().unwrap_or_default() == config.webhook_secret {
        Ok(())
    } else {
        Err(AppError::Authorization)
    }
}

/// POST /internal/callback-worker — the worker side of the dual
/// moderation path; runs the transition in this process.
async fn callback_worker_handler(
    State(state): State<AppState>,
    Query(query): Query<SecretQuery>,
    Json(work): Json<WorkerJob>,
) -> AppResult<Json<serde_json::Value>> {
    check_secret(&query, &state.config)?;
    moderation::run_transition(&state.bot, &state.store, &state.config, &work).await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /telegram/set-webhook — registers this service's webhook URL
/// with Telegram.
async fn set_webhook_handler(
    State(state): State<AppState>,
    Query(query): Query<SecretQuery>,
) -> AppResult<Json<serde_json::Value>> {
    check_secret(&query, &state.config)?;
    let url = register_webhook(&state.bot, &state.config).await?;
    Ok(Json(json!({ "ok": true, "url": url })))
}

/// GET /telegram/webhook-info — current webhook registration as seen
/// by Telegram.
async fn webhook_info_handler(
    State(state): State<AppState>,
    Query(query): Query<SecretQuery>,
) -> AppResult<Json<serde_json::Value>> {
    check_secret(&query, &state.config)?;
    let info = state.bot.get_webhook_info().await?;
    Ok(Json(json!({
        "url": info.url.as_ref().map(|u| u.to_string()),
        "pending_update_count": info.pending_update_count,
        "last_error_message": info.last_error_message,
    })))
}

/// Points Telegram at `{public_url}/telegram/webhook` with the shared
/// secret attached. Returns the registered URL.
pub async fn register_webhook(bot: &Bot, config: &Config) -> AppResult<String> {
    let base = config
        .public_url
        .as_deref()
        .ok_or_else(|| AppError::Validation("PUBLIC_URL is not configured".into()))?;
    let webhook_url = format!("{}/telegram/webhook", base);
    let url = url::Url::parse(&webhook_url)
        .map_err(|e| AppError::Validation(format!("bad webhook URL {}: {}", webhook_url, e)))?;

    if config.webhook_secret.is_empty() {
        bot.set_webhook(url).await?;
    } else {
        bot.set_webhook(url)
            .secret_token(config.webhook_secret.clone())
            .await?;
    }

    log::info!("webhook registered at {}", webhook_url);
    Ok(webhook_url)
}
