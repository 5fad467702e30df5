//! Router and request handlers.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tokio::sync::Mutex;
use toolsmith_action::{ActionContext, ActionError, ActionRegistry, ErrorObservation};
use toolsmith_sandbox::{FunctionCall, FunctionCallResult, StatusResponse};

use crate::config::ServerConfig;
use crate::run::run_function;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    lock: Arc<Mutex<()>>,
    registry: ActionRegistry,
    context: Arc<ActionContext>,
    config: Arc<ServerConfig>,
}

impl AppState {
    /// State serving a snapshot of the process-wide action table.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, toolsmith_action::registered())
    }

    /// State serving the actions in `registry`.
    pub fn with_registry(config: ServerConfig, registry: ActionRegistry) -> Self {
        let context = ActionContext::new(config.workspace_dir.clone(), config.mount_dir.clone())
            .mirror_output(config.mirror);
        Self {
            lock: Arc::new(Mutex::new(())),
            registry,
            context: Arc::new(context),
            config: Arc::new(config),
        }
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Build the sandbox router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/alive", get(alive))
        .route("/execute/{kind}", post(execute))
        .route("/run", post(run))
        .layer(middleware::from_fn_with_state(state.clone(), serialize))
        .with_state(state)
}

async fn serialize(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let _guard = state.lock.lock().await;
    next.run(request).await
}

async fn alive() -> Json<StatusResponse> {
    Json(StatusResponse::default())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorObservation::new(message))).into_response()
}

async fn execute(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let action = match state.registry.parse(&kind, body) {
        Ok(action) => action,
        Err(e @ ActionError::UnknownKind(_)) => {
            return error_response(StatusCode::NOT_FOUND, e.to_string());
        }
        Err(e) => {
            tracing::debug!(kind = %kind, error = %e, "rejected action");
            return error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string());
        }
    };

    tracing::info!(kind = %kind, command = %action.bash(), "executing action");
    match action.execute_dyn(&state.context).await {
        Ok(observation) => Json(observation).into_response(),
        Err(e) => {
            tracing::warn!(kind = %kind, error = %e, "action failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn run(
    State(state): State<AppState>,
    Json(call): Json<FunctionCall>,
) -> Result<Json<FunctionCallResult>, Response> {
    run_function(&state.config, &state.context.env, &call)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(function = %call.name, error = %e, "function run failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })
}
