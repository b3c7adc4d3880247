use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use board_common::{KeyGenError, OrderKey};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::error;

use super::db::DbHandle;
#[cfg(test)]
use super::db::BoardDb;
use super::models::{IssueColumn, MoveRequest};
use super::mover::{MoveCoordinator, retry_on_conflict};
use super::store::ItemOrderStore;
use super::ws::{WsMessage, broadcast_message};
use crate::config::OrderingSection;
use crate::errors::MoveError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
    pub ws_tx: broadcast::Sender<String>,
    pub ordering: OrderingSection,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: Option<String>,
    pub column: Option<String>,
}

/// Without `destination_id` the issue goes to the end of `column`.
#[derive(Deserialize)]
pub struct MoveIssueRequest {
    pub column: String,
    pub destination_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct OrderKeyRequest {
    pub left: Option<String>,
    pub right: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct OrderKeyResponse {
    pub key: String,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<KeyGenError> for ApiError {
    fn from(e: KeyGenError) -> Self {
        if e.is_exhausted() {
            ApiError::Internal(e.to_string())
        } else {
            ApiError::BadRequest(e.to_string())
        }
    }
}

impl From<MoveError> for ApiError {
    fn from(e: MoveError) -> Self {
        match e {
            MoveError::TargetNotFound { .. } | MoveError::DestinationNotFound { .. } => {
                ApiError::NotFound(e.to_string())
            }
            MoveError::InvalidDestination { .. } => ApiError::BadRequest(e.to_string()),
            MoveError::KeyGeneration(inner) => inner.into(),
            MoveError::DuplicateOrderKey { .. } => ApiError::Conflict(e.to_string()),
            MoveError::Store(inner) => ApiError::Internal(format!("{:#}", inner)),
        }
    }
}

fn parse_column(raw: &str) -> Result<IssueColumn, ApiError> {
    IssueColumn::from_str(raw).map_err(ApiError::BadRequest)
}

fn parse_bound(raw: Option<String>) -> Result<Option<OrderKey>, ApiError> {
    raw.map(OrderKey::try_from)
        .transpose()
        .map_err(ApiError::from)
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}/board", get(get_board))
        .route("/api/projects/{id}/issues", post(create_issue))
        .route(
            "/api/projects/{id}/columns/{column}/rebalance",
            post(rebalance_column),
        )
        .route("/api/issues/{id}", get(get_issue).delete(delete_issue))
        .route("/api/issues/{id}/move", patch(move_issue))
        .route("/api/order-keys", post(generate_order_key))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_projects(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let projects = state
        .db
        .call(move |db| db.list_projects())
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<SharedState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Project name must not be empty".into()));
    }
    let project = state
        .db
        .call(move |db| db.create_project(&name))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let board = state
        .db
        .call(move |db| db.get_board(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match board {
        Some(board) => Ok(Json(board)),
        None => Err(ApiError::NotFound(format!("Project {} not found", id))),
    }
}

async fn create_issue(
    State(state): State<SharedState>,
    Path(project_id): Path<i64>,
    Json(req): Json<CreateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let column = match &req.column {
        Some(c) => parse_column(c)?,
        None => IssueColumn::Backlog,
    };
    let title = req.title;
    let description = req.description.unwrap_or_default();
    let mut keys = state.ordering.key_generator();
    let issue = state
        .db
        .call(move |db| {
            if db.get_project(project_id)?.is_none() {
                return Ok(None);
            }
            db.create_issue(project_id, &title, &description, column, &mut keys)
                .map(Some)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("{:#}", e)))?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", project_id)))?;
    broadcast_message(
        &state.ws_tx,
        &WsMessage::IssueCreated {
            issue: issue.clone(),
        },
    );
    Ok((StatusCode::CREATED, Json(issue)))
}

async fn get_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = state
        .db
        .call(move |db| db.get_issue(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match issue {
        Some(issue) => Ok(Json(issue)),
        None => Err(ApiError::NotFound(format!("Issue {} not found", id))),
    }
}

async fn move_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<MoveIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let column = parse_column(&req.column)?;
    let request = MoveRequest {
        target_id: id,
        destination_id: req.destination_id,
        column,
    };
    let ordering = state.ordering.clone();
    let (from_column, issue) = state
        .db
        .call(move |db| {
            let before = db
                .resolve_item(id)?
                .ok_or(MoveError::TargetNotFound { id })?;
            let mut mover = MoveCoordinator::new(db, ordering.key_generator());
            retry_on_conflict(ordering.move_retry_attempts, || mover.move_item(&request))?;
            let issue = db
                .get_issue(id)?
                .ok_or(MoveError::TargetNotFound { id })?;
            Ok::<_, MoveError>((before.column, issue))
        })
        .await?;
    broadcast_message(
        &state.ws_tx,
        &WsMessage::IssueMoved {
            issue_id: id,
            from_column,
            to_column: issue.column,
            order_key: issue.order_key.clone(),
        },
    );
    Ok(Json(issue))
}

async fn delete_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .call(move |db| db.delete_issue(id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match deleted {
        true => {
            broadcast_message(&state.ws_tx, &WsMessage::IssueDeleted { issue_id: id });
            Ok(StatusCode::NO_CONTENT)
        }
        false => Err(ApiError::NotFound(format!("Issue {} not found", id))),
    }
}

async fn rebalance_column(
    State(state): State<SharedState>,
    Path((project_id, column)): Path<(i64, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let column = parse_column(&column)?;
    let keys = state.ordering.key_generator();
    let issues = state
        .db
        .call(move |db| {
            if db.get_project(project_id)?.is_none() {
                return Ok(None);
            }
            db.rebalance_column(project_id, column, &keys).map(Some)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("{:#}", e)))?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", project_id)))?;
    broadcast_message(
        &state.ws_tx,
        &WsMessage::ColumnRebalanced {
            project_id,
            column,
            issues: issues.clone(),
        },
    );
    Ok(Json(issues))
}

async fn generate_order_key(
    State(state): State<SharedState>,
    Json(req): Json<OrderKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let left = parse_bound(req.left)?;
    let right = parse_bound(req.right)?;
    let key = state
        .ordering
        .key_generator()
        .generate(left.as_ref(), right.as_ref())?;
    Ok(Json(OrderKeyResponse {
        key: key.into_string(),
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────
