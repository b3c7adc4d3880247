//! Typed error hierarchy for the board service.
//!
//! Two top-level enums cover the two subsystems:
//! - `MoveError`: repositioning an issue (validation, key generation, commit)
//! - `BoardError`: maintenance commands around the ordering core

use board_common::KeyGenError;
use thiserror::Error;

use crate::board::models::IssueColumn;

/// Errors from moving an issue to a new position or column.
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("Issue {id} not found")]
    TargetNotFound { id: i64 },

    #[error("Destination issue {id} not found")]
    DestinationNotFound { id: i64 },

    #[error("Invalid destination {destination_id} for issue {target_id}: {reason}")]
    InvalidDestination {
        target_id: i64,
        destination_id: i64,
        reason: String,
    },

    #[error(transparent)]
    KeyGeneration(#[from] KeyGenError),

    /// Another writer committed the same key first. Re-resolving neighbours
    /// and trying again is safe.
    #[error("Order key '{key}' already taken in project {project_id}, column {column}")]
    DuplicateOrderKey {
        project_id: i64,
        column: IssueColumn,
        key: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl MoveError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DuplicateOrderKey { .. })
    }

    pub fn is_key_exhausted(&self) -> bool {
        matches!(self, Self::KeyGeneration(e) if e.is_exhausted())
    }
}

/// Errors from board maintenance commands outside the move path.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Project {id} not found")]
    ProjectNotFound { id: i64 },

    #[error("Invalid column '{column}'")]
    InvalidColumn { column: String },

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error(transparent)]
    Move(#[from] MoveError),
}
