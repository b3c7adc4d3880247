//! The storage contract the move logic is written against.

use anyhow::Result;
use board_common::OrderKey;
use thiserror::Error;

use super::models::IssueColumn;

/// Where an issue currently sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedItem {
    pub id: i64,
    pub project_id: i64,
    pub column: IssueColumn,
    pub order_key: OrderKey,
}

/// Failure to persist a new position.
#[derive(Debug, Error)]
pub enum CommitError {
    /// The `(project, column, key)` uniqueness index rejected the write.
    #[error("order key '{key}' already exists in column {column}")]
    UniquenessViolation { column: IssueColumn, key: String },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Per-(project, column) ordered sequences of issues.
///
/// Implementations must enforce uniqueness of `(project_id, column, key)` in
/// `commit`; that index is the only guard against two writers choosing the
/// same key.
pub trait ItemOrderStore {
    fn resolve_item(&self, id: i64) -> Result<Option<PositionedItem>>;

    /// Greatest key in the column, ignoring `excluding`.
    fn find_max_key(
        &self,
        project_id: i64,
        column: IssueColumn,
        excluding: i64,
    ) -> Result<Option<OrderKey>>;

    /// Greatest key strictly below `before_key` in the column, ignoring
    /// `excluding`.
    fn find_predecessor_key(
        &self,
        project_id: i64,
        column: IssueColumn,
        before_key: &OrderKey,
        excluding: i64,
    ) -> Result<Option<OrderKey>>;

    fn commit(&self, id: i64, column: IssueColumn, key: &OrderKey) -> Result<(), CommitError>;
}
