use std::fmt;
use std::str::FromStr;

use board_common::OrderKey;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// Status column of an issue. Each column of a project is an independent
/// ordering sequence with its own key uniqueness scope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueColumn {
    Backlog,
    Ready,
    InProgress,
    InReview,
    Done,
}

impl IssueColumn {
    /// Board display order.
    pub const ALL: [IssueColumn; 5] = [
        Self::Backlog,
        Self::Ready,
        Self::InProgress,
        Self::InReview,
        Self::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Ready => "ready",
            Self::InProgress => "in_progress",
            Self::InReview => "in_review",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for IssueColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backlog" => Ok(Self::Backlog),
            "ready" => Ok(Self::Ready),
            "in_progress" => Ok(Self::InProgress),
            "in_review" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid column: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: String,
    pub column: IssueColumn,
    pub order_key: OrderKey,
    pub created_at: String,
    pub updated_at: String,
}

/// A request to reposition `target_id`.
///
/// With a destination the target lands immediately before it; without one
/// the target goes to the end of `column`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub target_id: i64,
    pub destination_id: Option<i64>,
    pub column: IssueColumn,
}

impl MoveRequest {
    pub fn to_end(target_id: i64, column: IssueColumn) -> Self {
        Self {
            target_id,
            destination_id: None,
            column,
        }
    }

    pub fn before(target_id: i64, destination_id: i64, column: IssueColumn) -> Self {
        Self {
            target_id,
            destination_id: Some(destination_id),
            column,
        }
    }
}

// API view types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub project: Project,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    pub name: IssueColumn,
    pub issues: Vec<Issue>,
}
