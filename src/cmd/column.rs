use std::path::Path;

use forge_board::board::db::BoardDb;
use forge_board::board::models::{Issue, IssueColumn, MoveRequest};
use forge_board::board::mover::{MoveCoordinator, retry_on_conflict};
use forge_board::board::server::open_database;
use forge_board::config::OrderingSection;
use forge_board::errors::{BoardError, MoveError};

pub fn cmd_rebalance(
    db_path: &Path,
    ordering: &OrderingSection,
    project_id: i64,
    column: &str,
) -> Result<(), BoardError> {
    let column = parse_column(column)?;
    let db = open_project_db(db_path, project_id)?;
    let issues = db
        .rebalance_column(project_id, column, &ordering.key_generator())
        .map_err(BoardError::Database)?;
    print_column(&issues);
    Ok(())
}

pub fn cmd_move(
    db_path: &Path,
    ordering: &OrderingSection,
    issue_id: i64,
    column: &str,
    before: Option<i64>,
) -> Result<(), BoardError> {
    let column = parse_column(column)?;
    let db = open_database(db_path).map_err(BoardError::Database)?;
    let request = MoveRequest {
        target_id: issue_id,
        destination_id: before,
        column,
    };

    let mut mover = MoveCoordinator::new(&db, ordering.key_generator());
    retry_on_conflict(ordering.move_retry_attempts, || mover.move_item(&request))?;

    let issue = db
        .get_issue(issue_id)
        .map_err(BoardError::Database)?
        .ok_or(MoveError::TargetNotFound { id: issue_id })?;
    let issues = db
        .list_column(issue.project_id, column)
        .map_err(BoardError::Database)?;
    print_column(&issues);
    Ok(())
}

fn parse_column(raw: &str) -> Result<IssueColumn, BoardError> {
    raw.parse().map_err(|_| BoardError::InvalidColumn {
        column: raw.to_string(),
    })
}

fn open_project_db(db_path: &Path, project_id: i64) -> Result<BoardDb, BoardError> {
    let db = open_database(db_path).map_err(BoardError::Database)?;
    match db.get_project(project_id).map_err(BoardError::Database)? {
        Some(_) => Ok(db),
        None => Err(BoardError::ProjectNotFound { id: project_id }),
    }
}

fn print_column(issues: &[Issue]) {
    for issue in issues {
        println!("{}\t{}\t{}", issue.order_key, issue.id, issue.title);
    }
}
