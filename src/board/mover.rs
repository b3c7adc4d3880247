//! Repositioning issues within and across columns.
//!
//! A move reads the neighbours around the landing spot, generates a key
//! between them and writes it back. Nothing is written until every check has
//! passed. Two concurrent moves to the same spot may pick the same key; the
//! store's uniqueness index catches that and the move fails with
//! [`MoveError::DuplicateOrderKey`]. Retrying is the caller's decision, see
//! [`retry_on_conflict`].

use board_common::{JitterSource, KeyGenerator, OrderKey, RandomJitter};
use tracing::{info, warn};

use super::models::{IssueColumn, MoveRequest};
use super::store::{CommitError, ItemOrderStore, PositionedItem};
use crate::errors::MoveError;

/// Default number of attempts the API makes before reporting a conflict.
pub const DEFAULT_MOVE_ATTEMPTS: u32 = 3;

pub struct MoveCoordinator<'a, S: ItemOrderStore + ?Sized, J: JitterSource = RandomJitter> {
    store: &'a S,
    keys: KeyGenerator<J>,
}

impl<'a, S: ItemOrderStore + ?Sized, J: JitterSource> MoveCoordinator<'a, S, J> {
    pub fn new(store: &'a S, keys: KeyGenerator<J>) -> Self {
        Self { store, keys }
    }

    /// Move the target to the end of `request.column`, or immediately before
    /// the destination issue when one is given. Returns the committed key.
    pub fn move_item(&mut self, request: &MoveRequest) -> Result<OrderKey, MoveError> {
        let target = self
            .store
            .resolve_item(request.target_id)?
            .ok_or(MoveError::TargetNotFound {
                id: request.target_id,
            })?;
        let column = request.column;

        let key = match request.destination_id {
            None => {
                let max = self
                    .store
                    .find_max_key(target.project_id, column, target.id)?;
                self.keys.generate(max.as_ref(), None)?
            }
            Some(destination_id) => {
                let destination = self.resolve_destination(&target, destination_id, column)?;
                let predecessor = self.store.find_predecessor_key(
                    target.project_id,
                    column,
                    &destination.order_key,
                    target.id,
                )?;
                self.keys
                    .generate(predecessor.as_ref(), Some(&destination.order_key))?
            }
        };

        match self.store.commit(target.id, column, &key) {
            Ok(()) => {
                info!(
                    issue_id = target.id,
                    destination_id = ?request.destination_id,
                    from_column = %target.column,
                    to_column = %column,
                    order_key = %key,
                    "issue moved"
                );
                Ok(key)
            }
            Err(CommitError::UniquenessViolation { column, key }) => {
                Err(MoveError::DuplicateOrderKey {
                    project_id: target.project_id,
                    column,
                    key,
                })
            }
            Err(CommitError::Store(e)) => Err(MoveError::Store(e)),
        }
    }

    fn resolve_destination(
        &self,
        target: &PositionedItem,
        destination_id: i64,
        column: IssueColumn,
    ) -> Result<PositionedItem, MoveError> {
        let invalid = |reason: &str| MoveError::InvalidDestination {
            target_id: target.id,
            destination_id,
            reason: reason.to_string(),
        };

        if destination_id == target.id {
            return Err(invalid("an issue cannot be moved relative to itself"));
        }
        let destination = self
            .store
            .resolve_item(destination_id)?
            .ok_or(MoveError::DestinationNotFound { id: destination_id })?;
        if destination.project_id != target.project_id {
            return Err(invalid("destination belongs to a different project"));
        }
        if destination.column != column {
            return Err(invalid("destination is not in the target column"));
        }
        Ok(destination)
    }
}

// ── Caller policy ─────────────────────────────────────────────────────

/// Run `op` up to `max_attempts` times while it fails with a retryable
/// conflict. Each attempt must re-read neighbour state, so `op` should be a
/// full `move_item` call rather than a bare commit.
pub fn retry_on_conflict<T>(
    max_attempts: u32,
    mut op: impl FnMut() -> Result<T, MoveError>,
) -> Result<T, MoveError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                warn!(attempt, max_attempts, error = %e, "order key conflict, retrying move");
                attempt += 1;
            }
            result => return result,
        }
    }
}
