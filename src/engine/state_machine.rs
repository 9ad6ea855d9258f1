//! Status transition tables for work items and tasks.

use crate::error::{Error, Result};
use crate::models::{EntityKind, Status};

/// Statuses reachable in one step from `status`.
pub fn allowed_next(kind: EntityKind, status: Status) -> &'static [Status] {
    use Status::*;

    match (kind, status) {
        (EntityKind::WorkItem, Draft) => &[Ready, Blocked, Cancelled],
        (EntityKind::WorkItem, Ready) => &[Active, Draft, Blocked, Cancelled],
        (EntityKind::WorkItem, Active) => &[Review, Blocked, Cancelled],
        (EntityKind::WorkItem, Review) => &[Done, Active, Blocked, Cancelled],
        (EntityKind::WorkItem, Blocked) => &[Draft, Ready, Active, Cancelled],
        (EntityKind::WorkItem, Done) => &[Archived],
        (EntityKind::WorkItem, Cancelled) => &[Archived],
        (EntityKind::WorkItem, Archived) => &[],

        (EntityKind::Task, Draft) => &[Ready, Blocked, Cancelled],
        (EntityKind::Task, Ready) => &[Active, Draft, Blocked, Cancelled],
        (EntityKind::Task, Active) => &[Review, Done, Blocked, Cancelled],
        (EntityKind::Task, Review) => &[Done, Active, Blocked, Cancelled],
        (EntityKind::Task, Blocked) => &[Ready, Active, Cancelled],
        (EntityKind::Task, Done | Cancelled | Archived) => &[],
    }
}

/// Whether `status` has no outgoing edges for this kind.
pub fn is_terminal(kind: EntityKind, status: Status) -> bool {
    allowed_next(kind, status).is_empty()
}

/// Check a single status edge. Pure: never touches the store.
///
/// Requesting the current status is always a no-op error, reported
/// separately from an edge that is missing from the table.
pub fn validate_transition(kind: EntityKind, current: Status, requested: Status) -> Result<()> {
    if current == requested {
        return Err(Error::NoOpTransition {
            kind,
            status: current,
        });
    }

    if !allowed_next(kind, current).contains(&requested) {
        return Err(Error::InvalidTransition {
            kind,
            from: current,
            to: requested,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_happy_path() {
        let path = [
            Status::Draft,
            Status::Ready,
            Status::Active,
            Status::Review,
            Status::Done,
            Status::Archived,
        ];
        for pair in path.windows(2) {
            validate_transition(EntityKind::WorkItem, pair[0], pair[1]).unwrap();
        }
    }

    #[test]
    fn test_work_item_cannot_skip_review() {
        let err = validate_transition(EntityKind::WorkItem, Status::Active, Status::Done).unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_task_may_finish_from_active() {
        validate_transition(EntityKind::Task, Status::Active, Status::Done).unwrap();
    }

    #[test]
    fn test_task_cannot_return_to_draft_from_blocked() {
        assert!(validate_transition(EntityKind::Task, Status::Blocked, Status::Draft).is_err());
        assert!(validate_transition(EntityKind::WorkItem, Status::Blocked, Status::Draft).is_ok());
    }

    #[test]
    fn test_no_op_is_reported_for_every_status() {
        for kind in [EntityKind::WorkItem, EntityKind::Task] {
            for status in Status::ALL {
                let err = validate_transition(kind, status, status).unwrap_err();
                assert_eq!(err.code(), "NO_OP_TRANSITION", "{} {}", kind, status);
            }
        }
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(is_terminal(EntityKind::WorkItem, Status::Archived));
        assert!(!is_terminal(EntityKind::WorkItem, Status::Done));
        assert!(is_terminal(EntityKind::Task, Status::Done));
        assert!(is_terminal(EntityKind::Task, Status::Cancelled));
    }

    #[test]
    fn test_tables_never_contain_self_edges() {
        for kind in [EntityKind::WorkItem, EntityKind::Task] {
            for status in Status::ALL {
                assert!(!allowed_next(kind, status).contains(&status));
            }
        }
    }
}
