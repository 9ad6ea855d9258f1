//! Per-type phase sequences.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Phase, Status, WorkItemType};

/// Why a phase request was refused.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseRejection {
    /// The requested phase is not part of this type's sequence.
    NotInSequence,
    /// An item without a phase must start at the first phase.
    MustStartAt(Phase),
    /// The request jumps past the next phase.
    Skip { expected: Phase },
    /// The request goes backwards.
    Regression,
    SamePhase,
    /// The current phase is the last one for this type.
    SequenceComplete,
    /// Cancelled and archived items keep their last phase.
    Frozen(Status),
}

impl fmt::Display for PhaseRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInSequence => f.write_str("phase is not in this type's sequence"),
            Self::MustStartAt(first) => write!(f, "must start at {}", first),
            Self::Skip { expected } => write!(f, "cannot skip, next phase is {}", expected),
            Self::Regression => f.write_str("phases cannot move backwards"),
            Self::SamePhase => f.write_str("already at that phase"),
            Self::SequenceComplete => f.write_str("sequence is complete"),
            Self::Frozen(status) => write!(f, "phase is frozen while {}", status),
        }
    }
}

/// Allowed phases for a work item type, in order.
pub fn sequence(item_type: WorkItemType) -> &'static [Phase] {
    use Phase::*;

    match item_type {
        WorkItemType::Feature => &[
            D1Discovery,
            P1Plan,
            I1Implementation,
            R1Review,
            O1Operations,
            E1Evolution,
        ],
        WorkItemType::Enhancement => &[D1Discovery, P1Plan, I1Implementation, R1Review, O1Operations],
        WorkItemType::Bugfix => &[D1Discovery, I1Implementation, R1Review, O1Operations],
        WorkItemType::Research | WorkItemType::Planning => &[D1Discovery, P1Plan, R1Review],
        WorkItemType::Refactoring | WorkItemType::Documentation => {
            &[D1Discovery, P1Plan, I1Implementation, R1Review]
        }
        WorkItemType::Maintenance | WorkItemType::Security => {
            &[D1Discovery, P1Plan, I1Implementation, O1Operations]
        }
        WorkItemType::Monitoring => &[D1Discovery, O1Operations, E1Evolution],
        WorkItemType::FixBacklog => &[D1Discovery, I1Implementation, R1Review],
    }
}

/// The phase that follows `current`, or the first phase when there is none yet.
pub fn next_phase(item_type: WorkItemType, current: Option<Phase>) -> Option<Phase> {
    let seq = sequence(item_type);
    match current {
        None => seq.first().copied(),
        Some(phase) => {
            let idx = seq.iter().position(|p| *p == phase)?;
            seq.get(idx + 1).copied()
        }
    }
}

fn check(item_type: WorkItemType, current: Option<Phase>, requested: Phase) -> std::result::Result<(), PhaseRejection> {
    let seq = sequence(item_type);
    let Some(req_idx) = seq.iter().position(|p| *p == requested) else {
        return Err(PhaseRejection::NotInSequence);
    };

    let Some(current) = current else {
        return if req_idx == 0 {
            Ok(())
        } else {
            Err(PhaseRejection::MustStartAt(seq[0]))
        };
    };

    if current == requested {
        return Err(PhaseRejection::SamePhase);
    }

    // A current phase outside the sequence can only come from a type change.
    let Some(cur_idx) = seq.iter().position(|p| *p == current) else {
        return Err(PhaseRejection::NotInSequence);
    };

    if cur_idx + 1 == seq.len() {
        return Err(PhaseRejection::SequenceComplete);
    }
    if req_idx < cur_idx {
        return Err(PhaseRejection::Regression);
    }
    if req_idx != cur_idx + 1 {
        return Err(PhaseRejection::Skip {
            expected: seq[cur_idx + 1],
        });
    }
    Ok(())
}

/// Accept `requested` only if it is the immediate successor of `current`.
pub fn validate_phase_progression(
    item_type: WorkItemType,
    current: Option<Phase>,
    requested: Phase,
) -> Result<()> {
    check(item_type, current, requested).map_err(|reason| Error::InvalidPhaseProgression {
        item_type,
        current,
        requested,
        reason,
    })
}
