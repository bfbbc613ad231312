//! Two-level decision state machine.
//!
//! Each level moves `pending -> {approved, rejected}` exactly once. The
//! composite state is `(level1_status, requires_level2, level2_status)` and
//! the externally visible `final_status` is always recomputed from it
//! through [`derive_final_status`] — every mutation path in the crate goes
//! through that one function.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::request::{ApprovalRequest, FinalStatus, LevelStatus, UserId};

/// Derivation table for the final status:
///
/// | level1   | requires_level2 | level2   | final    |
/// |----------|-----------------|----------|----------|
/// | pending  | —               | —        | pending  |
/// | rejected | —               | —        | rejected |
/// | approved | false           | —        | approved |
/// | approved | true            | pending  | pending  |
/// | approved | true            | approved | approved |
/// | approved | true            | rejected | rejected |
pub fn derive_final_status(
    level1: LevelStatus,
    requires_level2: bool,
    level2: Option<LevelStatus>,
) -> FinalStatus {
    match (level1, requires_level2) {
        (LevelStatus::Pending, _) => FinalStatus::Pending,
        (LevelStatus::Rejected, _) => FinalStatus::Rejected,
        (LevelStatus::Approved, false) => FinalStatus::Approved,
        (LevelStatus::Approved, true) => match level2.unwrap_or(LevelStatus::Pending) {
            LevelStatus::Pending => FinalStatus::Pending,
            LevelStatus::Approved => FinalStatus::Approved,
            LevelStatus::Rejected => FinalStatus::Rejected,
        },
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub approved: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Final-status movement produced by a decision, fed to the activity
/// notifier. `from == to` is possible (level 1 approval on a request that
/// still awaits level 2).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: FinalStatus,
    pub to: FinalStatus,
}

/// Governs what happens when a decision arrives for an already-decided
/// level. The default rejects the second decision; `allow_redecision`
/// restores the legacy overwrite behavior for hosts that depend on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecisionPolicy {
    pub allow_redecision: bool,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecisionError {
    #[error("level 1 must be approved before level 2")]
    LevelOneNotApproved,
    #[error("request does not require level 2 approval")]
    LevelTwoNotRequired,
    #[error("level {level} has already been decided")]
    AlreadyDecided { level: u8 },
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DecisionEngine {
    policy: DecisionPolicy,
}

impl DecisionEngine {
    pub fn new(policy: DecisionPolicy) -> Self {
        Self { policy }
    }

    /// Record the level-1 decision. A rejection here is terminal regardless
    /// of `requires_level2`.
    pub fn apply_level1(
        &self,
        request: &mut ApprovalRequest,
        decision: Decision,
        approver: UserId,
    ) -> Result<StatusChange, DecisionError> {
        if request.level1_status != LevelStatus::Pending && !self.policy.allow_redecision {
            return Err(DecisionError::AlreadyDecided { level: 1 });
        }

        let from = request.final_status;
        request.level1_status =
            if decision.approved { LevelStatus::Approved } else { LevelStatus::Rejected };
        request.level1_approver = Some(approver);
        request.level1_notes = decision.notes;
        Ok(self.finish(request, from))
    }

    /// Record the level-2 decision. Only reachable once level 1 is approved
    /// on a request that was created requiring level 2.
    pub fn apply_level2(
        &self,
        request: &mut ApprovalRequest,
        decision: Decision,
        approver: UserId,
    ) -> Result<StatusChange, DecisionError> {
        if !request.requires_level2 {
            return Err(DecisionError::LevelTwoNotRequired);
        }
        if request.level1_status != LevelStatus::Approved {
            return Err(DecisionError::LevelOneNotApproved);
        }
        if !matches!(request.level2_status, Some(LevelStatus::Pending) | None)
            && !self.policy.allow_redecision
        {
            return Err(DecisionError::AlreadyDecided { level: 2 });
        }

        let from = request.final_status;
        request.level2_status =
            Some(if decision.approved { LevelStatus::Approved } else { LevelStatus::Rejected });
        request.level2_approver = Some(approver);
        request.level2_notes = decision.notes;
        Ok(self.finish(request, from))
    }

    fn finish(&self, request: &mut ApprovalRequest, from: FinalStatus) -> StatusChange {
        request.final_status = derive_final_status(
            request.level1_status,
            request.requires_level2,
            request.level2_status,
        );
        request.updated_at = Utc::now();
        StatusChange { from, to: request.final_status }
    }
}
