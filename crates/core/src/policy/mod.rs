//! Threshold selection rule.
//!
//! A threshold applies when the amount reaches its configured minimum. The
//! rule is an existence check per level over the active thresholds for one
//! `(organization, entity_type)` pair: it never needs to pick a single
//! "best" threshold, only to know whether level 1 and/or level 2 apply.
//! The outcome is evaluated once at request-creation time and frozen into
//! the request; later threshold edits never retroactively change an
//! in-flight request's required levels.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::threshold::{ApprovalLevel, Threshold};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub needs_approval: bool,
    pub requires_level2: bool,
}

/// Evaluate the active thresholds against an amount.
///
/// An empty or fully-inactive threshold list yields no gate at all: absence
/// of configuration means no approval, not "approve everything".
pub fn evaluate(thresholds: &[Threshold], amount: Decimal) -> RuleOutcome {
    let mut outcome = RuleOutcome::default();

    for threshold in thresholds {
        if !threshold.is_active || amount < threshold.threshold_amount {
            continue;
        }
        outcome.needs_approval = true;
        if threshold.approval_level == ApprovalLevel::Two {
            outcome.requires_level2 = true;
        }
    }

    outcome
}
