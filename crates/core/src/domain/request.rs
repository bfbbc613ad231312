use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::entity::EntityType;
use crate::domain::organization::OrganizationId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Status of a single sign-off level. A level leaves `Pending` at most once;
/// decisions are not revocable by this engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStatus {
    Pending,
    Approved,
    Rejected,
}

impl LevelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Externally visible outcome of a request. Always derived from the level
/// statuses via `decisions::derive_final_status`, never written directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Pending,
    Approved,
    Rejected,
}

impl FinalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// One approval request per approvable action.
///
/// `requires_level2` is frozen from threshold evaluation at creation time and
/// never recomputed; later threshold edits do not touch in-flight requests.
/// `level2_status` is `None` exactly when `requires_level2` is false.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: RequestId,
    pub organization_id: OrganizationId,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub amount: Decimal,
    pub requested_by: UserId,
    pub requester: String,
    pub requires_level2: bool,
    pub level1_status: LevelStatus,
    pub level2_status: Option<LevelStatus>,
    pub level1_approver: Option<UserId>,
    pub level1_notes: Option<String>,
    pub level2_approver: Option<UserId>,
    pub level2_notes: Option<String>,
    pub final_status: FinalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{FinalStatus, LevelStatus};

    #[test]
    fn level_status_string_forms_round_trip() {
        for status in [LevelStatus::Pending, LevelStatus::Approved, LevelStatus::Rejected] {
            assert_eq!(LevelStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LevelStatus::parse("escalated"), None);
    }

    #[test]
    fn final_status_string_forms_round_trip() {
        for status in [FinalStatus::Pending, FinalStatus::Approved, FinalStatus::Rejected] {
            assert_eq!(FinalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(FinalStatus::parse(""), None);
    }
}
