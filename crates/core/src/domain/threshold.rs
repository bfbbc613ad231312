use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::entity::EntityType;
use crate::domain::organization::OrganizationId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThresholdId(pub String);

/// Sign-off level an amount threshold gates. Level two is the additional
/// sign-off required above a higher amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ApprovalLevel {
    One,
    Two,
}

impl ApprovalLevel {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    pub fn from_i64(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }
}

impl TryFrom<i64> for ApprovalLevel {
    type Error = String;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::from_i64(raw).ok_or_else(|| format!("approval level must be 1 or 2, got {raw}"))
    }
}

impl From<ApprovalLevel> for i64 {
    fn from(level: ApprovalLevel) -> Self {
        level.as_i64()
    }
}

/// Configured amount threshold: the minimum amount at which `approval_level`
/// applies for `entity_type` within one organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold {
    pub id: ThresholdId,
    pub organization_id: OrganizationId,
    pub entity_type: EntityType,
    pub threshold_amount: Decimal,
    pub approval_level: ApprovalLevel,
    pub approver_role: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation input for a threshold; identifiers and timestamps are assigned
/// by the service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdInput {
    pub entity_type: EntityType,
    pub threshold_amount: Decimal,
    pub approval_level: ApprovalLevel,
    #[serde(default)]
    pub approver_role: Option<String>,
}

/// Partial update; `None` fields are left untouched. Deactivation via
/// `is_active` is the only supported retirement path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdPatch {
    #[serde(default)]
    pub threshold_amount: Option<Decimal>,
    #[serde(default)]
    pub approval_level: Option<ApprovalLevel>,
    #[serde(default)]
    pub approver_role: Option<Option<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Threshold {
    pub fn apply_patch(&mut self, patch: ThresholdPatch, now: DateTime<Utc>) {
        if let Some(threshold_amount) = patch.threshold_amount {
            self.threshold_amount = threshold_amount;
        }
        if let Some(approval_level) = patch.approval_level {
            self.approval_level = approval_level;
        }
        if let Some(approver_role) = patch.approver_role {
            self.approver_role = approver_role;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = now;
    }
}
