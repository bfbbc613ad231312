use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use fieldgate_core::domain::entity::EntityType;
use fieldgate_core::domain::organization::{Organization, OrganizationId};
use fieldgate_core::domain::request::{ApprovalRequest, FinalStatus, RequestId, UserId};
use fieldgate_core::domain::threshold::{Threshold, ThresholdId};

pub mod memory;
pub mod organization;
pub mod request;
pub mod threshold;

pub use memory::{
    InMemoryApprovalRequestRepository, InMemoryOrganizationRepository, InMemoryThresholdRepository,
};
pub use organization::SqlOrganizationRepository;
pub use request::SqlApprovalRequestRepository;
pub use threshold::SqlThresholdRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Query filters for request listings. `pending_only` is a convenience
/// equivalent to `final_status == pending`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub entity_type: Option<EntityType>,
    pub final_status: Option<FinalStatus>,
    pub requested_by: Option<UserId>,
    pub pending_only: bool,
    pub limit: Option<u32>,
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError>;
    async fn save(&self, organization: Organization) -> Result<(), RepositoryError>;
}

/// Threshold storage. Every read is scoped to one organization; thresholds
/// are never visible across tenants.
#[async_trait]
pub trait ThresholdRepository: Send + Sync {
    /// Active thresholds for the organization, optionally filtered by
    /// entity type, ordered ascending by amount. This ordering is the
    /// canonical one for both display and rule evaluation.
    async fn list_active(
        &self,
        organization_id: &OrganizationId,
        entity_type: Option<&EntityType>,
    ) -> Result<Vec<Threshold>, RepositoryError>;

    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &ThresholdId,
    ) -> Result<Option<Threshold>, RepositoryError>;

    async fn save(&self, threshold: Threshold) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ApprovalRequestRepository: Send + Sync {
    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError>;

    async fn insert(&self, request: ApprovalRequest) -> Result<(), RepositoryError>;

    /// Conditional write for a decision: applies only if the stored row
    /// still carries `expected_updated_at`, so a concurrent decision on the
    /// same request loses instead of silently overwriting. Returns whether
    /// the write was applied.
    async fn update_decision(
        &self,
        request: &ApprovalRequest,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Filtered listing, always ordered newest-created first.
    async fn list(
        &self,
        organization_id: &OrganizationId,
        filter: RequestFilter,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError>;

    /// Count of requests whose final status is pending, via a count query
    /// rather than a row scan.
    async fn count_pending(&self, organization_id: &OrganizationId)
        -> Result<i64, RepositoryError>;
}
