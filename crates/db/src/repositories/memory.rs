use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use fieldgate_core::domain::entity::EntityType;
use fieldgate_core::domain::organization::{Organization, OrganizationId};
use fieldgate_core::domain::request::{ApprovalRequest, FinalStatus, RequestId};
use fieldgate_core::domain::threshold::{Threshold, ThresholdId};

use super::{
    ApprovalRequestRepository, OrganizationRepository, RepositoryError, RequestFilter,
    ThresholdRepository,
};

#[derive(Default)]
pub struct InMemoryOrganizationRepository {
    organizations: RwLock<HashMap<String, Organization>>,
}

#[async_trait::async_trait]
impl OrganizationRepository for InMemoryOrganizationRepository {
    async fn find_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        let organizations = self.organizations.read().await;
        Ok(organizations.get(&id.0).cloned())
    }

    async fn save(&self, organization: Organization) -> Result<(), RepositoryError> {
        let mut organizations = self.organizations.write().await;
        organizations.insert(organization.id.0.clone(), organization);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryThresholdRepository {
    thresholds: RwLock<HashMap<String, Threshold>>,
}

#[async_trait::async_trait]
impl ThresholdRepository for InMemoryThresholdRepository {
    async fn list_active(
        &self,
        organization_id: &OrganizationId,
        entity_type: Option<&EntityType>,
    ) -> Result<Vec<Threshold>, RepositoryError> {
        let thresholds = self.thresholds.read().await;
        let mut listed: Vec<Threshold> = thresholds
            .values()
            .filter(|threshold| {
                threshold.organization_id == *organization_id
                    && threshold.is_active
                    && entity_type.map(|et| threshold.entity_type == *et).unwrap_or(true)
            })
            .cloned()
            .collect();

        listed.sort_by(|left, right| {
            left.threshold_amount
                .cmp(&right.threshold_amount)
                .then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(listed)
    }

    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &ThresholdId,
    ) -> Result<Option<Threshold>, RepositoryError> {
        let thresholds = self.thresholds.read().await;
        Ok(thresholds
            .get(&id.0)
            .filter(|threshold| threshold.organization_id == *organization_id)
            .cloned())
    }

    async fn save(&self, threshold: Threshold) -> Result<(), RepositoryError> {
        let mut thresholds = self.thresholds.write().await;
        thresholds.insert(threshold.id.0.clone(), threshold);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryApprovalRequestRepository {
    requests: RwLock<HashMap<String, ApprovalRequest>>,
}

#[async_trait::async_trait]
impl ApprovalRequestRepository for InMemoryApprovalRequestRepository {
    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests
            .get(&id.0)
            .filter(|request| request.organization_id == *organization_id)
            .cloned())
    }

    async fn insert(&self, request: ApprovalRequest) -> Result<(), RepositoryError> {
        let mut requests = self.requests.write().await;
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn update_decision(
        &self,
        request: &ApprovalRequest,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut requests = self.requests.write().await;
        match requests.get_mut(&request.id.0) {
            Some(stored)
                if stored.organization_id == request.organization_id
                    && stored.updated_at == expected_updated_at =>
            {
                *stored = request.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(
        &self,
        organization_id: &OrganizationId,
        filter: RequestFilter,
    ) -> Result<Vec<ApprovalRequest>, RepositoryError> {
        let final_status = if filter.pending_only {
            Some(FinalStatus::Pending)
        } else {
            filter.final_status
        };

        let requests = self.requests.read().await;
        let mut listed: Vec<ApprovalRequest> = requests
            .values()
            .filter(|request| {
                request.organization_id == *organization_id
                    && filter
                        .entity_type
                        .as_ref()
                        .map(|et| request.entity_type == *et)
                        .unwrap_or(true)
                    && final_status.map(|status| request.final_status == status).unwrap_or(true)
                    && filter
                        .requested_by
                        .as_ref()
                        .map(|user| request.requested_by == *user)
                        .unwrap_or(true)
            })
            .cloned()
            .collect();

        listed.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.0.cmp(&left.id.0))
        });
        if let Some(limit) = filter.limit {
            listed.truncate(limit as usize);
        }
        Ok(listed)
    }

    async fn count_pending(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<i64, RepositoryError> {
        let requests = self.requests.read().await;
        Ok(requests
            .values()
            .filter(|request| {
                request.organization_id == *organization_id
                    && request.final_status == FinalStatus::Pending
            })
            .count() as i64)
    }
}
