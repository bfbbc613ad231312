use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use fieldgate_core::activity::{ActivityEvent, ActivityNotifier, LabelCatalog};
use fieldgate_core::decisions::{derive_final_status, Decision, DecisionEngine, StatusChange};
use fieldgate_core::domain::entity::EntityType;
use fieldgate_core::domain::organization::OrganizationId;
use fieldgate_core::domain::request::{ApprovalRequest, LevelStatus, RequestId, UserId};
use fieldgate_core::domain::threshold::{Threshold, ThresholdId, ThresholdInput, ThresholdPatch};
use fieldgate_core::errors::ApprovalError;
use fieldgate_core::policy;
use fieldgate_db::repositories::{
    ApprovalRequestRepository, OrganizationRepository, RepositoryError, RequestFilter,
    ThresholdRepository,
};

/// Creation input for an approval request; identity comes from the caller.
#[derive(Clone, Debug)]
pub struct RequestInput {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub amount: Decimal,
}

/// Orchestrates the threshold registry, the request store, and the decision
/// engine. Every operation is scoped to one organization; nothing here
/// holds state between calls.
pub struct ApprovalService {
    organizations: Arc<dyn OrganizationRepository>,
    thresholds: Arc<dyn ThresholdRepository>,
    requests: Arc<dyn ApprovalRequestRepository>,
    notifier: Arc<dyn ActivityNotifier>,
    engine: DecisionEngine,
    labels: LabelCatalog,
}

impl ApprovalService {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        thresholds: Arc<dyn ThresholdRepository>,
        requests: Arc<dyn ApprovalRequestRepository>,
        notifier: Arc<dyn ActivityNotifier>,
        engine: DecisionEngine,
        labels: LabelCatalog,
    ) -> Self {
        Self { organizations, thresholds, requests, notifier, engine, labels }
    }

    pub async fn list_thresholds(
        &self,
        organization_id: &OrganizationId,
        entity_type: Option<&EntityType>,
    ) -> Result<Vec<Threshold>, ApprovalError> {
        self.thresholds.list_active(organization_id, entity_type).await.map_err(storage)
    }

    pub async fn create_threshold(
        &self,
        organization_id: &OrganizationId,
        input: ThresholdInput,
    ) -> Result<Threshold, ApprovalError> {
        if input.threshold_amount < Decimal::ZERO {
            return Err(ApprovalError::Validation(
                "threshold_amount must be non-negative".to_string(),
            ));
        }

        self.organizations
            .find_by_id(organization_id)
            .await
            .map_err(storage)?
            .ok_or_else(|| ApprovalError::not_found("organization", &organization_id.0))?;

        let now = Utc::now();
        let threshold = Threshold {
            id: ThresholdId(Uuid::new_v4().to_string()),
            organization_id: organization_id.clone(),
            entity_type: input.entity_type,
            threshold_amount: input.threshold_amount,
            approval_level: input.approval_level,
            approver_role: input.approver_role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.thresholds.save(threshold.clone()).await.map_err(storage)?;
        Ok(threshold)
    }

    pub async fn update_threshold(
        &self,
        organization_id: &OrganizationId,
        id: &ThresholdId,
        patch: ThresholdPatch,
    ) -> Result<Threshold, ApprovalError> {
        if matches!(patch.threshold_amount, Some(amount) if amount < Decimal::ZERO) {
            return Err(ApprovalError::Validation(
                "threshold_amount must be non-negative".to_string(),
            ));
        }

        let mut threshold = self
            .thresholds
            .find_by_id(organization_id, id)
            .await
            .map_err(storage)?
            .ok_or_else(|| ApprovalError::not_found("approval threshold", &id.0))?;

        threshold.apply_patch(patch, Utc::now());
        self.thresholds.save(threshold.clone()).await.map_err(storage)?;
        Ok(threshold)
    }

    /// Whether an amount of this entity type needs approval at all. An
    /// entity type with no configured thresholds never does, even when
    /// other entity types are gated.
    pub async fn check_needs_approval(
        &self,
        organization_id: &OrganizationId,
        entity_type: &EntityType,
        amount: Decimal,
    ) -> Result<bool, ApprovalError> {
        let thresholds = self
            .thresholds
            .list_active(organization_id, Some(entity_type))
            .await
            .map_err(storage)?;
        Ok(policy::evaluate(&thresholds, amount).needs_approval)
    }

    pub async fn create_request(
        &self,
        organization_id: &OrganizationId,
        input: RequestInput,
        requested_by: UserId,
        requester: String,
    ) -> Result<ApprovalRequest, ApprovalError> {
        if input.entity_id.trim().is_empty() {
            return Err(ApprovalError::Validation("entity_id must not be empty".to_string()));
        }
        if input.amount < Decimal::ZERO {
            return Err(ApprovalError::Validation("amount must be non-negative".to_string()));
        }

        let thresholds = self
            .thresholds
            .list_active(organization_id, Some(&input.entity_type))
            .await
            .map_err(storage)?;
        let outcome = policy::evaluate(&thresholds, input.amount);

        let now = Utc::now();
        let request = ApprovalRequest {
            id: RequestId(Uuid::new_v4().to_string()),
            organization_id: organization_id.clone(),
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            amount: input.amount,
            requested_by,
            requester,
            requires_level2: outcome.requires_level2,
            level1_status: LevelStatus::Pending,
            level2_status: outcome.requires_level2.then_some(LevelStatus::Pending),
            level1_approver: None,
            level1_notes: None,
            level2_approver: None,
            level2_notes: None,
            final_status: derive_final_status(
                LevelStatus::Pending,
                outcome.requires_level2,
                outcome.requires_level2.then_some(LevelStatus::Pending),
            ),
            created_at: now,
            updated_at: now,
        };

        self.requests.insert(request.clone()).await.map_err(storage)?;

        let label = self.label_for(&request);
        self.notifier.notify(ActivityEvent::created(request.id.0.clone(), label));

        Ok(request)
    }

    pub async fn decide_level1(
        &self,
        organization_id: &OrganizationId,
        id: &RequestId,
        decision: Decision,
        approver: UserId,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let mut request = self.load_request(organization_id, id).await?;
        let observed_at = request.updated_at;

        let change = self.engine.apply_level1(&mut request, decision, approver)?;
        self.persist_decision(&request, observed_at, change).await?;
        Ok(request)
    }

    pub async fn decide_level2(
        &self,
        organization_id: &OrganizationId,
        id: &RequestId,
        decision: Decision,
        approver: UserId,
    ) -> Result<ApprovalRequest, ApprovalError> {
        let mut request = self.load_request(organization_id, id).await?;
        let observed_at = request.updated_at;

        let change = self.engine.apply_level2(&mut request, decision, approver)?;
        self.persist_decision(&request, observed_at, change).await?;
        Ok(request)
    }

    pub async fn get_request(
        &self,
        organization_id: &OrganizationId,
        id: &RequestId,
    ) -> Result<ApprovalRequest, ApprovalError> {
        self.load_request(organization_id, id).await
    }

    pub async fn list_requests(
        &self,
        organization_id: &OrganizationId,
        filter: RequestFilter,
    ) -> Result<Vec<ApprovalRequest>, ApprovalError> {
        self.requests.list(organization_id, filter).await.map_err(storage)
    }

    pub async fn pending_count(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<i64, ApprovalError> {
        self.requests.count_pending(organization_id).await.map_err(storage)
    }

    async fn load_request(
        &self,
        organization_id: &OrganizationId,
        id: &RequestId,
    ) -> Result<ApprovalRequest, ApprovalError> {
        self.requests
            .find_by_id(organization_id, id)
            .await
            .map_err(storage)?
            .ok_or_else(|| ApprovalError::not_found("approval request", &id.0))
    }

    async fn persist_decision(
        &self,
        request: &ApprovalRequest,
        observed_at: chrono::DateTime<Utc>,
        change: StatusChange,
    ) -> Result<(), ApprovalError> {
        let applied =
            self.requests.update_decision(request, observed_at).await.map_err(storage)?;
        if !applied {
            return Err(ApprovalError::InvalidStateTransition(
                "request was modified concurrently".to_string(),
            ));
        }

        let label = self.label_for(request);
        self.notifier.notify(ActivityEvent::status_changed(
            request.id.0.clone(),
            label,
            change.from,
            change.to,
        ));
        Ok(())
    }

    fn label_for(&self, request: &ApprovalRequest) -> String {
        self.labels.label(&request.entity_type, &request.entity_id, request.amount)
    }
}

fn storage(error: RepositoryError) -> ApprovalError {
    ApprovalError::Storage(error.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use fieldgate_core::activity::{InMemoryActivityNotifier, LabelCatalog};
    use fieldgate_core::decisions::{Decision, DecisionEngine, DecisionPolicy};
    use fieldgate_core::domain::entity::EntityType;
    use fieldgate_core::domain::organization::{Organization, OrganizationId};
    use fieldgate_core::domain::request::{FinalStatus, LevelStatus, UserId};
    use fieldgate_core::domain::threshold::{ApprovalLevel, ThresholdInput, ThresholdPatch};
    use fieldgate_core::errors::ApprovalError;
    use fieldgate_db::repositories::{
        InMemoryApprovalRequestRepository, InMemoryOrganizationRepository,
        InMemoryThresholdRepository, OrganizationRepository, RequestFilter,
    };

    use super::{ApprovalService, RequestInput};

    fn org_id() -> OrganizationId {
        OrganizationId("org-1".to_string())
    }

    async fn service() -> (ApprovalService, Arc<InMemoryActivityNotifier>) {
        service_with_policy(DecisionPolicy::default()).await
    }

    async fn service_with_policy(
        policy: DecisionPolicy,
    ) -> (ApprovalService, Arc<InMemoryActivityNotifier>) {
        let organizations = Arc::new(InMemoryOrganizationRepository::default());
        organizations
            .save(Organization {
                id: org_id(),
                name: "Lakeside Restoration Co".to_string(),
                created_at: Utc::now(),
            })
            .await
            .expect("seed organization");

        let notifier = Arc::new(InMemoryActivityNotifier::default());
        let service = ApprovalService::new(
            organizations,
            Arc::new(InMemoryThresholdRepository::default()),
            Arc::new(InMemoryApprovalRequestRepository::default()),
            notifier.clone(),
            DecisionEngine::new(policy),
            LabelCatalog::default(),
        );
        (service, notifier)
    }

    fn estimate_input(amount: i64) -> RequestInput {
        RequestInput {
            entity_type: EntityType::Estimate,
            entity_id: "EST-1042".to_string(),
            amount: Decimal::new(amount, 0),
        }
    }

    fn threshold_input(amount: i64, level: ApprovalLevel) -> ThresholdInput {
        ThresholdInput {
            entity_type: EntityType::Estimate,
            threshold_amount: Decimal::new(amount, 0),
            approval_level: level,
            approver_role: None,
        }
    }

    fn approve() -> Decision {
        Decision { approved: true, notes: None }
    }

    fn reject() -> Decision {
        Decision { approved: false, notes: Some("not justified".to_string()) }
    }

    #[tokio::test]
    async fn single_level_flow_approves_on_level1() {
        let (service, notifier) = service().await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("create threshold");

        assert!(service
            .check_needs_approval(&org_id(), &EntityType::Estimate, Decimal::new(15_000, 0))
            .await
            .expect("needs approval"));

        let request = service
            .create_request(
                &org_id(),
                estimate_input(15_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("create request");
        assert!(!request.requires_level2);
        assert_eq!(request.level2_status, None);
        assert_eq!(request.final_status, FinalStatus::Pending);

        let decided = service
            .decide_level1(&org_id(), &request.id, approve(), UserId("u-mgr".to_string()))
            .await
            .expect("decide level 1");
        assert_eq!(decided.final_status, FinalStatus::Approved);

        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].from_status, None);
        assert_eq!(events[1].to_status, Some(FinalStatus::Approved));
        assert!(events[1].label.contains("EST-1042"));
    }

    #[tokio::test]
    async fn two_level_flow_requires_both_approvals() {
        let (service, _) = service().await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("level 1 threshold");
        service
            .create_threshold(&org_id(), threshold_input(25_000, ApprovalLevel::Two))
            .await
            .expect("level 2 threshold");

        let request = service
            .create_request(
                &org_id(),
                estimate_input(50_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("create request");
        assert!(request.requires_level2);
        assert_eq!(request.level2_status, Some(LevelStatus::Pending));

        let after_level1 = service
            .decide_level1(&org_id(), &request.id, approve(), UserId("u-mgr".to_string()))
            .await
            .expect("decide level 1");
        assert_eq!(after_level1.final_status, FinalStatus::Pending);

        let after_level2 = service
            .decide_level2(&org_id(), &request.id, approve(), UserId("u-dir".to_string()))
            .await
            .expect("decide level 2");
        assert_eq!(after_level2.final_status, FinalStatus::Approved);
    }

    #[tokio::test]
    async fn level1_rejection_blocks_level2() {
        let (service, _) = service().await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("level 1 threshold");
        service
            .create_threshold(&org_id(), threshold_input(25_000, ApprovalLevel::Two))
            .await
            .expect("level 2 threshold");

        let request = service
            .create_request(
                &org_id(),
                estimate_input(50_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("create request");

        let rejected = service
            .decide_level1(&org_id(), &request.id, reject(), UserId("u-mgr".to_string()))
            .await
            .expect("decide level 1");
        assert_eq!(rejected.final_status, FinalStatus::Rejected);

        let error = service
            .decide_level2(&org_id(), &request.id, approve(), UserId("u-dir".to_string()))
            .await
            .expect_err("level 2 after rejection must fail");
        assert!(matches!(error, ApprovalError::InvalidStateTransition(_)));
    }

    #[tokio::test]
    async fn amount_below_thresholds_needs_no_approval() {
        let (service, _) = service().await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("create threshold");

        assert!(!service
            .check_needs_approval(&org_id(), &EntityType::Estimate, Decimal::new(5_000, 0))
            .await
            .expect("needs approval"));
    }

    #[tokio::test]
    async fn entity_type_without_thresholds_is_never_gated() {
        let (service, _) = service().await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("estimate threshold");

        assert!(!service
            .check_needs_approval(&org_id(), &EntityType::Proposal, Decimal::new(1_000_000, 0))
            .await
            .expect("needs approval"));
    }

    #[tokio::test]
    async fn requires_level2_is_frozen_against_later_threshold_edits() {
        let (service, _) = service().await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("level 1 threshold");

        let request = service
            .create_request(
                &org_id(),
                estimate_input(50_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("create request");
        assert!(!request.requires_level2);

        // A level-2 threshold added afterwards must not affect the in-flight
        // request.
        service
            .create_threshold(&org_id(), threshold_input(25_000, ApprovalLevel::Two))
            .await
            .expect("level 2 threshold");

        let reloaded = service.get_request(&org_id(), &request.id).await.expect("reload");
        assert!(!reloaded.requires_level2);

        let decided = service
            .decide_level1(&org_id(), &request.id, approve(), UserId("u-mgr".to_string()))
            .await
            .expect("decide level 1");
        assert_eq!(decided.final_status, FinalStatus::Approved);
    }

    #[tokio::test]
    async fn pending_count_reflects_final_status() {
        let (service, _) = service().await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("create threshold");

        let approved = service
            .create_request(
                &org_id(),
                estimate_input(12_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("request 1");
        service
            .decide_level1(&org_id(), &approved.id, approve(), UserId("u-mgr".to_string()))
            .await
            .expect("approve");

        let rejected = service
            .create_request(
                &org_id(),
                estimate_input(13_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("request 2");
        service
            .decide_level1(&org_id(), &rejected.id, reject(), UserId("u-mgr".to_string()))
            .await
            .expect("reject");

        service
            .create_request(
                &org_id(),
                estimate_input(14_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("request 3");

        let count = service.pending_count(&org_id()).await.expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unknown_request_is_not_found() {
        let (service, _) = service().await;
        let error = service
            .decide_level1(
                &org_id(),
                &fieldgate_core::domain::request::RequestId("req-missing".to_string()),
                approve(),
                UserId("u-mgr".to_string()),
            )
            .await
            .expect_err("must fail");
        assert!(matches!(error, ApprovalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn create_threshold_requires_resolvable_organization() {
        let (service, _) = service().await;
        let error = service
            .create_threshold(
                &OrganizationId("org-unknown".to_string()),
                threshold_input(10_000, ApprovalLevel::One),
            )
            .await
            .expect_err("must fail");
        assert!(matches!(error, ApprovalError::NotFound { resource: "organization", .. }));
    }

    #[tokio::test]
    async fn negative_threshold_amount_is_rejected() {
        let (service, _) = service().await;
        let error = service
            .create_threshold(
                &org_id(),
                ThresholdInput {
                    entity_type: EntityType::Estimate,
                    threshold_amount: Decimal::new(-1, 0),
                    approval_level: ApprovalLevel::One,
                    approver_role: None,
                },
            )
            .await
            .expect_err("must fail");
        assert!(matches!(error, ApprovalError::Validation(_)));
    }

    #[tokio::test]
    async fn update_threshold_deactivates_and_unknown_id_is_not_found() {
        let (service, _) = service().await;
        let threshold = service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("create threshold");

        let updated = service
            .update_threshold(
                &org_id(),
                &threshold.id,
                ThresholdPatch { is_active: Some(false), ..ThresholdPatch::default() },
            )
            .await
            .expect("deactivate");
        assert!(!updated.is_active);

        // Deactivated thresholds drop out of rule evaluation.
        assert!(!service
            .check_needs_approval(&org_id(), &EntityType::Estimate, Decimal::new(50_000, 0))
            .await
            .expect("needs approval"));

        let error = service
            .update_threshold(
                &org_id(),
                &fieldgate_core::domain::threshold::ThresholdId("thr-missing".to_string()),
                ThresholdPatch::default(),
            )
            .await
            .expect_err("must fail");
        assert!(matches!(error, ApprovalError::NotFound { .. }));
    }

    #[tokio::test]
    async fn redecision_is_rejected_unless_configured() {
        let (service, _) = service().await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("create threshold");
        let request = service
            .create_request(
                &org_id(),
                estimate_input(15_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("create request");

        service
            .decide_level1(&org_id(), &request.id, approve(), UserId("u-mgr".to_string()))
            .await
            .expect("first decision");
        let error = service
            .decide_level1(&org_id(), &request.id, reject(), UserId("u-other".to_string()))
            .await
            .expect_err("second decision must fail");
        assert!(matches!(error, ApprovalError::InvalidStateTransition(_)));

        let (service, _) =
            service_with_policy(DecisionPolicy { allow_redecision: true }).await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("create threshold");
        let request = service
            .create_request(
                &org_id(),
                estimate_input(15_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("create request");
        service
            .decide_level1(&org_id(), &request.id, approve(), UserId("u-mgr".to_string()))
            .await
            .expect("first decision");
        let overwritten = service
            .decide_level1(&org_id(), &request.id, reject(), UserId("u-other".to_string()))
            .await
            .expect("overwrite allowed by config");
        assert_eq!(overwritten.final_status, FinalStatus::Rejected);
    }

    #[tokio::test]
    async fn requests_are_invisible_to_other_organizations() {
        let (service, _) = service().await;
        service
            .create_threshold(&org_id(), threshold_input(10_000, ApprovalLevel::One))
            .await
            .expect("create threshold");
        let request = service
            .create_request(
                &org_id(),
                estimate_input(15_000),
                UserId("u-tech".to_string()),
                "Jordan Reyes".to_string(),
            )
            .await
            .expect("create request");

        let other = OrganizationId("org-2".to_string());
        let error =
            service.get_request(&other, &request.id).await.expect_err("cross-tenant read");
        assert!(matches!(error, ApprovalError::NotFound { .. }));

        let listed = service.list_requests(&other, RequestFilter::default()).await.expect("list");
        assert!(listed.is_empty());
    }
}
