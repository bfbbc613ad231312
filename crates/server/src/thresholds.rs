use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, patch};
use axum::Router;
use rust_decimal::Decimal;
use serde::Deserialize;

use fieldgate_core::domain::entity::EntityType;
use fieldgate_core::domain::threshold::{
    ApprovalLevel, Threshold, ThresholdId, ThresholdInput, ThresholdPatch,
};
use fieldgate_core::errors::ApprovalError;

use crate::api::{error_response, AppState, ErrorResponse};
use crate::identity::caller_identity;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/thresholds", get(list_thresholds).post(create_threshold))
        .route("/api/thresholds/{id}", patch(update_threshold))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListThresholdsQuery {
    entity_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateThresholdBody {
    entity_type: String,
    threshold_amount: Decimal,
    approval_level: i64,
    #[serde(default)]
    approver_role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateThresholdBody {
    #[serde(default)]
    threshold_amount: Option<Decimal>,
    #[serde(default)]
    approval_level: Option<i64>,
    #[serde(default)]
    approver_role: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
}

async fn list_thresholds(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListThresholdsQuery>,
) -> Result<Json<Vec<Threshold>>, ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;
    let entity_type = query.entity_type.as_deref().map(EntityType::parse);

    let thresholds = state
        .service
        .list_thresholds(&identity.organization_id, entity_type.as_ref())
        .await
        .map_err(error_response)?;
    Ok(Json(thresholds))
}

async fn create_threshold(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateThresholdBody>,
) -> Result<(StatusCode, Json<Threshold>), ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;
    let approval_level = parse_level(body.approval_level).map_err(error_response)?;

    let threshold = state
        .service
        .create_threshold(
            &identity.organization_id,
            ThresholdInput {
                entity_type: EntityType::parse(&body.entity_type),
                threshold_amount: body.threshold_amount,
                approval_level,
                approver_role: body.approver_role,
            },
        )
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(threshold)))
}

async fn update_threshold(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateThresholdBody>,
) -> Result<Json<Threshold>, ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;
    let approval_level =
        body.approval_level.map(parse_level).transpose().map_err(error_response)?;

    let threshold = state
        .service
        .update_threshold(
            &identity.organization_id,
            &ThresholdId(id),
            ThresholdPatch {
                threshold_amount: body.threshold_amount,
                approval_level,
                approver_role: body.approver_role.map(Some),
                is_active: body.is_active,
            },
        )
        .await
        .map_err(error_response)?;
    Ok(Json(threshold))
}

fn parse_level(raw: i64) -> Result<ApprovalLevel, ApprovalError> {
    ApprovalLevel::from_i64(raw).ok_or_else(|| {
        ApprovalError::Validation(format!("approval_level must be 1 or 2, got {raw}"))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::Json;
    use chrono::Utc;
    use rust_decimal::Decimal;

    use fieldgate_core::activity::{InMemoryActivityNotifier, LabelCatalog};
    use fieldgate_core::decisions::DecisionEngine;
    use fieldgate_core::domain::organization::{Organization, OrganizationId};
    use fieldgate_db::repositories::{
        InMemoryApprovalRequestRepository, InMemoryOrganizationRepository,
        InMemoryThresholdRepository, OrganizationRepository,
    };

    use crate::api::AppState;
    use crate::service::ApprovalService;

    use super::{
        create_threshold, list_thresholds, update_threshold, CreateThresholdBody,
        ListThresholdsQuery, UpdateThresholdBody,
    };

    async fn state() -> AppState {
        let organizations = Arc::new(InMemoryOrganizationRepository::default());
        organizations
            .save(Organization {
                id: OrganizationId("org-1".to_string()),
                name: "Lakeside Restoration Co".to_string(),
                created_at: Utc::now(),
            })
            .await
            .expect("seed organization");

        AppState {
            service: Arc::new(ApprovalService::new(
                organizations,
                Arc::new(InMemoryThresholdRepository::default()),
                Arc::new(InMemoryApprovalRequestRepository::default()),
                Arc::new(InMemoryActivityNotifier::default()),
                DecisionEngine::default(),
                LabelCatalog::default(),
            )),
        }
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-organization-id", "org-1".parse().expect("header"));
        headers.insert("x-user-id", "u-admin".parse().expect("header"));
        headers
    }

    #[tokio::test]
    async fn create_list_and_update_threshold() {
        let state = state().await;

        let (status, Json(created)) = create_threshold(
            State(state.clone()),
            headers(),
            Json(CreateThresholdBody {
                entity_type: "estimate".to_string(),
                threshold_amount: Decimal::new(10_000, 0),
                approval_level: 1,
                approver_role: Some("ops_manager".to_string()),
            }),
        )
        .await
        .expect("create");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.approver_role.as_deref(), Some("ops_manager"));

        let Json(listed) = list_thresholds(
            State(state.clone()),
            headers(),
            Query(ListThresholdsQuery { entity_type: Some("estimate".to_string()) }),
        )
        .await
        .expect("list");
        assert_eq!(listed.len(), 1);

        let Json(updated) = update_threshold(
            State(state.clone()),
            headers(),
            Path(created.id.0.clone()),
            Json(UpdateThresholdBody {
                threshold_amount: None,
                approval_level: None,
                approver_role: None,
                is_active: Some(false),
            }),
        )
        .await
        .expect("update");
        assert!(!updated.is_active);

        let Json(listed) = list_thresholds(
            State(state),
            headers(),
            Query(ListThresholdsQuery { entity_type: Some("estimate".to_string()) }),
        )
        .await
        .expect("list after deactivation");
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn invalid_level_is_unprocessable() {
        let state = state().await;

        let (status, _) = create_threshold(
            State(state),
            headers(),
            Json(CreateThresholdBody {
                entity_type: "estimate".to_string(),
                threshold_amount: Decimal::new(10_000, 0),
                approval_level: 3,
                approver_role: None,
            }),
        )
        .await
        .expect_err("level 3 must fail");
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn missing_identity_is_unauthorized() {
        let state = state().await;

        let (status, _) = list_thresholds(
            State(state),
            HeaderMap::new(),
            Query(ListThresholdsQuery { entity_type: None }),
        )
        .await
        .expect_err("must fail");
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_threshold_update_is_not_found() {
        let state = state().await;

        let (status, _) = update_threshold(
            State(state),
            headers(),
            Path("thr-missing".to_string()),
            Json(UpdateThresholdBody {
                threshold_amount: None,
                approval_level: None,
                approver_role: None,
                is_active: Some(false),
            }),
        )
        .await
        .expect_err("must fail");
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
