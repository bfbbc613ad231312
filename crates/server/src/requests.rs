use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fieldgate_core::decisions::Decision;
use fieldgate_core::domain::entity::EntityType;
use fieldgate_core::domain::request::{ApprovalRequest, FinalStatus, RequestId, UserId};
use fieldgate_core::errors::ApprovalError;
use fieldgate_db::repositories::RequestFilter;

use crate::api::{error_response, AppState, ErrorResponse};
use crate::identity::caller_identity;
use crate::service::RequestInput;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/requests", get(list_requests).post(create_request))
        .route("/api/requests/{id}", get(get_request))
        .route("/api/requests/{id}/decide-level1", post(decide_level1))
        .route("/api/requests/{id}/decide-level2", post(decide_level2))
        .route("/api/pending-count", get(pending_count))
        .route("/api/needs-approval", get(needs_approval))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListRequestsQuery {
    entity_type: Option<String>,
    final_status: Option<String>,
    requested_by: Option<String>,
    pending_only: Option<bool>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CreateRequestBody {
    entity_type: String,
    entity_id: String,
    amount: Decimal,
    #[serde(default)]
    requester: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NeedsApprovalQuery {
    entity_type: String,
    amount: Decimal,
}

#[derive(Debug, Serialize)]
struct PendingCountResponse {
    pending: i64,
}

#[derive(Debug, Serialize)]
struct NeedsApprovalResponse {
    needs_approval: bool,
}

async fn list_requests(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<ApprovalRequest>>, ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;

    let final_status = query
        .final_status
        .as_deref()
        .map(|raw| {
            FinalStatus::parse(raw).ok_or_else(|| {
                ApprovalError::Validation(format!(
                    "final_status must be pending|approved|rejected, got `{raw}`"
                ))
            })
        })
        .transpose()
        .map_err(error_response)?;

    let filter = RequestFilter {
        entity_type: query.entity_type.as_deref().map(EntityType::parse),
        final_status,
        requested_by: query.requested_by.map(UserId),
        pending_only: query.pending_only.unwrap_or(false),
        limit: query.limit,
    };

    let requests = state
        .service
        .list_requests(&identity.organization_id, filter)
        .await
        .map_err(error_response)?;
    Ok(Json(requests))
}

async fn get_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApprovalRequest>, ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;

    let request = state
        .service
        .get_request(&identity.organization_id, &RequestId(id))
        .await
        .map_err(error_response)?;
    Ok(Json(request))
}

async fn create_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<ApprovalRequest>), ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;
    let requester = body.requester.unwrap_or_else(|| identity.display_name.clone());

    let request = state
        .service
        .create_request(
            &identity.organization_id,
            RequestInput {
                entity_type: EntityType::parse(&body.entity_type),
                entity_id: body.entity_id,
                amount: body.amount,
            },
            identity.user_id,
            requester,
        )
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn decide_level1(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(decision): Json<Decision>,
) -> Result<Json<ApprovalRequest>, ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;

    let request = state
        .service
        .decide_level1(&identity.organization_id, &RequestId(id), decision, identity.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(request))
}

async fn decide_level2(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(decision): Json<Decision>,
) -> Result<Json<ApprovalRequest>, ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;

    let request = state
        .service
        .decide_level2(&identity.organization_id, &RequestId(id), decision, identity.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(request))
}

async fn pending_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PendingCountResponse>, ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;

    let pending =
        state.service.pending_count(&identity.organization_id).await.map_err(error_response)?;
    Ok(Json(PendingCountResponse { pending }))
}

async fn needs_approval(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NeedsApprovalQuery>,
) -> Result<Json<NeedsApprovalResponse>, ErrorResponse> {
    let identity = caller_identity(&headers).map_err(error_response)?;

    let needs_approval = state
        .service
        .check_needs_approval(
            &identity.organization_id,
            &EntityType::parse(&query.entity_type),
            query.amount,
        )
        .await
        .map_err(error_response)?;
    Ok(Json(NeedsApprovalResponse { needs_approval }))
}
