use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use fieldgate_core::domain::entity::EntityType;
use fieldgate_core::domain::organization::OrganizationId;
use fieldgate_core::domain::request::{
    ApprovalRequest, FinalStatus, LevelStatus, RequestId, UserId,
};

use super::{ApprovalRequestRepository, RepositoryError, RequestFilter};
use crate::DbPool;

pub struct SqlApprovalRequestRepository {
    pool: DbPool,
}

impl SqlApprovalRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const REQUEST_COLUMNS: &str = "id, organization_id, entity_type, entity_id, amount, \
     requested_by, requester, requires_level2, level1_status, level2_status, \
     level1_approver, level1_notes, level2_approver, level2_notes, final_status, \
     created_at, updated_at";

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalRequest, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let organization_id: String =
        row.try_get("organization_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let entity_type: String =
        row.try_get("entity_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let entity_id: String =
        row.try_get("entity_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_str: String =
        row.try_get("amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requested_by: String =
        row.try_get("requested_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requester: String =
        row.try_get("requester").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let requires_level2: bool =
        row.try_get("requires_level2").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level1_status_str: String =
        row.try_get("level1_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level2_status_str: Option<String> =
        row.try_get("level2_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level1_approver: Option<String> =
        row.try_get("level1_approver").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level1_notes: Option<String> =
        row.try_get("level1_notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level2_approver: Option<String> =
        row.try_get("level2_approver").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let level2_notes: Option<String> =
        row.try_get("level2_notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let final_status_str: String =
        row.try_get("final_status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let amount = Decimal::from_str(&amount_str)
        .map_err(|e| RepositoryError::Decode(format!("invalid amount: {e}")))?;
    let level1_status = LevelStatus::parse(&level1_status_str).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid level1_status: {level1_status_str}"))
    })?;
    let level2_status = level2_status_str
        .map(|raw| {
            LevelStatus::parse(&raw)
                .ok_or_else(|| RepositoryError::Decode(format!("invalid level2_status: {raw}")))
        })
        .transpose()?;
    let final_status = FinalStatus::parse(&final_status_str).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid final_status: {final_status_str}"))
    })?;
    let created_at = parse_timestamp("created_at", &created_at_str)?;
    let updated_at = parse_timestamp("updated_at", &updated_at_str)?;

    Ok(ApprovalRequest {
        id: RequestId(id),
        organization_id: OrganizationId(organization_id),
        entity_type: EntityType::parse(&entity_type),
        entity_id,
        amount,
        requested_by: UserId(requested_by),
        requester,
        requires_level2,
        level1_status,
        level2_status,
        level1_approver: level1_approver.map(UserId),
        level1_notes,
        level2_approver: level2_approver.map(UserId),
        level2_notes,
        final_status,
        created_at,
        updated_at,
    })
}

fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid {field}: {e}")))
}

#[async_trait::async_trait]
impl ApprovalRequestRepository for SqlApprovalRequestRepository {
    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &RequestId,
    ) -> Result<Option<ApprovalRequest>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM approval_request
             WHERE organization_id = ? AND id = ?",
        ))
        .bind(&organization_id.0)
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    async fn insert(&self, request: ApprovalRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO approval_request (id, organization_id, entity_type, entity_id, amount,
                                           requested_by, requester, requires_level2,
                                           level1_status, level2_status,
                                           level1_approver, level1_notes,
                                           level2_approver, level2_notes,
                                           final_status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.organization_id.0)
        .bind(request.entity_type.as_str())
        .bind(&request.entity_id)
        .bind(request.amount.to_string())
        .bind(&request.requested_by.0)
        .bind(&request.requester)
        .bind(request.requires_level2)
        .bind(request.level1_status.as_str())
        .bind(request.level2_status.map(LevelStatus::as_str))
        .bind(request.level1_approver.as_ref().map(|u| u.0.as_str()))
        .bind(&request.level1_notes)
        .bind(request.level2_approver.as_ref().map(|u| u.0.as_str()))
        .bind(&request.level2_notes)
        .bind(request.final_status.as_str())
        .bind(request.created_at.to_rfc3339())
        .bind(request.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_decision(
        &self,
        request: &ApprovalRequest,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE approval_request SET
                 level1_status = ?,
                 level2_status = ?,
                 level1_approver = ?,
                 level1_notes = ?,
                 level2_approver = ?,
                 level2_notes = ?,
                 final_status = ?,
                 updated_at = ?
             WHERE id = ? AND organization_id = ? AND updated_at = ?",
        )
        .bind(request.level1_status.as_str())
        .bind(request.level2_status.map(LevelStatus::as_str))
        .bind(request.level1_approver.as_ref().map(|u| u.0.as_str()))
        .bind(&request.level1_notes)
        .bind(request.level2_approver.as_ref().map(|u| u.0.as_str()))
        .bind(&request.level2_notes)
        .bind(request.final_status.as_str())
        .bind(request.updated_at.to_rfc3339())
        .bind(&request.id.0)
        .bind(&request.organization_id.0)
        .bind(expected_updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
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

        let mut sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM approval_request WHERE organization_id = ?"
        );
        if filter.entity_type.is_some() {
            sql.push_str(" AND entity_type = ?");
        }
        if final_status.is_some() {
            sql.push_str(" AND final_status = ?");
        }
        if filter.requested_by.is_some() {
            sql.push_str(" AND requested_by = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(&organization_id.0);
        if let Some(entity_type) = &filter.entity_type {
            query = query.bind(entity_type.as_str().to_string());
        }
        if let Some(final_status) = final_status {
            query = query.bind(final_status.as_str());
        }
        if let Some(requested_by) = &filter.requested_by {
            query = query.bind(requested_by.0.clone());
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }

        let rows: Vec<sqlx::sqlite::SqliteRow> = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }

    async fn count_pending(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM approval_request
             WHERE organization_id = ? AND final_status = 'pending'",
        )
        .bind(&organization_id.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
