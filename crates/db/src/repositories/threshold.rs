use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use fieldgate_core::domain::entity::EntityType;
use fieldgate_core::domain::organization::OrganizationId;
use fieldgate_core::domain::threshold::{ApprovalLevel, Threshold, ThresholdId};

use super::{RepositoryError, ThresholdRepository};
use crate::DbPool;

pub struct SqlThresholdRepository {
    pool: DbPool,
}

impl SqlThresholdRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const THRESHOLD_COLUMNS: &str = "id, organization_id, entity_type, threshold_amount, \
     approval_level, approver_role, is_active, created_at, updated_at";

fn row_to_threshold(row: &sqlx::sqlite::SqliteRow) -> Result<Threshold, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let organization_id: String =
        row.try_get("organization_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let entity_type: String =
        row.try_get("entity_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let threshold_amount_str: String =
        row.try_get("threshold_amount").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approval_level_raw: i64 =
        row.try_get("approval_level").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_role: Option<String> =
        row.try_get("approver_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_active: bool =
        row.try_get("is_active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let updated_at_str: String =
        row.try_get("updated_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let threshold_amount = Decimal::from_str(&threshold_amount_str)
        .map_err(|e| RepositoryError::Decode(format!("invalid threshold_amount: {e}")))?;
    let approval_level = ApprovalLevel::from_i64(approval_level_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("invalid approval_level: {approval_level_raw}"))
    })?;
    let created_at = parse_timestamp("created_at", &created_at_str)?;
    let updated_at = parse_timestamp("updated_at", &updated_at_str)?;

    Ok(Threshold {
        id: ThresholdId(id),
        organization_id: OrganizationId(organization_id),
        entity_type: EntityType::parse(&entity_type),
        threshold_amount,
        approval_level,
        approver_role,
        is_active,
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
impl ThresholdRepository for SqlThresholdRepository {
    async fn list_active(
        &self,
        organization_id: &OrganizationId,
        entity_type: Option<&EntityType>,
    ) -> Result<Vec<Threshold>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = if let Some(entity_type) = entity_type {
            sqlx::query(&format!(
                "SELECT {THRESHOLD_COLUMNS} FROM approval_threshold
                 WHERE organization_id = ? AND entity_type = ? AND is_active = 1
                 ORDER BY CAST(threshold_amount AS REAL) ASC, id ASC",
            ))
            .bind(&organization_id.0)
            .bind(entity_type.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {THRESHOLD_COLUMNS} FROM approval_threshold
                 WHERE organization_id = ? AND is_active = 1
                 ORDER BY CAST(threshold_amount AS REAL) ASC, id ASC",
            ))
            .bind(&organization_id.0)
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(row_to_threshold).collect::<Result<Vec<_>, _>>()
    }

    async fn find_by_id(
        &self,
        organization_id: &OrganizationId,
        id: &ThresholdId,
    ) -> Result<Option<Threshold>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {THRESHOLD_COLUMNS} FROM approval_threshold
             WHERE organization_id = ? AND id = ?",
        ))
        .bind(&organization_id.0)
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_threshold(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, threshold: Threshold) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO approval_threshold (id, organization_id, entity_type, threshold_amount,
                                             approval_level, approver_role, is_active,
                                             created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 entity_type = excluded.entity_type,
                 threshold_amount = excluded.threshold_amount,
                 approval_level = excluded.approval_level,
                 approver_role = excluded.approver_role,
                 is_active = excluded.is_active,
                 updated_at = excluded.updated_at",
        )
        .bind(&threshold.id.0)
        .bind(&threshold.organization_id.0)
        .bind(threshold.entity_type.as_str())
        .bind(threshold.threshold_amount.to_string())
        .bind(threshold.approval_level.as_i64())
        .bind(&threshold.approver_role)
        .bind(threshold.is_active)
        .bind(threshold.created_at.to_rfc3339())
        .bind(threshold.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
