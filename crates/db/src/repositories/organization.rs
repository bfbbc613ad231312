use chrono::{DateTime, Utc};
use sqlx::Row;

use fieldgate_core::domain::organization::{Organization, OrganizationId};

use super::{OrganizationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrganizationRepository {
    pool: DbPool,
}

impl SqlOrganizationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_organization(row: &sqlx::sqlite::SqliteRow) -> Result<Organization, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid created_at: {e}")))?;

    Ok(Organization { id: OrganizationId(id), name, created_at })
}

#[async_trait::async_trait]
impl OrganizationRepository for SqlOrganizationRepository {
    async fn find_by_id(
        &self,
        id: &OrganizationId,
    ) -> Result<Option<Organization>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, created_at FROM organization WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_organization(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, organization: Organization) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO organization (id, name, created_at)
             VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        )
        .bind(&organization.id.0)
        .bind(&organization.name)
        .bind(organization.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use fieldgate_core::domain::organization::{Organization, OrganizationId};

    use super::SqlOrganizationRepository;
    use crate::repositories::OrganizationRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let pool = setup().await;
        let repo = SqlOrganizationRepository::new(pool);

        let organization = Organization {
            id: OrganizationId("org-1".to_string()),
            name: "Northside Restoration".to_string(),
            created_at: Utc::now(),
        };
        repo.save(organization.clone()).await.expect("save");

        let found = repo
            .find_by_id(&OrganizationId("org-1".to_string()))
            .await
            .expect("find")
            .expect("should exist");
        assert_eq!(found.id, organization.id);
        assert_eq!(found.name, "Northside Restoration");
    }

    #[tokio::test]
    async fn missing_organization_returns_none() {
        let pool = setup().await;
        let repo = SqlOrganizationRepository::new(pool);

        let found = repo.find_by_id(&OrganizationId("org-missing".to_string())).await.expect("find");
        assert!(found.is_none());
    }
}
