use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_ORGANIZATION_ID: &str = "org-demo";

const SEED_THRESHOLD_IDS: &[&str] = &["thr-demo-est-l1", "thr-demo-est-l2", "thr-demo-prop-l1"];

/// One request per final status, so the pending badge demo returns exactly 1.
const SEED_REQUESTS: &[(&str, &str)] = &[
    ("req-demo-pending", "pending"),
    ("req-demo-approved", "approved"),
    ("req-demo-rejected", "rejected"),
];

/// Deterministic demo dataset covering the two-level approval paths.
pub struct DemoSeedDataset;

#[derive(Debug, Clone)]
pub struct SeedResult {
    pub organization_id: &'static str,
    pub threshold_count: usize,
    pub request_count: usize,
}

#[derive(Debug, Clone)]
pub struct SeedVerification {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            organization_id: SEED_ORGANIZATION_ID,
            threshold_count: SEED_THRESHOLD_IDS.len(),
            request_count: SEED_REQUESTS.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<SeedVerification, RepositoryError> {
        let mut checks = Vec::new();

        let org_exists: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM organization WHERE id = ?1)")
                .bind(SEED_ORGANIZATION_ID)
                .fetch_one(pool)
                .await?;
        checks.push(("organization", org_exists == 1));

        for threshold_id in SEED_THRESHOLD_IDS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM approval_threshold
                 WHERE id = ?1 AND organization_id = ?2 AND is_active = 1)",
            )
            .bind(threshold_id)
            .bind(SEED_ORGANIZATION_ID)
            .fetch_one(pool)
            .await?;
            checks.push((*threshold_id, exists == 1));
        }

        for (request_id, final_status) in SEED_REQUESTS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM approval_request
                 WHERE id = ?1 AND organization_id = ?2 AND final_status = ?3)",
            )
            .bind(request_id)
            .bind(SEED_ORGANIZATION_ID)
            .bind(final_status)
            .fetch_one(pool)
            .await?;
            checks.push((*request_id, exists == 1));
        }

        let pending_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM approval_request
             WHERE organization_id = ?1 AND final_status = 'pending'",
        )
        .bind(SEED_ORGANIZATION_ID)
        .fetch_one(pool)
        .await?;
        checks.push(("pending-count", pending_count == 1));

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(SeedVerification { all_present, checks })
    }
}

#[cfg(test)]
mod tests {
    use super::DemoSeedDataset;
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn seed_loads_and_verifies() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        let result = DemoSeedDataset::load(&pool).await.expect("load seed");
        assert_eq!(result.threshold_count, 3);
        assert_eq!(result.request_count, 3);

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify seed");
        assert!(
            verification.all_present,
            "failed checks: {:?}",
            verification
                .checks
                .iter()
                .filter(|(_, passed)| !passed)
                .map(|(check, _)| *check)
                .collect::<Vec<_>>(),
        );
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");

        DemoSeedDataset::load(&pool).await.expect("first load");
        DemoSeedDataset::load(&pool).await.expect("second load");

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify seed");
        assert!(verification.all_present);
    }
}
