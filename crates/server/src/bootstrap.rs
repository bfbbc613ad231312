use std::sync::Arc;

use fieldgate_core::activity::LabelCatalog;
use fieldgate_core::config::{AppConfig, ConfigError, LoadOptions};
use fieldgate_core::decisions::{DecisionEngine, DecisionPolicy};
use fieldgate_db::repositories::{
    SqlApprovalRequestRepository, SqlOrganizationRepository, SqlThresholdRepository,
};
use fieldgate_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::api::AppState;
use crate::notify::TracingActivityNotifier;
use crate::service::ApprovalService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    Ok(Application { config, db_pool })
}

impl Application {
    /// Wire the SQL-backed approval service from the bootstrapped pool and
    /// configuration. Label nouns and the decision policy are fixed here,
    /// at startup.
    pub fn app_state(&self) -> AppState {
        let service = ApprovalService::new(
            Arc::new(SqlOrganizationRepository::new(self.db_pool.clone())),
            Arc::new(SqlThresholdRepository::new(self.db_pool.clone())),
            Arc::new(SqlApprovalRequestRepository::new(self.db_pool.clone())),
            Arc::new(TracingActivityNotifier),
            DecisionEngine::new(DecisionPolicy {
                allow_redecision: self.config.approvals.allow_redecision,
            }),
            LabelCatalog::default(),
        );
        AppState { service: Arc::new(service) }
    }
}
