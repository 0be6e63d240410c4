use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::workflow::store::{ContentStore, DbContentStore, DbSubmissionStore, SubmissionStore};
use crate::workflow::{ApprovalGateway, Policy, ResourceController};

pub mod content;
pub mod health;
pub mod submissions;

/// Shared application state available in all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<Config>,
    pub policy: Arc<Policy>,
    pub gateway: ApprovalGateway,
    pub resources: ResourceController,
}

impl AppState {
    /// State backed by the database for both stores.
    pub fn new(db: DatabaseConnection, config: Arc<Config>, policy: Arc<Policy>) -> Self {
        let submissions = Arc::new(DbSubmissionStore::new(db.clone()));
        let content = Arc::new(DbContentStore::new(db.clone()));
        Self::with_stores(db, config, policy, submissions, content)
    }

    /// State with explicit store backends. Users are always read from `db`.
    pub fn with_stores(
        db: DatabaseConnection,
        config: Arc<Config>,
        policy: Arc<Policy>,
        submissions: Arc<dyn SubmissionStore>,
        content: Arc<dyn ContentStore>,
    ) -> Self {
        AppState {
            gateway: ApprovalGateway::new(policy.clone(), submissions),
            resources: ResourceController::new(content),
            db,
            config,
            policy,
        }
    }
}
