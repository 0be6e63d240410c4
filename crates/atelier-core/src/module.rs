//! Route groups mounted by [`App`](crate::App).
//!
//! Each module owns its routes and an optional health probe that
//! `GET /health` runs.

use async_trait::async_trait;
use axum::Router;

use crate::controllers::{self, AppState};
use crate::error::AtelierError;
use crate::workflow::store::ContentFilter;
use crate::workflow::SubmissionFilter;

#[async_trait]
pub trait AtelierModule: Send + Sync {
    /// Short name used in logs and the health report.
    fn name(&self) -> &str;

    fn routes(&self) -> Router<AppState>;

    /// Default implementation always returns Ok.
    async fn health_check(&self, _state: &AppState) -> Result<(), AtelierError> {
        Ok(())
    }
}

/// Content endpoints; probes the content store.
pub struct ContentModule;

#[async_trait]
impl AtelierModule for ContentModule {
    fn name(&self) -> &str {
        "content"
    }

    fn routes(&self) -> Router<AppState> {
        controllers::content::routes()
    }

    async fn health_check(&self, state: &AppState) -> Result<(), AtelierError> {
        let probe = ContentFilter {
            limit: Some(1),
            ..Default::default()
        };
        state.resources.list(&probe).await.map(|_| ())
    }
}

/// Review queue endpoints; probes the submission store.
pub struct SubmissionsModule;

#[async_trait]
impl AtelierModule for SubmissionsModule {
    fn name(&self) -> &str {
        "submissions"
    }

    fn routes(&self) -> Router<AppState> {
        controllers::submissions::routes()
    }

    async fn health_check(&self, state: &AppState) -> Result<(), AtelierError> {
        let probe = SubmissionFilter {
            limit: Some(1),
            ..SubmissionFilter::pending()
        };
        state.gateway.probe(&probe).await
    }
}
