use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

use crate::controllers::AppState;
use crate::module::AtelierModule;
use crate::response::{ApiResponse, WithStatus};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    /// `ok` when every module probe passed, `degraded` otherwise.
    pub status: &'static str,
    pub version: &'static str,
    /// Probe result per module.
    pub modules: BTreeMap<String, String>,
}

/// Liveness plus a store probe per module.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "All probes passed", body = ApiResponse<HealthReport>),
        (status = 503, description = "A probe failed", body = ApiResponse<HealthReport>)
    ),
    tag = "health"
)]
pub async fn health(
    state: AppState,
    modules: Arc<Vec<Arc<dyn AtelierModule>>>,
) -> WithStatus<HealthReport> {
    let mut report = BTreeMap::new();
    let mut healthy = true;
    for module in modules.iter() {
        let outcome = match module.health_check(&state).await {
            Ok(()) => "ok".to_string(),
            Err(err) => {
                tracing::warn!(module = module.name(), error = %err, "health probe failed");
                healthy = false;
                err.error_code().to_string()
            }
        };
        report.insert(module.name().to_string(), outcome);
    }

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    ApiResponse::success(HealthReport {
        status: if healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        modules: report,
    })
    .with_status(status)
}
