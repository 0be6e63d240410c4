use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::config::Config;
use crate::controllers::{health, AppState};
use crate::error::AtelierError;
use crate::migrations::Migrator;
use crate::module::{AtelierModule, ContentModule, SubmissionsModule};
use crate::openapi::ApiDoc;
use crate::workflow::Policy;

pub const API_DOCS_PATH: &str = "/api-docs";
const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// The atelier application: configuration, database, policy and the
/// mounted route modules.
pub struct App {
    pub config: Config,
    pub db: DatabaseConnection,
    pub policy: Arc<Policy>,
    modules: Vec<Arc<dyn AtelierModule>>,
}

/// Apply pending migrations.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), AtelierError> {
    tracing::info!("Running pending database migrations...");
    Migrator::up(db, None).await?;
    tracing::info!("Migrations complete.");
    Ok(())
}

impl App {
    /// Build the application from environment configuration.
    pub async fn new() -> Result<Self, AtelierError> {
        Self::with_config(Config::from_env()?).await
    }

    /// Build the application from a given config. Loads the policy, connects
    /// and migrates the database, and mounts the content and submission
    /// modules.
    pub async fn with_config(config: Config) -> Result<Self, AtelierError> {
        let policy = Arc::new(config.load_policy()?);
        let db = crate::db::connect(&config).await?;
        run_migrations(&db).await?;

        Ok(App {
            config,
            db,
            policy,
            modules: vec![Arc::new(ContentModule), Arc::new(SubmissionsModule)],
        })
    }

    /// Replace the effective policy.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Mount an additional route module.
    pub fn mount_module(mut self, module: impl AtelierModule + 'static) -> Self {
        tracing::debug!(module = module.name(), "module mounted");
        self.modules.push(Arc::new(module));
        self
    }

    /// Handler state backed by the database stores.
    pub fn state(&self) -> AppState {
        AppState::new(
            self.db.clone(),
            Arc::new(self.config.clone()),
            self.policy.clone(),
        )
    }

    /// Build the router with [`state`](Self::state).
    pub fn router(&self) -> Router {
        self.router_with_state(self.state())
    }

    /// Build the router around an explicit state, e.g. one using in-memory
    /// stores.
    pub fn router_with_state(&self, state: AppState) -> Router {
        let modules = Arc::new(self.modules.clone());
        let mut router: Router<AppState> = Router::new().route(
            "/health",
            get(move |State(state): State<AppState>| {
                let modules = modules.clone();
                async move { health::health(state, modules).await }
            }),
        );
        for module in &self.modules {
            router = router.merge(module.routes());
        }

        let openapi_spec = ApiDoc::openapi();
        let openapi_json = openapi_spec.clone();
        let mut router = router
            .with_state(state)
            .merge(Scalar::with_url(API_DOCS_PATH, openapi_spec))
            .route(
                OPENAPI_JSON_PATH,
                get(move || {
                    let spec = openapi_json.clone();
                    async move { axum::Json(spec) }
                }),
            )
            .layer(CorsLayer::permissive());

        // Only add tracing/request-id middleware in development mode.
        if self.config.is_dev() {
            use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse};
            use tower_http::LatencyUnit;

            let x_request_id = axum::http::HeaderName::from_static("x-request-id");
            router = router
                .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                        .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                        .on_response(
                            DefaultOnResponse::new()
                                .level(tracing::Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                )
                .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid));
        }

        router
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<(), AtelierError> {
        let addr = self.config.server_addr();
        let router = self.router();

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AtelierError::Configuration(format!("Cannot bind {}: {}", addr, e)))?;

        tracing::info!(
            "atelier server running on http://{} (docs at {})",
            addr,
            API_DOCS_PATH
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AtelierError::Internal(format!("Server error: {}", e)))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down atelier server...");
}
