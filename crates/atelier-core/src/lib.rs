//! Content publishing with role-based approval.
//!
//! Actions on content are routed by the [`ApprovalGateway`](workflow::ApprovalGateway):
//! actors with a direct grant mutate immediately, everyone else queues a
//! [`SubmissionRequest`](workflow::SubmissionRequest) for a reviewer. Status
//! changes go through the [`state_machine`](workflow::state_machine).

pub mod app;
pub mod auth;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod module;
pub mod openapi;
pub mod prelude;
pub mod response;
pub mod testing;
pub mod workflow;

pub use app::App;
pub use config::Config;
pub use error::AtelierError;
pub use response::ApiResponse;
pub use testing::{TestApp, TestClient, TestResponse};
