//! Common imports for binaries and integration tests.
//!
//! ```rust,ignore
//! use atelier_core::prelude::*;
//! ```

pub use crate::app::App;
pub use crate::config::Config;
pub use crate::error::AtelierError;
pub use crate::response::ApiResponse;

pub use crate::extractors::{AuthActor, Json, MaybeActor, Pagination, Query};

pub use crate::workflow::store::{
    ContentFilter, ContentStore, InMemoryContentStore, InMemorySubmissionStore, SubmissionStore,
};
pub use crate::workflow::{
    Action, ActionRequest, Actor, Applied, ApprovalGateway, ApprovalRules, ContentDraft,
    ContentItem, ContentPatch, ContentStatus, ContentType, Decided, Decision, InitialStatus,
    PendingMutation, PermissionModel, Policy, ResourceController, ReviewDecision, Role, Scope,
    SubmissionFilter, SubmissionRequest, SubmissionStatus, Submitter,
};
