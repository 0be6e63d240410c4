//! Role-based content approval: permissions, the content state machine, the
//! approval gateway and the stores behind them.

pub mod content;
pub mod gateway;
pub mod permissions;
pub mod policy;
pub mod resource;
pub mod state_machine;
pub mod store;
pub mod submission;

pub use content::{ContentDraft, ContentItem, ContentPatch, ContentStatus, ContentType, InitialStatus};
pub use gateway::{ActionRequest, ApprovalGateway, ApprovalRules, Decided, Decision, PendingMutation, ReviewDecision};
pub use permissions::{Actor, PermissionModel, Role, Scope};
pub use policy::Policy;
pub use resource::{Applied, ResourceController};
pub use submission::{Action, SubmissionFilter, SubmissionRequest, SubmissionStatus, Submitter};
