pub mod actor;
pub mod json;
pub mod pagination;
pub mod query;

pub use actor::{AuthActor, MaybeActor};
pub use json::Json;
pub use pagination::Pagination;
pub use query::Query;
