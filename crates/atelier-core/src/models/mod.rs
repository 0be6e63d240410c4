pub mod content_item;
pub mod submission_request;
pub mod user;
