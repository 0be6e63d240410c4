pub mod jwt;

pub use jwt::{bearer_token, create_token, validate_token, Claims};
