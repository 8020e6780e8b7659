pub mod auth;
pub mod security_headers;

pub use auth::{AuthMiddleware, CurrentUser};
pub use security_headers::SecurityHeaders;
