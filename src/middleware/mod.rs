mod access_gate;
mod csrf;
mod error_handler;
mod rate_limit;

pub use access_gate::require_staff;
pub use csrf::{CSRF_FIELD, CSRF_HEADER, CSRF_TOKEN_KEY, csrf_protect, verify_form_token};
pub use error_handler::log_errors;
pub use rate_limit::{RateLimiter, rate_limit};
