pub mod principal;
pub mod session;
pub mod token;

pub use principal::{CurrentStaff, Principal};
pub use session::ChatSession;
