mod handler;

pub use handler::{admin_events, chat_events};
