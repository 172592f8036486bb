mod handler;
pub mod model;

pub use handler::{create_message, download_file, list_messages};
