mod handler;
mod model;

pub use handler::{home, login, login_page, logout};
