pub mod auth;
pub mod chats;
pub mod events;
pub mod messages;
pub mod users;
