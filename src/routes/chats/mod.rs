mod handler;
mod model;

pub use handler::{
    create_chat_message, download_chat_file, get_chat, list_chat_messages, list_chats, update_chat,
};
