mod handler;
pub mod model;

pub use handler::{
    create_user, get_user, list_permission_meta, list_users, update_user, update_user_permissions,
};
