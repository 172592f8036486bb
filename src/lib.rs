use config::Config;
use redis::Client as RedisClient;
use sqlx::PgPool;
use std::sync::Arc;

use files::FileStorage;

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod files;
pub mod middleware;
pub mod permissions;
pub mod realtime;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub redis: Arc<RedisClient>,
    pub files: FileStorage,
}
