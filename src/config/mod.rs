use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub secret_key: String,
    pub server_host: String,
    pub server_port: u16,
    pub files_path: PathBuf,
    pub first_user_email: String,
    pub first_user_password: String,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            secret_key: env::var("SECRET_KEY")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .map(|v| v.parse().unwrap_or(3000))
                .unwrap_or(3000),
            files_path: env::var("FILES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/files")),
            first_user_email: env::var("FIRST_USER_EMAIL")
                .unwrap_or_else(|_| "admin@admin.com".to_string()),
            first_user_password: env::var("FIRST_USER_PASSWORD")
                .unwrap_or_else(|_| "admin".to_string()),
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW")
                .map(|v| v.parse().unwrap_or(60))
                .unwrap_or(60),
            rate_limit_requests: env::var("RATE_LIMIT_REQUESTS")
                .map(|v| v.parse().unwrap_or(100))
                .unwrap_or(100),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
