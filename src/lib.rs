#[macro_use]
extern crate lazy_static;

use sqlx::SqlitePool;

pub mod accounts;
pub mod config;
pub mod db;
pub mod errors;
pub mod render;
pub mod routes;
pub mod session;
pub mod shell;
pub mod structs;
pub mod utils;
pub mod workflow;

#[cfg(test)]
mod testing;

use config::Config;
use errors::AppError;
use session::TokenIssuer;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub tokens: TokenIssuer,
    pub config: Config,
}

impl AppState {
    /// Connects, migrates and keys the token issuer.
    pub async fn new(config: Config) -> Result<Self, AppError> {
        let ttl = chrono::Duration::try_hours(config.token_ttl_hours).ok_or_else(|| {
            AppError::ConfigError(format!("TOKEN_TTL_HOURS {} is out of range", config.token_ttl_hours))
        })?;
        let tokens = TokenIssuer::new(config.token_secret.as_bytes(), ttl);
        let db_pool = db::connect(&config.database_url).await?;
        Ok(AppState {
            db_pool,
            tokens,
            config,
        })
    }
}
