//! Server configuration.

use clap::{Parser, ValueEnum};

use crate::storage::StoreLocation;

/// Deployment environment; selects which store connection string is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    Production,
    Test,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "server")]
#[command(about = "REST backend for notes", long_about = None)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Deployment environment
    #[arg(long = "env", env = "NOTES_ENV", value_enum, default_value_t = Environment::Production)]
    pub environment: Environment,

    /// Store connection string (`memory:`, `file:<path>` or a path)
    #[arg(long, env = "DB_CONNECTION_URL")]
    pub db_url: Option<String>,

    /// Store connection string used when the environment is `test`
    #[arg(long, env = "TEST_DB_CONNECTION_URL")]
    pub test_db_url: Option<String>,

    /// bcrypt work factor for password hashes
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    pub bcrypt_cost: u32,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerConfig {
    pub fn store_location(&self) -> StoreLocation {
        let url = match self.environment {
            Environment::Production => self.db_url.as_deref(),
            Environment::Test => self.test_db_url.as_deref(),
        };
        url.map(StoreLocation::parse).unwrap_or(StoreLocation::Memory)
    }
}
