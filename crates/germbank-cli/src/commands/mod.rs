pub mod import;
pub mod migrate;
pub mod sheets;

use std::path::PathBuf;

use clap::Args;
use germbank_core_types::Sensitive;
use germbank_store::{ConnectionConfig, Settings};

/// Connection flags shared by every command that opens the database
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Database file
    #[arg(long, env = "GERMBANK_DATABASE")]
    pub database: Option<String>,

    #[arg(long, env = "GERMBANK_SERVER")]
    pub server: Option<String>,

    #[arg(long, env = "GERMBANK_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "GERMBANK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long, env = "GERMBANK_PORT")]
    pub port: Option<u16>,

    /// TOML settings file; flags override its values
    #[arg(long, env = "GERMBANK_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn settings(&self) -> Result<Settings, Box<dyn std::error::Error>> {
        Ok(match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        })
    }

    /// Layer the flags over the connection section of a settings file
    pub fn apply(self, mut config: ConnectionConfig) -> ConnectionConfig {
        if let Some(database) = self.database {
            config.database = database;
        }
        if let Some(server) = self.server {
            config.server = Some(server);
        }
        if let Some(username) = self.username {
            config.username = Some(username);
        }
        if let Some(password) = self.password {
            config.password = Sensitive::new(password);
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        config
    }
}
