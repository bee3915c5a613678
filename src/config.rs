use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub base_url: String,
    pub key_length: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Tiered paste storage service")]
pub struct Args {
    /// Host to bind to (overrides PASTE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PASTE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where large payloads are stored (overrides PASTE_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides PASTE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Public URL prefix echoed after uploads (overrides PASTE_STORE_BASE_URL)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Length of generated keys (overrides PASTE_STORE_KEY_LENGTH)
    #[arg(long)]
    pub key_length: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("PASTE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("PASTE_STORE_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing PASTE_STORE_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading PASTE_STORE_PORT"),
        };
        let env_storage =
            env::var("PASTE_STORE_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("PASTE_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/paste_store.db".into());
        let env_base_url =
            env::var("PASTE_STORE_BASE_URL").unwrap_or_else(|_| "http://localhost:3000/".into());
        let env_key_length = match env::var("PASTE_STORE_KEY_LENGTH") {
            Ok(value) => value
                .parse::<usize>()
                .with_context(|| format!("parsing PASTE_STORE_KEY_LENGTH value `{}`", value))?,
            Err(env::VarError::NotPresent) => 6,
            Err(err) => return Err(err).context("reading PASTE_STORE_KEY_LENGTH"),
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            base_url: args.base_url.unwrap_or(env_base_url),
            key_length: args.key_length.unwrap_or(env_key_length),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
