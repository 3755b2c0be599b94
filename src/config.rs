use crate::services::upload_service::DEFAULT_MAX_UPLOAD_BYTES;
use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub database_url: String,
    pub max_upload_bytes: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Photo portfolio API")]
pub struct Args {
    /// Host to bind to (overrides PORTFOLIO_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORTFOLIO_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where uploaded images are stored (overrides PORTFOLIO_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Database URL (overrides PORTFOLIO_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Largest accepted upload in bytes (overrides PORTFOLIO_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        Self::resolve(Args::parse(), |name| env::var(name).ok())
    }

    /// Merge `args` over values from `lookup` (an environment), then defaults.
    pub fn resolve(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<(Self, bool)> {
        // --- Environment fallback ---
        let env_host = lookup("PORTFOLIO_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let env_port = parse_env(&lookup, "PORTFOLIO_PORT", 5000u16)?;
        let env_upload_dir =
            lookup("PORTFOLIO_UPLOAD_DIR").unwrap_or_else(|| "./data/uploads".into());
        let env_db = lookup("PORTFOLIO_DATABASE_URL")
            .unwrap_or_else(|| "sqlite://./data/portfolio.db".into());
        let env_max_upload =
            parse_env(&lookup, "PORTFOLIO_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload_dir),
            database_url: args.database_url.unwrap_or(env_db),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_env_or_args() {
        let (cfg, migrate) = AppConfig::resolve(Args::default(), env_of(&[])).unwrap();
        assert!(!migrate);
        assert_eq!(cfg.addr(), "0.0.0.0:5000");
        assert_eq!(cfg.upload_dir, "./data/uploads");
        assert_eq!(cfg.database_url, "sqlite://./data/portfolio.db");
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn args_override_env() {
        let args = Args::try_parse_from([
            "photo-portfolio",
            "--port",
            "8080",
            "--upload-dir",
            "/srv/uploads",
            "--migrate",
        ])
        .unwrap();
        let env = env_of(&[
            ("PORTFOLIO_HOST", "127.0.0.1"),
            ("PORTFOLIO_PORT", "9000"),
            ("PORTFOLIO_MAX_UPLOAD_BYTES", "2048"),
        ]);

        let (cfg, migrate) = AppConfig::resolve(args, env).unwrap();
        assert!(migrate);
        assert_eq!(cfg.addr(), "127.0.0.1:8080");
        assert_eq!(cfg.upload_dir, "/srv/uploads");
        assert_eq!(cfg.max_upload_bytes, 2048);
    }

    #[test]
    fn bad_numeric_env_is_an_error() {
        let err = AppConfig::resolve(Args::default(), env_of(&[("PORTFOLIO_PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("PORTFOLIO_PORT"));
    }
}
