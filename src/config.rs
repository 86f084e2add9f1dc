//! Configuration for plotledger
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// plotledger - colony and plot management backend
#[derive(Parser, Debug, Clone)]
#[command(name = "plotledger")]
#[command(about = "REST backend for colony, plot and booking management")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Enable development mode (memory store fallback, default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "plotledger")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Default page size for list endpoints
    #[arg(long, env = "PAGE_SIZE", default_value = "10")]
    pub page_size: u32,

    /// Maximum page size a client may request
    #[arg(long, env = "MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: u32,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> Option<String> {
        if self.dev_mode {
            Some(
                self.jwt_secret
                    .clone()
                    .unwrap_or_else(|| "dev-only-insecure-secret-0123456789abcdef".to_string()),
            )
        } else {
            self.jwt_secret.clone()
        }
    }

    /// Clamp a client-requested page size to the configured maximum
    pub fn clamp_page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.page_size)
            .clamp(1, self.max_page_size)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.page_size == 0 || self.page_size > self.max_page_size {
            return Err("PAGE_SIZE must be between 1 and MAX_PAGE_SIZE".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["plotledger", "--dev-mode"])
    }

    #[test]
    fn test_dev_mode_jwt_fallback() {
        let args = base_args();
        assert!(args.jwt_secret().is_some());
    }

    #[test]
    fn test_production_requires_secret() {
        let args = Args::parse_from(["plotledger"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_clamp_page_size() {
        let args = base_args();
        assert_eq!(args.clamp_page_size(None), 10);
        assert_eq!(args.clamp_page_size(Some(5000)), 100);
        assert_eq!(args.clamp_page_size(Some(0)), 1);
    }
}
