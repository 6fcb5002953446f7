//! Service Configuration
//! Mission: Load settings from flags and environment, refuse unsafe values at startup

use crate::auth::{jwt::MIN_SECRET_LEN, password::MIN_PRODUCTION_COST, SessionConfig};
use anyhow::{bail, Context, Result};
use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, CorsLayer};

#[derive(Parser, Clone)]
#[command(name = "medrecords")]
#[command(about = "Medical records API - doctors, patients and their clinical data")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:5000")]
    pub bind_addr: SocketAddr,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH", default_value = "medrecords.db")]
    pub database_path: String,

    /// Token signing secret (at least 32 bytes)
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Token and cookie lifetime in seconds
    #[arg(long, env = "TOKEN_TTL_SECS", default_value_t = crate::auth::jwt::DEFAULT_TTL_SECS)]
    pub token_ttl_secs: i64,

    /// bcrypt cost factor
    #[arg(
        long,
        env = "BCRYPT_COST",
        default_value_t = bcrypt::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(MIN_PRODUCTION_COST as i64..=31)
    )]
    pub bcrypt_cost: u32,

    /// Mark the session cookie Secure (set when served over TLS)
    #[arg(long, env = "COOKIE_SECURE")]
    pub cookie_secure: bool,

    /// Origins allowed to call the API with credentials (comma-separated)
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,
}

// The secret never reaches logs
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("jwt_secret", &"[redacted]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("cookie_secure", &self.cookie_secure)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl Config {
    /// Checks clap cannot express
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            bail!(
                "JWT_SECRET must be at least {} bytes (got {})",
                MIN_SECRET_LEN,
                self.jwt_secret.len()
            );
        }
        if self.token_ttl_secs <= 0 {
            bail!("TOKEN_TTL_SECS must be positive");
        }
        self.origins()?;
        Ok(())
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            secure: self.cookie_secure,
            max_age_secs: self.token_ttl_secs,
        }
    }

    fn origins(&self) -> Result<Vec<HeaderValue>> {
        self.allowed_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .map(|origin| {
                // Browsers refuse `*` on credentialed requests
                if origin == "*" {
                    bail!("ALLOWED_ORIGINS cannot contain `*`; list each origin explicitly");
                }
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid origin in ALLOWED_ORIGINS: {}", origin))
            })
            .collect()
    }

    /// CORS for cookie-carrying browser clients on the listed origins
    pub fn cors_layer(&self) -> Result<CorsLayer> {
        Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.origins()?))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true))
    }
}
