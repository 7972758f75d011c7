//! Configuration module for the Serapeu backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::errors::AppError;

/// Bootstrap administrator seeded at startup.
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Whether new accounts must confirm their e-mail before signing in
    pub require_email_verification: bool,
    /// Lifetime of an issued session token
    pub session_ttl_hours: i64,
    /// scrypt cost parameter (log2 of N) for new password hashes
    pub password_cost: u8,
    /// Base URL used to build verification and reset links
    pub public_url: String,
    /// Optional administrator account created at startup
    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("SERAPEU_DB_PATH")
            .unwrap_or_else(|_| "./data/serapeu.sqlite".to_string())
            .into();

        let bind_addr = env::var("SERAPEU_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid SERAPEU_BIND_ADDR: {}", e)))?;

        let log_level = env::var("SERAPEU_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let require_email_verification = env::var("SERAPEU_REQUIRE_EMAIL_VERIFICATION")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        let session_ttl_hours = parse_var("SERAPEU_SESSION_TTL_HOURS", 168)?;
        let password_cost = parse_var("SERAPEU_PASSWORD_COST", 15)?;

        let public_url =
            env::var("SERAPEU_PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let admin_seed = match (
            env::var("SERAPEU_ADMIN_EMAIL"),
            env::var("SERAPEU_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(AdminSeed {
                email,
                password,
                name: env::var("SERAPEU_ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            db_path,
            bind_addr,
            log_level,
            require_email_verification,
            session_ttl_hours,
            password_cost,
            public_url,
            admin_seed,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for name in [
            "SERAPEU_DB_PATH",
            "SERAPEU_BIND_ADDR",
            "SERAPEU_LOG_LEVEL",
            "SERAPEU_REQUIRE_EMAIL_VERIFICATION",
            "SERAPEU_SESSION_TTL_HOURS",
            "SERAPEU_PASSWORD_COST",
            "SERAPEU_PUBLIC_URL",
            "SERAPEU_ADMIN_EMAIL",
            "SERAPEU_ADMIN_PASSWORD",
            "SERAPEU_ADMIN_NAME",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/serapeu.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(config.require_email_verification);
        assert_eq!(config.session_ttl_hours, 168);
        assert_eq!(config.password_cost, 15);
        assert!(config.admin_seed.is_none());
    }
}
