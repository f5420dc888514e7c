use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub portal_url: String,
    pub mail_service_url: Option<String>,
    pub mail_service_token: Option<String>,
    pub invoice_api_url: String,
    pub invoice_api_key: Option<String>,
    pub otp_ttl_seconds: i64,
    pub otp_sweep_interval_seconds: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8080"),
            database_url: get_env_opt("DATABASE_URL"),
            db_max_connections: get_env_parse_or("DB_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            portal_url: get_env_or("PORTAL_URL", "http://localhost:3000"),
            mail_service_url: get_env_opt("MAIL_SERVICE_URL"),
            mail_service_token: get_env_opt("MAIL_SERVICE_TOKEN"),
            invoice_api_url: get_env_or("INVOICE_API_URL", "http://localhost:9000/api"),
            invoice_api_key: get_env_opt("INVOICE_API_KEY"),
            otp_ttl_seconds: get_env_parse_or("OTP_TTL_SECONDS", 600)?,
            otp_sweep_interval_seconds: get_env_parse_or("OTP_SWEEP_INTERVAL_SECONDS", 300)?,
        })
    }

    /// Settings for tests and local tooling; nothing external is configured.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            server_address: "127.0.0.1:0".to_string(),
            database_url: None,
            db_max_connections: 5,
            jwt_secret: jwt_secret.to_string(),
            portal_url: "http://portal.test".to_string(),
            mail_service_url: None,
            mail_service_token: None,
            invoice_api_url: "http://invoices.test".to_string(),
            invoice_api_key: None,
            otp_ttl_seconds: 600,
            otp_sweep_interval_seconds: 300,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or(name: &str, default: &str) -> String {
    get_env_opt(name).unwrap_or_else(|| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        None => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
