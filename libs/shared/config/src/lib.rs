use std::env;
use tracing::warn;

pub const DEFAULT_DRCHRONO_BASE_URL: &str = "https://drchrono.com";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/complete/drchrono/";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub drchrono_base_url: String,
    pub drchrono_client_id: String,
    pub drchrono_client_secret: String,
    pub drchrono_redirect_uri: String,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub database_path: String,
    pub port: u16,
    /// Require the entered SSN to match the remote record during intake.
    pub match_on_ssn: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            drchrono_base_url: env::var("DRCHRONO_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("DRCHRONO_BASE_URL not set, using default");
                    DEFAULT_DRCHRONO_BASE_URL.to_string()
                }),
            drchrono_client_id: env::var("DRCHRONO_CLIENT_ID")
                .unwrap_or_else(|_| {
                    warn!("DRCHRONO_CLIENT_ID not set, using empty value");
                    String::new()
                }),
            drchrono_client_secret: env::var("DRCHRONO_CLIENT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("DRCHRONO_CLIENT_SECRET not set, using empty value");
                    String::new()
                }),
            drchrono_redirect_uri: env::var("DRCHRONO_REDIRECT_URI")
                .unwrap_or_else(|_| {
                    warn!("DRCHRONO_REDIRECT_URI not set, using default");
                    DEFAULT_REDIRECT_URI.to_string()
                }),
            session_secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SESSION_SECRET not set, using empty value");
                    String::new()
                }),
            session_ttl_hours: parse_or("SESSION_TTL_HOURS", 12),
            database_path: env::var("KIOSK_DATABASE_PATH")
                .unwrap_or_else(|_| {
                    warn!("KIOSK_DATABASE_PATH not set, using default");
                    "kiosk.db".to_string()
                }),
            port: parse_or("KIOSK_PORT", 3000),
            match_on_ssn: parse_or("MATCH_ON_SSN", false),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.drchrono_client_id.is_empty()
            && !self.drchrono_client_secret.is_empty()
            && !self.session_secret.is_empty()
    }

    /// Joins an API path such as `/api/patients` onto the configured base URL.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.drchrono_base_url.trim_end_matches('/'), path)
    }
}

fn parse_or<T: std::str::FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value {:?}, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
