/// Application configuration module
use anyhow::Context;
use std::env;
use std::net::SocketAddr;
use tracing::warn;

/// Fallback upstream for local development
pub const DEFAULT_API_URL: &str = "https://thesurfkit.com/api/v2";
pub const DEFAULT_SITE_URL: &str = "https://labouee.app";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiSettings,
    pub site_url: String,
    pub mapbox_token: String,
    pub bind_addr: SocketAddr,
}

/// Everything the buoy API client needs, passed in explicitly
#[derive(Clone, Debug)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_seconds: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let base_url = env::var("BUOY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let api_key = env::var("BUOY_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            warn!("BUOY_API_KEY is not set, upstream requests will be unauthenticated");
        }

        let site_url = env::var("SITE_URL")
            .unwrap_or_else(|_| DEFAULT_SITE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let mapbox_token = env::var("MAPBOX_TOKEN").unwrap_or_default();

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let api = ApiSettings {
            timeout_seconds: env_u64("HTTP_TIMEOUT_SECONDS", 30),
            ..ApiSettings::new(base_url, api_key)
        };

        Ok(Self {
            api,
            site_url,
            mapbox_token,
            bind_addr,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_settings_trims_trailing_slash() {
        let settings = ApiSettings::new("http://127.0.0.1:9000/api/v2/", "key");
        assert_eq!(settings.base_url, "http://127.0.0.1:9000/api/v2");
        assert_eq!(settings.timeout_seconds, 30);
    }

    #[test]
    fn test_env_u64_fallback() {
        assert_eq!(env_u64("BUOY_SITE_TEST_UNSET_VARIABLE", 42), 42);
    }
}
