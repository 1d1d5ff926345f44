use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use scrapbook_api::catalog::CatalogConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub public_origin: String,
    pub auth_exchange_url: String,
    pub catalog: CatalogConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = var("SCRAPBOOK_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SCRAPBOOK_JWT_SECRET is unset or still a placeholder");
        }

        let port = or("SCRAPBOOK_PORT", "3000")
            .parse::<u16>()
            .context("SCRAPBOOK_PORT must be a port number")?;

        Ok(Self {
            host: or("SCRAPBOOK_HOST", "0.0.0.0"),
            port,
            db_path: or("SCRAPBOOK_DB_PATH", "scrapbook.db").into(),
            jwt_secret,
            public_origin: or("SCRAPBOOK_PUBLIC_ORIGIN", "http://localhost:3000"),
            auth_exchange_url: or(
                "SCRAPBOOK_AUTH_EXCHANGE_URL",
                "http://localhost:9999/auth/v1/token?grant_type=pkce",
            ),
            catalog: CatalogConfig {
                client_id: or("SPOTIFY_CLIENT_ID", ""),
                client_secret: or("SPOTIFY_CLIENT_SECRET", ""),
                refresh_token: or("SPOTIFY_REFRESH_TOKEN", ""),
                token_url: or("SPOTIFY_TOKEN_URL", "https://accounts.spotify.com/api/token"),
                api_base: or("SPOTIFY_API_BASE", "https://api.spotify.com/v1"),
            },
        })
    }
}
