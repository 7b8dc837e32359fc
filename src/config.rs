use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub gemini_timeout: Duration,
    pub openfoodfacts_base_url: String,
    pub uploads_dir: PathBuf,
    pub base_url: String,
    pub host: String,
    pub port: u16,
    pub prod: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port = var("PORT", "8000");
        let timeout = var("GEMINI_TIMEOUT_SECS", "60");

        Ok(Self {
            google_api_key: lookup("GOOGLE_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_model: var("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_api_base: var(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com",
            ),
            gemini_timeout: Duration::from_secs(
                timeout
                    .parse()
                    .with_context(|| format!("GEMINI_TIMEOUT_SECS is not a number: {}", timeout))?,
            ),
            openfoodfacts_base_url: var(
                "OPENFOODFACTS_BASE_URL",
                "https://world.openfoodfacts.org",
            ),
            uploads_dir: PathBuf::from(var("UPLOADS_DIR", "uploads")),
            base_url: var("BASE_URL", "http://localhost:8000")
                .trim_end_matches('/')
                .to_string(),
            host: var("HOST", "0.0.0.0"),
            port: port
                .parse()
                .with_context(|| format!("PORT is not a valid port: {}", port))?,
            prod: var("PROD", "false").eq_ignore_ascii_case("true"),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn environment(&self) -> &'static str {
        if self.prod {
            "production"
        } else {
            "development"
        }
    }
}
