use anyhow::Context;
use std::env;
use std::time::Duration;

/// Runtime settings, read from the environment (and `.env` when present)
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL; `None` runs against an in-memory store
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub seeker_id: String,
    pub sitter_id: String,
    /// How long fetched data stays fresh; `None` means until invalidated
    pub stale_time: Option<Duration>,
    pub http_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: None,
            api_key: None,
            seeker_id: "demo-seeker".to_string(),
            sitter_id: "demo-sitter".to_string(),
            stale_time: None,
            http_timeout: None,
        }
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn optional_secs(name: &str) -> anyhow::Result<Option<Duration>> {
    optional(name)
        .map(|v| {
            v.parse::<u64>()
                .map(Duration::from_secs)
                .with_context(|| format!("{name} must be a number of seconds"))
        })
        .transpose()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let backend_url = optional("SITBOARD_BACKEND_URL");
        let api_key = optional("SITBOARD_API_KEY");
        if backend_url.is_some() && api_key.is_none() {
            anyhow::bail!("SITBOARD_API_KEY is required when SITBOARD_BACKEND_URL is set");
        }

        Ok(Self {
            backend_url,
            api_key,
            seeker_id: optional("SITBOARD_SEEKER_ID").unwrap_or(defaults.seeker_id),
            sitter_id: optional("SITBOARD_SITTER_ID").unwrap_or(defaults.sitter_id),
            stale_time: optional_secs("SITBOARD_STALE_SECS")?,
            http_timeout: optional_secs("SITBOARD_HTTP_TIMEOUT_SECS")?,
        })
    }
}
