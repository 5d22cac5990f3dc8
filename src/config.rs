//! Runtime settings.
//!
//! Values come from the environment (a `.env` file is loaded when present)
//! and can be overridden by CLI flags.

use std::time::Duration;

use crate::error::{AppError, EXIT_INPUT};

pub const DEFAULT_SGS_URL: &str = "https://api.bcb.gov.br";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
/// Matches the proxy's `s-maxage`.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;

/// Where observations are fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    Direct,
    Proxy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub source: SourceMode,
    pub sgs_url: String,
    pub proxy_url: Option<String>,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: SourceMode::Direct,
            sgs_url: DEFAULT_SGS_URL.to_string(),
            proxy_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl Settings {
    /// Load `.env` (if any) and read `READJUST_*` variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("READJUST_SGS_URL") {
            settings.sgs_url = url;
        }
        settings.proxy_url = get("READJUST_PROXY_URL");

        settings.source = match get("READJUST_SOURCE").as_deref() {
            None => {
                if settings.proxy_url.is_some() {
                    SourceMode::Proxy
                } else {
                    SourceMode::Direct
                }
            }
            Some(v) if v.eq_ignore_ascii_case("direct") => SourceMode::Direct,
            Some(v) if v.eq_ignore_ascii_case("proxy") => SourceMode::Proxy,
            Some(v) => {
                return Err(AppError::new(
                    EXIT_INPUT,
                    format!("READJUST_SOURCE must be `direct` or `proxy` (got '{v}')."),
                ));
            }
        };

        if let Some(raw) = get("READJUST_TIMEOUT_SECS") {
            settings.timeout = Duration::from_secs(parse_secs("READJUST_TIMEOUT_SECS", &raw, 1)?);
        }
        if let Some(raw) = get("READJUST_CACHE_TTL_SECS") {
            settings.cache_ttl = Duration::from_secs(parse_secs("READJUST_CACHE_TTL_SECS", &raw, 0)?);
        }

        Ok(settings)
    }

    /// Apply CLI overrides on top of the environment.
    pub fn with_overrides(mut self, proxy_url: Option<String>, timeout_secs: Option<u64>) -> Self {
        if let Some(url) = proxy_url {
            self.proxy_url = Some(url);
            self.source = SourceMode::Proxy;
        }
        if let Some(secs) = timeout_secs {
            self.timeout = Duration::from_secs(secs.max(1));
        }
        self
    }
}

fn parse_secs(name: &str, raw: &str, min: u64) -> Result<u64, AppError> {
    match raw.parse::<u64>() {
        Ok(v) if v >= min => Ok(v),
        _ => Err(AppError::new(
            EXIT_INPUT,
            format!("{name} must be an integer >= {min} (got '{raw}')."),
        )),
    }
}
