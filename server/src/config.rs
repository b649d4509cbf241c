use std::time::Duration;

use anyhow::{Result, anyhow};

#[derive(Clone, Debug)]
pub struct TgBotConfig {
    pub base_url: String,
    pub secret: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub http_prefix: String,
    pub cors_allowed_origins: Vec<String>,
    pub tg_bot: Option<TgBotConfig>,
    pub otlp_endpoint: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "employee-service".into(),
            environment: "development".into(),
            http_prefix: "/api/v1".into(),
            cors_allowed_origins: Vec::new(),
            tg_bot: None,
            otlp_endpoint: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let service_name = lookup("SERVICE_NAME").unwrap_or(defaults.service_name);
        let environment = lookup("ENVIRONMENT").unwrap_or(defaults.environment);
        let http_prefix = normalize_prefix(
            &lookup("HTTP_PREFIX").unwrap_or(defaults.http_prefix),
        )?;

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let tg_bot = match lookup("TG_BOT_URL").filter(|url| !url.trim().is_empty()) {
            Some(base_url) => {
                let timeout_ms = match lookup("TG_BOT_TIMEOUT_MS") {
                    Some(raw) => raw
                        .parse::<u64>()
                        .map_err(|_| anyhow!("TG_BOT_TIMEOUT_MS must be an integer, got {raw:?}"))?,
                    None => 5_000,
                };
                Some(TgBotConfig {
                    base_url,
                    secret: lookup("INTERSERVER_SECRET_KEY").unwrap_or_default(),
                    timeout: Duration::from_millis(timeout_ms),
                })
            }
            None => None,
        };

        Ok(Self {
            service_name,
            environment,
            http_prefix,
            cors_allowed_origins,
            tg_bot,
            otlp_endpoint: lookup("OTLP_ENDPOINT"),
        })
    }
}

/// `""` and `"/"` mount at the root; anything else must start with `/` and loses trailing slashes.
fn normalize_prefix(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if !trimmed.starts_with('/') {
        return Err(anyhow!("HTTP_PREFIX must start with '/', got {raw:?}"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.http_prefix, "/api/v1");
        assert!(config.tg_bot.is_none());
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn bot_settings_are_read_together() {
        let config = load(&[
            ("TG_BOT_URL", "http://bot:8000"),
            ("INTERSERVER_SECRET_KEY", "k"),
            ("TG_BOT_TIMEOUT_MS", "250"),
        ])
        .unwrap();
        let bot = config.tg_bot.unwrap();
        assert_eq!(bot.base_url, "http://bot:8000");
        assert_eq!(bot.secret, "k");
        assert_eq!(bot.timeout, Duration::from_millis(250));
    }

    #[test]
    fn bad_timeout_is_an_error() {
        assert!(load(&[("TG_BOT_URL", "http://bot"), ("TG_BOT_TIMEOUT_MS", "soon")]).is_err());
    }

    #[test]
    fn prefix_is_normalized() {
        assert_eq!(load(&[("HTTP_PREFIX", "/svc/")]).unwrap().http_prefix, "/svc");
        assert_eq!(load(&[("HTTP_PREFIX", "/")]).unwrap().http_prefix, "");
        assert!(load(&[("HTTP_PREFIX", "api")]).is_err());
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let config = load(&[("CORS_ALLOWED_ORIGINS", "http://a, ,http://b ")]).unwrap();
        assert_eq!(config.cors_allowed_origins, vec!["http://a", "http://b"]);
    }
}
