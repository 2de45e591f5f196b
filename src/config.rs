use anyhow::Context;
use serde::Deserialize;

/// Upper bound for a single status long-poll, whatever the environment says.
pub const STATUS_WAIT_CEILING_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub openai: OpenAiConfig,
    pub database_url: Option<String>,
    pub strict_model_json: bool,
    pub max_body_bytes: usize,
    pub status_wait_max_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't have to
    /// touch the process environment.
    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = get("OPENAI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .context("OPENAI_API_KEY is not set")?;

        let openai = OpenAiConfig {
            api_key,
            base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".into())
                .trim_end_matches('/')
                .to_string(),
            model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".into()),
            max_tokens: get("OPENAI_MAX_TOKENS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(1000),
            timeout_secs: get("OPENAI_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()),
        };

        Ok(Self {
            openai,
            database_url: get("DATABASE_URL").filter(|v| !v.is_empty()),
            strict_model_json: get("STRICT_MODEL_JSON")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            max_body_bytes: get("MAX_BODY_BYTES")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(20 * 1024 * 1024),
            status_wait_max_ms: get("STATUS_WAIT_MAX_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30_000)
                .min(STATUS_WAIT_CEILING_MS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(cfg.openai.api_key, "sk-test");
        assert_eq!(cfg.openai.base_url, "https://api.openai.com/v1");
        assert_eq!(cfg.openai.model, "gpt-4o");
        assert_eq!(cfg.openai.max_tokens, 1000);
        assert_eq!(cfg.openai.timeout_secs, None);
        assert_eq!(cfg.database_url, None);
        assert!(!cfg.strict_model_json);
        assert_eq!(cfg.max_body_bytes, 20 * 1024 * 1024);
        assert_eq!(cfg.status_wait_max_ms, 30_000);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:9000/v1/"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("OPENAI_MAX_TOKENS", "512"),
            ("OPENAI_TIMEOUT_SECS", "15"),
            ("DATABASE_URL", "postgres://localhost/snapmeal"),
            ("STRICT_MODEL_JSON", "true"),
            ("MAX_BODY_BYTES", "1024"),
            ("STATUS_WAIT_MAX_MS", "500"),
        ]))
        .unwrap();
        assert_eq!(cfg.openai.base_url, "http://localhost:9000/v1");
        assert_eq!(cfg.openai.model, "gpt-4o-mini");
        assert_eq!(cfg.openai.max_tokens, 512);
        assert_eq!(cfg.openai.timeout_secs, Some(15));
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/snapmeal"));
        assert!(cfg.strict_model_json);
        assert_eq!(cfg.max_body_bytes, 1024);
        assert_eq!(cfg.status_wait_max_ms, 500);
    }

    #[test]
    fn status_wait_is_clamped_to_ceiling() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("STATUS_WAIT_MAX_MS", "18446744073709551615"),
        ]))
        .unwrap();
        assert_eq!(cfg.status_wait_max_ms, STATUS_WAIT_CEILING_MS);
    }
}
