//! Runtime secret resolution.
//!
//! Config stores only env var NAMES (e.g. `api_key_env: "NAVER_API_KEY"`).
//! Values are read here, once, and carried in [`ApiKey`], whose `Debug`
//! output is redacted. Errors name the variable, never its value.

use anyhow::{bail, Result};

use crate::settings::CollectorConfig;

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(<REDACTED>)")
    }
}

/// `None` if the variable is unset or blank.
pub fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// API key for one collector.
///
/// An HTTP collector that names an env var requires it to be set; one that
/// names none runs unauthenticated. Mock collectors never have a key.
pub fn resolve_collector_key(channel_code: &str, cfg: &CollectorConfig) -> Result<Option<ApiKey>> {
    match cfg {
        CollectorConfig::Mock => Ok(None),
        CollectorConfig::Http {
            api_key_env: None, ..
        } => Ok(None),
        CollectorConfig::Http {
            api_key_env: Some(name),
            ..
        } => match resolve_env(name) {
            Some(v) => Ok(Some(ApiKey(v))),
            None => bail!(
                "SECRETS_MISSING collector={}: required env var '{}' is not set or empty",
                channel_code,
                name
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_is_redacted() {
        let k = ApiKey("super-secret".to_string());
        assert_eq!(format!("{k:?}"), "ApiKey(<REDACTED>)");
        assert_eq!(k.expose(), "super-secret");
    }

    #[test]
    fn missing_env_names_the_variable() {
        let cfg = CollectorConfig::Http {
            base_url: "http://x".to_string(),
            api_key_env: Some("OMS_TEST_KEY_THAT_IS_NEVER_SET_3141".to_string()),
            timeout_secs: None,
        };
        let err = resolve_collector_key("NAVER", &cfg).unwrap_err().to_string();
        assert!(err.contains("OMS_TEST_KEY_THAT_IS_NEVER_SET_3141"));
        assert!(err.contains("NAVER"));
    }

    #[test]
    fn mock_and_keyless_http_need_nothing() {
        assert!(resolve_collector_key("NAVER", &CollectorConfig::Mock)
            .unwrap()
            .is_none());
        let http = CollectorConfig::Http {
            base_url: "http://x".to_string(),
            api_key_env: None,
            timeout_secs: Some(5),
        };
        assert!(resolve_collector_key("NAVER", &http).unwrap().is_none());
    }
}
