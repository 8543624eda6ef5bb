use crate::{document::CallQuery, error::ConfigError};
use std::{str::FromStr, time::Duration};
use url::Url;

/// Default upstream collection holding call documents.
pub const DEFAULT_COLLECTION: &str = "calls";

/// Default number of most recent calls kept in the live window.
pub const DEFAULT_WINDOW_LIMIT: usize = 100;

/// Default bounded wait for the first snapshot.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of entries in the top-gainers ticker.
pub const DEFAULT_TOP_K: usize = 20;

fn var_str(vars: &impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    vars(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn var_parse<T: FromStr>(vars: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T {
    vars(name)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_vars(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Backend connection settings.
///
/// Values come from the environment with hardcoded fallbacks so a local gateway works out of
/// the box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// WebSocket endpoint of the document-change gateway.
    pub gateway_url: String,
    /// Backend project the gateway should listen on.
    pub project_id: String,
    /// Optional API key forwarded with every listen request.
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            gateway_url: "ws://127.0.0.1:8080/listen".to_string(),
            project_id: "calls-feed".to_string(),
            api_key: None,
        }
    }
}

impl BackendConfig {
    /// Read `CALLFEED_GATEWAY_URL`, `CALLFEED_PROJECT_ID` and `CALLFEED_API_KEY`.
    pub fn from_env() -> Self {
        Self::from_vars(env_vars)
    }

    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            gateway_url: var_str(&vars, "CALLFEED_GATEWAY_URL", &defaults.gateway_url),
            project_id: var_str(&vars, "CALLFEED_PROJECT_ID", &defaults.project_id),
            api_key: vars("CALLFEED_API_KEY")
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        }
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Parse and validate the gateway endpoint.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: "CALLFEED_GATEWAY_URL",
            value: self.gateway_url.clone(),
        };

        let url = Url::parse(&self.gateway_url).map_err(|_| invalid())?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            _ => Err(invalid()),
        }
    }
}

/// Live feed window and timing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Upstream collection to subscribe to.
    pub collection: String,
    /// Most recent N documents kept in the window.
    pub window_limit: usize,
    /// Bounded wait for the first snapshot before reporting an error.
    pub connect_timeout: Duration,
    /// Number of entries kept by the top-gainers aggregator.
    pub top_k: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            window_limit: DEFAULT_WINDOW_LIMIT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl FeedConfig {
    /// Read `CALLFEED_COLLECTION`, `CALLFEED_WINDOW_LIMIT`, `CALLFEED_CONNECT_TIMEOUT_SECS`
    /// and `CALLFEED_TOP_K`.
    pub fn from_env() -> Self {
        Self::from_vars(env_vars)
    }

    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            collection: var_str(&vars, "CALLFEED_COLLECTION", &defaults.collection),
            window_limit: var_parse(&vars, "CALLFEED_WINDOW_LIMIT", defaults.window_limit).max(1),
            connect_timeout: Duration::from_secs(var_parse(
                &vars,
                "CALLFEED_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )),
            top_k: var_parse(&vars, "CALLFEED_TOP_K", defaults.top_k),
        }
    }

    pub fn with_window_limit(mut self, limit: usize) -> Self {
        self.window_limit = limit;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Newest-first bounded query over the configured collection.
    pub fn query(&self) -> CallQuery {
        CallQuery::recent(self.collection.clone(), self.window_limit)
    }
}

/// Username lookup endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3000/api/telegram/lookup".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl LookupConfig {
    /// Read `CALLFEED_LOOKUP_URL`.
    pub fn from_env() -> Self {
        Self::from_vars(env_vars)
    }

    pub fn from_vars(vars: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            endpoint: var_str(&vars, "CALLFEED_LOOKUP_URL", &defaults.endpoint),
            ..defaults
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = FeedConfig::from_vars(vars(&[]));
        assert_eq!(config.collection, "calls");
        assert_eq!(config.window_limit, 100);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.top_k, 20);

        let backend = BackendConfig::from_vars(vars(&[]));
        assert_eq!(backend, BackendConfig::default());
        assert!(backend.api_key.is_none());
    }

    #[test]
    fn test_config_from_vars() {
        let config = FeedConfig::from_vars(vars(&[
            ("CALLFEED_WINDOW_LIMIT", "50"),
            ("CALLFEED_CONNECT_TIMEOUT_SECS", " 3 "),
            ("CALLFEED_TOP_K", "not-a-number"),
        ]));
        assert_eq!(config.window_limit, 50);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.top_k, DEFAULT_TOP_K);

        let backend = BackendConfig::from_vars(vars(&[
            ("CALLFEED_GATEWAY_URL", "wss://gateway.example.com/listen"),
            ("CALLFEED_API_KEY", "  "),
        ]));
        assert_eq!(backend.gateway_url, "wss://gateway.example.com/listen");
        assert!(backend.api_key.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = FeedConfig::default()
            .with_window_limit(25)
            .with_connect_timeout(Duration::from_secs(2))
            .with_top_k(15);

        assert_eq!(config.window_limit, 25);
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.top_k, 15);
        assert_eq!(config.query().limit, 25);
    }

    #[test]
    fn test_backend_endpoint_validation() {
        assert!(BackendConfig::default().endpoint().is_ok());
        assert!(
            BackendConfig::default()
                .with_gateway_url("http://127.0.0.1:8080")
                .endpoint()
                .is_err()
        );
        assert!(
            BackendConfig::default()
                .with_gateway_url("not a url")
                .endpoint()
                .is_err()
        );
    }
}
