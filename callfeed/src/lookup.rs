//! Best-effort username → messaging-platform numeric id lookup over HTTP.

use crate::{config::LookupConfig, error::ConfigError};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum LookupError {
    #[error("username is required")]
    EmptyUsername,

    #[error("user not found: {0}")]
    NotFound(String),

    #[error("lookup failed with {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid lookup response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value.to_string())
    }
}

/// Trim, strip one leading `@` and lowercase.
pub fn clean_username(input: &str) -> Result<String, LookupError> {
    let username = input.trim();
    let username = username.strip_prefix('@').unwrap_or(username).trim();

    if username.is_empty() {
        Err(LookupError::EmptyUsername)
    } else {
        Ok(username.to_lowercase())
    }
}

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    username: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    user_id: Option<Value>,
    error: Option<String>,
}

/// Map a lookup endpoint response onto a numeric user id.
pub fn interpret(status: StatusCode, body: &str) -> Result<i64, LookupError> {
    let response = serde_json::from_str::<LookupResponse>(body).unwrap_or_else(|error| {
        debug!(%error, "lookup response body is not JSON");
        LookupResponse::default()
    });

    if !status.is_success() {
        let message = response
            .error
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
        return Err(match status {
            StatusCode::NOT_FOUND => LookupError::NotFound(message),
            _ => LookupError::Upstream {
                status: status.as_u16(),
                message,
            },
        });
    }

    match response.user_id {
        Some(Value::Number(number)) => number
            .as_i64()
            .ok_or_else(|| LookupError::InvalidResponse(number.to_string())),
        Some(Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| LookupError::InvalidResponse(text)),
        Some(other) => Err(LookupError::InvalidResponse(other.to_string())),
        None => Err(LookupError::InvalidResponse(
            response.error.unwrap_or_else(|| "missing userId".to_string()),
        )),
    }
}

#[derive(Debug, Clone)]
pub struct LookupClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl LookupClient {
    pub fn new(config: &LookupConfig) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|_| ConfigError::InvalidValue {
            key: "CALLFEED_LOOKUP_URL",
            value: config.endpoint.clone(),
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Resolve `username` (with or without `@`) to its numeric id. No retry.
    pub async fn lookup(&self, username: &str) -> Result<i64, LookupError> {
        let username = clean_username(username)?;
        debug!(%username, endpoint = %self.endpoint, "looking up user id");

        let response = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(&LookupRequest {
                username: &username,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        interpret(status, &body).inspect_err(|error| warn!(%username, %error, "user id lookup failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_username() {
        struct TestCase {
            input: &'static str,
            expected: Result<String, LookupError>,
        }

        let tests = vec![
            TestCase {
                // TC0: strips leading @ and lowercases
                input: "@Bizonacci",
                expected: Ok("bizonacci".to_string()),
            },
            TestCase {
                // TC1: surrounding whitespace
                input: "  j1legend ",
                expected: Ok("j1legend".to_string()),
            },
            TestCase {
                // TC2: only @
                input: "@",
                expected: Err(LookupError::EmptyUsername),
            },
            TestCase {
                // TC3: blank
                input: "   ",
                expected: Err(LookupError::EmptyUsername),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(clean_username(test.input), test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_interpret() {
        struct TestCase {
            status: StatusCode,
            body: &'static str,
            expected: Result<i64, LookupError>,
        }

        let tests = vec![
            TestCase {
                // TC0: numeric string id
                status: StatusCode::OK,
                body: r#"{"userId":"191059284","source":"telethon_api"}"#,
                expected: Ok(191059284),
            },
            TestCase {
                // TC1: numeric id
                status: StatusCode::OK,
                body: r#"{"userId":374435895}"#,
                expected: Ok(374435895),
            },
            TestCase {
                // TC2: not found
                status: StatusCode::NOT_FOUND,
                body: r#"{"error":"User not found or invalid ID returned"}"#,
                expected: Err(LookupError::NotFound(
                    "User not found or invalid ID returned".to_string(),
                )),
            },
            TestCase {
                // TC3: upstream failure without JSON body
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom",
                expected: Err(LookupError::Upstream {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                }),
            },
            TestCase {
                // TC4: success without an id
                status: StatusCode::OK,
                body: r#"{}"#,
                expected: Err(LookupError::InvalidResponse("missing userId".to_string())),
            },
            TestCase {
                // TC5: non-numeric id
                status: StatusCode::OK,
                body: r#"{"userId":"abc"}"#,
                expected: Err(LookupError::InvalidResponse("abc".to_string())),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(interpret(test.status, test.body), test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_lookup_client_rejects_invalid_endpoint() {
        let config = LookupConfig::default().with_endpoint("not a url");
        assert!(matches!(
            LookupClient::new(&config),
            Err(ConfigError::InvalidValue { key: "CALLFEED_LOOKUP_URL", .. })
        ));
    }

    #[tokio::test]
    async fn test_lookup_empty_username_skips_request() {
        let client = LookupClient::new(&LookupConfig::default()).unwrap();
        assert_eq!(client.lookup(" @ ").await, Err(LookupError::EmptyUsername));
    }
}
