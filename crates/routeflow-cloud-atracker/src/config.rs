//! Connection settings for the activity tracker service

use crate::error::{AtrackerError, Result};
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-south";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_API_TOKEN: &str = "ROUTEFLOW_API_TOKEN";
const ENV_REGION: &str = "ROUTEFLOW_REGION";
const ENV_ENDPOINT: &str = "ROUTEFLOW_ENDPOINT";
const ENV_PRIVATE: &str = "ROUTEFLOW_PRIVATE";

/// Service URL for a region
pub fn service_url_for_region(region: &str, private: bool) -> String {
    if private {
        format!("https://private.{}.atracker.cloud.ibm.com", region)
    } else {
        format!("https://{}.atracker.cloud.ibm.com", region)
    }
}

#[derive(Debug, Clone)]
pub struct AtrackerConfig {
    /// Bearer token sent with every request
    pub api_token: String,
    pub region: String,
    pub private_endpoint: bool,
    /// Overrides the regional URL when set
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl AtrackerConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            region: DEFAULT_REGION.to_string(),
            private_endpoint: false,
            endpoint: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Create AtrackerConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(Self::api_token_from_env()?);
        config.apply_env()?;
        Ok(config)
    }

    /// `ROUTEFLOW_API_TOKEN`, which must be set and non-empty
    pub fn api_token_from_env() -> Result<String> {
        std::env::var(ENV_API_TOKEN)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AtrackerError::MissingEnvVar(ENV_API_TOKEN.to_string()))
    }

    /// Apply `ROUTEFLOW_REGION`, `ROUTEFLOW_ENDPOINT` and `ROUTEFLOW_PRIVATE`
    /// on top of the current values
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(region) = std::env::var(ENV_REGION) {
            if !region.is_empty() {
                self.region = region;
            }
        }
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            if !endpoint.is_empty() {
                self.endpoint = Some(endpoint);
            }
        }
        if let Ok(private) = std::env::var(ENV_PRIVATE) {
            self.private_endpoint = parse_flag(ENV_PRIVATE, &private)?;
        }
        Ok(())
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_private_endpoint(mut self, private: bool) -> Self {
        self.private_endpoint = private;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL requests are sent to, without a trailing slash
    pub fn service_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => service_url_for_region(&self.region, self.private_endpoint),
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AtrackerError::InvalidConfig(format!(
            "{} must be a boolean, got '{}'",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_service_url_for_region() {
        assert_eq!(
            service_url_for_region("eu-de", false),
            "https://eu-de.atracker.cloud.ibm.com"
        );
        assert_eq!(
            service_url_for_region("us-south", true),
            "https://private.us-south.atracker.cloud.ibm.com"
        );
    }

    #[test]
    fn test_endpoint_override_wins() {
        let config = AtrackerConfig::new("token")
            .with_region("eu-gb")
            .with_endpoint("http://127.0.0.1:8080/");
        assert_eq!(config.service_url(), "http://127.0.0.1:8080");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        temp_env::with_vars(
            [
                (ENV_API_TOKEN, Some("secret")),
                (ENV_REGION, Some("eu-de")),
                (ENV_PRIVATE, Some("true")),
                (ENV_ENDPOINT, None),
            ],
            || {
                let config = AtrackerConfig::from_env().unwrap();
                assert_eq!(config.api_token, "secret");
                assert_eq!(config.region, "eu-de");
                assert!(config.private_endpoint);
                assert_eq!(
                    config.service_url(),
                    "https://private.eu-de.atracker.cloud.ibm.com"
                );
            },
        );
    }

    #[test]
    #[serial]
    fn test_from_env_requires_token() {
        temp_env::with_var_unset(ENV_API_TOKEN, || {
            assert!(matches!(
                AtrackerConfig::from_env(),
                Err(AtrackerError::MissingEnvVar(_))
            ));
        });
    }

    #[test]
    #[serial]
    fn test_invalid_private_flag() {
        temp_env::with_vars(
            [(ENV_API_TOKEN, Some("secret")), (ENV_PRIVATE, Some("maybe"))],
            || {
                assert!(matches!(
                    AtrackerConfig::from_env(),
                    Err(AtrackerError::InvalidConfig(_))
                ));
            },
        );
    }
}
