/*
[INPUT]:  Credential profile fields (environment, key, secret, alternate auth material)
[OUTPUT]: Immutable Credentials value and environment-resolved endpoints
[POS]:    Auth layer - credential model shared by REST and stream clients
[UPDATE]: When adding auth methods or deployment environments
*/

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::endpoints::{BASE_URLS, WS_URLS};
use crate::http::{PrimeError, Result};

/// Deployment target.
///
/// Parsing is fail-safe: only the exact string `production` selects
/// production, everything else lands on the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    Production,
    #[default]
    Sandbox,
}

impl Environment {
    pub fn from_name(name: &str) -> Self {
        if name == "production" {
            Environment::Production
        } else {
            Environment::Sandbox
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Sandbox => "sandbox",
        }
    }

    /// REST base URL for this environment
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Production => BASE_URLS.production,
            Environment::Sandbox => BASE_URLS.sandbox,
        }
    }

    /// WebSocket URL for this environment
    pub fn ws_url(self) -> &'static str {
        match self {
            Environment::Production => WS_URLS.production,
            Environment::Sandbox => WS_URLS.sandbox,
        }
    }
}

impl From<String> for Environment {
    fn from(value: String) -> Self {
        Environment::from_name(&value)
    }
}

impl From<Environment> for String {
    fn from(value: Environment) -> Self {
        value.as_str().to_string()
    }
}

/// REST base URL for an environment name
pub fn base_url(environment: &str) -> &'static str {
    Environment::from_name(environment).base_url()
}

/// WebSocket URL for an environment name
pub fn ws_url(environment: &str) -> &'static str {
    Environment::from_name(environment).ws_url()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthMethod {
    #[default]
    #[serde(rename = "apiKey")]
    ApiKey,
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(rename = "mtls")]
    Mtls,
    #[serde(rename = "jwt")]
    Jwt,
}

/// Credentials for signed requests and stream authentication
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// OAuth 2.0 or JWT bearer token
    #[serde(default)]
    pub access_token: Option<String>,
    /// PEM-encoded client certificate for mTLS
    #[serde(default)]
    pub client_cert: Option<String>,
    /// PEM-encoded private key for mTLS
    #[serde(default)]
    pub client_key: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
}

impl Credentials {
    /// API key + secret credentials for the given environment
    pub fn new(
        environment: Environment,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            environment,
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            ..Self::default()
        }
    }

    /// Ensure the material needed for HMAC signing is present
    pub fn validate_for_signing(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(PrimeError::signing("API key is required"));
        }
        if self.api_secret.is_empty() {
            return Err(PrimeError::signing("API secret is required"));
        }
        Ok(())
    }

    /// Bearer token to present, if the auth method uses one
    pub fn bearer_token(&self) -> Option<&str> {
        match self.auth_method {
            AuthMethod::OAuth2 | AuthMethod::Jwt => self
                .access_token
                .as_deref()
                .filter(|token| !token.is_empty()),
            _ => None,
        }
    }

    /// Concatenated client certificate and key, if mTLS material is present
    pub fn client_identity_pem(&self) -> Option<Vec<u8>> {
        match (&self.client_cert, &self.client_key) {
            (Some(cert), Some(key)) if !cert.is_empty() && !key.is_empty() => {
                let mut pem = Vec::with_capacity(cert.len() + key.len() + 1);
                pem.extend_from_slice(cert.as_bytes());
                pem.push(b'\n');
                pem.extend_from_slice(key.as_bytes());
                Some(pem)
            }
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("environment", &self.environment)
            .field("auth_method", &self.auth_method)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("client_cert", &self.client_cert.is_some())
            .field("client_key", &self.client_key.as_ref().map(|_| "<redacted>"))
            .field("account_id", &self.account_id)
            .field("organization_id", &self.organization_id)
            .finish()
    }
}
