/*
[INPUT]:  YAML configuration file, RIPPLE_PRIME_* environment variables
[OUTPUT]: Parsed runner configuration, credentials, stream settings
[POS]:    Configuration layer - profiles and trigger setup
[UPDATE]: When adding new configuration options
*/

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use ripple_prime_adapter::ws::{DEFAULT_TOPICS, ExponentialBackoff, FixedInterval};
use ripple_prime_adapter::{
    AuthMethod, ClientConfig, CredentialStore, Credentials, EVENT_TOPICS, Environment,
    ReconnectConfig, StaticCredentialStore, StreamConfig,
};
use serde::{Deserialize, Serialize};

pub const API_KEY_ENV: &str = "RIPPLE_PRIME_API_KEY";
pub const API_SECRET_ENV: &str = "RIPPLE_PRIME_API_SECRET";

/// Top-level configuration for the runner
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// Credential profiles
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
    /// Event stream settings
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// One named set of credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub name: String,
    /// "production" or anything else for sandbox
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// apiKey, oauth2, mtls or jwt
    #[serde(default)]
    pub auth_method: AuthMethod,
    /// Bearer token for oauth2 and jwt
    #[serde(default)]
    pub access_token: Option<String>,
    /// PEM client certificate for mtls
    #[serde(default)]
    pub client_cert: Option<String>,
    /// PEM private key for mtls
    #[serde(default)]
    pub client_key: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    /// REST base URL override
    #[serde(default)]
    pub base_url: Option<String>,
    /// WebSocket URL override
    #[serde(default)]
    pub ws_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 0 means unlimited
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub backoff: BackoffKind,
    /// Cap for exponential backoff
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
            backoff: BackoffKind::Fixed,
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

/// Event stream configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerConfig {
    /// Profile used by `listen`; defaults to the first profile
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default = "default_topics")]
    pub topics: Vec<String>,
    #[serde(default)]
    pub account_filter: Option<String>,
    #[serde(default)]
    pub symbol_filter: Option<String>,
    #[serde(default)]
    pub include_heartbeats: bool,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    #[serde(default)]
    pub keep_alive_secs: Option<u64>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            profile: None,
            topics: default_topics(),
            account_filter: None,
            symbol_filter: None,
            include_heartbeats: false,
            reconnect: ReconnectSettings::default(),
            keep_alive_secs: None,
        }
    }
}

/// HTTP client timeouts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_environment() -> String {
    "sandbox".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_max_interval_ms() -> u64 {
    60_000
}

fn default_topics() -> Vec<String> {
    DEFAULT_TOPICS.iter().map(|topic| topic.to_string()).collect()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl RunnerConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Fill empty API keys and secrets from the process environment
    pub fn apply_env_fallback(&mut self) {
        self.apply_env_fallback_with(|name| std::env::var(name).ok());
    }

    pub fn apply_env_fallback_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        for profile in &mut self.profiles {
            if profile.api_key.is_empty() {
                if let Some(key) = non_empty(API_KEY_ENV) {
                    profile.api_key = key;
                }
            }
            if profile.api_secret.is_empty() {
                if let Some(secret) = non_empty(API_SECRET_ENV) {
                    profile.api_secret = secret;
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.profiles.is_empty() {
            bail!("at least one profile is required");
        }

        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if !seen.insert(profile.name.as_str()) {
                bail!("duplicate profile name: {}", profile.name);
            }
            profile
                .validate()
                .with_context(|| format!("profile {}", profile.name))?;
        }

        if let Some(name) = &self.trigger.profile {
            self.profile(Some(name))?;
        }
        self.trigger
            .stream_config()
            .validate()
            .context("trigger settings")?;
        Ok(())
    }

    /// Named profile, or the first one when `name` is None
    pub fn profile(&self, name: Option<&str>) -> anyhow::Result<&ProfileConfig> {
        match name {
            Some(name) => self
                .profiles
                .iter()
                .find(|profile| profile.name == name)
                .with_context(|| format!("unknown profile: {name}")),
            None => self.profiles.first().context("no profiles configured"),
        }
    }

    /// Profile settings plus its credentials as held by `store`
    pub fn resolve(
        &self,
        store: &dyn CredentialStore,
        name: Option<&str>,
    ) -> anyhow::Result<(&ProfileConfig, Credentials)> {
        let profile = self.profile(name)?;
        let credentials = store
            .credentials(&profile.name)
            .with_context(|| format!("credentials for profile {}", profile.name))?;
        Ok((profile, credentials))
    }

    pub fn credential_store(&self) -> StaticCredentialStore {
        self.profiles
            .iter()
            .fold(StaticCredentialStore::new(), |store, profile| {
                store.with_profile(profile.name.clone(), profile.credentials())
            })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.http.timeout_secs),
            connect_timeout: Duration::from_secs(self.http.connect_timeout_secs),
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}

impl ProfileConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            auth_method: self.auth_method,
            access_token: self.access_token.clone(),
            client_cert: self.client_cert.clone(),
            client_key: self.client_key.clone(),
            account_id: self.account_id.clone(),
            organization_id: self.organization_id.clone(),
            ..Credentials::new(
                Environment::from_name(&self.environment),
                self.api_key.clone(),
                self.api_secret.clone(),
            )
        }
    }

    /// Signing material plus whatever the auth method needs on top
    pub fn validate(&self) -> anyhow::Result<()> {
        self.credentials().validate_for_signing()?;
        match self.auth_method {
            AuthMethod::OAuth2 | AuthMethod::Jwt if is_blank(self.access_token.as_deref()) => {
                bail!("access_token is required for {:?} auth", self.auth_method)
            }
            AuthMethod::Mtls
                if is_blank(self.client_cert.as_deref()) || is_blank(self.client_key.as_deref()) =>
            {
                bail!("client_cert and client_key are required for mtls auth")
            }
            _ => Ok(()),
        }
    }
}

impl ReconnectSettings {
    pub fn to_reconnect_config(&self) -> ReconnectConfig {
        let interval = Duration::from_millis(self.interval_ms);
        let policy: Arc<dyn ripple_prime_adapter::ReconnectPolicy> = match self.backoff {
            BackoffKind::Fixed => Arc::new(FixedInterval(interval)),
            BackoffKind::Exponential => Arc::new(ExponentialBackoff {
                initial: interval,
                max: Duration::from_millis(self.max_interval_ms),
            }),
        };
        ReconnectConfig {
            enabled: self.enabled,
            max_attempts: self.max_attempts,
            policy,
        }
    }
}

impl TriggerConfig {
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            topics: self.topics.clone(),
            account_filter: self.account_filter.clone(),
            symbol_filter: self.symbol_filter.clone(),
            include_heartbeats: self.include_heartbeats,
            reconnect: self.reconnect.to_reconnect_config(),
            keep_alive: self.keep_alive_secs.map(Duration::from_secs),
        }
    }

    /// Topics that neither name nor prefix a published event topic
    pub fn unknown_topics(&self) -> Vec<&str> {
        self.topics
            .iter()
            .map(String::as_str)
            .filter(|topic| !EVENT_TOPICS.iter().any(|known| known.starts_with(topic)))
            .collect()
    }
}
