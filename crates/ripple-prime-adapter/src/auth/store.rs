/*
[INPUT]:  Named credential profiles supplied by the host
[OUTPUT]: Credentials lookup by profile name
[POS]:    Auth layer - credential store seam (storage is host-owned)
[UPDATE]: When adding credential sources
*/

use std::collections::HashMap;

use crate::http::{PrimeError, Result};

use super::Credentials;

/// Source of credentials keyed by profile name
pub trait CredentialStore: Send + Sync {
    fn credentials(&self, profile: &str) -> Result<Credentials>;
}

/// In-memory credential store
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    profiles: HashMap<String, Credentials>,
}

impl StaticCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: impl Into<String>, credentials: Credentials) {
        self.profiles.insert(profile.into(), credentials);
    }

    pub fn with_profile(mut self, profile: impl Into<String>, credentials: Credentials) -> Self {
        self.insert(profile, credentials);
        self
    }

    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

impl CredentialStore for StaticCredentialStore {
    fn credentials(&self, profile: &str) -> Result<Credentials> {
        self.profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| PrimeError::Config(format!("unknown credential profile: {profile}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Environment;

    #[test]
    fn test_lookup_known_and_unknown_profile() {
        let store = StaticCredentialStore::new().with_profile(
            "desk",
            Credentials::new(Environment::Production, "key", "secret"),
        );

        let creds = store.credentials("desk").unwrap();
        assert_eq!(creds.api_key, "key");
        assert_eq!(creds.environment, Environment::Production);

        let err = store.credentials("missing").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
