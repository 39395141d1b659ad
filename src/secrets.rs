// src/secrets.rs
//! Session-scoped cache of reveal-once secrets (temporary passwords).
//!
//! The server returns a temporary password exactly once, in the response to
//! create / bulk create / reset. The cache keeps it for the rest of the
//! session. When nothing was recorded, lookups fall back to the owner's
//! persisted `last_temp_password` hint. A value recorded this session always
//! wins over the hint ("freshest wins"), including after later status changes
//! such as disabling the user.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{BulkCreateResponse, CreatedUser, ResetPasswordResponse};

/// An owner record carrying a server-persisted hint.
pub trait SecretOwner {
    fn owner_id(&self) -> i64;
    fn persisted_hint(&self) -> Option<&str>;
}

#[derive(Debug, Default, Clone)]
pub struct EphemeralSecretCache {
    records: HashMap<i64, String>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl EphemeralSecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty secrets are ignored.
    pub fn record(&mut self, owner_id: i64, secret: impl Into<String>) {
        let secret = secret.into();
        if secret.is_empty() {
            return;
        }
        debug!(owner_id, "secret recorded for session");
        self.records.insert(owner_id, secret);
    }

    /// Session record first, then the persisted hint.
    pub fn get<'a>(&'a self, owner_id: i64, hint: Option<&'a str>) -> Option<&'a str> {
        present(self.records.get(&owner_id).map(String::as_str)).or_else(|| present(hint))
    }

    pub fn get_for<'a, O: SecretOwner>(&'a self, owner: &'a O) -> Option<&'a str> {
        self.get(owner.owner_id(), owner.persisted_hint())
    }

    /// Looks the owner up by id among `owners` to find its hint.
    pub fn lookup<'a, O: SecretOwner>(&'a self, owner_id: i64, owners: &'a [O]) -> Option<&'a str> {
        let hint = owners
            .iter()
            .find(|o| o.owner_id() == owner_id)
            .and_then(|o| o.persisted_hint());
        self.get(owner_id, hint)
    }

    pub fn record_created(&mut self, created: &CreatedUser) -> Option<&str> {
        let secret = created.temp_password.as_deref().filter(|s| !s.is_empty())?;
        self.record(created.id, secret);
        self.records.get(&created.id).map(String::as_str)
    }

    /// Returns how many secrets were recorded.
    pub fn record_bulk(&mut self, response: &BulkCreateResponse) -> usize {
        response
            .created
            .iter()
            .filter(|c| self.record_created(c).is_some())
            .count()
    }

    pub fn record_reset(&mut self, owner_id: i64, response: &ResetPasswordResponse) -> bool {
        match response.temp_password.as_deref() {
            Some(secret) if !secret.is_empty() => {
                self.record(owner_id, secret);
                true
            }
            _ => false,
        }
    }

    /// Full application reset. Persisted hints are not affected.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Owner {
        id: i64,
        hint: Option<String>,
    }

    impl SecretOwner for Owner {
        fn owner_id(&self) -> i64 {
            self.id
        }
        fn persisted_hint(&self) -> Option<&str> {
            self.hint.as_deref()
        }
    }

    #[test]
    fn test_record_overrides_hint() {
        let mut cache = EphemeralSecretCache::new();
        cache.record(5, "abc");
        assert_eq!(cache.get(5, Some("stale")), Some("abc"));
    }

    #[test]
    fn test_falls_back_to_hint() {
        let cache = EphemeralSecretCache::new();
        assert_eq!(cache.get(5, Some("persisted")), Some("persisted"));
        assert_eq!(cache.get(5, Some("")), None);
        assert_eq!(cache.get(5, None), None);
    }

    #[test]
    fn test_latest_record_wins() {
        let mut cache = EphemeralSecretCache::new();
        cache.record(1, "first");
        cache.record(1, "second");
        cache.record(1, "");
        assert_eq!(cache.get(1, None), Some("second"));
    }

    #[test]
    fn test_lookup_among_owners() {
        let owners = vec![
            Owner { id: 1, hint: Some("h1".to_string()) },
            Owner { id: 2, hint: None },
        ];
        let mut cache = EphemeralSecretCache::new();
        cache.record(2, "fresh2");

        assert_eq!(cache.lookup(1, &owners), Some("h1"));
        assert_eq!(cache.lookup(2, &owners), Some("fresh2"));
        assert_eq!(cache.lookup(3, &owners), None);
        assert_eq!(cache.get_for(&owners[0]), Some("h1"));
    }

    #[test]
    fn test_clear_restores_hint() {
        let mut cache = EphemeralSecretCache::new();
        cache.record(5, "abc");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(5, Some("hint")), Some("hint"));
    }

    #[test]
    fn test_server_responses() {
        let mut cache = EphemeralSecretCache::new();

        let created = CreatedUser { id: 10, temp_password: Some("T-10".to_string()), username: None };
        assert_eq!(cache.record_created(&created), Some("T-10"));

        let bulk = BulkCreateResponse {
            created: vec![
                CreatedUser { id: 11, temp_password: Some("T-11".to_string()), username: None },
                CreatedUser { id: 12, temp_password: None, username: None },
            ],
            errors: vec![],
        };
        assert_eq!(cache.record_bulk(&bulk), 1);

        let reset = ResetPasswordResponse { temp_password: Some("R-10".to_string()), ..Default::default() };
        assert!(cache.record_reset(10, &reset));
        assert!(!cache.record_reset(12, &ResetPasswordResponse::default()));

        assert_eq!(cache.get(10, None), Some("R-10"));
        assert_eq!(cache.get(11, None), Some("T-11"));
        assert_eq!(cache.get(12, None), None);
        assert_eq!(cache.len(), 2);
    }
}
