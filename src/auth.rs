use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Context;
use chrono::{DateTime, Utc};
use spin_sdk::http::Request;
use spin_sdk::key_value::Store;

use crate::config::{self, token_expiration_hours, token_key, user_key};
use crate::models::{Identity, TokenData};

/// Resolves bearer tokens to callers. Token issuance and user profiles are
/// owned elsewhere; this is the only view of them the board needs.
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` for unknown, expired or orphaned tokens.
    fn resolve(&self, token: &str) -> anyhow::Result<Option<Identity>>;
}

pub fn bearer_token(req: &Request) -> Option<&str> {
    let auth_header = req.header("Authorization")?.as_str()?;
    let token = auth_header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

pub fn token_expired(created_at: &str, now: DateTime<Utc>, max_age_hours: i64) -> bool {
    match DateTime::parse_from_rfc3339(created_at) {
        Ok(created) => (now - created.with_timezone(&Utc)).num_hours() > max_age_hours,
        // Unreadable timestamps are treated as expired.
        Err(_) => true,
    }
}

/// Reads tokens and profiles written by the account service into the shared
/// Spin key-value store (`token:{token}` and `user:{id}`).
pub struct KvIdentityProvider {
    label: Option<String>,
}

impl KvIdentityProvider {
    pub fn from_env() -> Self {
        KvIdentityProvider {
            label: config::kv_store_label(),
        }
    }

    fn store(&self) -> anyhow::Result<Store> {
        match &self.label {
            Some(label) => Store::open(label.as_str())
                .with_context(|| format!("failed to open key-value store {}", label)),
            None => Store::open_default().context("failed to open default key-value store"),
        }
    }
}

impl IdentityProvider for KvIdentityProvider {
    fn resolve(&self, token: &str) -> anyhow::Result<Option<Identity>> {
        let store = self.store()?;

        let data = match store.get_json::<TokenData>(&token_key(token))? {
            Some(data) => data,
            None => return Ok(None),
        };

        if token_expired(&data.created_at, Utc::now(), token_expiration_hours()) {
            return Ok(None);
        }

        // A token whose user has since been removed no longer authenticates.
        store.get_json::<Identity>(&user_key(&data.user_id))
    }
}

/// Token table held in memory, for the native server and tests.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    identities: RwLock<HashMap<String, Identity>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: impl Into<String>, identity: Identity) -> anyhow::Result<()> {
        self.identities
            .write()
            .map_err(|_| anyhow::anyhow!("identity table lock poisoned"))?
            .insert(token.into(), identity);
        Ok(())
    }

    pub fn revoke(&self, token: &str) -> anyhow::Result<bool> {
        Ok(self
            .identities
            .write()
            .map_err(|_| anyhow::anyhow!("identity table lock poisoned"))?
            .remove(token)
            .is_some())
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    fn resolve(&self, token: &str) -> anyhow::Result<Option<Identity>> {
        Ok(self
            .identities
            .read()
            .map_err(|_| anyhow::anyhow!("identity table lock poisoned"))?
            .get(token)
            .cloned())
    }
}
