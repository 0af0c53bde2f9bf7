//! In-memory identity store
//!
//! Keeps entitlements in a process-local map. Used by `tally serve
//! --dev-identity` and throughout the tests, where the recorded update calls
//! make "the store was never called" assertions possible.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

use super::{EntitlementUpdate, IdentityStore, UserEntitlement};

/// Number of most recent update calls kept for inspection
pub const RECORDED_UPDATES_LIMIT: usize = 1024;

#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    records: RwLock<HashMap<String, UserEntitlement>>,
    updates: RwLock<VecDeque<(String, EntitlementUpdate)>>,
    update_count: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user record
    pub fn with_user(self, entitlement: UserEntitlement) -> Self {
        if let Ok(mut records) = self.records.write() {
            records.insert(entitlement.user_id.clone(), entitlement);
        }
        self
    }

    /// Make every subsequent update fail (simulates a provider outage)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The most recent update calls, oldest first (including failed ones)
    ///
    /// At most `RECORDED_UPDATES_LIMIT` calls are kept.
    pub fn update_calls(&self) -> Vec<(String, EntitlementUpdate)> {
        self.updates
            .read()
            .map(|updates| updates.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of update calls received
    pub fn update_count(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Identity("identity store lock poisoned".to_string())
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn update_user_entitlement(
        &self,
        user_id: &str,
        update: &EntitlementUpdate,
    ) -> Result<()> {
        self.update_count.fetch_add(1, Ordering::SeqCst);
        {
            let mut updates = self.updates.write().map_err(poisoned)?;
            if updates.len() == RECORDED_UPDATES_LIMIT {
                updates.pop_front();
            }
            updates.push_back((user_id.to_string(), update.clone()));
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Identity(format!(
                "simulated failure updating {}",
                user_id
            )));
        }

        // Unknown users are created so local development needs no seeding
        self.records
            .write()
            .map_err(poisoned)?
            .insert(user_id.to_string(), update.apply_to(user_id));

        debug!(user_id, plan = ?update.subscription_plan, "Stored entitlement in memory");
        Ok(())
    }

    async fn get_user_entitlement(&self, user_id: &str) -> Result<Option<UserEntitlement>> {
        Ok(self.records.read().map_err(poisoned)?.get(user_id).cloned())
    }
}
