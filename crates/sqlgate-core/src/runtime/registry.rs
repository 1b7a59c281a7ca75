// crates/sqlgate-core/src/runtime/registry.rs
// ============================================================================
// Module: SQL Gate Tenant Registry
// Description: Exactly-once, lazily created tenant handles.
// Purpose: Map tenant keys to isolated engine sessions and policy stores.
// Dependencies: crate::{core, interfaces, runtime::policy_store}
// ============================================================================

//! ## Overview
//! The registry owns one slot per tenant key. The map itself is guarded by an
//! `RwLock` held only long enough to find or insert a slot. A created tenant
//! is published through the slot's `OnceLock`, so resolving a warm tenant
//! takes no mutex. Session creation happens under the slot's init mutex: a
//! slow `open` for one tenant never blocks lookups for another, and
//! concurrent first touches of the same key create exactly one session.
//!
//! Tenants are never evicted. A quota bounds how many keys may hold a slot;
//! a slot whose creation fails is retired and removed, so failed opens do
//! not consume quota.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use thiserror::Error;

use crate::core::Policy;
use crate::core::TenantKey;
use crate::interfaces::EngineError;
use crate::interfaces::EngineSession;
use crate::interfaces::StorageEngine;
use crate::runtime::policy_store::PolicyStore;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tenant resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Creating the tenant would exceed the quota.
    #[error("tenant limit reached ({max} tenants)")]
    TenantLimit {
        /// Configured quota.
        max: usize,
    },
    /// The engine could not open the tenant session.
    #[error("tenant session unavailable: {0}")]
    Engine(EngineError),
    /// A persisted policy no longer compiles.
    #[error("stored policy for {tenant} is invalid: {reason}")]
    StoredPolicy {
        /// Tenant whose policy failed.
        tenant: String,
        /// Compile failure.
        reason: String,
    },
    /// A registry lock is poisoned.
    #[error("tenant registry error: {0}")]
    Internal(String),
}

// ============================================================================
// SECTION: Tenant
// ============================================================================

/// A tenant's session and policy.
pub struct Tenant {
    /// Tenant key.
    key: TenantKey,
    /// Engine session shared by all calls for this tenant.
    session: Arc<dyn EngineSession>,
    /// Current policy.
    policy: PolicyStore,
}

impl Tenant {
    /// Returns the tenant key.
    #[must_use]
    pub const fn key(&self) -> &TenantKey {
        &self.key
    }

    /// Returns the engine session.
    #[must_use]
    pub fn session(&self) -> &dyn EngineSession {
        self.session.as_ref()
    }

    /// Returns the policy store.
    #[must_use]
    pub const fn policy(&self) -> &PolicyStore {
        &self.policy
    }
}

impl fmt::Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("key", &self.key)
            .field("policy_version", &self.policy.current().version())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Slot that is filled exactly once.
#[derive(Default)]
struct TenantSlot {
    /// Created tenant.
    ready: OnceLock<Arc<Tenant>>,
    /// Serializes creation attempts.
    init: Mutex<()>,
    /// Set when creation failed and the slot left the map.
    retired: AtomicBool,
}

/// Lazily populated map from tenant key to tenant.
pub struct TenantRegistry {
    /// Engine used to open sessions.
    engine: Arc<dyn StorageEngine>,
    /// Maximum number of tenant keys.
    max_tenants: usize,
    /// Slots keyed by tenant.
    slots: RwLock<HashMap<TenantKey, Arc<TenantSlot>>>,
}

impl TenantRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(engine: Arc<dyn StorageEngine>, max_tenants: usize) -> Self {
        Self {
            engine,
            max_tenants,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the tenant for `key`, creating it on first reference.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the quota is exhausted, the engine
    /// cannot open a session, or a persisted policy is invalid. A failed
    /// creation is retried on the next call.
    pub fn resolve(&self, key: &TenantKey) -> Result<Arc<Tenant>, RegistryError> {
        loop {
            let slot = self.slot(key)?;
            if let Some(tenant) = slot.ready.get() {
                return Ok(Arc::clone(tenant));
            }
            let _init = slot
                .init
                .lock()
                .map_err(|_| RegistryError::Internal("tenant slot mutex poisoned".to_string()))?;
            if let Some(tenant) = slot.ready.get() {
                return Ok(Arc::clone(tenant));
            }
            if slot.retired.load(Ordering::SeqCst) {
                continue;
            }
            match self.create(key) {
                Ok(tenant) => {
                    let tenant = Arc::new(tenant);
                    let _ = slot.ready.set(Arc::clone(&tenant));
                    return Ok(tenant);
                }
                Err(err) => {
                    slot.retired.store(true, Ordering::SeqCst);
                    self.release(key, &slot);
                    return Err(err);
                }
            }
        }
    }

    /// Returns the tenant for `key` if it has already been created.
    #[must_use]
    pub fn get(&self, key: &TenantKey) -> Option<Arc<Tenant>> {
        let slots = self.slots.read().ok()?;
        slots.get(key)?.ready.get().cloned()
    }

    /// Returns the number of tenant keys holding a slot, including keys whose
    /// creation is in progress.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().map_or(0, |slots| slots.len())
    }

    /// Returns true when no tenant has been referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds or reserves the slot for `key`.
    fn slot(&self, key: &TenantKey) -> Result<Arc<TenantSlot>, RegistryError> {
        {
            let slots = self
                .slots
                .read()
                .map_err(|_| RegistryError::Internal("tenant map lock poisoned".to_string()))?;
            if let Some(slot) = slots.get(key) {
                return Ok(Arc::clone(slot));
            }
        }
        let mut slots = self
            .slots
            .write()
            .map_err(|_| RegistryError::Internal("tenant map lock poisoned".to_string()))?;
        if let Some(slot) = slots.get(key) {
            return Ok(Arc::clone(slot));
        }
        if slots.len() >= self.max_tenants {
            return Err(RegistryError::TenantLimit {
                max: self.max_tenants,
            });
        }
        let slot = Arc::new(TenantSlot::default());
        slots.insert(key.clone(), Arc::clone(&slot));
        Ok(slot)
    }

    /// Removes a retired slot, unless another slot replaced it.
    fn release(&self, key: &TenantKey, slot: &Arc<TenantSlot>) {
        if let Ok(mut slots) = self.slots.write()
            && slots.get(key).is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            slots.remove(key);
        }
    }

    /// Opens the session and loads any persisted policy.
    fn create(&self, key: &TenantKey) -> Result<Tenant, RegistryError> {
        let session = self.engine.open(key).map_err(RegistryError::Engine)?;
        let policy = match session.load_policy().map_err(RegistryError::Engine)? {
            Some(stored) => Policy::compile(&stored.document, stored.version).map_err(|err| {
                RegistryError::StoredPolicy {
                    tenant: key.to_string(),
                    reason: err.to_string(),
                }
            })?,
            None => Policy::empty(),
        };
        Ok(Tenant {
            key: key.clone(),
            session,
            policy: PolicyStore::new(policy),
        })
    }
}
