//! Provider registry
//!
//! Holds every configured provider keyed by id. Each entry carries its own
//! locks for configuration, health and usage so updates to one provider
//! never serialize behind another.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, AppResult},
    health::HealthState,
    providers::{
        CapabilityType, ProviderConfig, ProviderTransport, ProviderUpdate, TransportFactory,
    },
    usage::UsageStats,
};

/// Read-only view of a provider for dashboards and callers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSnapshot {
    pub id: String,
    pub name: String,
    pub capability: CapabilityType,
    pub kind: String,
    pub priority: i32,
    pub is_enabled: bool,
    /// Effective active flag: always false while the provider is disabled
    pub is_active: bool,
    pub is_eligible: bool,
    pub health: HealthState,
    pub usage: UsageStats,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A registered provider and its runtime state
pub struct ProviderEntry {
    id: String,
    capability: CapabilityType,
    /// Registration order, used to break priority ties
    seq: u64,
    config: RwLock<ProviderConfig>,
    transport: RwLock<Arc<dyn ProviderTransport>>,
    health: RwLock<HealthState>,
    usage: Mutex<UsageStats>,
    probing: AtomicBool,
}

impl ProviderEntry {
    fn new(seq: u64, config: ProviderConfig, transport: Arc<dyn ProviderTransport>) -> Self {
        Self {
            id: config.id.clone(),
            capability: config.capability,
            seq,
            config: RwLock::new(config),
            transport: RwLock::new(transport),
            health: RwLock::new(HealthState::default()),
            usage: Mutex::new(UsageStats::default()),
            probing: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capability(&self) -> CapabilityType {
        self.capability
    }

    pub fn config(&self) -> ProviderConfig {
        read(&self.config).clone()
    }

    pub fn transport(&self) -> Arc<dyn ProviderTransport> {
        read(&self.transport).clone()
    }

    pub fn health(&self) -> HealthState {
        read(&self.health).clone()
    }

    pub fn usage(&self) -> UsageStats {
        guard(&self.usage).clone()
    }

    /// Mutate health state under the entry's lock
    pub(crate) fn update_health<R>(&self, f: impl FnOnce(&mut HealthState) -> R) -> R {
        f(&mut write(&self.health))
    }

    /// Mutate usage counters under the entry's lock
    pub(crate) fn update_usage<R>(&self, f: impl FnOnce(&mut UsageStats) -> R) -> R {
        f(&mut guard(&self.usage))
    }

    /// Claim the probe slot. Returns false if a probe is already running.
    pub(crate) fn try_begin_probe(&self) -> bool {
        self.probing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn end_probe(&self) {
        self.probing.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        read(&self.config).is_enabled
    }

    /// Enabled, active and healthy
    pub fn is_eligible(&self) -> bool {
        let config = read(&self.config);
        config.is_enabled && config.is_active && read(&self.health).is_healthy
    }

    fn sort_key(&self) -> (i32, u64) {
        (read(&self.config).priority, self.seq)
    }

    pub fn snapshot(&self) -> ProviderSnapshot {
        let config = self.config();
        let health = self.health();
        let is_active = config.is_enabled && config.is_active;
        ProviderSnapshot {
            id: self.id.clone(),
            name: config.name,
            capability: self.capability,
            kind: config.settings.kind().to_string(),
            priority: config.priority,
            is_enabled: config.is_enabled,
            is_active,
            is_eligible: is_active && health.is_healthy,
            health,
            usage: self.usage(),
        }
    }
}

/// Registry of all configured providers
pub struct ProviderRegistry {
    entries: DashMap<String, Arc<ProviderEntry>>,
    next_seq: AtomicU64,
    factory: TransportFactory,
}

impl ProviderRegistry {
    /// Create an empty registry that builds transports with `factory`
    pub fn new(factory: TransportFactory) -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(0),
            factory,
        }
    }

    /// Register or replace a provider, building its transport from settings
    pub fn register(&self, config: ProviderConfig) -> AppResult<ProviderSnapshot> {
        config.validate()?;
        let transport = self.factory.build(&config.settings);
        self.insert(config, transport)
    }

    /// Register or replace a provider with an explicit transport
    ///
    /// Replacing keeps the provider's registration order, health and usage.
    /// Re-registering an id under a different capability is rejected.
    pub fn register_with_transport(
        &self,
        config: ProviderConfig,
        transport: Arc<dyn ProviderTransport>,
    ) -> AppResult<ProviderSnapshot> {
        config.validate()?;
        self.insert(config, transport)
    }

    /// Store an already validated configuration
    fn insert(
        &self,
        config: ProviderConfig,
        transport: Arc<dyn ProviderTransport>,
    ) -> AppResult<ProviderSnapshot> {
        let entry = match self.entries.entry(config.id.clone()) {
            Entry::Occupied(occupied) => {
                let existing = occupied.get().clone();
                if existing.capability != config.capability {
                    return Err(AppError::DuplicateId {
                        id: config.id,
                        existing: existing.capability,
                        requested: config.capability,
                    });
                }
                // Transport is swapped under the config guard so the pair changes together
                let mut current = write(&existing.config);
                *write(&existing.transport) = transport;
                *current = config;
                drop(current);
                info!(provider_id = %existing.id, "Replaced provider configuration");
                existing
            }
            Entry::Vacant(vacant) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                let entry = Arc::new(ProviderEntry::new(seq, config, transport));
                info!(
                    provider_id = %entry.id,
                    capability = %entry.capability,
                    kind = entry.transport().kind(),
                    "Registered provider"
                );
                vacant.insert(entry.clone());
                entry
            }
        };

        Ok(entry.snapshot())
    }

    /// Apply a partial configuration update
    ///
    /// The capability is immutable; new settings must serve the same one.
    pub fn update(&self, id: &str, update: ProviderUpdate) -> AppResult<ProviderSnapshot> {
        let entry = self.entry(id)?;
        let mut config = write(&entry.config);
        let merged = config.merged(&update);
        merged.validate()?;

        if merged.settings != config.settings {
            *write(&entry.transport) = self.factory.build(&merged.settings);
            debug!(provider_id = %id, "Rebuilt transport for new settings");
        }
        *config = merged;
        drop(config);

        info!(provider_id = %id, "Updated provider configuration");
        Ok(entry.snapshot())
    }

    /// Remove a provider
    pub fn deregister(&self, id: &str) -> AppResult<ProviderSnapshot> {
        let (_, entry) = self
            .entries
            .remove(id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        info!(provider_id = %id, "Deregistered provider");
        Ok(entry.snapshot())
    }

    /// Administratively enable or disable a provider
    ///
    /// Returns whether the flag changed.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> AppResult<bool> {
        let entry = self.entry(id)?;
        let mut config = write(&entry.config);
        if config.is_enabled == enabled {
            return Ok(false);
        }
        config.is_enabled = enabled;
        info!(provider_id = %id, enabled, "Provider enabled flag changed");
        Ok(true)
    }

    /// Toggle a provider's active flag
    ///
    /// The stored flag has no effect on eligibility while the provider is
    /// disabled. Returns whether the flag changed.
    pub fn set_active(&self, id: &str, active: bool) -> AppResult<bool> {
        let entry = self.entry(id)?;
        let mut config = write(&entry.config);
        if config.is_active == active {
            return Ok(false);
        }
        config.is_active = active;
        if !config.is_enabled {
            warn!(
                provider_id = %id,
                active,
                "Active flag changed on a disabled provider; it stays ineligible until enabled"
            );
        } else {
            info!(provider_id = %id, active, "Provider active flag changed");
        }
        Ok(true)
    }

    /// Eligible providers for a capability, best first
    pub fn eligible_candidates(&self, capability: CapabilityType) -> Vec<ProviderSnapshot> {
        self.eligible_entries(capability)
            .iter()
            .map(|entry| entry.snapshot())
            .collect()
    }

    /// Eligible entries for a capability ordered by priority, then
    /// registration order
    pub(crate) fn eligible_entries(&self, capability: CapabilityType) -> Vec<Arc<ProviderEntry>> {
        let mut eligible: Vec<_> = self
            .entries_for(capability)
            .into_iter()
            .filter(|entry| entry.is_eligible())
            .collect();
        eligible.sort_by_key(|entry| entry.sort_key());
        eligible
    }

    /// Every provider for a capability, ordered by priority
    pub fn snapshot(&self, capability: CapabilityType) -> Vec<ProviderSnapshot> {
        let mut entries = self.entries_for(capability);
        entries.sort_by_key(|entry| entry.sort_key());
        entries.iter().map(|entry| entry.snapshot()).collect()
    }

    /// Every provider across all capabilities
    pub fn snapshot_all(&self) -> Vec<ProviderSnapshot> {
        CapabilityType::all()
            .into_iter()
            .flat_map(|capability| self.snapshot(capability))
            .collect()
    }

    /// Snapshot of a single provider
    pub fn get(&self, id: &str) -> AppResult<ProviderSnapshot> {
        Ok(self.entry(id)?.snapshot())
    }

    /// Stored configuration records, ordered like [`Self::snapshot_all`]
    pub fn configs(&self) -> Vec<ProviderConfig> {
        CapabilityType::all()
            .into_iter()
            .flat_map(|capability| {
                let mut entries = self.entries_for(capability);
                entries.sort_by_key(|entry| entry.sort_key());
                entries
            })
            .map(|entry| entry.config())
            .collect()
    }

    pub(crate) fn entry(&self, id: &str) -> AppResult<Arc<ProviderEntry>> {
        self.entries
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(id.to_string()))
    }

    pub(crate) fn entries(&self) -> Vec<Arc<ProviderEntry>> {
        self.entries.iter().map(|entry| entry.value().clone()).collect()
    }

    fn entries_for(&self, capability: CapabilityType) -> Vec<Arc<ProviderEntry>> {
        self.entries
            .iter()
            .filter(|entry| entry.capability == capability)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
