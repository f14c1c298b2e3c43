mod session;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};
use uuid::Uuid;

use crate::{config::AppConfig, dao::run_store::RunStore};

pub use self::session::{IdentityResolver, SessionRegistry};
pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;

/// Capacity of the broadcast channel feeding group streams.
const SSE_CAPACITY: usize = 64;

/// Source of the current instant; tests pin it to drive time-dependent rules.
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

/// Central application state holding the store, sessions, per-group locks and the SSE hub.
pub struct AppState {
    store: Arc<dyn RunStore>,
    sessions: SessionRegistry,
    group_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    rotation_gate: Mutex<()>,
    sse: SseHub,
    config: AppConfig,
    clock: Clock,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(store: Arc<dyn RunStore>, config: AppConfig) -> SharedState {
        Self::with_clock(store, config, Arc::new(OffsetDateTime::now_utc))
    }

    /// Same as [`AppState::new`] with an explicit clock.
    pub fn with_clock(store: Arc<dyn RunStore>, config: AppConfig, clock: Clock) -> SharedState {
        Arc::new(Self {
            store,
            sessions: SessionRegistry::new(),
            group_locks: DashMap::new(),
            rotation_gate: Mutex::new(()),
            sse: SseHub::new(SSE_CAPACITY),
            config,
            clock,
        })
    }

    /// Persistence backend.
    pub fn store(&self) -> &Arc<dyn RunStore> {
        &self.store
    }

    /// Token registry used at registration time.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Resolver turning request tokens into user ids.
    pub fn identity(&self) -> &dyn IdentityResolver {
        &self.sessions
    }

    /// Broadcast hub used by group SSE streams.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Current instant according to the state clock.
    pub fn now(&self) -> OffsetDateTime {
        (self.clock)()
    }

    /// Serialize every mutation of one group's row set.
    ///
    /// The guard must be held across the whole read-modify-write of the group.
    pub async fn lock_group(&self, group_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .group_locks
            .entry(group_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop lock entries nobody holds or waits on.
    pub fn prune_group_locks(&self) {
        self.group_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.group_locks.len()
    }

    /// Gate ensuring quick match rotations never overlap.
    pub async fn rotation_gate(&self) -> MutexGuard<'_, ()> {
        self.rotation_gate.lock().await
    }
}
