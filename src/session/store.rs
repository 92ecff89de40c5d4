//! Session store: the single owner of [`SessionState`].
//!
//! DESIGN
//! ======
//! State lives behind an `RwLock<Arc<SessionState>>` so readers get a cheap
//! immutable snapshot. Each transition builds the next state, swaps it in,
//! releases the state lock and then notifies every observer in registration
//! order before returning. A separate transition lock is held across the
//! swap and the notification so observers see snapshots in the order the
//! transitions happened.
//!
//! Observers may read `state()` but must not call a transition: the
//! transition lock is not re-entrant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::debug;

use super::types::{AuthenticatedSession, ProfileRecord, SessionState, UserRecord};

type ObserverFn = Arc<dyn Fn(&Arc<SessionState>) + Send + Sync>;

/// Handle returned by [`SessionStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct SessionStore {
    state: RwLock<Arc<SessionState>>,
    observers: Mutex<Vec<(SubscriptionId, ObserverFn)>>,
    transition: Mutex<()>,
    next_id: AtomicU64,
}

impl SessionStore {
    #[must_use]
    pub fn new(initial: SessionState) -> Self {
        Self {
            state: RwLock::new(Arc::new(initial)),
            observers: Mutex::new(Vec::new()),
            transition: Mutex::new(()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Current immutable snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Register an observer called synchronously after every transition.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&Arc<SessionState>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let observer: ObserverFn = Arc::new(observer);
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Replace user, profile and token in one step. Inputs are not validated.
    pub fn apply_log_in(&self, session: AuthenticatedSession) {
        self.transition("log_in", |_| SessionState::logged_in_as(session));
    }

    /// Reset to the empty logged-out state. Idempotent.
    pub fn apply_log_out(&self) {
        self.transition("log_out", |_| SessionState::default());
    }

    /// Replace only the current user.
    pub fn apply_update_user(&self, user: UserRecord) {
        self.transition("update_user", |current| current.with_user(user));
    }

    /// Replace only the current profile.
    pub fn apply_update_profile(&self, profile: ProfileRecord) {
        self.transition("update_profile", |current| current.with_profile(profile));
    }

    fn transition(&self, name: &'static str, next: impl FnOnce(&SessionState) -> SessionState) {
        let _ordered = self.transition.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let updated = Arc::new(next(&**state));
            *state = updated.clone();
            updated
        };
        debug!(transition = name, logged_in = snapshot.logged_in(), "session transition applied");

        let observers: Vec<ObserverFn> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(&snapshot);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionState::default())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
