//! Session controller: turns presentation events into gateway calls and
//! store transitions.
//!
//! DESIGN
//! ======
//! The controller is the only caller of the store's transitions. A login
//! runs the gateway handshake to completion first and applies the composed
//! result in one `apply_log_in`, so a failed or cancelled login never leaves
//! a partial session behind.
//!
//! Only one login may be in flight per controller. A second attempt is
//! rejected with [`AuthError::LoginInProgress`] instead of racing the first
//! to the store. Cancellation drops the in-flight handshake future, which
//! aborts whichever request is pending.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::gateway::AuthGateway;
use crate::gateway::types::AuthError;
use crate::persistence::PersistenceBridge;
use crate::resources::{ResourceClient, ResourceError};
use crate::session::store::{SessionStore, SubscriptionId};
use crate::session::types::{Record, SessionState, UserRecord};

pub struct SessionController {
    store: Arc<SessionStore>,
    gateway: AuthGateway,
    resources: ResourceClient,
    login_in_flight: AtomicBool,
    writer: Option<(SubscriptionId, JoinHandle<()>)>,
}

/// Clears the in-flight flag however the login ends.
struct LoginGuard<'a>(&'a AtomicBool);

impl Drop for LoginGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionController {
    #[must_use]
    pub fn new(store: Arc<SessionStore>, gateway: AuthGateway) -> Self {
        let resources = ResourceClient::new(gateway.transport().clone(), gateway.api_root());
        Self { store, gateway, resources, login_in_flight: AtomicBool::new(false), writer: None }
    }

    /// Rehydrate from the persisted snapshot, talk to the configured API and
    /// mirror every transition back to disk.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AuthError> {
        let bridge = PersistenceBridge::new(&config.state_dir);
        let store = Arc::new(SessionStore::new(bridge.load()));
        let gateway = AuthGateway::from_config(config)?;
        let writer = bridge.spawn_writer(&store);

        let mut controller = Self::new(store, gateway);
        controller.writer = Some(writer);
        Ok(controller)
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    #[must_use]
    pub fn state(&self) -> Arc<SessionState> {
        self.store.state()
    }

    /// Wait for pending snapshot writes to land on disk.
    pub async fn shutdown(mut self) {
        if let Some((subscription, handle)) = self.writer.take() {
            self.store.unsubscribe(subscription);
            if let Err(e) = handle.await {
                warn!(error = %e, "session writer task failed");
            }
        }
    }

    // =========================================================================
    // LOGIN / LOGOUT
    // =========================================================================

    /// Log in and return the resulting snapshot.
    ///
    /// # Errors
    ///
    /// Returns the gateway's error, or [`AuthError::LoginInProgress`] if
    /// another login is running. State is untouched on error.
    pub async fn login(&self, username: &str, password: &str) -> Result<Arc<SessionState>, AuthError> {
        self.login_with_cancel(username, password, &CancellationToken::new()).await
    }

    /// Log in unless `cancel` fires first.
    ///
    /// # Errors
    ///
    /// As [`login`](Self::login), plus [`AuthError::Cancelled`].
    pub async fn login_with_cancel(
        &self,
        username: &str,
        password: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<SessionState>, AuthError> {
        let _guard = self.begin_login()?;

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AuthError::Cancelled),
            result = self.gateway.login(username, password) => result,
        };

        match result {
            Ok(session) => {
                self.store.apply_log_in(session);
                info!(username, "login succeeded");
                Ok(self.store.state())
            }
            Err(e) => {
                warn!(username, error = %e, "login failed");
                Err(e)
            }
        }
    }

    fn begin_login(&self) -> Result<LoginGuard<'_>, AuthError> {
        if self.login_in_flight.swap(true, Ordering::AcqRel) {
            return Err(AuthError::LoginInProgress);
        }
        Ok(LoginGuard(&self.login_in_flight))
    }

    /// Reset the local session, then invalidate the token server-side.
    /// The remote call is best-effort; its failure is only logged.
    pub async fn logout(&self) {
        let token = self.store.state().token().map(str::to_owned);
        self.store.apply_log_out();
        info!("logged out");

        if let Some(token) = token {
            if let Err(e) = self.gateway.logout(&token).await {
                warn!(error = %e, "remote logout failed");
            }
        }
    }

    /// Create an account without logging in.
    ///
    /// # Errors
    ///
    /// Returns the gateway's registration error.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        let user = self.gateway.register(username, email, password).await?;
        info!(username, "account registered");
        Ok(user)
    }

    // =========================================================================
    // REFRESH
    // =========================================================================

    /// Re-fetch the current user and apply it.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotLoggedIn`] without a session (or if it ended during
    /// the fetch), otherwise the gateway's error.
    pub async fn refresh_user(&self) -> Result<(), AuthError> {
        let token = self.current_token().ok_or(AuthError::NotLoggedIn)?;
        let user = self.gateway.fetch_user(&token).await?;
        self.ensure_same_session(&token)?;
        self.store.apply_update_user(user);
        Ok(())
    }

    /// Re-fetch the current user's profile and apply it.
    ///
    /// # Errors
    ///
    /// As [`refresh_user`](Self::refresh_user).
    pub async fn refresh_profile(&self) -> Result<(), AuthError> {
        let state = self.store.state();
        let token = state.token().ok_or(AuthError::NotLoggedIn)?;
        let profile_ref = state.current_user().profile_ref().ok_or(AuthError::NotLoggedIn)?;
        let profile = self.gateway.fetch_profile(token, profile_ref).await?;
        self.ensure_same_session(token)?;
        self.store.apply_update_profile(profile);
        Ok(())
    }

    fn current_token(&self) -> Option<String> {
        self.store.state().token().map(str::to_owned)
    }

    fn ensure_same_session(&self, token: &str) -> Result<(), AuthError> {
        if self.store.state().token() == Some(token) { Ok(()) } else { Err(AuthError::NotLoggedIn) }
    }

    // =========================================================================
    // RESOURCES
    // =========================================================================

    /// # Errors
    ///
    /// Returns an error if the testimonials cannot be fetched.
    pub async fn testimonials(&self) -> Result<Vec<Record>, ResourceError> {
        self.resources.testimonials().await
    }

    /// # Errors
    ///
    /// [`ResourceError::NotLoggedIn`] without a session, otherwise fetch errors.
    pub async fn thermometers(&self) -> Result<Vec<Record>, ResourceError> {
        let token = self.current_token().ok_or(ResourceError::NotLoggedIn)?;
        self.resources.thermometers(&token).await
    }

    /// # Errors
    ///
    /// [`ResourceError::NotLoggedIn`] without a session, otherwise fetch errors.
    pub async fn temperatures(&self) -> Result<Vec<Record>, ResourceError> {
        let token = self.current_token().ok_or(ResourceError::NotLoggedIn)?;
        self.resources.temperatures(&token).await
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
