//! Session manager.
//!
//! Owns the session state machine:
//!
//! ```text
//! LoggedOut --login--> LoggedIn --401--> RefreshingCredentials
//!     ^                   ^                  |        |
//!     |                   +---refresh ok-----+        |
//!     +-----------refresh 401 / malformed / retry 401-+
//! ```
//!
//! Each submission gets at most one refresh-and-retry cycle. Refreshes are
//! single-flight: a submission that sees 401 while another refresh runs
//! waits for it and retries with the rotated token instead of refreshing
//! again.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, instrument, warn};
use trackme_core::{
    Acknowledgement, Credentials, FailureReason, LocationSample, LogoutReason, SessionState,
    SubmissionOutcome, TokenPair,
};
use trackme_fetch::{HttpOutcome, RawResponse, Transport, codec, paths};
use trackme_store::CredentialStore;

use crate::error::SessionError;
use crate::events::SessionEvent;

/// Capacity of the event channel.
const EVENT_CAPACITY: usize = 64;

// ============================================================================
// Session Manager
// ============================================================================

/// Drives login, logout, submissions and token refresh.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    refresh_gate: Mutex<()>,
    state: watch::Sender<SessionState>,
    last_updated: watch::Sender<Option<DateTime<Utc>>>,
    events: broadcast::Sender<SessionEvent>,
    shutdown: watch::Sender<bool>,
}

impl SessionManager {
    /// Creates a manager in the `LoggedOut` state.
    ///
    /// Call [`SessionManager::resume`] to pick up a persisted session.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        let (state, _) = watch::channel(SessionState::LoggedOut);
        let (last_updated, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        Self {
            transport,
            store,
            refresh_gate: Mutex::new(()),
            state,
            last_updated,
            events,
            shutdown,
        }
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Returns the current state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Subscribes to state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Returns when the last submission was acknowledged.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.last_updated.borrow()
    }

    /// Subscribes to events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Returns the stored username, if a session exists.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the store cannot be read.
    pub async fn username(&self) -> Result<Option<String>, SessionError> {
        let credentials = self.store.get().await?;
        Ok(credentials
            .has_session()
            .then(|| credentials.username().to_string()))
    }

    /// Returns true once [`SessionManager::shutdown`] has been called.
    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Picks up a persisted session without contacting the server.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the store cannot be read.
    pub async fn resume(&self) -> Result<SessionState, SessionError> {
        self.cancellable(async {
            let credentials = self.store.get().await?;
            if credentials.has_session() && self.state() == SessionState::LoggedOut {
                self.state.send_replace(SessionState::LoggedIn);
                info!(username = %credentials.username(), "Resumed persisted session");
                self.emit(SessionEvent::LoggedIn {
                    username: credentials.username().to_string(),
                });
            }
            Ok(self.state())
        })
        .await
    }

    /// Logs in with a username and password.
    ///
    /// # Errors
    ///
    /// - [`SessionError::LoginRejected`] if `/auth` does not answer 200
    /// - [`SessionError::MalformedResponse`] if the token pair is unusable
    /// - [`SessionError::Transport`] if the server is unreachable
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
        self.cancellable(async {
            let body = codec::encode_login(username, password)?;
            let response = self.post(paths::AUTH, body).await?;

            let tokens = match response.outcome() {
                HttpOutcome::Success(bytes) => codec::decode_token_pair(&bytes)?,
                HttpOutcome::Unauthorized => return Err(SessionError::LoginRejected { status: 401 }),
                HttpOutcome::Rejected(status) => return Err(SessionError::LoginRejected { status }),
            };

            self.store
                .set(Credentials::authenticated(username, tokens))
                .await?;
            self.state.send_replace(SessionState::LoggedIn);
            info!(username, "Logged in");
            self.emit(SessionEvent::LoggedIn {
                username: username.to_string(),
            });
            Ok(())
        })
        .await
    }

    /// Ends the session and clears the store. No network call.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Store`] if the store cannot be cleared.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.cancellable(async {
            self.end_session(LogoutReason::UserRequested).await?;
            Ok(())
        })
        .await
    }

    /// Submits one sample, refreshing the token once if needed.
    ///
    /// # Errors
    ///
    /// - [`SessionError::NotAuthenticated`] while logged out, without a request
    /// - [`SessionError::SessionExpired`] if the session was force-logged-out
    /// - [`SessionError::Transport`] if the server is unreachable
    /// - [`SessionError::Rejected`] for any other non-200 answer
    pub async fn submit_location(
        &self,
        sample: LocationSample,
    ) -> Result<Acknowledgement, SessionError> {
        self.cancellable(self.submit(sample)).await
    }

    /// Cancels all in-flight operations. Every later call fails with
    /// [`SessionError::Cancelled`].
    pub fn shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            info!("Session manager shut down");
        }
    }

    // ========================================================================
    // Submission Flow
    // ========================================================================

    async fn submit(&self, sample: LocationSample) -> Result<Acknowledgement, SessionError> {
        match self.state() {
            SessionState::LoggedOut => return Err(SessionError::NotAuthenticated),
            SessionState::RefreshingCredentials => {
                debug!("Refresh in flight, queueing submission");
                drop(self.refresh_gate.lock().await);
            }
            SessionState::LoggedIn => {}
        }

        let credentials = self.store.get().await?;
        let Some(tokens) = credentials.tokens().cloned() else {
            self.session_gone();
            return Err(SessionError::NotAuthenticated);
        };

        self.emit(SessionEvent::SubmissionStarted { sample });
        let result = self.submit_with_refresh(sample, &credentials, &tokens).await;

        match &result {
            Ok(ack) => self.emit(SessionEvent::LocationSubmitted { ack: *ack }),
            Err(e) => {
                warn!(error = %e, "Submission failed");
                self.emit(SessionEvent::SubmissionFailed {
                    kind: e.kind(),
                    message: e.to_string(),
                });
            }
        }
        result
    }

    async fn submit_with_refresh(
        &self,
        sample: LocationSample,
        credentials: &Credentials,
        tokens: &TokenPair,
    ) -> Result<Acknowledgement, SessionError> {
        match self.attempt(&sample, credentials).await? {
            SubmissionOutcome::Success { server_time } => {
                return Ok(self.acknowledge(sample, server_time));
            }
            SubmissionOutcome::Failed(FailureReason::Status { code }) => {
                return Err(SessionError::Rejected { status: code });
            }
            SubmissionOutcome::Unauthorized => {}
        }

        info!("Submission unauthorized, refreshing credentials");
        let refreshed = self.refresh(tokens).await?;

        match self.attempt(&sample, &refreshed).await? {
            SubmissionOutcome::Success { server_time } => Ok(self.acknowledge(sample, server_time)),
            SubmissionOutcome::Failed(FailureReason::Status { code }) => {
                Err(SessionError::Rejected { status: code })
            }
            SubmissionOutcome::Unauthorized => {
                warn!("Retried submission unauthorized, logging out");
                self.force_logout(LogoutReason::RetryRejected).await;
                Err(SessionError::SessionExpired)
            }
        }
    }

    async fn attempt(
        &self,
        sample: &LocationSample,
        credentials: &Credentials,
    ) -> Result<SubmissionOutcome, SessionError> {
        let body = codec::encode_location_submission(sample, credentials)?;
        let response = self.post(paths::COORDINATES, body).await?;
        Ok(match response.outcome() {
            HttpOutcome::Success(_) => SubmissionOutcome::Success {
                server_time: Utc::now(),
            },
            HttpOutcome::Unauthorized => SubmissionOutcome::Unauthorized,
            HttpOutcome::Rejected(code) => SubmissionOutcome::Failed(FailureReason::Status { code }),
        })
    }

    fn acknowledge(&self, sample: LocationSample, server_time: DateTime<Utc>) -> Acknowledgement {
        self.last_updated.send_replace(Some(server_time));
        debug!(%sample, "Location acknowledged");
        Acknowledgement {
            sample,
            acknowledged_at: server_time,
        }
    }

    // ========================================================================
    // Refresh
    // ========================================================================

    /// Exchanges `stale` for a new token pair and returns the credentials to
    /// retry with.
    ///
    /// Runs under the refresh gate. If the stored pair no longer equals
    /// `stale`, another submission already refreshed and its result is
    /// reused.
    async fn refresh(&self, stale: &TokenPair) -> Result<Credentials, SessionError> {
        let _gate = self.refresh_gate.lock().await;

        let current = self.store.get().await?;
        match current.tokens() {
            None => {
                debug!("Session ended while waiting to refresh");
                self.session_gone();
                return Err(SessionError::SessionExpired);
            }
            Some(tokens) if tokens != stale => {
                debug!("Tokens already rotated, retrying without refresh");
                return Ok(current);
            }
            Some(_) => {}
        }

        let body = codec::encode_refresh(&current)?;
        self.transition(SessionState::LoggedIn, SessionState::RefreshingCredentials);
        let _in_flight = RefreshInFlight { manager: self };

        let response = match self.post(paths::REFRESH_TOKEN, body).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Refresh request failed");
                return Err(e);
            }
        };

        match response.outcome() {
            HttpOutcome::Success(bytes) => match codec::decode_token_pair(&bytes) {
                Ok(tokens) => self.store_refreshed(stale, current.with_tokens(tokens)).await,
                Err(e) => {
                    warn!(error = %e, "Refresh response unusable, logging out");
                    self.force_logout(LogoutReason::MalformedRefresh).await;
                    Err(SessionError::SessionExpired)
                }
            },
            HttpOutcome::Unauthorized => {
                warn!("Refresh token rejected, logging out");
                self.force_logout(LogoutReason::RefreshRejected).await;
                Err(SessionError::SessionExpired)
            }
            HttpOutcome::Rejected(status) => {
                warn!(status, "Refresh rejected, keeping session");
                Err(SessionError::Rejected { status })
            }
        }
    }

    async fn store_refreshed(
        &self,
        stale: &TokenPair,
        next: Credentials,
    ) -> Result<Credentials, SessionError> {
        match self.store.swap_tokens(stale, next.clone()).await {
            Ok(true) => {
                self.transition(SessionState::RefreshingCredentials, SessionState::LoggedIn);
                info!(username = %next.username(), "Credentials refreshed");
                self.emit(SessionEvent::CredentialsRefreshed);
                Ok(next)
            }
            Ok(false) => {
                debug!("Stored session changed during refresh, discarding new tokens");
                Err(SessionError::SessionExpired)
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn post(&self, path: &str, body: Vec<u8>) -> Result<RawResponse, SessionError> {
        debug!(path, "Sending request");
        let response = self.transport.post(path, body).await?;
        debug!(path, status = response.status, "Received response");
        Ok(response)
    }

    /// Moves `from` to `to`; does nothing if the state is no longer `from`.
    fn transition(&self, from: SessionState, to: SessionState) {
        if self.is_shut_down() {
            return;
        }
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
    }

    /// Sets `LoggedOut` first, then clears the store, so a refresh racing
    /// with this cannot move the state back to `LoggedIn`.
    async fn end_session(&self, reason: LogoutReason) -> Result<(), SessionError> {
        self.state.send_replace(SessionState::LoggedOut);
        let result = self.store.clear().await;
        info!(%reason, "Logged out");
        self.emit(SessionEvent::LoggedOut { reason });
        result.map_err(SessionError::from)
    }

    /// The store no longer holds a session although this manager still
    /// thinks it does; another process logged out.
    fn session_gone(&self) {
        if self.is_shut_down() {
            return;
        }
        let ended = self.state.send_if_modified(|state| {
            if state.is_authenticated() {
                *state = SessionState::LoggedOut;
                true
            } else {
                false
            }
        });
        if ended {
            info!("Stored session removed elsewhere, logged out");
            self.emit(SessionEvent::LoggedOut {
                reason: LogoutReason::EndedElsewhere,
            });
        }
    }

    async fn force_logout(&self, reason: LogoutReason) {
        if let Err(e) = self.end_session(reason).await {
            warn!(error = %e, "Failed to clear credentials on forced logout");
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Runs `fut` unless the manager is or becomes shut down.
    async fn cancellable<T>(
        &self,
        fut: impl Future<Output = Result<T, SessionError>>,
    ) -> Result<T, SessionError> {
        if self.is_shut_down() {
            return Err(SessionError::Cancelled);
        }
        tokio::select! {
            biased;
            () = wait_for_shutdown(self.shutdown.subscribe()) => {
                debug!("Operation cancelled by shutdown");
                Err(SessionError::Cancelled)
            }
            result = fut => result,
        }
    }
}

/// Returns the state to `LoggedIn` when a refresh ends without settling it,
/// including when the refresh future is dropped.
struct RefreshInFlight<'a> {
    manager: &'a SessionManager,
}

impl Drop for RefreshInFlight<'_> {
    fn drop(&mut self) {
        self.manager
            .transition(SessionState::RefreshingCredentials, SessionState::LoggedIn);
    }
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|down| *down).await;
}
