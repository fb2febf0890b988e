//! Session state machine tests against a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Barrier, Notify};
use trackme_core::{Credentials, LocationSample, LogoutReason, SessionState, TokenPair};
use trackme_fetch::paths::{AUTH, COORDINATES, REFRESH_TOKEN};
use trackme_store::{CredentialStore, MemoryCredentialStore};

use crate::error::{SessionError, SessionErrorKind};
use crate::events::SessionEvent;
use crate::manager::SessionManager;
use crate::mock::{MockTransport, Reply};

fn alice(access: &str, refresh: &str) -> Credentials {
    Credentials::authenticated("alice", TokenPair::new(access, refresh))
}

fn sample() -> LocationSample {
    LocationSample::now(55.6, 12.5).unwrap()
}

fn manager_with(
    transport: &Arc<MockTransport>,
    credentials: Credentials,
) -> (Arc<SessionManager>, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::with_credentials(credentials));
    let manager = Arc::new(SessionManager::new(transport.clone(), store.clone()));
    (manager, store)
}

/// A manager resumed from a stored A1/R1 session.
async fn logged_in(transport: &Arc<MockTransport>) -> (Arc<SessionManager>, Arc<MemoryCredentialStore>) {
    let (manager, store) = manager_with(transport, alice("A1", "R1"));
    assert_eq!(manager.resume().await.unwrap(), SessionState::LoggedIn);
    (manager, store)
}

async fn wait_for_state(manager: &SessionManager, wanted: SessionState) {
    let mut rx = manager.subscribe_state();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == wanted))
        .await
        .expect("state not reached in time")
        .unwrap();
}

// ============================================================================
// Login / Logout / Resume
// ============================================================================

#[tokio::test]
async fn test_login_stores_token_pair() {
    let transport = MockTransport::new();
    transport.on(AUTH, Reply::tokens("A1", "R1"));
    let (manager, store) = manager_with(&transport, Credentials::empty());
    let mut events = manager.subscribe_events();

    manager.login("alice", "pw").await.unwrap();

    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert_eq!(store.get().await.unwrap(), alice("A1", "R1"));
    assert_eq!(manager.username().await.unwrap().as_deref(), Some("alice"));
    assert_eq!(
        transport.bodies(AUTH),
        vec![serde_json::json!({"username": "alice", "password": "pw"})]
    );
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedIn {
            username: "alice".into()
        }
    );
}

#[tokio::test]
async fn test_login_rejected_keeps_logged_out() {
    let transport = MockTransport::new();
    transport.on(AUTH, Reply::status(403));
    let (manager, store) = manager_with(&transport, Credentials::empty());

    let err = manager.login("alice", "wrong").await.unwrap_err();

    assert!(matches!(err, SessionError::LoginRejected { status: 403 }));
    assert_eq!(manager.state(), SessionState::LoggedOut);
    assert!(!store.get().await.unwrap().has_session());
}

#[tokio::test]
async fn test_login_malformed_body() {
    let transport = MockTransport::new();
    transport.on(AUTH, Reply::Status(200, br#"{"access_token":"A1"}"#.to_vec()));
    let (manager, store) = manager_with(&transport, Credentials::empty());

    let err = manager.login("alice", "pw").await.unwrap_err();

    assert!(matches!(err, SessionError::MalformedResponse(_)));
    assert_eq!(manager.state(), SessionState::LoggedOut);
    assert!(!store.get().await.unwrap().has_session());
}

#[tokio::test]
async fn test_resume_without_session_stays_logged_out() {
    let transport = MockTransport::new();
    let (manager, _store) = manager_with(&transport, Credentials::anonymous("alice"));

    assert_eq!(manager.resume().await.unwrap(), SessionState::LoggedOut);
    assert_eq!(manager.username().await.unwrap(), None);
    assert_eq!(transport.total(), 0);
}

#[tokio::test]
async fn test_logout_clears_store_without_network() {
    let transport = MockTransport::new();
    let (manager, store) = logged_in(&transport).await;
    let mut events = manager.subscribe_events();

    manager.logout().await.unwrap();

    assert_eq!(manager.state(), SessionState::LoggedOut);
    assert_eq!(store.get().await.unwrap(), Credentials::empty());
    assert_eq!(transport.total(), 0);
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            reason: LogoutReason::UserRequested
        }
    );
}

// ============================================================================
// Submissions
// ============================================================================

#[tokio::test]
async fn test_submit_while_logged_out_sends_nothing() {
    let transport = MockTransport::new();
    let (manager, _store) = manager_with(&transport, Credentials::empty());

    let err = manager.submit_location(sample()).await.unwrap_err();

    assert!(matches!(err, SessionError::NotAuthenticated));
    assert_eq!(transport.total(), 0);
}

#[tokio::test]
async fn test_submit_success_updates_last_updated() {
    let transport = MockTransport::new();
    transport.on(COORDINATES, Reply::ok());
    let (manager, _store) = logged_in(&transport).await;
    assert_eq!(manager.last_updated(), None);

    let ack = manager.submit_location(sample()).await.unwrap();

    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert_eq!(manager.last_updated(), Some(ack.acknowledged_at));
    let body = &transport.bodies(COORDINATES)[0];
    assert_eq!(body["username"], "alice");
    assert_eq!(body["access_token"], "A1");
    assert_eq!(body["latitude"], 55.6);
    assert_eq!(body["longitude"], 12.5);
}

#[tokio::test]
async fn test_unauthorized_refreshes_and_retries_once() {
    let transport = MockTransport::new();
    transport
        .on(COORDINATES, Reply::status(401))
        .on(COORDINATES, Reply::ok())
        .on(REFRESH_TOKEN, Reply::tokens("A2", "R2"));
    let (manager, store) = logged_in(&transport).await;
    let mut events = manager.subscribe_events();

    manager.submit_location(sample()).await.unwrap();

    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert_eq!(store.get().await.unwrap(), alice("A2", "R2"));
    assert_eq!(transport.count(REFRESH_TOKEN), 1);
    assert_eq!(transport.count(COORDINATES), 2);

    let refresh = &transport.bodies(REFRESH_TOKEN)[0];
    assert_eq!(refresh["username"], "alice");
    assert_eq!(refresh["refresh_token"], "R1");
    assert_eq!(refresh["access_token"], "A1");

    let submissions = transport.bodies(COORDINATES);
    assert_eq!(submissions[0]["access_token"], "A1");
    assert_eq!(submissions[1]["access_token"], "A2");

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(matches!(seen.first(), Some(SessionEvent::SubmissionStarted { .. })));
    assert!(seen.contains(&SessionEvent::CredentialsRefreshed));
    assert!(matches!(seen.last(), Some(SessionEvent::LocationSubmitted { .. })));
}

#[tokio::test]
async fn test_refresh_rejected_logs_out() {
    let transport = MockTransport::new();
    transport
        .on(COORDINATES, Reply::status(401))
        .on(REFRESH_TOKEN, Reply::status(401));
    let (manager, store) = logged_in(&transport).await;
    let mut events = manager.subscribe_events();

    let err = manager.submit_location(sample()).await.unwrap_err();

    assert!(matches!(err, SessionError::SessionExpired));
    assert_eq!(manager.state(), SessionState::LoggedOut);
    assert_eq!(store.get().await.unwrap(), Credentials::empty());
    assert_eq!(transport.count(COORDINATES), 1);

    let mut logout = None;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::LoggedOut { reason } = event {
            logout = Some(reason);
        }
    }
    assert_eq!(logout, Some(LogoutReason::RefreshRejected));
}

#[tokio::test]
async fn test_malformed_refresh_logs_out() {
    let transport = MockTransport::new();
    transport
        .on(COORDINATES, Reply::status(401))
        .on(REFRESH_TOKEN, Reply::Status(200, b"{}".to_vec()));
    let (manager, store) = logged_in(&transport).await;

    let err = manager.submit_location(sample()).await.unwrap_err();

    assert!(err.is_auth_failure());
    assert_eq!(manager.state(), SessionState::LoggedOut);
    assert!(!store.get().await.unwrap().has_session());
}

#[tokio::test]
async fn test_retry_rejected_logs_out_without_loop() {
    let transport = MockTransport::new();
    transport
        .on(COORDINATES, Reply::status(401))
        .on(COORDINATES, Reply::status(401))
        .on(REFRESH_TOKEN, Reply::tokens("A2", "R2"));
    let (manager, store) = logged_in(&transport).await;

    let err = manager.submit_location(sample()).await.unwrap_err();

    assert!(matches!(err, SessionError::SessionExpired));
    assert_eq!(manager.state(), SessionState::LoggedOut);
    assert!(!store.get().await.unwrap().has_session());
    assert_eq!(transport.count(REFRESH_TOKEN), 1);
    assert_eq!(transport.count(COORDINATES), 2);
}

#[tokio::test]
async fn test_transport_error_keeps_state() {
    let transport = MockTransport::new();
    transport.on(COORDINATES, Reply::NetworkDown);
    let (manager, store) = logged_in(&transport).await;
    let mut events = manager.subscribe_events();

    let err = manager.submit_location(sample()).await.unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    assert!(err.is_retryable());
    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert_eq!(store.get().await.unwrap(), alice("A1", "R1"));

    let mut failure = None;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::SubmissionFailed { kind, .. } = event {
            failure = Some(kind);
        }
    }
    assert_eq!(failure, Some(SessionErrorKind::Transport));
}

#[tokio::test]
async fn test_refresh_transport_error_returns_to_logged_in() {
    let transport = MockTransport::new();
    transport
        .on(COORDINATES, Reply::status(401))
        .on(REFRESH_TOKEN, Reply::NetworkDown);
    let (manager, store) = logged_in(&transport).await;

    let err = manager.submit_location(sample()).await.unwrap_err();

    assert!(matches!(err, SessionError::Transport(_)));
    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert_eq!(store.get().await.unwrap(), alice("A1", "R1"));
}

#[tokio::test]
async fn test_refresh_server_error_keeps_session() {
    let transport = MockTransport::new();
    transport
        .on(COORDINATES, Reply::status(401))
        .on(REFRESH_TOKEN, Reply::status(503));
    let (manager, store) = logged_in(&transport).await;

    let err = manager.submit_location(sample()).await.unwrap_err();

    assert!(matches!(err, SessionError::Rejected { status: 503 }));
    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert_eq!(store.get().await.unwrap(), alice("A1", "R1"));
}

#[tokio::test]
async fn test_other_status_is_rejected() {
    let transport = MockTransport::new();
    transport.on(COORDINATES, Reply::status(500));
    let (manager, _store) = logged_in(&transport).await;

    let err = manager.submit_location(sample()).await.unwrap_err();

    assert!(matches!(err, SessionError::Rejected { status: 500 }));
    assert!(err.is_retryable());
    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert_eq!(transport.count(REFRESH_TOKEN), 0);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_unauthorized_single_refresh() {
    let transport = MockTransport::new();
    let barrier = Arc::new(Barrier::new(2));
    transport
        .on(
            COORDINATES,
            Reply::AfterBarrier(barrier.clone(), Box::new(Reply::status(401))),
        )
        .on(
            COORDINATES,
            Reply::AfterBarrier(barrier, Box::new(Reply::status(401))),
        )
        .on(COORDINATES, Reply::ok())
        .on(COORDINATES, Reply::ok())
        .on(REFRESH_TOKEN, Reply::tokens("A2", "R2"));
    let (manager, store) = logged_in(&transport).await;

    let (first, second) = tokio::join!(
        manager.submit_location(sample()),
        manager.submit_location(sample())
    );

    first.unwrap();
    second.unwrap();
    assert_eq!(transport.count(REFRESH_TOKEN), 1);
    assert_eq!(transport.count(COORDINATES), 4);
    let submissions = transport.bodies(COORDINATES);
    assert_eq!(submissions[2]["access_token"], "A2");
    assert_eq!(submissions[3]["access_token"], "A2");
    assert_eq!(store.get().await.unwrap(), alice("A2", "R2"));
    assert_eq!(manager.state(), SessionState::LoggedIn);
}

#[tokio::test]
async fn test_concurrent_submissions_are_independent() {
    let transport = MockTransport::new();
    for _ in 0..5 {
        transport.on(COORDINATES, Reply::ok());
    }
    let (manager, _store) = logged_in(&transport).await;

    let results =
        futures::future::join_all((0..5).map(|_| manager.submit_location(sample()))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(transport.count(COORDINATES), 5);
    assert_eq!(transport.count(REFRESH_TOKEN), 0);
    assert_eq!(manager.state(), SessionState::LoggedIn);
}

#[tokio::test]
async fn test_submission_queues_behind_refresh() {
    let transport = MockTransport::new();
    let release = Arc::new(Notify::new());
    transport
        .on(COORDINATES, Reply::status(401))
        .on(
            REFRESH_TOKEN,
            Reply::AfterNotify(release.clone(), Box::new(Reply::tokens("A2", "R2"))),
        )
        .on(COORDINATES, Reply::ok())
        .on(COORDINATES, Reply::ok());
    let (manager, _store) = logged_in(&transport).await;

    let first = tokio::spawn({
        let manager = manager.clone();
        async move { manager.submit_location(sample()).await }
    });
    wait_for_state(&manager, SessionState::RefreshingCredentials).await;

    let second = tokio::spawn({
        let manager = manager.clone();
        async move { manager.submit_location(sample()).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.count(COORDINATES), 1, "queued submission must wait");

    release.notify_one();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let submissions = transport.bodies(COORDINATES);
    assert_eq!(submissions.len(), 3);
    assert_eq!(submissions[1]["access_token"], "A2");
    assert_eq!(submissions[2]["access_token"], "A2");
}

#[tokio::test]
async fn test_logout_during_refresh_is_not_undone() {
    let transport = MockTransport::new();
    let release = Arc::new(Notify::new());
    transport.on(COORDINATES, Reply::status(401)).on(
        REFRESH_TOKEN,
        Reply::AfterNotify(release.clone(), Box::new(Reply::tokens("A2", "R2"))),
    );
    let (manager, store) = logged_in(&transport).await;

    let pending = tokio::spawn({
        let manager = manager.clone();
        async move { manager.submit_location(sample()).await }
    });
    wait_for_state(&manager, SessionState::RefreshingCredentials).await;

    manager.logout().await.unwrap();
    release.notify_one();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::SessionExpired));
    assert_eq!(manager.state(), SessionState::LoggedOut);
    assert_eq!(store.get().await.unwrap(), Credentials::empty());
    assert_eq!(transport.count(COORDINATES), 1);
}

#[tokio::test]
async fn test_session_cleared_elsewhere_logs_out() {
    let transport = MockTransport::new();
    let (manager, store) = logged_in(&transport).await;
    let mut events = manager.subscribe_events();

    // Another process ran `logout` against the same store.
    store.clear().await.unwrap();

    let err = manager.submit_location(sample()).await.unwrap_err();
    assert!(matches!(err, SessionError::NotAuthenticated));
    assert_eq!(manager.state(), SessionState::LoggedOut);
    assert_eq!(transport.total(), 0);
    assert_eq!(
        events.recv().await.unwrap(),
        SessionEvent::LoggedOut {
            reason: LogoutReason::EndedElsewhere
        }
    );
}

#[tokio::test]
async fn test_session_cleared_before_refresh_is_not_restored() {
    let transport = MockTransport::new();
    let release = Arc::new(Notify::new());
    transport.on(
        COORDINATES,
        Reply::AfterNotify(release.clone(), Box::new(Reply::status(401))),
    );
    let (manager, store) = logged_in(&transport).await;

    let pending = tokio::spawn({
        let manager = manager.clone();
        async move { manager.submit_location(sample()).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    store.clear().await.unwrap();
    release.notify_one();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::SessionExpired));
    assert_eq!(manager.state(), SessionState::LoggedOut);
    assert_eq!(transport.count(REFRESH_TOKEN), 0);
    assert!(!store.get().await.unwrap().has_session());
}

#[tokio::test]
async fn test_dropped_submission_mid_refresh_restores_logged_in() {
    let transport = MockTransport::new();
    transport
        .on(COORDINATES, Reply::status(401))
        .on(COORDINATES, Reply::ok())
        .on(REFRESH_TOKEN, Reply::Hang);
    let (manager, store) = logged_in(&transport).await;

    let timed_out =
        tokio::time::timeout(Duration::from_millis(50), manager.submit_location(sample())).await;

    assert!(timed_out.is_err());
    assert_eq!(transport.count(REFRESH_TOKEN), 1);
    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert_eq!(store.get().await.unwrap(), alice("A1", "R1"));

    manager.submit_location(sample()).await.unwrap();
    assert_eq!(manager.state(), SessionState::LoggedIn);
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_cancels_in_flight_submission() {
    let transport = MockTransport::new();
    transport.on(COORDINATES, Reply::Hang);
    let (manager, store) = logged_in(&transport).await;

    let pending = tokio::spawn({
        let manager = manager.clone();
        async move { manager.submit_location(sample()).await }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(transport.count(COORDINATES), 1);

    manager.shutdown();

    let err = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SessionError::Cancelled));
    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert_eq!(manager.last_updated(), None);
    assert_eq!(store.get().await.unwrap(), alice("A1", "R1"));
}

#[tokio::test]
async fn test_operations_after_shutdown_are_cancelled() {
    let transport = MockTransport::new();
    let (manager, store) = logged_in(&transport).await;

    manager.shutdown();
    assert!(manager.is_shut_down());

    assert!(matches!(
        manager.submit_location(sample()).await,
        Err(SessionError::Cancelled)
    ));
    assert!(matches!(manager.login("alice", "pw").await, Err(SessionError::Cancelled)));
    assert!(matches!(manager.logout().await, Err(SessionError::Cancelled)));
    assert_eq!(manager.state(), SessionState::LoggedIn);
    assert!(store.get().await.unwrap().has_session());
    assert_eq!(transport.total(), 0);
}
