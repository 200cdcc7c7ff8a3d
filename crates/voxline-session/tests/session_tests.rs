// SPDX-FileCopyrightText: 2026 Voxline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session manager behaviour through the public API.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use voxline_core::VoxlineError;
use voxline_core::types::ProviderEvent;
use voxline_session::{
    EndReason, SessionEvent, SessionManager, SessionRequest, SessionSettings, spawn_sweeper,
};
use voxline_test_utils::{MockAudioChannel, MockConnector};

fn request(call_uuid: &str, domain_uuid: &str) -> SessionRequest {
    SessionRequest {
        call_uuid: call_uuid.into(),
        domain_uuid: domain_uuid.into(),
        caller_id: "5518997752222".into(),
        secretary_uuid: Some("sec-1".into()),
    }
}

fn settings(max: usize) -> SessionSettings {
    SessionSettings {
        max_sessions_per_domain: max,
        session_timeout: Duration::from_secs(30),
        sweep_interval: Duration::from_secs(1),
        ..SessionSettings::default()
    }
}

fn channel() -> Arc<MockAudioChannel> {
    Arc::new(MockAudioChannel::new())
}

#[tokio::test]
async fn domain_limit_is_a_hard_gate() {
    let (manager, _events) = SessionManager::with_events(Arc::new(MockConnector::new()), settings(2));

    manager.create_session(request("c1", "d1"), channel()).await.unwrap();
    manager.create_session(request("c2", "d1"), channel()).await.unwrap();

    let err = manager
        .create_session(request("c3", "d1"), channel())
        .await
        .unwrap_err();
    assert!(matches!(err, VoxlineError::DomainCapacityExceeded { limit: 2, .. }));
    assert!(err.is_admission_rejection());
    assert_eq!(manager.get_domain_session_count("d1"), 2);

    // Other tenants are unaffected.
    manager.create_session(request("c4", "d2"), channel()).await.unwrap();
    assert_eq!(manager.active_session_count(), 3);
    assert_eq!(manager.get_sessions_by_domain("d1").len(), 2);

    assert!(manager.remove_session("c1").await);
    assert!(manager.get_session("c1").is_none());
    assert!(!manager.remove_session("c1").await);
    assert_eq!(manager.get_domain_session_count("d1"), 1);

    manager.create_session(request("c3", "d1"), channel()).await.unwrap();
    assert_eq!(manager.get_domain_session_count("d1"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_admission_never_exceeds_the_limit() {
    const LIMIT: usize = 4;
    const CALLERS: usize = 16;
    let (manager, _events) =
        SessionManager::with_events(Arc::new(MockConnector::new()), settings(LIMIT));
    let start = Arc::new(tokio::sync::Barrier::new(CALLERS));

    let attempts: Vec<_> = (0..CALLERS)
        .map(|i| {
            let manager = manager.clone();
            let start = start.clone();
            tokio::spawn(async move {
                start.wait().await;
                manager
                    .create_session(request(&format!("c{i}"), "d1"), channel())
                    .await
                    .map(|_| ())
            })
        })
        .collect();

    let mut admitted = 0;
    let mut rejected = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(()) => admitted += 1,
            Err(VoxlineError::DomainCapacityExceeded { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(admitted, LIMIT);
    assert_eq!(rejected, CALLERS - LIMIT);
    assert_eq!(manager.get_domain_session_count("d1"), LIMIT);
    assert_eq!(manager.get_sessions_by_domain("d1").len(), LIMIT);
}

#[tokio::test]
async fn duplicate_call_is_rejected() {
    let connector = Arc::new(MockConnector::new());
    let (manager, _events) = SessionManager::with_events(connector.clone(), settings(5));

    manager.create_session(request("c1", "d1"), channel()).await.unwrap();
    let err = manager
        .create_session(request("c1", "d1"), channel())
        .await
        .unwrap_err();
    assert!(matches!(err, VoxlineError::DuplicateSession { .. }));
    assert_eq!(manager.get_domain_session_count("d1"), 1);
    assert_eq!(connector.connect_count().await, 1);
}

#[tokio::test]
async fn removal_closes_both_legs() {
    let connector = Arc::new(MockConnector::new());
    let (manager, mut events) = SessionManager::with_events(connector.clone(), settings(5));
    let audio = channel();

    let session = manager.create_session(request("c1", "d1"), audio.clone()).await.unwrap();
    assert!(session.is_active());
    assert_eq!(session.secretary_uuid(), Some("sec-1"));

    assert!(manager.remove_session("c1").await);
    assert!(!session.is_active());
    assert!(audio.is_closed());
    assert!(connector.connection("c1").await.unwrap().is_closed());

    let Some(SessionEvent::Ended(summary)) = events.recv().await else {
        panic!("expected an Ended event");
    };
    assert_eq!(summary.reason, EndReason::Removed);
    assert_eq!(summary.call.call_uuid, "c1");
}

#[tokio::test]
async fn provider_requests_reach_the_event_queue() {
    let connector = Arc::new(MockConnector::with_script(vec![
        ProviderEvent::TransferRequested {
            destination: "Jeni".into(),
            reason: Some("billing".into()),
        },
        ProviderEvent::CallbackRequested { reason: None },
    ]));
    let (manager, mut events) = SessionManager::with_events(connector, settings(5));
    manager.create_session(request("c1", "d1"), channel()).await.unwrap();

    match events.recv().await {
        Some(SessionEvent::TransferRequested {
            call,
            destination,
            reason,
        }) => {
            assert_eq!(call.call_uuid, "c1");
            assert_eq!(call.domain_uuid, "d1");
            assert_eq!(destination, "Jeni");
            assert_eq!(reason.as_deref(), Some("billing"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(matches!(
        events.recv().await,
        Some(SessionEvent::CallbackRequested { reason: None, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn cleanup_removes_only_expired_sessions() {
    let (manager, _events) = SessionManager::with_events(Arc::new(MockConnector::new()), settings(5));

    manager.create_session(request("old-1", "d1"), channel()).await.unwrap();
    manager.create_session(request("old-2", "d1"), channel()).await.unwrap();
    tokio::time::advance(Duration::from_secs(20)).await;
    manager.create_session(request("new", "d1"), channel()).await.unwrap();
    tokio::time::advance(Duration::from_secs(15)).await;

    assert_eq!(manager.cleanup_expired_sessions().await, 2);
    assert!(manager.get_session("old-1").is_none());
    assert!(manager.get_session("new").is_some());
    assert_eq!(manager.get_domain_session_count("d1"), 1);
    assert_eq!(manager.cleanup_expired_sessions().await, 0);
}

#[tokio::test(start_paused = true)]
async fn sweeper_removes_expired_sessions_until_cancelled() {
    let (manager, _events) = SessionManager::with_events(Arc::new(MockConnector::new()), settings(5));
    manager.create_session(request("c1", "d1"), channel()).await.unwrap();

    let cancel = CancellationToken::new();
    let sweeper = spawn_sweeper(manager.clone(), Duration::from_secs(1), cancel.clone());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(manager.get_session("c1").is_some());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(manager.get_session("c1").is_none());
    assert_eq!(manager.get_domain_session_count("d1"), 0);

    cancel.cancel();
    sweeper.await.unwrap();
}

#[tokio::test]
async fn shutdown_closes_everything() {
    let (manager, _events) = SessionManager::with_events(Arc::new(MockConnector::new()), settings(5));
    manager.create_session(request("c1", "d1"), channel()).await.unwrap();
    manager.create_session(request("c2", "d2"), channel()).await.unwrap();

    assert_eq!(manager.shutdown().await, 2);
    assert_eq!(manager.active_session_count(), 0);
    assert!(manager.get_all_sessions().is_empty());
}
