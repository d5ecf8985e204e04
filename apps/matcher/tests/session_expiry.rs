//! Expired access tokens: session teardown and single-flight refresh.

mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fixtures::{
    can_bind_localhost, client, client_with_refresher, error_response, expired_response, session,
    signed_in_store,
};
use matcher::api_client::{
    ApiClient, ApiError, ApiRequest, RecordingEvents, SessionEvent, TokenRefresher, GENERIC_FAILURE,
    NETWORK_FAILURE, SESSION_EXPIRED_NOTICE,
};
use matcher::models::Session;
use matcher::storage::CredentialStore;
use serde_json::json;
use tokio::sync::Notify;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Hands out a fixed session (or fails when there is none), but only once
/// the test opens the gate.
struct GatedRefresher {
    calls: AtomicUsize,
    gate: Notify,
    session: Option<Session>,
}

impl GatedRefresher {
    fn new(session: Option<Session>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
            session,
        })
    }
}

#[async_trait]
impl TokenRefresher for GatedRefresher {
    async fn refresh(&self, refresh_token: Option<String>) -> Result<Session, ApiError> {
        assert_eq!(refresh_token.as_deref(), Some("r1"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.session.clone().ok_or(ApiError::RefreshUnavailable)
    }
}

async fn wait_for_queued(client: &ApiClient, count: usize) {
    let mut waited = Duration::ZERO;
    while client.pending_refresh_waiters() < count {
        assert!(waited < Duration::from_secs(5), "request never queued");
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += Duration::from_millis(10);
    }
}

#[tokio::test]
async fn test_expired_token_ends_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(expired_response())
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store();
    let events = Arc::new(RecordingEvents::default());
    let client = client(&server.uri(), store.clone(), events.clone());

    let err = client.send(ApiRequest::get("/reports")).await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(store.session().is_none());
    assert!(store.user().is_none());
    assert_eq!(
        events.events(),
        vec![
            SessionEvent::Error(SESSION_EXPIRED_NOTICE.to_string()),
            SessionEvent::Redirect("/login".to_string()),
        ]
    );
    assert!(!client.is_refreshing());
}

#[tokio::test]
async fn test_concurrent_expiry_refreshes_once() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(expired_response())
        .expect(2)
        .mount(&server)
        .await;

    let refresher = GatedRefresher::new(Some(session("t2", "r2", "7")));
    let store = signed_in_store();
    let events = Arc::new(RecordingEvents::default());
    let client = client_with_refresher(
        &server.uri(),
        store.clone(),
        events.clone(),
        refresher.clone(),
    );

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.send(ApiRequest::get("/a")).await }
    });
    let second = tokio::spawn({
        let client = client.clone();
        async move { client.send(ApiRequest::get("/b")).await }
    });

    // One request leads the refresh; the other must be queued behind it.
    wait_for_queued(&client, 1).await;
    assert!(client.is_refreshing());

    refresher.gate.notify_one();

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.access_token().as_deref(), Some("t2"));
    assert_eq!(store.refresh_token().as_deref(), Some("r2"));
    assert!(!client.is_refreshing());
    assert_eq!(client.pending_refresh_waiters(), 0);
    assert!(events.events().is_empty());
}

#[tokio::test]
async fn test_queued_requests_fail_with_the_leader() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(expired_response())
        .expect(2)
        .mount(&server)
        .await;

    let refresher = GatedRefresher::new(None);
    let store = signed_in_store();
    let events = Arc::new(RecordingEvents::default());
    let client = client_with_refresher(
        &server.uri(),
        store.clone(),
        events.clone(),
        refresher.clone(),
    );

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.send(ApiRequest::get("/a")).await }
    });
    let second = tokio::spawn({
        let client = client.clone();
        async move { client.send(ApiRequest::get("/b")).await }
    });

    wait_for_queued(&client, 1).await;
    refresher.gate.notify_one();

    assert!(first.await.unwrap().unwrap_err().is_session_expired());
    assert!(second.await.unwrap().unwrap_err().is_session_expired());

    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    assert!(store.session().is_none());
    // Only the leader tears the session down; the queued request just fails.
    assert_eq!(
        events.events(),
        vec![
            SessionEvent::Error(SESSION_EXPIRED_NOTICE.to_string()),
            SessionEvent::Redirect("/login".to_string()),
        ]
    );
    assert!(!client.is_refreshing());
    assert_eq!(client.pending_refresh_waiters(), 0);
}

#[tokio::test]
async fn test_replayed_request_is_not_refreshed_twice() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    // Even the refreshed token is rejected.
    Mock::given(method("GET"))
        .respond_with(expired_response())
        .expect(2)
        .mount(&server)
        .await;

    let refresher = GatedRefresher::new(Some(session("t2", "r2", "7")));
    refresher.gate.notify_one();

    let events = Arc::new(RecordingEvents::default());
    let client = client_with_refresher(
        &server.uri(),
        signed_in_store(),
        events.clone(),
        refresher.clone(),
    );

    let err = client.send(ApiRequest::get("/reports")).await.unwrap_err();

    assert_eq!(err.server_message(), Some("jwt expired"));
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        events.events(),
        vec![SessionEvent::Error("jwt expired".to_string())]
    );
}

#[tokio::test]
async fn test_server_errors_are_reported() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(error_response(400, "Bad input"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = signed_in_store();
    let events = Arc::new(RecordingEvents::default());
    let client = client(&server.uri(), store.clone(), events.clone());

    let err = client.send(ApiRequest::get("/bad")).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 400, .. }));
    let err = client.send(ApiRequest::get("/broken")).await.unwrap_err();
    assert!(matches!(err, ApiError::Server { status: 500, message: None }));

    assert_eq!(
        events.events(),
        vec![
            SessionEvent::Error("Bad input".to_string()),
            SessionEvent::Error(GENERIC_FAILURE.to_string()),
        ]
    );
    // Ordinary failures leave the session alone.
    assert_eq!(store.access_token().as_deref(), Some("t1"));
}

#[tokio::test]
async fn test_network_failure_is_reported() {
    // Bind and drop to find a port nobody is listening on.
    let port = match std::net::TcpListener::bind("127.0.0.1:0") {
        Ok(listener) => listener.local_addr().unwrap().port(),
        Err(_) => {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
    };

    let events = Arc::new(RecordingEvents::default());
    let client = client(
        &format!("http://127.0.0.1:{port}"),
        CredentialStore::in_memory(),
        events.clone(),
    );

    let err = client.send(ApiRequest::get("/reports")).await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
    assert_eq!(
        events.events(),
        vec![SessionEvent::Error(NETWORK_FAILURE.to_string())]
    );
}
