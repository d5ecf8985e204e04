//! Shared helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use matcher::api_client::{ApiClient, RecordingEvents, TokenRefresher};
use matcher::models::Session;
use matcher::storage::CredentialStore;
use serde_json::{json, Value};
use wiremock::ResponseTemplate;

pub fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Login/refresh response body.
pub fn session_body(access: &str, refresh: &str, school_id: &str) -> Value {
    json!({
        "accessToken": access,
        "refreshToken": refresh,
        "user": {"email": "a@b.com", "name": "Ada", "school.id": school_id}
    })
}

pub fn session(access: &str, refresh: &str, school_id: &str) -> Session {
    serde_json::from_value(session_body(access, refresh, school_id)).unwrap()
}

pub fn signed_in_store() -> CredentialStore {
    let store = CredentialStore::in_memory();
    store.store_session(&session("t1", "r1", "7"));
    store
}

pub fn error_response(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({ "message": message }))
}

pub fn expired_response() -> ResponseTemplate {
    error_response(401, "jwt expired")
}

pub fn client(
    uri: &str,
    store: CredentialStore,
    events: Arc<RecordingEvents>,
) -> ApiClient {
    ApiClient::builder(uri, store).events(events).build().unwrap()
}

pub fn client_with_refresher(
    uri: &str,
    store: CredentialStore,
    events: Arc<RecordingEvents>,
    refresher: Arc<dyn TokenRefresher>,
) -> ApiClient {
    ApiClient::builder(uri, store)
        .events(events)
        .refresher(refresher)
        .build()
        .unwrap()
}
