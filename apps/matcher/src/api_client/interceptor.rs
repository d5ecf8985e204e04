//! Request augmentation applied before every outbound call.

use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::request::{ApiRequest, RequestBody};
use crate::storage::CredentialStore;

/// Name of the tenant field injected into bodies and queries.
pub const TENANT_FIELD: &str = "schoolId";

/// Attaches the stored bearer token and the user's tenant id.
///
/// The token is attached only when the request is not a replay and carries
/// no Authorization header yet. The tenant id goes into the body for
/// POST/PUT/PATCH and into the query for GET.
pub fn prepare(mut request: ApiRequest, store: &CredentialStore) -> ApiRequest {
    if !request.retry && !request.has_authorization() {
        if let Some(token) = store.access_token() {
            if let Err(e) = request.set_bearer(&token) {
                warn!("Stored access token not attached: {e}");
            }
        }
    }

    if let Some(tenant_id) = store.user().and_then(|user| user.tenant_id()) {
        inject_tenant(&mut request, tenant_id);
    }

    request
}

fn inject_tenant(request: &mut ApiRequest, tenant_id: i64) {
    let method = request.method.clone();
    if method == Method::POST || method == Method::PUT || method == Method::PATCH {
        if matches!(request.body, RequestBody::Empty) {
            request.body = RequestBody::Json(json!({}));
        }
        match &mut request.body {
            RequestBody::Empty => {}
            RequestBody::Json(Value::Object(fields)) => {
                fields.insert(TENANT_FIELD.to_string(), json!(tenant_id));
            }
            RequestBody::Json(_) => {
                debug!("Body of {} {} is not an object; tenant not injected", method, request.path);
            }
            RequestBody::Multipart(form) => form.set_text(TENANT_FIELD, tenant_id.to_string()),
        }
    } else if method == Method::GET {
        request.set_query(TENANT_FIELD, tenant_id.to_string());
    }
}
