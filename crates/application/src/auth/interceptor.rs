//! Outgoing request interceptor.

use docflow_domain::ApiRequest;

use crate::auth::TokenStore;

/// Adds `Authorization: Bearer <token>` when the store holds an access token.
///
/// Requests are left untouched while signed out, so public endpoints keep
/// working without a session.
pub fn attach_bearer(store: &TokenStore, request: &mut ApiRequest) {
    if let Some(token) = store.access_token() {
        request.set_bearer(&token);
    }
}
