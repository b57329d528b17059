//! Normalization of auth endpoint responses.
//!
//! The backend has shipped several response shapes over time. Tokens are
//! looked up in this order, first non-empty string wins:
//!
//! 1. top level: `accessToken`, then `access_token`
//! 2. `tokens` object: `accessToken`, then `access_token`
//! 3. `data` envelope: `accessToken`, then `access_token`
//! 4. `data.tokens` object: `accessToken`, then `access_token`
//!
//! The refresh token follows the same order with `refreshToken` /
//! `refresh_token`.

use serde_json::Value;

use super::types::{LoginResponse, RefreshedTokens, TokenPair, UserProfile};

const ACCESS_TOKEN_FIELDS: [&str; 2] = ["accessToken", "access_token"];
const REFRESH_TOKEN_FIELDS: [&str; 2] = ["refreshToken", "refresh_token"];

/// Objects that may carry tokens, in priority order.
fn token_containers(body: &Value) -> impl Iterator<Item = &Value> {
    let data = body.get("data");
    [
        Some(body),
        body.get("tokens"),
        data,
        data.and_then(|d| d.get("tokens")),
    ]
    .into_iter()
    .flatten()
}

fn find_token(body: &Value, fields: &[&str]) -> Option<String> {
    token_containers(body).find_map(|container| {
        fields.iter().find_map(|field| {
            container
                .get(*field)
                .and_then(Value::as_str)
                .filter(|token| !token.is_empty())
                .map(str::to_owned)
        })
    })
}

impl TokenPair {
    /// Extracts whichever tokens are present in an auth response body.
    #[must_use]
    pub fn from_auth_body(body: &Value) -> Self {
        Self {
            access_token: find_token(body, &ACCESS_TOKEN_FIELDS),
            refresh_token: find_token(body, &REFRESH_TOKEN_FIELDS),
        }
    }
}

impl RefreshedTokens {
    /// Extracts refresh results; `None` when the body carries no access token.
    #[must_use]
    pub fn from_auth_body(body: &Value) -> Option<Self> {
        let pair = TokenPair::from_auth_body(body);
        Some(Self {
            access_token: pair.access_token?,
            refresh_token: pair.refresh_token,
        })
    }
}

impl UserProfile {
    /// Extracts the user from a login response (`user` or `data.user`).
    #[must_use]
    pub fn from_login_body(body: &Value) -> Option<Self> {
        body.get("user")
            .or_else(|| body.get("data").and_then(|d| d.get("user")))
            .filter(|user| user.is_object())
            .cloned()
            .map(Self)
    }

    /// Extracts the user from a `/auth/me` response (`{data: user}` or the
    /// bare user object).
    #[must_use]
    pub fn from_me_body(body: &Value) -> Self {
        let user = body
            .get("data")
            .filter(|data| data.is_object())
            .or_else(|| body.get("user").filter(|user| user.is_object()))
            .unwrap_or(body);
        Self(user.clone())
    }
}

impl LoginResponse {
    /// Normalizes a login response; `None` when no access token is present.
    #[must_use]
    pub fn from_body(body: &Value) -> Option<Self> {
        let tokens = RefreshedTokens::from_auth_body(body)?;
        Some(Self {
            user: UserProfile::from_login_body(body),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }
}
