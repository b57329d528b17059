//! Session and credential types

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The bearer credentials of the current session.
///
/// Either field may be absent; an empty pair is the logged-out state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived token attached to authenticated requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Longer-lived token exchanged for a new access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    /// Creates a pair with both tokens present.
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    /// Returns true if neither token is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Tokens returned by a successful refresh.
///
/// Unlike [`TokenPair`], the access token is guaranteed to be present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    /// The new access token.
    pub access_token: String,
    /// A rotated refresh token, if the server issued one.
    pub refresh_token: Option<String>,
}

impl From<RefreshedTokens> for TokenPair {
    fn from(tokens: RefreshedTokens) -> Self {
        Self {
            access_token: Some(tokens.access_token),
            refresh_token: tokens.refresh_token,
        }
    }
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEvent {
    /// A user signed in.
    Login,
    /// The session ended (explicit logout or failed refresh).
    Logout,
    /// The access token was renewed.
    Refresh,
}

impl AuthEvent {
    /// Returns the event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for AuthEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login form input.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
    /// Optional login context forwarded to the backend (e.g. a tenant).
    pub context: Option<String>,
}

impl Credentials {
    /// Creates credentials without a context.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            context: None,
        }
    }

    /// Sets the login context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Builds the `/auth/login` request body.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "email": self.email,
            "password": self.password,
        });
        if let (Some(context), Some(map)) = (&self.context, body.as_object_mut()) {
            map.insert("context".to_string(), Value::String(context.clone()));
        }
        body
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("context", &self.context)
            .finish()
    }
}

/// The signed-in user as returned by the backend.
///
/// The backend owns this shape, so it is kept as raw JSON with accessors for
/// the fields the client cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub Value);

impl UserProfile {
    /// User id, whether the backend sends it as a string or a number.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        match self.0.get("id").or_else(|| self.0.get("_id"))? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    /// User email.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.0.get("email").and_then(Value::as_str)
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Role, e.g. `admin` or `approver`.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.0.get("role").and_then(Value::as_str)
    }
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// The signed-in user, when the backend includes it.
    pub user: Option<UserProfile>,
    /// The new access token.
    pub access_token: String,
    /// The new refresh token, when issued.
    pub refresh_token: Option<String>,
}

impl LoginResponse {
    /// Returns the tokens of this login as a pair.
    #[must_use]
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: Some(self.access_token.clone()),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// Result of a logout. Logout never fails; problems are reported here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogoutOutcome {
    /// Whether the backend acknowledged the logout.
    pub ok: bool,
    /// HTTP status of the logout call, if one was made and answered.
    pub status: Option<u16>,
    /// Human-readable result.
    pub message: String,
}

impl LogoutOutcome {
    /// Outcome of a local-only logout.
    #[must_use]
    pub fn local() -> Self {
        Self {
            ok: true,
            status: None,
            message: "Logged out locally".to_string(),
        }
    }
}

/// Get a preview of a token (first 8 chars + ...), safe for logs.
#[must_use]
pub fn token_preview(token: &str) -> String {
    match token.char_indices().nth(8) {
        Some((cut, _)) if token.len() > 12 => format!("{}...", &token[..cut]),
        _ => token.to_string(),
    }
}
