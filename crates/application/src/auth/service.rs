//! Auth service: login, logout, refresh and password reset.

use std::sync::Arc;

use docflow_domain::{
    ApiError, AuthEvent, Credentials, HttpMethod, LoginResponse, LogoutOutcome, TokenPair,
    UserProfile, token_preview,
};
use serde_json::{Value, json};

use crate::client::ApiClient;

/// Domain-level auth operations on top of an [`ApiClient`].
///
/// Calls to the auth endpoints themselves are excluded from the refresh
/// protocol, so a rejected login never triggers a refresh.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    /// Creates a service using `client`'s session.
    #[must_use]
    pub const fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Signs in, stores the issued tokens and emits [`AuthEvent::Login`].
    ///
    /// # Errors
    ///
    /// Returns the call's error, or a server error if the response carries
    /// no access token.
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let request = self
            .client
            .request(HttpMethod::Post, "/auth/login")
            .with_json_body(credentials.to_json())
            .without_refresh();

        let response = self.client.send(request).await?;
        let body = response.json_value()?;
        let login = LoginResponse::from_body(&body).ok_or_else(|| ApiError::Server {
            status: response.status,
            message: "login response carried no access token".to_string(),
        })?;

        // A new login replaces the session; a refresh token from an earlier
        // one must not outlive it.
        self.client.token_store().replace_tokens(&login.tokens());
        tracing::info!(
            email = %credentials.email,
            user_id = ?login.user.as_ref().and_then(UserProfile::id),
            access_token = %token_preview(&login.access_token),
            "signed in"
        );
        self.client.events().emit(AuthEvent::Login);
        Ok(login)
    }

    /// Exchanges the stored refresh token for new tokens.
    ///
    /// Joins a refresh that is already in flight instead of starting a second
    /// one.
    ///
    /// # Errors
    ///
    /// Fails locally with `AuthExpired` when no refresh token is stored;
    /// otherwise returns the refresh error, after which the session is
    /// cleared.
    pub async fn refresh_token(&self) -> Result<TokenPair, ApiError> {
        if self.client.token_store().refresh_token().is_none() {
            return Err(ApiError::auth_expired("no refresh token available"));
        }
        self.client.refresh_session().await
    }

    /// Signs out.
    ///
    /// With `server_side`, the stored refresh token is revoked on the backend
    /// first. Local tokens are cleared in every case and failures are
    /// reported in the outcome rather than returned.
    pub async fn logout(&self, server_side: bool) -> LogoutOutcome {
        if !server_side {
            return self.logout_local();
        }

        let outcome = match self.client.token_store().refresh_token() {
            Some(refresh_token) => self.revoke(&refresh_token).await,
            None => LogoutOutcome {
                ok: true,
                status: None,
                message: "No server session to revoke; logged out locally".to_string(),
            },
        };

        self.client.token_store().clear();
        tracing::info!(ok = outcome.ok, status = outcome.status, "signed out");
        outcome
    }

    /// Clears the local session without contacting the backend.
    pub fn logout_local(&self) -> LogoutOutcome {
        self.client.token_store().clear();
        tracing::info!("signed out locally");
        LogoutOutcome::local()
    }

    /// Asks the backend to send a password reset email.
    ///
    /// # Errors
    ///
    /// Returns the call's error unchanged.
    pub async fn forgot_password(&self, email: &str) -> Result<Value, ApiError> {
        self.post_unauthenticated("/auth/forgot-password", json!({ "email": email }))
            .await
    }

    /// Sets a new password using a reset token.
    ///
    /// # Errors
    ///
    /// Returns the call's error unchanged.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Value, ApiError> {
        self.post_unauthenticated(
            "/auth/reset-password",
            json!({ "token": token, "newPassword": new_password }),
        )
        .await
    }

    /// Fetches the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns the call's error, after a token refresh if one was needed.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let body = self.client.get_json("/auth/me").await?;
        Ok(UserProfile::from_me_body(&body))
    }

    /// Returns true if an access token is stored.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.client.token_store().is_authenticated()
    }

    async fn revoke(&self, refresh_token: &str) -> LogoutOutcome {
        let request = self
            .client
            .request(HttpMethod::Post, "/auth/logout")
            .with_json_body(json!({ "refreshToken": refresh_token }))
            .without_refresh();

        match self.client.send(request).await {
            Ok(response) => LogoutOutcome {
                ok: true,
                status: Some(response.status),
                message: "Logged out".to_string(),
            },
            Err(error) => {
                tracing::warn!(%error, "server-side logout failed, clearing local session anyway");
                LogoutOutcome {
                    ok: false,
                    status: error.status(),
                    message: error.to_string(),
                }
            }
        }
    }

    async fn post_unauthenticated(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        let request = self
            .client
            .request(HttpMethod::Post, path)
            .with_json_body(body)
            .without_refresh();
        self.client.send(request).await?.json_value()
    }
}
