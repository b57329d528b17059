//! Command line interface.

use std::error::Error;

use clap::{Parser, Subcommand};
use docflow_domain::{Credentials, HttpMethod, token_preview};
use docflow_infrastructure::Session;
use serde_json::{Value, json};

/// Docflow session client.
#[derive(Debug, Parser)]
#[command(name = "docflow")]
#[command(about = "Command-line client for the Docflow document approval API")]
#[command(version)]
pub struct Cli {
    /// Base URL of the API; overrides `DOCFLOW_API_URL`.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session.
    Login {
        /// Account email.
        email: String,
        /// Account password.
        #[arg(long)]
        password: String,
        /// Optional login context, e.g. an organization slug.
        #[arg(long)]
        context: Option<String>,
    },

    /// Show the signed-in user.
    Whoami,

    /// Exchange the refresh token for a new access token.
    Refresh,

    /// Sign out.
    Logout {
        /// Only forget the local session; do not contact the server.
        #[arg(long)]
        local: bool,
    },

    /// Request a password reset email.
    ForgotPassword {
        /// Account email.
        email: String,
    },

    /// Set a new password with a reset token.
    ResetPassword {
        /// Token from the reset email.
        token: String,
        /// The new password.
        #[arg(long)]
        new_password: String,
    },

    /// Send an authenticated call, refreshing the session if needed.
    Call {
        /// HTTP method.
        method: HttpMethod,
        /// Path under the API base URL, e.g. `/documents`.
        path: String,
        /// JSON request body.
        #[arg(long)]
        body: Option<String>,
    },

    /// Show the local session state.
    Status,
}

/// Runs one command against `session`.
pub async fn run(command: Command, session: &Session) -> Result<(), Box<dyn Error>> {
    let auth = session.auth();

    match command {
        Command::Login {
            email,
            password,
            context,
        } => {
            let mut credentials = Credentials::new(email, password);
            if let Some(context) = context {
                credentials = credentials.with_context(context);
            }
            let login = auth.login(&credentials).await?;
            print_json(&json!({ "user": login.user }))?;
        }
        Command::Whoami => {
            let user = auth.current_user().await?;
            print_json(&user.0)?;
        }
        Command::Refresh => {
            let tokens = auth.refresh_token().await?;
            print_json(&json!({
                "refreshed": true,
                "accessToken": tokens.access_token.as_deref().map(token_preview),
            }))?;
        }
        Command::Logout { local } => {
            let outcome = auth.logout(!local).await;
            print_json(&serde_json::to_value(&outcome)?)?;
        }
        Command::ForgotPassword { email } => {
            print_json(&auth.forgot_password(&email).await?)?;
        }
        Command::ResetPassword {
            token,
            new_password,
        } => {
            print_json(&auth.reset_password(&token, &new_password).await?)?;
        }
        Command::Call { method, path, body } => {
            let client = session.client();
            let mut request = client.request(method, &path);
            if let Some(body) = body.as_deref() {
                let body: Value = serde_json::from_str(body)?;
                request = request.with_json_body(body);
            }
            let response = client.send(request).await?;
            print_json(&response.json_value()?)?;
        }
        Command::Status => {
            let tokens = session.tokens();
            let storage = if tokens.is_degraded() { "memory" } else { "durable" };
            print_json(&json!({
                "authenticated": tokens.is_authenticated(),
                "accessToken": tokens.access_token().as_deref().map(token_preview),
                "hasRefreshToken": tokens.refresh_token().is_some(),
                "storage": storage,
                "tokenFile": session.client().settings().token_file,
            }))?;
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_call_with_lowercase_method() {
        let cli = Cli::parse_from(["docflow", "call", "post", "/documents", "--body", "{}"]);

        let Command::Call { method, path, body } = cli.command else {
            unreachable!("parsed a different command");
        };
        assert_eq!(method, HttpMethod::Post);
        assert_eq!(path, "/documents");
        assert_eq!(body.as_deref(), Some("{}"));
    }

    #[test]
    fn test_logout_defaults_to_server_side() {
        let cli = Cli::parse_from(["docflow", "logout"]);
        assert!(matches!(cli.command, Command::Logout { local: false }));
    }

    #[test]
    fn test_rejects_unknown_method() {
        assert!(Cli::try_parse_from(["docflow", "call", "TRACE", "/x"]).is_err());
    }
}
