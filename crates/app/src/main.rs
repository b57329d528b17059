//! Docflow session client - command line entry point.
//!
//! Signs in against the Docflow API, keeps the session in the token file
//! and sends authenticated calls through the shared client.

mod cli;

use clap::Parser;
use docflow_domain::AuthEvent;
use docflow_infrastructure::{Session, load_settings};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut settings = load_settings()?;
    if let Some(api_url) = &cli.api_url {
        settings.api_url.clone_from(api_url);
        settings.validate()?;
    }

    tracing::debug!(
        "starting docflow v{} against {}",
        env!("CARGO_PKG_VERSION"),
        settings.api_url
    );

    let session = Session::open(settings)?;
    for event in [AuthEvent::Login, AuthEvent::Logout, AuthEvent::Refresh] {
        session
            .events()
            .on(event, move || tracing::debug!(%event, "session changed"));
    }

    cli::run(cli.command, &session).await
}
