//! Settings loader.
//!
//! Built-in defaults, overridden by `DOCFLOW_*` environment variables:
//!
//! | Variable                       | Setting                |
//! |--------------------------------|------------------------|
//! | `DOCFLOW_API_URL`              | `api_url`              |
//! | `DOCFLOW_TOKEN_FILE`           | `token_file`           |
//! | `DOCFLOW_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` |
//! | `DOCFLOW_REFRESH_TIMEOUT_SECS` | `refresh_timeout_secs` |
//! | `DOCFLOW_USER_AGENT`           | `user_agent`           |

use std::path::PathBuf;

use config::{Config, ConfigError, Environment};
use docflow_domain::{ClientSettings, DomainError};

const ENV_PREFIX: &str = "DOCFLOW";

/// Error type for settings loading.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// A source could not be read or a value has the wrong type.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The loaded values are inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] DomainError),

    /// No token file was configured and the platform has no config
    /// directory.
    #[error("could not determine config directory; set DOCFLOW_TOKEN_FILE")]
    NoConfigDir,
}

/// Default session file: `<config dir>/docflow/session.json`.
#[must_use]
pub fn default_token_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("docflow").join("session.json"))
}

/// Loads settings from the process environment.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed, the API URL is not an
/// absolute http(s) URL, or no token file location can be determined.
pub fn load_settings() -> Result<ClientSettings, SettingsError> {
    build(Environment::with_prefix(ENV_PREFIX))
}

/// Loads settings from the given variables instead of the process
/// environment.
///
/// # Errors
///
/// Same as [`load_settings`].
pub fn load_settings_from<I, K, V>(vars: I) -> Result<ClientSettings, SettingsError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: config::Map<String, String> = vars
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect();
    build(Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
}

fn build(environment: Environment) -> Result<ClientSettings, SettingsError> {
    let defaults = ClientSettings::default();

    let mut settings: ClientSettings = Config::builder()
        .set_default("api_url", defaults.api_url)?
        .set_default("request_timeout_secs", defaults.request_timeout_secs)?
        .set_default("refresh_timeout_secs", defaults.refresh_timeout_secs)?
        .set_default("user_agent", defaults.user_agent)?
        .add_source(
            environment
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;

    settings.validate()?;

    if settings.token_file.is_none() {
        settings.token_file = Some(default_token_file().ok_or(SettingsError::NoConfigDir)?);
    }

    tracing::debug!(
        api_url = %settings.api_url,
        token_file = ?settings.token_file,
        "settings loaded"
    );
    Ok(settings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const NO_VARS: [(&str, &str); 0] = [];

    #[test]
    fn test_defaults() {
        let settings = load_settings_from(NO_VARS).unwrap();

        assert_eq!(settings.api_url, "http://localhost:4000/api");
        assert_eq!(settings.request_timeout(), Duration::from_secs(30));
        assert_eq!(settings.refresh_timeout(), Some(Duration::from_secs(30)));
        assert!(settings.user_agent.starts_with("docflow/"));
    }

    #[test]
    fn test_environment_overrides() {
        let settings = load_settings_from([
            ("DOCFLOW_API_URL", "https://docs.example.com/api"),
            ("DOCFLOW_TOKEN_FILE", "/tmp/docflow-session.json"),
            ("DOCFLOW_REFRESH_TIMEOUT_SECS", "0"),
        ])
        .unwrap();

        assert_eq!(settings.api_url, "https://docs.example.com/api");
        assert_eq!(
            settings.token_file,
            Some(PathBuf::from("/tmp/docflow-session.json"))
        );
        assert_eq!(settings.refresh_timeout(), None);
    }

    #[test]
    fn test_unrelated_variables_are_ignored() {
        let settings = load_settings_from([("HOME", "/root"), ("API_URL", "ftp://nope")]).unwrap();
        assert_eq!(settings.api_url, "http://localhost:4000/api");
    }

    #[test]
    fn test_non_http_url_is_rejected() {
        let result = load_settings_from([("DOCFLOW_API_URL", "ftp://docs.example.com")]);
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let result = load_settings_from([("DOCFLOW_REQUEST_TIMEOUT_SECS", "soon")]);
        assert!(matches!(result, Err(SettingsError::Config(_))));
    }
}
