use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum AwsAuthError {
    #[error("SSO session for profile '{profile}' is expired or invalid")]
    SessionExpired { profile: String },
    #[error("Failed to retrieve credentials for profile '{profile}': {source}")]
    CredentialRetrieval {
        profile: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("No credentials provider configured for profile '{0}'")]
    NoCredentialsProvider(String),
    #[error("Access key id and secret access key must both be provided")]
    IncompleteAccessKeys,
    #[error("SSO login failed: {0}")]
    SsoLogin(#[from] SsoLoginError),
}

#[derive(Error, Debug)]
pub(crate) enum SsoLoginError {
    #[error("Failed to execute 'aws sso login --profile {profile}': {source}")]
    Spawn {
        profile: String,
        source: std::io::Error,
    },
    #[error("'aws sso login --profile {profile}' exited with {status}: {stderr}")]
    CommandFailed {
        profile: String,
        status: String,
        stderr: String,
    },
}

#[derive(Error, Debug)]
pub(crate) enum ProfileReadError {
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Neither ~/.aws/config nor ~/.aws/credentials file found")]
    NoConfigFilesFound,
}

#[derive(Error, Debug)]
pub(crate) enum GatewayError {
    #[error("Trigger gateway is closed; no new triggers are accepted")]
    Closed,
    #[error("Backend worker is gone; request queue is disconnected")]
    Disconnected,
}

#[derive(Error, Debug)]
pub(crate) enum ConfigError {
    #[error("Failed to read configuration file {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse configuration from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
