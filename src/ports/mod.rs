use crate::core::error::AwsAuthError;
use crate::core::types::AwsSessionData;
use async_trait::async_trait;

/// Boundary with the AWS control plane. The backend worker performs every
/// external operation through this port, one at a time.
///
/// Implementations must classify an expired or invalid SSO session as
/// `AwsAuthError::SessionExpired` so the worker can offer reauthentication
/// instead of a dead-end error.
#[async_trait]
pub(crate) trait AuthProvider: Send + Sync {
    /// Resolves a session from a named profile (or the SDK default chain when
    /// `profile` is `None`), retrieving credentials and the account id.
    async fn load_from_profile(
        &self,
        profile: Option<&str>,
        region: Option<&str>,
    ) -> Result<AwsSessionData, AwsAuthError>;

    /// Resolves a session from static access keys.
    async fn load_from_access_keys(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
        region: Option<&str>,
    ) -> Result<AwsSessionData, AwsAuthError>;

    /// Runs the interactive SSO login flow for the given profile.
    async fn sso_login(&self, profile: &str) -> Result<(), AwsAuthError>;
}
