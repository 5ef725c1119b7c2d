use crate::adapters::aws::{profiles, sso};
use crate::core::error::AwsAuthError;
use crate::core::types::AwsSessionData;
use crate::ports::AuthProvider;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use tracing::{debug, info, warn};

/// `AuthProvider` backed by the AWS SDK shared-config machinery plus STS for
/// the account-id lookup.
pub(crate) struct SdkAuthProvider;

#[async_trait]
impl AuthProvider for SdkAuthProvider {
    async fn load_from_profile(
        &self,
        profile: Option<&str>,
        region: Option<&str>,
    ) -> Result<AwsSessionData, AwsAuthError> {
        let profile = resolve_profile_name(profile);
        info!(profile, "Loading AWS session from profile");

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).profile_name(&profile);
        if let Some(region) = region.filter(|r| !r.is_empty()) {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;

        let credentials_provider = sdk_config
            .credentials_provider()
            .ok_or_else(|| AwsAuthError::NoCredentialsProvider(profile.clone()))?;
        let credentials = credentials_provider
            .provide_credentials()
            .await
            .map_err(|e| classify_credentials_error(&profile, e))?;

        let account_id = lookup_account_id(&sdk_config).await;
        let sso_role_name = profiles::profile_property(&profile, "sso_role_name");
        let assume_role_arn = profiles::profile_property(&profile, "role_arn");
        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_default();
        info!(profile, region, "AWS session loaded");

        Ok(AwsSessionData {
            credentials_source: if sso_role_name.is_some() {
                "sso".to_string()
            } else {
                "shared-config".to_string()
            },
            profile,
            sso_role_name: sso_role_name.unwrap_or_default(),
            account_id,
            assume_role_arn: assume_role_arn.unwrap_or_default(),
            access_key_id: credentials.access_key_id().to_string(),
            region,
        })
    }

    async fn load_from_access_keys(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
        region: Option<&str>,
    ) -> Result<AwsSessionData, AwsAuthError> {
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(AwsAuthError::IncompleteAccessKeys);
        }
        info!(access_key_id, "Loading AWS session from static access keys");

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "static-keys",
        );
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).credentials_provider(credentials);
        if let Some(region) = region.filter(|r| !r.is_empty()) {
            loader = loader.region(Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;

        let account_id = lookup_account_id(&sdk_config).await;
        let region = sdk_config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_default();

        Ok(AwsSessionData {
            profile: String::new(),
            sso_role_name: String::new(),
            account_id,
            assume_role_arn: String::new(),
            access_key_id: access_key_id.to_string(),
            credentials_source: "static-keys".to_string(),
            region,
        })
    }

    async fn sso_login(&self, profile: &str) -> Result<(), AwsAuthError> {
        sso::exec_sso_login(profile).await.map_err(AwsAuthError::from)
    }
}

/// GetCallerIdentity for the account id. A failure here is informational
/// only: the header shows a blank account rather than the whole load failing.
async fn lookup_account_id(sdk_config: &aws_config::SdkConfig) -> String {
    let client = aws_sdk_sts::Client::new(sdk_config);
    match client.get_caller_identity().send().await {
        Ok(output) => {
            let account = output.account().unwrap_or_default().to_string();
            debug!(account, "Resolved caller identity");
            account
        }
        Err(e) => {
            warn!(error = %e, "Failed to resolve account id via GetCallerIdentity");
            String::new()
        }
    }
}

fn resolve_profile_name(profile: Option<&str>) -> String {
    if let Some(p) = profile.filter(|p| !p.is_empty()) {
        return p.to_string();
    }
    std::env::var("AWS_PROFILE")
        .or_else(|_| std::env::var("AWS_DEFAULT_PROFILE"))
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "default".to_string())
}

/// Separates "the SSO session has expired or is invalid" from every other
/// credential failure, so the UI can offer reauthentication instead of a
/// dead-end error message.
fn classify_credentials_error(
    profile: &str,
    err: aws_credential_types::provider::error::CredentialsError,
) -> AwsAuthError {
    if is_expired_session(&error_chain_text(&err)) {
        return AwsAuthError::SessionExpired {
            profile: profile.to_string(),
        };
    }
    AwsAuthError::CredentialRetrieval {
        profile: profile.to_string(),
        source: Box::new(err),
    }
}

fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}

fn is_expired_session(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    text.contains("expired or is invalid")
        || (text.contains("sso") && (text.contains("expired") || text.contains("invalid")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_session_messages_are_recognized() {
        assert!(is_expired_session(
            "failed to load credentials: the SSO session has expired or is invalid"
        ));
        assert!(is_expired_session("SSO token is expired"));
        assert!(is_expired_session("sso session invalid, run `aws sso login`"));
        assert!(!is_expired_session("connection refused"));
        assert!(!is_expired_session("invalid access key id"));
    }

    #[test]
    fn error_chain_includes_sources() {
        let inner = std::io::Error::other("the SSO session has expired or is invalid");
        let outer = crate::core::error::ProfileReadError::Io {
            path: "/tmp/x".into(),
            source: inner,
        };
        let text = error_chain_text(&outer);
        assert!(text.contains("/tmp/x"));
        assert!(text.contains("expired or is invalid"));
        assert!(is_expired_session(&text));
    }

    #[test]
    fn explicit_profile_wins_over_default() {
        assert_eq!(resolve_profile_name(Some("dev")), "dev");
        assert_eq!(resolve_profile_name(Some("")), resolve_profile_name(None));
    }
}
