/// Snapshot of the currently active AWS session, as shown in the header panel.
///
/// Built by the backend worker whenever credentials are (re)loaded and shipped
/// to the UI as an event payload. All fields are display-ready strings; empty
/// means "not applicable" for the current credential source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AwsSessionData {
    pub profile: String,
    pub sso_role_name: String,
    pub account_id: String,
    pub assume_role_arn: String,
    pub access_key_id: String,
    pub credentials_source: String,
    pub region: String,
}

/// New static key material entered in the access-keys form.
///
/// The secret never appears in Debug output; only the key id is logged.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct AccessKeysData {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl std::fmt::Debug for AccessKeysData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKeysData")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}
