use crate::bus::event::{Action, ComponentId, Event, Payload, Trigger};
use crate::core::error::AwsAuthError;
use crate::core::types::AwsSessionData;
use crate::ports::AuthProvider;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Serialized executor of external AWS operations.
///
/// Consumes triggers from the bounded request queue one at a time; this is
/// the sole guard against concurrent operations racing on the credential
/// state. Every accepted trigger is answered with exactly one reply, a list
/// of zero or more events, success or failure.
pub(crate) struct BackendWorker {
    request_rx: mpsc::Receiver<Trigger>,
    provider: Arc<dyn AuthProvider>,
    session: Option<AwsSessionData>,
    sso_expired: bool,
    last_error: Option<String>,
    initial_profile: Option<String>,
    initial_region: Option<String>,
}

impl BackendWorker {
    pub(crate) fn new(
        request_rx: mpsc::Receiver<Trigger>,
        provider: Arc<dyn AuthProvider>,
        initial_profile: Option<String>,
        initial_region: Option<String>,
    ) -> Self {
        Self {
            request_rx,
            provider,
            session: None,
            sso_expired: false,
            last_error: None,
            initial_profile,
            initial_region,
        }
    }

    /// Runs until a quit trigger is handled or the gateway is dropped.
    /// Triggers still queued behind a quit are abandoned; the gateway stops
    /// accepting right after quit is raised, so at most a handful are lost.
    pub(crate) async fn run(mut self) {
        info!("Backend worker starting");
        let profile = self.initial_profile.clone();
        let region = self.initial_region.clone();
        self.load_session(profile.as_deref(), region.as_deref())
            .await;

        while let Some(trigger) = self.request_rx.recv().await {
            if self.handle_trigger(trigger).await {
                break;
            }
        }
        info!("Backend worker shutting down");
    }

    /// Dispatches one trigger by destination. Returns true on quit.
    async fn handle_trigger(&mut self, trigger: Trigger) -> bool {
        let destination = trigger.event.destination;
        let action = trigger.event.action;
        info!(%destination, %action, "Handling trigger");

        match (destination, action) {
            (ComponentId::Header, Action::GetAuthData) => {
                let events = self.auth_data_events();
                trigger.respond(events);
            }
            (ComponentId::ProfileSelect, Action::ChangeProfile) => {
                let events = self.change_profile(&trigger.event.payload).await;
                trigger.respond(events);
            }
            (ComponentId::AccessKeys, Action::SetAccessKeys) => {
                let events = self.set_access_keys(&trigger.event.payload).await;
                trigger.respond(events);
            }
            (ComponentId::SsoModal, Action::ReauthenticateSso) => {
                let events = self.reauthenticate_sso(&trigger.event.payload).await;
                trigger.respond(events);
            }
            (ComponentId::Quit, Action::End) => {
                info!("Quit trigger received");
                trigger.respond(vec![Event::quit()]);
                return true;
            }
            _ => {
                warn!(%destination, %action, "Trigger with no backend handler");
                trigger.respond(error_events(format!(
                    "No backend handler for {destination}/{action}"
                )));
            }
        }
        false
    }

    fn auth_data_events(&self) -> Vec<Event> {
        if self.sso_expired {
            return reauth_events();
        }
        match &self.session {
            Some(session) => vec![header_event(session.clone())],
            None => {
                let detail = self
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "no session loaded".to_string());
                error_events(format!("No AWS session available: {detail}"))
            }
        }
    }

    async fn change_profile(&mut self, payload: &Payload) -> Vec<Event> {
        let Payload::Profile(profile) = payload else {
            return self.unexpected_payload(Action::ChangeProfile, payload);
        };
        let profile = profile.clone();
        let region = self.current_region();
        self.load_session(Some(&profile), region.as_deref()).await;
        match &self.session {
            Some(session) => {
                info!(profile, "Switched AWS profile");
                vec![
                    header_event(session.clone()),
                    Event::new(
                        ComponentId::ProfileSelect,
                        Action::ChangeProfile,
                        Payload::None,
                    ),
                ]
            }
            None => self.load_failure_events(),
        }
    }

    async fn set_access_keys(&mut self, payload: &Payload) -> Vec<Event> {
        let Payload::AccessKeys(keys) = payload else {
            return self.unexpected_payload(Action::SetAccessKeys, payload);
        };
        let region = self.current_region();
        match self
            .provider
            .load_from_access_keys(
                &keys.access_key_id,
                &keys.secret_access_key,
                region.as_deref(),
            )
            .await
        {
            Ok(session) => {
                info!(access_key_id = %keys.access_key_id, "Switched to static access keys");
                self.session = Some(session.clone());
                self.sso_expired = false;
                self.last_error = None;
                vec![
                    header_event(session),
                    Event::new(ComponentId::AccessKeys, Action::SetAccessKeys, Payload::None),
                ]
            }
            Err(err) => self.record_failure(err),
        }
    }

    async fn reauthenticate_sso(&mut self, payload: &Payload) -> Vec<Event> {
        let Payload::Profile(profile) = payload else {
            return self.unexpected_payload(Action::ReauthenticateSso, payload);
        };
        let profile = profile.clone();
        if let Err(err) = self.provider.sso_login(&profile).await {
            error!(profile, %err, "SSO reauthentication failed");
            return error_events(format!("Failed to reauthenticate SSO session: {err}"));
        }

        let region = self.current_region();
        self.sso_expired = false;
        self.load_session(Some(&profile), region.as_deref()).await;
        match &self.session {
            Some(session) => {
                info!(profile, "Reauthenticated SSO session");
                vec![
                    header_event(session.clone()),
                    Event::new(
                        ComponentId::SsoModal,
                        Action::FinishReauthenticateSso,
                        Payload::None,
                    ),
                ]
            }
            None => self.load_failure_events(),
        }
    }

    /// Loads a session through the provider and records the outcome. An
    /// expired SSO session is remembered as such instead of as a failure, so
    /// the next auth-data request prompts for reauthentication.
    async fn load_session(&mut self, profile: Option<&str>, region: Option<&str>) {
        match self.provider.load_from_profile(profile, region).await {
            Ok(session) => {
                self.session = Some(session);
                self.sso_expired = false;
                self.last_error = None;
            }
            Err(AwsAuthError::SessionExpired { profile }) => {
                warn!(profile, "SSO session expired or invalid");
                self.session = None;
                self.sso_expired = true;
                self.last_error = None;
            }
            Err(err) => {
                error!(%err, "Failed to load AWS session");
                self.session = None;
                self.sso_expired = false;
                self.last_error = Some(err.to_string());
            }
        }
    }

    /// Events for a load that left no usable session behind.
    fn load_failure_events(&self) -> Vec<Event> {
        if self.sso_expired {
            reauth_events()
        } else {
            let detail = self
                .last_error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            error_events(format!("Failed to refresh AWS session: {detail}"))
        }
    }

    fn record_failure(&mut self, err: AwsAuthError) -> Vec<Event> {
        match err {
            AwsAuthError::SessionExpired { profile } => {
                warn!(profile, "SSO session expired or invalid");
                self.sso_expired = true;
                reauth_events()
            }
            other => {
                error!(%other, "AWS operation failed");
                self.last_error = Some(other.to_string());
                error_events(other.to_string())
            }
        }
    }

    /// A payload variant that does not fit the action aborts only the current
    /// operation, as a contained error reply. The single-reply contract holds.
    fn unexpected_payload(&self, action: Action, payload: &Payload) -> Vec<Event> {
        error!(%action, ?payload, "Unexpected payload variant for action");
        error_events(format!("Internal error: unexpected payload for {action}"))
    }

    fn current_region(&self) -> Option<String> {
        self.session
            .as_ref()
            .map(|s| s.region.clone())
            .filter(|r| !r.is_empty())
            .or_else(|| self.initial_region.clone())
    }
}

fn header_event(session: AwsSessionData) -> Event {
    Event::new(
        ComponentId::Header,
        Action::GetAuthData,
        Payload::AuthData(session),
    )
}

/// Error display pair: open the error modal and set its message.
fn error_events(message: String) -> Vec<Event> {
    vec![
        Event::new(ComponentId::Tui, Action::ShowErrorModal, Payload::None),
        Event::new(
            ComponentId::ErrorModal,
            Action::ShowErrorMessage,
            Payload::ErrorMessage(message),
        ),
    ]
}

/// Expired-session pair: open the reauthentication modal and mark it forced.
/// Two destinations, so per-destination coalescing cannot drop either one.
fn reauth_events() -> Vec<Event> {
    vec![
        Event::new(ComponentId::Tui, Action::ShowReauthModal, Payload::None),
        Event::new(
            ComponentId::SsoModal,
            Action::MustReauthenticateSso,
            Payload::None,
        ),
    ]
}
