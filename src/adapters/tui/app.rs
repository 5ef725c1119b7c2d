use crate::adapters::tui::event::InputListener;
use crate::adapters::tui::ui;
use crate::bus::event::{Action, ComponentId, Event, Payload};
use crate::bus::gateway::TriggerGateway;
use crate::core::types::{AccessKeysData, AwsSessionData};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::collections::HashMap;
use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cadence of the drain/dispatch cycle: how long the run loop parks on the
/// input channel before polling pending replies again.
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);

const SSO_PROMPT_DEFAULT: &str = "Refresh your AWS SSO credentials";
const SSO_PROMPT_EXPIRED: &str = "Your SSO session has expired. Reauthenticate to continue.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActiveModal {
    Auth,
    Sso,
    Error,
    Help,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum FormPhase {
    #[default]
    Input,
    Working,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum AuthTab {
    #[default]
    ChangeProfile,
    SetAccessKeys,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum AccessKeysField {
    #[default]
    KeyId,
    Secret,
    Submit,
}

#[derive(Default)]
pub(crate) struct HeaderState {
    pub data: AwsSessionData,
}

impl HeaderState {
    fn on_event(&mut self, event: Event) {
        match event.payload {
            Payload::AuthData(data) => self.data = data,
            other => warn!(action = %event.action, payload = ?other, "Header: unexpected payload"),
        }
    }
}

#[derive(Default)]
pub(crate) struct ErrorModalState {
    pub message: String,
}

impl ErrorModalState {
    fn on_event(&mut self, event: Event) {
        match event.payload {
            Payload::ErrorMessage(message) => self.message = message,
            other => {
                warn!(action = %event.action, payload = ?other, "ErrorModal: unexpected payload");
            }
        }
    }
}

pub(crate) struct SsoModalState {
    pub profiles: Vec<String>,
    pub selected: usize,
    pub phase: FormPhase,
    pub prompt: String,
    pub must_reauth: bool,
}

impl SsoModalState {
    fn new(profiles: Vec<String>) -> Self {
        Self {
            profiles,
            selected: 0,
            phase: FormPhase::default(),
            prompt: SSO_PROMPT_DEFAULT.to_string(),
            must_reauth: false,
        }
    }

    fn on_event(&mut self, event: Event) {
        match event.action {
            Action::MustReauthenticateSso => {
                self.must_reauth = true;
                self.prompt = SSO_PROMPT_EXPIRED.to_string();
            }
            Action::FinishReauthenticateSso => {
                // Reset the prompt in case this was a forced reauthentication.
                self.must_reauth = false;
                self.prompt = SSO_PROMPT_DEFAULT.to_string();
                self.phase = FormPhase::Success;
            }
            other => warn!(action = %other, "SsoModal: unexpected action"),
        }
    }
}

pub(crate) struct ProfileSelectState {
    pub profiles: Vec<String>,
    pub selected: usize,
    pub phase: FormPhase,
}

impl ProfileSelectState {
    fn new(profiles: Vec<String>) -> Self {
        Self {
            profiles,
            selected: 0,
            phase: FormPhase::default(),
        }
    }

    fn on_event(&mut self, event: Event) {
        match event.action {
            Action::ChangeProfile => self.phase = FormPhase::Success,
            other => warn!(action = %other, "ProfileSelect: unexpected action"),
        }
    }
}

#[derive(Default)]
pub(crate) struct AccessKeysState {
    pub key_id: String,
    pub secret: String,
    pub focus: AccessKeysField,
    pub phase: FormPhase,
}

impl AccessKeysState {
    fn on_event(&mut self, event: Event) {
        match event.action {
            Action::SetAccessKeys => {
                self.phase = FormPhase::Success;
                self.secret.clear();
            }
            other => warn!(action = %other, "AccessKeys: unexpected action"),
        }
    }
}

pub(crate) struct AuthModalState {
    pub tab: AuthTab,
    pub profile_select: ProfileSelectState,
    pub access_keys: AccessKeysState,
}

/// Root TUI state: the subscribed component states plus modal bookkeeping.
/// Owned exclusively by the run loop, which serializes event delivery, input
/// handling, and rendering by construction.
pub(crate) struct TuiApp {
    gateway: Arc<TriggerGateway>,
    pub should_quit: bool,
    pub active_modal: Option<ActiveModal>,
    pub header: HeaderState,
    pub error_modal: ErrorModalState,
    pub sso_modal: SsoModalState,
    pub auth_modal: AuthModalState,
}

impl TuiApp {
    pub(crate) fn new(gateway: Arc<TriggerGateway>, profiles: Vec<String>) -> Self {
        Self {
            gateway,
            should_quit: false,
            active_modal: None,
            header: HeaderState::default(),
            error_modal: ErrorModalState::default(),
            sso_modal: SsoModalState::new(profiles.clone()),
            auth_modal: AuthModalState {
                tab: AuthTab::default(),
                profile_select: ProfileSelectState::new(profiles),
                access_keys: AccessKeysState::default(),
            },
        }
    }

    /// The drain/dispatch loop. Each cycle: poll pending replies, swap out
    /// the coalesced batch, deliver it, redraw, then park on the input
    /// channel for at most `DRAIN_INTERVAL`.
    pub(crate) async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        input: &mut InputListener,
    ) -> anyhow::Result<()> {
        info!("TUI run loop started");
        self.raise(ComponentId::Header, Action::GetAuthData, Payload::None)
            .await;

        loop {
            self.gateway.drain().await;
            if let Some(batch) = self.gateway.take().await {
                if self.dispatch_batch(batch) {
                    info!("Terminal event observed; leaving run loop");
                    break;
                }
            }
            if self.should_quit {
                break;
            }

            terminal.draw(|frame| ui::draw(frame, self))?;

            match tokio::time::timeout(DRAIN_INTERVAL, input.next()).await {
                Ok(Some(key_event)) => self.handle_key(key_event).await,
                Ok(None) => {
                    warn!("Input channel closed; shutting down");
                    self.request_quit().await;
                }
                Err(_) => {}
            }
        }
        Ok(())
    }

    /// Delivers one coalesced batch. Quit takes precedence: when the terminal
    /// destination is present, nothing else from the batch is delivered.
    pub(crate) fn dispatch_batch(&mut self, batch: HashMap<ComponentId, Event>) -> bool {
        if batch.contains_key(&ComponentId::Quit) {
            return true;
        }
        for (destination, event) in batch {
            debug!(%destination, action = %event.action, "Delivering event");
            self.deliver(destination, event);
        }
        false
    }

    /// The subscription table: one arm per component with state to mutate.
    fn deliver(&mut self, destination: ComponentId, event: Event) {
        match destination {
            ComponentId::Tui => self.on_tui_event(event),
            ComponentId::Header => self.header.on_event(event),
            ComponentId::ErrorModal => self.error_modal.on_event(event),
            ComponentId::SsoModal => self.sso_modal.on_event(event),
            ComponentId::ProfileSelect => self.auth_modal.profile_select.on_event(event),
            ComponentId::AccessKeys => self.auth_modal.access_keys.on_event(event),
            ComponentId::AuthModal | ComponentId::HelpModal | ComponentId::Quit => {
                warn!(%destination, action = %event.action, "Event for unsubscribed component dropped");
            }
        }
    }

    /// Show/close-modal signals addressed to the root component.
    fn on_tui_event(&mut self, event: Event) {
        match event.action {
            Action::ShowErrorModal => self.active_modal = Some(ActiveModal::Error),
            Action::ShowReauthModal => {
                self.sso_modal.phase = FormPhase::Input;
                self.active_modal = Some(ActiveModal::Sso);
            }
            Action::CloseErrorModal => self.close_if(ActiveModal::Error),
            Action::CloseReauthModal => self.close_if(ActiveModal::Sso),
            Action::CloseAuthModal => self.close_if(ActiveModal::Auth),
            other => warn!(action = %other, "Tui: unexpected action"),
        }
    }

    fn close_if(&mut self, modal: ActiveModal) {
        if self.active_modal == Some(modal) {
            self.active_modal = None;
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL {
            match key.code {
                KeyCode::Char('c') => {
                    self.request_quit().await;
                    return;
                }
                KeyCode::Char('a') => {
                    self.toggle_modal(ActiveModal::Auth);
                    return;
                }
                KeyCode::Char('s') => {
                    self.toggle_modal(ActiveModal::Sso);
                    return;
                }
                KeyCode::Char('h') => {
                    self.toggle_modal(ActiveModal::Help);
                    return;
                }
                _ => {}
            }
        }

        match self.active_modal {
            Some(ActiveModal::Auth) => self.handle_auth_modal_key(key).await,
            Some(ActiveModal::Sso) => self.handle_sso_modal_key(key).await,
            Some(ActiveModal::Error) => self.handle_error_modal_key(key).await,
            Some(ActiveModal::Help) => {
                if key.code == KeyCode::Esc {
                    self.active_modal = None;
                }
            }
            None => {}
        }
    }

    async fn handle_auth_modal_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.active_modal = None;
            return;
        }
        if key.code == KeyCode::Tab {
            self.auth_modal.tab = match self.auth_modal.tab {
                AuthTab::ChangeProfile => AuthTab::SetAccessKeys,
                AuthTab::SetAccessKeys => AuthTab::ChangeProfile,
            };
            return;
        }
        match self.auth_modal.tab {
            AuthTab::ChangeProfile => self.handle_profile_select_key(key).await,
            AuthTab::SetAccessKeys => self.handle_access_keys_key(key).await,
        }
    }

    async fn handle_profile_select_key(&mut self, key: KeyEvent) {
        let view = &mut self.auth_modal.profile_select;
        match (view.phase, key.code) {
            (FormPhase::Input, KeyCode::Up) => {
                view.selected = view.selected.saturating_sub(1);
            }
            (FormPhase::Input, KeyCode::Down) => {
                if view.selected + 1 < view.profiles.len() {
                    view.selected += 1;
                }
            }
            (FormPhase::Input, KeyCode::Enter) => {
                if let Some(profile) = view.profiles.get(view.selected).cloned() {
                    view.phase = FormPhase::Working;
                    self.raise(
                        ComponentId::ProfileSelect,
                        Action::ChangeProfile,
                        Payload::Profile(profile),
                    )
                    .await;
                }
            }
            (FormPhase::Success, KeyCode::Enter) => {
                view.phase = FormPhase::Input;
                self.gateway
                    .relay(Event::new(
                        ComponentId::Tui,
                        Action::CloseAuthModal,
                        Payload::None,
                    ))
                    .await;
            }
            _ => {}
        }
    }

    async fn handle_access_keys_key(&mut self, key: KeyEvent) {
        let view = &mut self.auth_modal.access_keys;
        if view.phase == FormPhase::Success {
            if key.code == KeyCode::Enter {
                view.phase = FormPhase::Input;
                view.key_id.clear();
                self.gateway
                    .relay(Event::new(
                        ComponentId::Tui,
                        Action::CloseAuthModal,
                        Payload::None,
                    ))
                    .await;
            }
            return;
        }
        if view.phase != FormPhase::Input {
            return;
        }
        match key.code {
            KeyCode::Up => {
                view.focus = match view.focus {
                    AccessKeysField::KeyId | AccessKeysField::Secret => AccessKeysField::KeyId,
                    AccessKeysField::Submit => AccessKeysField::Secret,
                };
            }
            KeyCode::Down => {
                view.focus = match view.focus {
                    AccessKeysField::KeyId => AccessKeysField::Secret,
                    AccessKeysField::Secret | AccessKeysField::Submit => AccessKeysField::Submit,
                };
            }
            KeyCode::Char(c) => match view.focus {
                AccessKeysField::KeyId => view.key_id.push(c),
                AccessKeysField::Secret => view.secret.push(c),
                AccessKeysField::Submit => {}
            },
            KeyCode::Backspace => match view.focus {
                AccessKeysField::KeyId => {
                    view.key_id.pop();
                }
                AccessKeysField::Secret => {
                    view.secret.pop();
                }
                AccessKeysField::Submit => {}
            },
            KeyCode::Enter => match view.focus {
                AccessKeysField::KeyId => view.focus = AccessKeysField::Secret,
                AccessKeysField::Secret => view.focus = AccessKeysField::Submit,
                AccessKeysField::Submit => {
                    if !view.key_id.is_empty() && !view.secret.is_empty() {
                        view.phase = FormPhase::Working;
                        let keys = AccessKeysData {
                            access_key_id: view.key_id.clone(),
                            secret_access_key: std::mem::take(&mut view.secret),
                        };
                        self.raise(
                            ComponentId::AccessKeys,
                            Action::SetAccessKeys,
                            Payload::AccessKeys(keys),
                        )
                        .await;
                    }
                }
            },
            _ => {}
        }
    }

    async fn handle_sso_modal_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.active_modal = None;
            return;
        }
        let modal = &mut self.sso_modal;
        match (modal.phase, key.code) {
            (FormPhase::Input, KeyCode::Up) => {
                modal.selected = modal.selected.saturating_sub(1);
            }
            (FormPhase::Input, KeyCode::Down) => {
                if modal.selected + 1 < modal.profiles.len() {
                    modal.selected += 1;
                }
            }
            (FormPhase::Input, KeyCode::Enter) => {
                if let Some(profile) = modal.profiles.get(modal.selected).cloned() {
                    modal.phase = FormPhase::Working;
                    self.raise(
                        ComponentId::SsoModal,
                        Action::ReauthenticateSso,
                        Payload::Profile(profile),
                    )
                    .await;
                }
            }
            (FormPhase::Success, KeyCode::Enter) => {
                modal.phase = FormPhase::Input;
                self.gateway
                    .relay(Event::new(
                        ComponentId::Tui,
                        Action::CloseReauthModal,
                        Payload::None,
                    ))
                    .await;
            }
            _ => {}
        }
    }

    async fn handle_error_modal_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            self.gateway
                .relay(Event::new(
                    ComponentId::Tui,
                    Action::CloseErrorModal,
                    Payload::None,
                ))
                .await;
        }
    }

    fn toggle_modal(&mut self, modal: ActiveModal) {
        if self.active_modal == Some(modal) {
            self.active_modal = None;
        } else {
            self.active_modal = Some(modal);
        }
    }

    /// Quit sequence: raise the quit trigger first so the worker can reply
    /// the terminal event, then close the gateway against new triggers.
    async fn request_quit(&mut self) {
        self.raise(ComponentId::Quit, Action::End, Payload::None)
            .await;
        self.gateway.close();
    }

    /// A failed raise after shutdown, or with a gone worker, is logged and
    /// otherwise ignored; the UI stays responsive in both cases.
    async fn raise(&mut self, destination: ComponentId, action: Action, payload: Payload) {
        if let Err(e) = self.gateway.raise(destination, action, payload).await {
            warn!(%destination, %action, error = %e, "Trigger rejected");
            if matches!(e, crate::core::error::GatewayError::Disconnected) {
                self.should_quit = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::gateway::TriggerGateway;

    fn app() -> (TuiApp, tokio::sync::mpsc::Receiver<crate::bus::event::Trigger>) {
        let (gateway, rx) = TriggerGateway::channel();
        (
            TuiApp::new(
                Arc::new(gateway),
                vec!["default".to_string(), "dev".to_string()],
            ),
            rx,
        )
    }

    fn batch(events: Vec<Event>) -> HashMap<ComponentId, Event> {
        events.into_iter().map(|e| (e.destination, e)).collect()
    }

    #[tokio::test]
    async fn quit_in_batch_stops_dispatch_without_delivery() {
        let (mut app, _rx) = app();
        let stop = app.dispatch_batch(batch(vec![
            Event::quit(),
            Event::new(ComponentId::Tui, Action::ShowErrorModal, Payload::None),
        ]));
        assert!(stop);
        // Nothing else from the batch was delivered.
        assert_eq!(app.active_modal, None);
    }

    #[tokio::test]
    async fn header_event_updates_header_data() {
        let (mut app, _rx) = app();
        let data = AwsSessionData {
            profile: "dev".to_string(),
            region: "eu-central-1".to_string(),
            ..Default::default()
        };
        let stop = app.dispatch_batch(batch(vec![Event::new(
            ComponentId::Header,
            Action::GetAuthData,
            Payload::AuthData(data.clone()),
        )]));
        assert!(!stop);
        assert_eq!(app.header.data, data);
    }

    #[tokio::test]
    async fn error_pair_opens_modal_and_sets_message() {
        let (mut app, _rx) = app();
        app.dispatch_batch(batch(vec![
            Event::new(ComponentId::Tui, Action::ShowErrorModal, Payload::None),
            Event::new(
                ComponentId::ErrorModal,
                Action::ShowErrorMessage,
                Payload::ErrorMessage("boom".to_string()),
            ),
        ]));
        assert_eq!(app.active_modal, Some(ActiveModal::Error));
        assert_eq!(app.error_modal.message, "boom");
    }

    #[tokio::test]
    async fn reauth_pair_forces_sso_modal_open() {
        let (mut app, _rx) = app();
        app.dispatch_batch(batch(vec![
            Event::new(ComponentId::Tui, Action::ShowReauthModal, Payload::None),
            Event::new(
                ComponentId::SsoModal,
                Action::MustReauthenticateSso,
                Payload::None,
            ),
        ]));
        assert_eq!(app.active_modal, Some(ActiveModal::Sso));
        assert!(app.sso_modal.must_reauth);
        assert_eq!(app.sso_modal.prompt, SSO_PROMPT_EXPIRED);
    }

    #[tokio::test]
    async fn finish_reauth_resets_prompt_and_shows_success() {
        let (mut app, _rx) = app();
        app.sso_modal.must_reauth = true;
        app.sso_modal.prompt = SSO_PROMPT_EXPIRED.to_string();
        app.dispatch_batch(batch(vec![Event::new(
            ComponentId::SsoModal,
            Action::FinishReauthenticateSso,
            Payload::None,
        )]));
        assert!(!app.sso_modal.must_reauth);
        assert_eq!(app.sso_modal.prompt, SSO_PROMPT_DEFAULT);
        assert_eq!(app.sso_modal.phase, FormPhase::Success);
    }

    #[tokio::test]
    async fn unexpected_payload_is_contained() {
        let (mut app, _rx) = app();
        let before = app.header.data.clone();
        app.dispatch_batch(batch(vec![Event::new(
            ComponentId::Header,
            Action::GetAuthData,
            Payload::ErrorMessage("not auth data".to_string()),
        )]));
        assert_eq!(app.header.data, before);
    }

    #[tokio::test]
    async fn close_events_only_close_the_matching_modal() {
        let (mut app, _rx) = app();
        app.active_modal = Some(ActiveModal::Sso);
        app.dispatch_batch(batch(vec![Event::new(
            ComponentId::Tui,
            Action::CloseErrorModal,
            Payload::None,
        )]));
        assert_eq!(app.active_modal, Some(ActiveModal::Sso));

        app.dispatch_batch(batch(vec![Event::new(
            ComponentId::Tui,
            Action::CloseReauthModal,
            Payload::None,
        )]));
        assert_eq!(app.active_modal, None);
    }

    #[tokio::test]
    async fn profile_selection_raises_change_profile() {
        let (mut app, mut rx) = app();
        app.active_modal = Some(ActiveModal::Auth);
        app.handle_key(KeyEvent::from(KeyCode::Down)).await;
        app.handle_key(KeyEvent::from(KeyCode::Enter)).await;

        assert_eq!(app.auth_modal.profile_select.phase, FormPhase::Working);
        let trigger = rx.recv().await.unwrap();
        assert_eq!(trigger.event.destination, ComponentId::ProfileSelect);
        assert_eq!(trigger.event.action, Action::ChangeProfile);
        assert_eq!(trigger.event.payload, Payload::Profile("dev".to_string()));
    }

    #[tokio::test]
    async fn access_keys_submit_raises_trigger_and_clears_secret() {
        let (mut app, mut rx) = app();
        app.active_modal = Some(ActiveModal::Auth);
        app.auth_modal.tab = AuthTab::SetAccessKeys;

        for c in "AKIA1".chars() {
            app.handle_key(KeyEvent::from(KeyCode::Char(c))).await;
        }
        app.handle_key(KeyEvent::from(KeyCode::Enter)).await;
        for c in "s3cret".chars() {
            app.handle_key(KeyEvent::from(KeyCode::Char(c))).await;
        }
        app.handle_key(KeyEvent::from(KeyCode::Enter)).await;
        app.handle_key(KeyEvent::from(KeyCode::Enter)).await;

        assert_eq!(app.auth_modal.access_keys.phase, FormPhase::Working);
        assert!(app.auth_modal.access_keys.secret.is_empty());
        let trigger = rx.recv().await.unwrap();
        assert_eq!(trigger.event.destination, ComponentId::AccessKeys);
        match trigger.event.payload {
            Payload::AccessKeys(keys) => {
                assert_eq!(keys.access_key_id, "AKIA1");
                assert_eq!(keys.secret_access_key, "s3cret");
            }
            other => panic!("expected AccessKeys payload, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_modal_ok_relays_close_event() {
        let (mut app, _rx) = app();
        app.active_modal = Some(ActiveModal::Error);
        app.handle_key(KeyEvent::from(KeyCode::Enter)).await;

        // The close travels through the mailbox, not directly.
        assert_eq!(app.active_modal, Some(ActiveModal::Error));
        let gateway = Arc::clone(&app.gateway);
        let batch = gateway.take().await.expect("relay reached the mailbox");
        let stop = app.dispatch_batch(batch);
        assert!(!stop);
        assert_eq!(app.active_modal, None);
    }

    #[tokio::test]
    async fn ctrl_c_raises_quit_and_closes_gateway() {
        let (mut app, mut rx) = app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
            .await;

        let trigger = rx.recv().await.unwrap();
        assert_eq!(trigger.event.destination, ComponentId::Quit);
        assert_eq!(trigger.event.action, Action::End);

        // Gateway is closed: nothing further is accepted.
        let result = app
            .gateway
            .raise(ComponentId::Header, Action::GetAuthData, Payload::None)
            .await;
        assert!(matches!(
            result,
            Err(crate::core::error::GatewayError::Closed)
        ));
    }
}
