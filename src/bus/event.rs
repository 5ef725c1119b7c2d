use crate::core::types::{AccessKeysData, AwsSessionData};
use tokio::sync::oneshot;

/// Stable identifier of a UI component or the backend-facing views it owns.
///
/// Used as mailbox key and dispatch selector. `Quit` is the distinguished
/// terminal destination: its presence in a dispatched batch stops the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ComponentId {
    Tui,
    Header,
    ErrorModal,
    AuthModal,
    ProfileSelect,
    AccessKeys,
    SsoModal,
    HelpModal,
    Quit,
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComponentId::Tui => "Tui",
            ComponentId::Header => "Header",
            ComponentId::ErrorModal => "ErrorModal",
            ComponentId::AuthModal => "AuthModal",
            ComponentId::ProfileSelect => "ProfileSelectView",
            ComponentId::AccessKeys => "SetAccessKeysView",
            ComponentId::SsoModal => "SsoReauthModal",
            ComponentId::HelpModal => "HelpModal",
            ComponentId::Quit => "Quit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Action {
    GetAuthData,
    ChangeProfile,
    SetAccessKeys,
    ReauthenticateSso,
    MustReauthenticateSso,
    FinishReauthenticateSso,
    ShowErrorModal,
    ShowErrorMessage,
    ShowReauthModal,
    CloseErrorModal,
    CloseReauthModal,
    CloseAuthModal,
    End,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::GetAuthData => "getAuthData",
            Action::ChangeProfile => "changeProfile",
            Action::SetAccessKeys => "setAccessKeys",
            Action::ReauthenticateSso => "reauthenticateSso",
            Action::MustReauthenticateSso => "mustReauthenticateSso",
            Action::FinishReauthenticateSso => "finishReauthenticateSso",
            Action::ShowErrorModal => "showErrorModal",
            Action::ShowErrorMessage => "showErrorMessage",
            Action::ShowReauthModal => "showReauthModal",
            Action::CloseErrorModal => "closeErrorModal",
            Action::CloseReauthModal => "closeReauthModal",
            Action::CloseAuthModal => "closeAuthModal",
            Action::End => "end",
        };
        f.write_str(name)
    }
}

/// Event payload, tagged by the action that carries it.
///
/// Receivers match exhaustively; a variant that does not fit the action is
/// handled by an explicit unexpected arm (logged, turned into an error event
/// by the worker), never a panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Payload {
    None,
    AuthData(AwsSessionData),
    Profile(String),
    AccessKeys(AccessKeysData),
    ErrorMessage(String),
}

/// An addressed result message. Immutable once constructed, one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Event {
    pub destination: ComponentId,
    pub action: Action,
    pub payload: Payload,
}

impl Event {
    pub(crate) fn new(destination: ComponentId, action: Action, payload: Payload) -> Self {
        Self {
            destination,
            action,
            payload,
        }
    }

    /// The terminal event replied to a quit trigger.
    pub(crate) fn quit() -> Self {
        Self::new(ComponentId::Quit, Action::End, Payload::None)
    }
}

/// Reply slot of an in-flight trigger, polled non-blockingly by the gateway.
pub(crate) type Responder = oneshot::Receiver<Vec<Event>>;

/// A request: the originating event plus a one-shot reply slot.
///
/// Contract: the backend writes the slot exactly once per accepted trigger,
/// with a list of zero or more events. Error replies count; a handler that
/// drops the slot without replying is a programming defect, surfaced by the
/// gateway's drain as a logged error.
#[derive(Debug)]
pub(crate) struct Trigger {
    pub event: Event,
    pub responder: oneshot::Sender<Vec<Event>>,
}

impl Trigger {
    pub(crate) fn new(event: Event) -> (Self, Responder) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                event,
                responder: tx,
            },
            rx,
        )
    }

    /// Writes the reply, consuming the slot. A closed receiver means the
    /// gateway was dropped mid-flight (shutdown); nothing left to do then.
    pub(crate) fn respond(self, events: Vec<Event>) {
        if self.responder.send(events).is_err() {
            tracing::debug!(
                destination = %self.event.destination,
                action = %self.event.action,
                "Reply dropped: trigger gateway is gone"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_names_are_stable() {
        assert_eq!(ComponentId::Header.to_string(), "Header");
        assert_eq!(ComponentId::Quit.to_string(), "Quit");
        assert_eq!(Action::GetAuthData.to_string(), "getAuthData");
        assert_eq!(Action::End.to_string(), "end");
    }

    #[tokio::test]
    async fn trigger_reply_reaches_responder() {
        let (trigger, responder) = Trigger::new(Event::new(
            ComponentId::Header,
            Action::GetAuthData,
            Payload::None,
        ));
        trigger.respond(vec![Event::quit()]);
        let events = responder.await.expect("reply was written");
        assert_eq!(events, vec![Event::quit()]);
    }

    #[test]
    fn respond_tolerates_dropped_receiver() {
        let (trigger, responder) = Trigger::new(Event::quit());
        drop(responder);
        trigger.respond(vec![]);
    }
}
