use crate::bus::event::{Action, ComponentId, Event, Payload, Responder, Trigger};
use crate::core::error::GatewayError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error};

/// Capacity of the bounded trigger queue feeding the backend worker. Once
/// full, `raise` blocks its caller until the worker drains a request; this is
/// the only backpressure mechanism between the UI and the backend.
pub(crate) const REQUEST_QUEUE_CAPACITY: usize = 100;

#[derive(Default)]
struct Mailbox {
    events: HashMap<ComponentId, Event>,
    dirty: bool,
}

impl Mailbox {
    fn route(&mut self, event: Event) {
        // Latest-write-wins per destination: an undelivered event for the
        // same component is overwritten. Bounded by construction, at the cost
        // of intermediate events when producers outpace the dispatch cadence.
        if let Some(previous) = self.events.insert(event.destination, event) {
            debug!(
                destination = %previous.destination,
                action = %previous.action,
                "Mailbox: overwrote undelivered event"
            );
        }
        self.dirty = true;
    }
}

/// Client-side facade of the coordination layer. The only object UI code may
/// use to reach the backend (`raise`) or other UI components (`relay`).
///
/// Shared between UI callbacks and the drain/dispatch cycle; the pending FIFO
/// and the mailbox are each behind a mutex held only for queue/map mutation,
/// never across external work.
pub(crate) struct TriggerGateway {
    request_tx: mpsc::Sender<Trigger>,
    accepting: AtomicBool,
    pending: Mutex<VecDeque<Responder>>,
    mailbox: Mutex<Mailbox>,
}

impl TriggerGateway {
    /// Creates the gateway plus the receiving end of the trigger queue that
    /// the backend worker consumes.
    pub(crate) fn channel() -> (Self, mpsc::Receiver<Trigger>) {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        (
            Self {
                request_tx,
                accepting: AtomicBool::new(true),
                pending: Mutex::new(VecDeque::new()),
                mailbox: Mutex::new(Mailbox::default()),
            },
            request_rx,
        )
    }

    /// Sends a new trigger to the backend and registers its pending reply.
    ///
    /// Blocks only while the bounded request queue is full. Returns as soon
    /// as the trigger is queued; the reply is collected later by `drain`.
    pub(crate) async fn raise(
        &self,
        destination: ComponentId,
        action: Action,
        payload: Payload,
    ) -> Result<(), GatewayError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(GatewayError::Closed);
        }
        let (trigger, responder) = Trigger::new(Event::new(destination, action, payload));
        debug!(%destination, %action, "Raising trigger");
        self.request_tx
            .send(trigger)
            .await
            .map_err(|_| GatewayError::Disconnected)?;
        self.pending.lock().await.push_back(responder);
        Ok(())
    }

    /// Passes an event from one UI component to another without involving the
    /// backend. Subject to the same latest-write-wins mailbox policy.
    pub(crate) async fn relay(&self, event: Event) {
        debug!(destination = %event.destination, action = %event.action, "Relaying event");
        self.mailbox.lock().await.route(event);
    }

    /// One non-blocking pass over the pending replies, in FIFO order.
    ///
    /// Replies that have arrived are merged into the mailbox and their
    /// responders retired; the rest are kept for the next cycle. Never blocks
    /// and never fails: this is a poll, not a wait.
    pub(crate) async fn drain(&self) {
        let mut ready: Vec<Event> = Vec::new();
        {
            let mut pending = self.pending.lock().await;
            let mut remaining = VecDeque::with_capacity(pending.len());
            for mut responder in pending.drain(..) {
                match responder.try_recv() {
                    Ok(events) => ready.extend(events),
                    Err(oneshot::error::TryRecvError::Empty) => remaining.push_back(responder),
                    Err(oneshot::error::TryRecvError::Closed) => {
                        // A trigger was accepted but its slot dropped without a
                        // reply. The single-reply contract makes this a defect
                        // in a backend handler, not a runtime condition.
                        error!("Pending responder closed without a reply; discarding");
                    }
                }
            }
            *pending = remaining;
        }
        if !ready.is_empty() {
            let mut mailbox = self.mailbox.lock().await;
            for event in ready {
                debug!(destination = %event.destination, action = %event.action, "Received reply event");
                mailbox.route(event);
            }
        }
    }

    /// Atomically swaps out the coalesced batch, or `None` when nothing is
    /// pending. The only point where mailbox contents are exposed; a second
    /// call without an intervening write always returns `None`.
    pub(crate) async fn take(&self) -> Option<HashMap<ComponentId, Event>> {
        let mut mailbox = self.mailbox.lock().await;
        if !mailbox.dirty {
            return None;
        }
        mailbox.dirty = false;
        Some(std::mem::take(&mut mailbox.events))
    }

    /// First phase of shutdown: stop accepting new triggers. Triggers already
    /// queued still run to completion; the quit trigger must be raised before
    /// closing so the worker can reply the terminal event.
    pub(crate) fn close(&self) {
        self.accepting.store(false, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::event::{Action, ComponentId, Event, Payload};
    use crate::core::types::AwsSessionData;

    fn relay_event(action: Action, message: &str) -> Event {
        Event::new(
            ComponentId::ErrorModal,
            action,
            Payload::ErrorMessage(message.to_string()),
        )
    }

    #[tokio::test]
    async fn take_without_writes_returns_none() {
        let (gateway, _rx) = TriggerGateway::channel();
        assert!(gateway.take().await.is_none());
    }

    #[tokio::test]
    async fn relay_coalesces_latest_write_per_destination() {
        let (gateway, _rx) = TriggerGateway::channel();
        gateway
            .relay(relay_event(Action::ShowErrorMessage, "A"))
            .await;
        gateway
            .relay(relay_event(Action::ShowErrorMessage, "B"))
            .await;

        let batch = gateway.take().await.expect("mailbox was dirty");
        assert_eq!(batch.len(), 1);
        let event = &batch[&ComponentId::ErrorModal];
        assert_eq!(event.payload, Payload::ErrorMessage("B".to_string()));

        // No double delivery.
        assert!(gateway.take().await.is_none());
    }

    #[tokio::test]
    async fn relays_to_distinct_destinations_do_not_collide() {
        let (gateway, _rx) = TriggerGateway::channel();
        gateway
            .relay(Event::new(
                ComponentId::Tui,
                Action::ShowReauthModal,
                Payload::None,
            ))
            .await;
        gateway
            .relay(Event::new(
                ComponentId::SsoModal,
                Action::MustReauthenticateSso,
                Payload::None,
            ))
            .await;

        let batch = gateway.take().await.expect("mailbox was dirty");
        assert_eq!(batch.len(), 2);
        assert!(batch.contains_key(&ComponentId::Tui));
        assert!(batch.contains_key(&ComponentId::SsoModal));
    }

    #[tokio::test]
    async fn drain_keeps_unreplied_responders() {
        let (gateway, mut rx) = TriggerGateway::channel();
        gateway
            .raise(ComponentId::Header, Action::GetAuthData, Payload::None)
            .await
            .unwrap();
        assert_eq!(gateway.pending_len().await, 1);

        // No reply written yet: drain returns immediately, keeps the slot.
        gateway.drain().await;
        assert_eq!(gateway.pending_len().await, 1);
        assert!(gateway.take().await.is_none());

        let trigger = rx.recv().await.unwrap();
        trigger.respond(vec![Event::new(
            ComponentId::Header,
            Action::GetAuthData,
            Payload::AuthData(AwsSessionData::default()),
        )]);

        gateway.drain().await;
        assert_eq!(gateway.pending_len().await, 0);
        let batch = gateway.take().await.expect("reply was merged");
        assert_eq!(batch[&ComponentId::Header].action, Action::GetAuthData);
        assert!(gateway.take().await.is_none());
    }

    #[tokio::test]
    async fn multi_event_reply_lands_in_one_batch() {
        let (gateway, mut rx) = TriggerGateway::channel();
        gateway
            .raise(ComponentId::Header, Action::GetAuthData, Payload::None)
            .await
            .unwrap();

        // Session-expired style reply: two events, two destinations.
        let trigger = rx.recv().await.unwrap();
        trigger.respond(vec![
            Event::new(ComponentId::Tui, Action::ShowReauthModal, Payload::None),
            Event::new(
                ComponentId::SsoModal,
                Action::MustReauthenticateSso,
                Payload::None,
            ),
        ]);

        gateway.drain().await;
        let batch = gateway.take().await.expect("both events merged");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[&ComponentId::Tui].action, Action::ShowReauthModal);
        assert_eq!(
            batch[&ComponentId::SsoModal].action,
            Action::MustReauthenticateSso
        );
    }

    #[tokio::test]
    async fn replies_drain_in_fifo_order_with_overwrite() {
        let (gateway, mut rx) = TriggerGateway::channel();
        for _ in 0..2 {
            gateway
                .raise(ComponentId::Header, Action::GetAuthData, Payload::None)
                .await
                .unwrap();
        }
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let data = |profile: &str| {
            Payload::AuthData(AwsSessionData {
                profile: profile.to_string(),
                ..Default::default()
            })
        };
        first.respond(vec![Event::new(
            ComponentId::Header,
            Action::GetAuthData,
            data("old"),
        )]);
        second.respond(vec![Event::new(
            ComponentId::Header,
            Action::GetAuthData,
            data("new"),
        )]);

        gateway.drain().await;
        let batch = gateway.take().await.unwrap();
        // Same destination: the later reply wins.
        assert_eq!(batch[&ComponentId::Header].payload, data("new"));
    }

    #[tokio::test]
    async fn raise_after_close_is_rejected() {
        let (gateway, mut rx) = TriggerGateway::channel();
        gateway.close();
        let result = gateway
            .raise(ComponentId::Quit, Action::End, Payload::None)
            .await;
        assert!(matches!(result, Err(GatewayError::Closed)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn raise_without_worker_reports_disconnect() {
        let (gateway, rx) = TriggerGateway::channel();
        drop(rx);
        let result = gateway
            .raise(ComponentId::Header, Action::GetAuthData, Payload::None)
            .await;
        assert!(matches!(result, Err(GatewayError::Disconnected)));
    }

    #[tokio::test]
    async fn dropped_reply_slot_is_discarded() {
        let (gateway, mut rx) = TriggerGateway::channel();
        gateway
            .raise(ComponentId::Header, Action::GetAuthData, Payload::None)
            .await
            .unwrap();
        // Simulate a defective handler dropping the slot without replying.
        drop(rx.recv().await.unwrap());
        gateway.drain().await;
        assert_eq!(gateway.pending_len().await, 0);
        assert!(gateway.take().await.is_none());
    }
}
