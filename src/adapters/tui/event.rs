use crossterm::event::{Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Terminal key events, pumped from crossterm's blocking poll/read API into
/// an async channel the dispatch loop can await with a timeout.
pub(crate) struct InputListener {
    key_tx: mpsc::Sender<KeyEvent>,
    key_rx: mpsc::Receiver<KeyEvent>,
    shutdown_token: CancellationToken,
}

impl InputListener {
    pub(crate) fn new() -> Self {
        let (key_tx, key_rx) = mpsc::channel(128);
        Self {
            key_tx,
            key_rx,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub(crate) fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    /// Spawns the blocking crossterm reader task. Resize and mouse events are
    /// ignored; the run loop redraws every cycle anyway.
    pub(crate) fn start(&self) {
        let tx = self.key_tx.clone();
        let shutdown_token = self.shutdown_token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_token.cancelled() => {
                        debug!("Input listener task cancelled");
                        break;
                    }
                    result = tokio::task::spawn_blocking(|| {
                        if crossterm::event::poll(Duration::from_millis(100)).unwrap_or(false) {
                            crossterm::event::read().map(Some)
                        } else {
                            Ok(None)
                        }
                    }) => {
                        match result {
                            Ok(Ok(Some(CrosstermEvent::Key(key_event)))) => {
                                if key_event.kind != KeyEventKind::Press {
                                    continue;
                                }
                                if tx.send(key_event).await.is_err() {
                                    debug!("Key channel closed; stopping input listener");
                                    break;
                                }
                            }
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => {
                                error!("Error reading terminal event: {e}. Stopping input listener.");
                                break;
                            }
                            Err(e) => {
                                error!("spawn_blocking failed: {e}. Stopping input listener.");
                                break;
                            }
                        }
                    }
                }
            }
        });
    }

    pub(crate) async fn next(&mut self) -> Option<KeyEvent> {
        self.key_rx.recv().await
    }
}
