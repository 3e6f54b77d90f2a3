use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};
use common::models::Signal;
use gateway::remote::ChannelEvent;

/// On-screen alert lifetime before auto-dismiss.
pub const ALERT_TTL: Duration = Duration::from_secs(10);

/// Session-scoped signal log, newest first. Unbounded on purpose: it lives
/// only as long as the session.
#[derive(Debug, Default)]
pub struct SignalHistory {
    items: Vec<Signal>,
}

impl SignalHistory {
    pub fn push(&mut self, signal: Signal) {
        self.items.insert(0, signal);
    }

    pub fn items(&self) -> &[Signal] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Consumes signal events from the live channel: logs them into history,
/// raises a transient alert and pushes a notification cue.
pub struct SignalFeedService {
    id: Uuid,
    event_rx: broadcast::Receiver<Arc<ChannelEvent>>,
    notify_tx: broadcast::Sender<String>,
    history: SignalHistory,
    active_alert: Option<(Signal, Instant)>,
}

#[async_trait]
impl Actor for SignalFeedService {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::SignalFeedActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let heartbeat_handle = self.spawn_heartbeat(supervisor_tx.clone());

        info!("Starting signal feed service");

        loop {
            let dismiss_at = self.active_alert.as_ref().map(|(_, at)| *at);

            tokio::select! {
                result = self.event_rx.recv() => {
                    match result {
                        Ok(event) => {
                            if let ChannelEvent::Signal(signal) = &*event {
                                self.on_signal(signal.clone());
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Signal feed lagged: missed {} events", n);
                        }
                        Err(_) => {
                            heartbeat_handle.abort();
                            supervisor_tx
                                .send(ControlMessage::Error(
                                    self.id,
                                    "Signal feed channel closed unexpectedly.".to_string(),
                                ))
                                .await?;
                            anyhow::bail!("Signal feed channel closed unexpectedly.");
                        }
                    }
                }

                _ = alert_expiry(dismiss_at) => {
                    if let Some((signal, _)) = self.active_alert.take() {
                        debug!("Alert for {} dismissed", signal.asset);
                    }
                }
            }
        }
    }
}

async fn alert_expiry(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl SignalFeedService {
    pub fn new(
        event_rx: broadcast::Receiver<Arc<ChannelEvent>>,
        notify_tx: broadcast::Sender<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_rx,
            notify_tx,
            history: SignalHistory::default(),
            active_alert: None,
        }
    }

    fn on_signal(&mut self, signal: Signal) {
        info!(
            "Signal received: {} {} ({:.0}%)",
            signal.asset, signal.direction, signal.confidence
        );

        let _ = self.notify_tx.send(format!(
            "{} {} • Confidence {:.0}% • Entry {}",
            signal.asset, signal.direction, signal.confidence, signal.entry_time
        ));

        self.active_alert = Some((signal.clone(), Instant::now() + ALERT_TTL));
        self.history.push(signal);
    }

    pub fn history(&self) -> &SignalHistory {
        &self.history
    }

    pub fn active_alert(&self) -> Option<&Signal> {
        self.active_alert.as_ref().map(|(signal, _)| signal)
    }
}
