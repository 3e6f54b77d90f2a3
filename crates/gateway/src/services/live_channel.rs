use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::{
    sync::{broadcast, mpsc, watch},
    time,
};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::remote::stream_event::{ChannelEvent, decode_frame};
use common::actors::{Actor, ActorType, ControlMessage};

/// Delay between reconnect attempts. Constant on purpose: no backoff growth,
/// no jitter, no attempt cap.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Keep-alive cadence; the backend answers a text "ping" with "pong".
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Connection lifecycle as shown by the status indicator. `Closed` is only
/// reached through the shutdown flag, never during normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    ReconnectWait,
    Closed,
}

/// Owns the single streaming connection for this session. Inbound frames are
/// decoded as a tagged union and fanned out on a broadcast channel; transport
/// loss is absorbed by an unbounded fixed-delay reconnect loop.
pub struct LiveChannel {
    id: Uuid,
    endpoint: Url,
    event_tx: broadcast::Sender<Arc<ChannelEvent>>,
    state_tx: watch::Sender<ChannelState>,
    shutdown: Arc<AtomicBool>,
    retry_delay: Duration,
}

#[async_trait]
impl Actor for LiveChannel {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::ChannelActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let heartbeat_handle = self.spawn_heartbeat(supervisor_tx.clone());

        info!("Connecting to: {}", self.endpoint);

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                self.set_state(ChannelState::Closed);
                heartbeat_handle.abort();
                return Ok(());
            }

            self.set_state(ChannelState::Connecting);

            match tokio_tungstenite::connect_async(self.endpoint.as_str()).await {
                Ok((ws_stream, _)) => {
                    self.set_state(ChannelState::Open);
                    debug!("Live channel open");

                    let (mut write, mut read) = ws_stream.split();
                    let mut ping_timer = time::interval(PING_INTERVAL);
                    ping_timer.tick().await; // the first tick completes immediately

                    loop {
                        tokio::select! {
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(Message::Text(ref text))) => {
                                        if text.as_str() == "pong" {
                                            debug!("Keep-alive acknowledged");
                                            continue;
                                        }
                                        match decode_frame(text) {
                                            Ok(event) => {
                                                let _ = self.event_tx.send(Arc::new(event));
                                            }
                                            Err(e) => {
                                                warn!("Dropping unhandled frame: {}", e);
                                                supervisor_tx
                                                    .send(ControlMessage::Error(
                                                        self.id,
                                                        format!("Unknown socket response: {}", e),
                                                    ))
                                                    .await?;
                                            }
                                        }
                                    }
                                    Some(Ok(Message::Ping(payload))) => {
                                        let _ = write.send(Message::Pong(payload)).await;
                                    }
                                    Some(Ok(Message::Close(_))) => {
                                        debug!("Close frame received");
                                        break;
                                    }
                                    Some(Err(e)) => {
                                        error!("WebSocket error: {}", e);
                                        break;
                                    }
                                    Some(Ok(_)) => {
                                        // Binary and pong frames carry nothing for us.
                                        continue;
                                    }
                                    None => {
                                        debug!("Stream ended");
                                        break;
                                    }
                                }
                            }
                            _ = ping_timer.tick() => {
                                if write.send(Message::Text("ping".into())).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(e) => {
                    error!(
                        "Connection failed: {}. Retrying in {:?}...",
                        e, self.retry_delay
                    );
                    supervisor_tx
                        .send(ControlMessage::Error(
                            self.id,
                            format!("Connection failed: {}", e),
                        ))
                        .await?;
                }
            }

            if self.shutdown.load(Ordering::Relaxed) {
                continue; // the loop head turns this into Closed
            }

            self.set_state(ChannelState::ReconnectWait);
            time::sleep(self.retry_delay).await;
        }
    }
}

impl LiveChannel {
    pub fn new(
        endpoint: Url,
        event_tx: broadcast::Sender<Arc<ChannelEvent>>,
        state_tx: watch::Sender<ChannelState>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint,
            event_tx,
            state_tx,
            shutdown,
            retry_delay: RECONNECT_DELAY,
        }
    }

    /// Test hook; production code keeps the fixed 5s policy.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn set_state(&self, state: ChannelState) {
        let _ = self.state_tx.send(state);
    }
}
