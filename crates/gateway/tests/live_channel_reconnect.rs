//! End-to-end checks for the live channel against a local websocket server:
//! dispatch, loss recovery, frame resilience and shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use common::actors::{Actor, ControlMessage};
use common::models::{Direction, Signal};
use gateway::remote::ChannelEvent;
use gateway::services::live_channel::{ChannelState, LiveChannel, RECONNECT_DELAY};

const SIGNAL_FRAME: &str = r#"{"type":"signal","data":{"asset":"BTC/USDT","direction":"BUY","confidence":91.0,"entry_time":"12:00","expiry":"5m","trend":"UP"}}"#;

#[test]
fn reconnect_delay_is_a_fixed_five_seconds() {
    assert_eq!(RECONNECT_DELAY, Duration::from_secs(5));
}

struct Harness {
    event_rx: broadcast::Receiver<Arc<ChannelEvent>>,
    state_rx: watch::Receiver<ChannelState>,
    shutdown: Arc<AtomicBool>,
}

/// Spawns a channel pointed at `addr` with a short retry delay so tests do
/// not sit through the production 5s interval.
fn start_channel(addr: std::net::SocketAddr) -> Harness {
    let endpoint = Url::parse(&format!("ws://{}/ws/demo_user", addr)).unwrap();
    let (event_tx, event_rx) = broadcast::channel(64);
    let (state_tx, state_rx) = watch::channel(ChannelState::Connecting);
    let shutdown = Arc::new(AtomicBool::new(false));

    // Drain supervisor traffic; these tests assert on the event stream.
    let (sup_tx, mut sup_rx) = mpsc::channel::<ControlMessage>(64);
    tokio::spawn(async move { while sup_rx.recv().await.is_some() {} });

    let mut channel = LiveChannel::new(endpoint, event_tx, state_tx, shutdown.clone())
        .with_retry_delay(Duration::from_millis(50));
    tokio::spawn(async move {
        let _ = channel.run(sup_tx).await;
    });

    Harness {
        event_rx,
        state_rx,
        shutdown,
    }
}

async fn next_signal(rx: &mut broadcast::Receiver<Arc<ChannelEvent>>) -> Signal {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for channel event")
            .expect("event channel closed");
        if let ChannelEvent::Signal(signal) = &*event {
            return signal.clone();
        }
    }
}

#[tokio::test]
async fn survives_disconnect_and_garbage_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // First connection delivers one signal and drops. The second sends
    // garbage and an unknown tag before a valid signal, then stays up.
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(SIGNAL_FRAME.into())).await.unwrap();
        ws.close(None).await.unwrap();

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text("definitely not json".into()))
            .await
            .unwrap();
        ws.send(Message::Text(r#"{"type":"mystery","data":{}}"#.into()))
            .await
            .unwrap();
        ws.send(Message::Text(SIGNAL_FRAME.into())).await.unwrap();

        while let Some(Ok(_)) = ws.next().await {}
    });

    let mut harness = start_channel(addr);

    let first = next_signal(&mut harness.event_rx).await;
    assert_eq!(first.asset, "BTC/USDT");
    assert_eq!(first.direction, Direction::Buy);

    // This one only arrives if the channel reconnected after the drop and
    // shrugged off the malformed and unknown frames in between.
    let second = next_signal(&mut harness.event_rx).await;
    assert_eq!(second.asset, "BTC/USDT");

    assert_eq!(*harness.state_rx.borrow(), ChannelState::Open);
}

#[tokio::test]
async fn shutdown_flag_closes_the_channel_for_good() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(SIGNAL_FRAME.into())).await.unwrap();
        // Give the client a moment to raise its shutdown flag, then drop.
        tokio::time::sleep(Duration::from_millis(100)).await;
        ws.close(None).await.unwrap();
    });

    let mut harness = start_channel(addr);

    next_signal(&mut harness.event_rx).await;
    harness.shutdown.store(true, Ordering::Relaxed);

    let closed = tokio::time::timeout(
        Duration::from_secs(5),
        harness
            .state_rx
            .wait_for(|state| *state == ChannelState::Closed),
    )
    .await;
    assert!(closed.is_ok(), "channel never reached Closed");
}
