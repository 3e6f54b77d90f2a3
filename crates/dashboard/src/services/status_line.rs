use std::time::Duration;

use chrono::Local;
use tokio::{sync::watch, time};
use tracing::{info, trace};

use gateway::services::live_channel::ChannelState;

/// Indicator text for the dashboard header.
pub fn status_text(state: ChannelState, clock: &str) -> String {
    match state {
        ChannelState::Open => format!("LIVE: {}", clock),
        ChannelState::Connecting => "CONNECTING...".to_string(),
        ChannelState::ReconnectWait => "RECONNECTING...".to_string(),
        ChannelState::Closed => "OFFLINE".to_string(),
    }
}

/// Folds channel state changes and a one-second clock into the status line.
/// State transitions are logged loudly, clock ticks quietly.
pub async fn run(mut state_rx: watch::Receiver<ChannelState>) {
    let mut clock = time::interval(Duration::from_secs(1));
    let mut last_state = *state_rx.borrow();

    info!("{}", status_text(last_state, &now_hms()));

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = clock.tick() => {}
        }

        let state = *state_rx.borrow();
        let text = status_text(state, &now_hms());

        if state != last_state {
            info!("{}", text);
            last_state = state;
        } else {
            trace!("{}", text);
        }
    }
}

fn now_hms() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_state_shows_the_live_clock() {
        assert_eq!(status_text(ChannelState::Open, "14:05:00"), "LIVE: 14:05:00");
    }

    #[test]
    fn lossy_states_show_reconnect_text() {
        assert_eq!(
            status_text(ChannelState::ReconnectWait, "14:05:00"),
            "RECONNECTING..."
        );
        assert_eq!(
            status_text(ChannelState::Connecting, "14:05:00"),
            "CONNECTING..."
        );
        assert_eq!(status_text(ChannelState::Closed, "14:05:00"), "OFFLINE");
    }
}
