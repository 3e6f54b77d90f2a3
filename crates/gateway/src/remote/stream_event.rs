use anyhow::bail;
use serde::Deserialize;
use serde_json::Value;

use common::models::{Candle, Signal};

/// Typed events carried by the live channel.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    Signal(Signal),
    MarketUpdate(Candle),
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    data: Value, // Delay parsing this until we know what it is!
}

/// Decodes one inbound text frame. Callers treat any error as "drop the
/// frame", never as a reason to tear the connection down.
pub fn decode_frame(text: &str) -> anyhow::Result<ChannelEvent> {
    let raw: RawFrame = serde_json::from_str(text)?;

    match raw.kind.as_str() {
        "signal" => Ok(ChannelEvent::Signal(serde_json::from_value(raw.data)?)),
        "market_update" => Ok(ChannelEvent::MarketUpdate(serde_json::from_value(raw.data)?)),
        other => bail!("unknown frame type: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::Direction;

    #[test]
    fn decodes_signal_frames() {
        let frame = r#"{
            "type": "signal",
            "data": {
                "asset": "BTC/USDT",
                "direction": "SELL",
                "confidence": 91.0,
                "entry_time": "14:05",
                "expiry": "5m",
                "trend": "DOWN"
            },
            "timestamp": "2026-08-23T14:05:00"
        }"#;

        match decode_frame(frame).unwrap() {
            ChannelEvent::Signal(signal) => {
                assert_eq!(signal.asset, "BTC/USDT");
                assert_eq!(signal.direction, Direction::Sell);
                assert_eq!(signal.confidence, 91.0);
            }
            other => panic!("expected signal, got {:?}", other),
        }
    }

    #[test]
    fn decodes_market_update_frames() {
        let frame = r#"{
            "type": "market_update",
            "data": {"time": 1700000000, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5}
        }"#;

        match decode_frame(frame).unwrap() {
            ChannelEvent::MarketUpdate(tick) => {
                assert_eq!(tick.time, 1_700_000_000);
                assert_eq!(tick.close, 1.5);
            }
            other => panic!("expected market update, got {:?}", other),
        }
    }

    #[test]
    fn unknown_tag_is_an_error_not_a_panic() {
        let err = decode_frame(r#"{"type":"mystery","data":{}}"#).unwrap_err();
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn malformed_payloads_are_errors() {
        assert!(decode_frame("not json at all").is_err());
        assert!(decode_frame(r#"{"type":"signal","data":{"asset":42}}"#).is_err());
        assert!(decode_frame(r#"{"data":{}}"#).is_err());
    }
}
