use serde::{Deserialize, Serialize};

/// Trade direction as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directional trade recommendation pushed by the backend. Immutable once
/// received; the client only displays it and logs it in session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub asset: String,
    pub direction: Direction,
    pub confidence: f64,
    #[serde(default)]
    pub entry_time: String,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub trend: String,
}
