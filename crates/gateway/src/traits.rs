use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use common::models::Candle;

/// Source of recent OHLC bars for the chart.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BarSource: Send + Sync {
    async fn minute_bars(&self, fsym: &str, tsym: &str, limit: u32)
    -> anyhow::Result<Vec<Candle>>;
}
