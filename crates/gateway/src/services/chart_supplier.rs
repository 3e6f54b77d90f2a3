use chrono::Utc;
use rand::Rng;
use tracing::warn;

use crate::traits::BarSource;
use common::models::Candle;

/// Bars per chart load, matching the provider's `limit` parameter.
pub const SERIES_LEN: usize = 100;
const BAR_SECONDS: i64 = 60;

/// Where a series came from. Synthetic bars exist purely so the chart is
/// never empty; nothing downstream may treat them as market truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesOrigin {
    Provider,
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub symbol: String,
    pub bars: Vec<Candle>,
    pub origin: SeriesOrigin,
}

impl ChartSeries {
    pub fn is_synthetic(&self) -> bool {
        self.origin == SeriesOrigin::Synthetic
    }
}

/// Supplies OHLC history for a requested asset, falling back to a synthetic
/// series on any provider trouble. Never fails.
pub struct ChartSupplier<S> {
    source: S,
}

impl<S: BarSource> ChartSupplier<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub async fn series_for(&self, symbol: &str) -> ChartSeries {
        let fsym = clean_symbol(symbol);

        let (bars, origin) = match self.source.minute_bars(&fsym, "USD", SERIES_LEN as u32).await
        {
            Ok(bars) if !bars.is_empty() => (bars, SeriesOrigin::Provider),
            Ok(_) => {
                warn!("Provider returned no bars for {}, showing synthetic series", symbol);
                (synthetic_series(), SeriesOrigin::Synthetic)
            }
            Err(e) => {
                warn!("Chart fetch failed for {}: {}. Showing synthetic series", symbol, e);
                (synthetic_series(), SeriesOrigin::Synthetic)
            }
        };

        ChartSeries {
            symbol: symbol.to_string(),
            bars,
            origin,
        }
    }
}

/// Reduces a display symbol to the provider's base-currency parameter:
/// "BTC/USDT" -> "BTC", "EURUSD=X" -> "EUR", "R_100" -> "R_100".
pub fn clean_symbol(symbol: &str) -> String {
    let base = symbol.split('/').next().unwrap_or(symbol);
    let base = base.trim_end_matches("=X");
    let base = base.trim_end_matches("USDT");
    let base = base.trim_end_matches("USD");
    base.to_string()
}

/// A random walk with the deterministic shape of real bars: 100 one-minute
/// candles ending now, each close feeding the next open.
pub fn synthetic_series() -> Vec<Candle> {
    let mut rng = rand::rng();
    let mut bars = Vec::with_capacity(SERIES_LEN);

    let mut time = Utc::now().timestamp() - (SERIES_LEN as i64) * BAR_SECONDS;
    let mut value = 100.0 + rng.random::<f64>() * 1000.0;

    for _ in 0..SERIES_LEN {
        let open = value + (rng.random::<f64>() - 0.5) * 2.0;
        let high = open + rng.random::<f64>() * 1.5;
        let low = open - rng.random::<f64>() * 1.5;
        let close = (high + low) / 2.0;

        bars.push(Candle {
            time,
            open,
            high,
            low,
            close,
        });

        value = close;
        time += BAR_SECONDS;
    }

    bars
}
