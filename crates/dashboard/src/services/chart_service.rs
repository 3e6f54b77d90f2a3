use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};
use common::models::Candle;
use gateway::remote::ChannelEvent;
use gateway::services::chart_supplier::{ChartSeries, ChartSupplier};
use gateway::traits::BarSource;

/// Owns the chart state for the currently selected asset: loads history via
/// the supplier on selection, then keeps the series fresh from live ticks.
pub struct ChartService<S> {
    id: Uuid,
    supplier: Arc<ChartSupplier<S>>,
    event_rx: broadcast::Receiver<Arc<ChannelEvent>>,
    select_rx: broadcast::Receiver<String>,
    series_tx: watch::Sender<Option<ChartSeries>>,
    asset: String,
}

#[async_trait]
impl<S: BarSource + 'static> Actor for ChartService<S> {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::ChartActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let heartbeat_handle = self.spawn_heartbeat(supervisor_tx.clone());

        info!("Starting chart service on {}", self.asset);
        self.load(self.asset.clone()).await;

        loop {
            tokio::select! {
                result = self.select_rx.recv() => {
                    match result {
                        Ok(symbol) => {
                            self.asset = symbol.clone();
                            self.load(symbol).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Asset selection lagged: missed {} picks", n);
                        }
                        Err(_) => {
                            heartbeat_handle.abort();
                            supervisor_tx
                                .send(ControlMessage::Error(
                                    self.id,
                                    "Asset selection channel closed unexpectedly.".to_string(),
                                ))
                                .await?;
                            anyhow::bail!("Asset selection channel closed unexpectedly.");
                        }
                    }
                }

                result = self.event_rx.recv() => {
                    match result {
                        Ok(event) => {
                            if let ChannelEvent::MarketUpdate(tick) = &*event {
                                self.on_tick(*tick);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Chart service lagged: missed {} events", n);
                        }
                        Err(_) => {
                            heartbeat_handle.abort();
                            supervisor_tx
                                .send(ControlMessage::Error(
                                    self.id,
                                    "Chart event channel closed unexpectedly.".to_string(),
                                ))
                                .await?;
                            anyhow::bail!("Chart event channel closed unexpectedly.");
                        }
                    }
                }
            }
        }
    }
}

impl<S: BarSource> ChartService<S> {
    pub fn new(
        supplier: Arc<ChartSupplier<S>>,
        event_rx: broadcast::Receiver<Arc<ChannelEvent>>,
        select_rx: broadcast::Receiver<String>,
        series_tx: watch::Sender<Option<ChartSeries>>,
        default_asset: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            supplier,
            event_rx,
            select_rx,
            series_tx,
            asset: default_asset.to_string(),
        }
    }

    async fn load(&mut self, symbol: String) {
        let series = self.supplier.series_for(&symbol).await;
        if series.is_synthetic() {
            debug!("Showing synthetic series for {}", symbol);
        }
        let _ = self.series_tx.send(Some(series));
    }

    fn on_tick(&mut self, tick: Candle) {
        self.series_tx.send_modify(|maybe| {
            if let Some(series) = maybe {
                apply_tick(&mut series.bars, tick);
            }
        });
    }
}

/// Same-timestamp ticks replace the last bar, newer ticks append, stale
/// ticks are dropped.
pub fn apply_tick(bars: &mut Vec<Candle>, tick: Candle) {
    match bars.last_mut() {
        Some(last) if last.time == tick.time => *last = tick,
        Some(last) if last.time > tick.time => {}
        _ => bars.push(tick),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: i64, close: f64) -> Candle {
        Candle {
            time,
            open: close,
            high: close,
            low: close,
            close,
        }
    }

    #[test]
    fn newer_ticks_append() {
        let mut bars = vec![bar(60, 1.0)];
        apply_tick(&mut bars, bar(120, 2.0));

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].time, 120);
    }

    #[test]
    fn same_timestamp_replaces_last_bar() {
        let mut bars = vec![bar(60, 1.0)];
        apply_tick(&mut bars, bar(60, 3.0));

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 3.0);
    }

    #[test]
    fn stale_ticks_are_dropped() {
        let mut bars = vec![bar(120, 2.0)];
        apply_tick(&mut bars, bar(60, 1.0));

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].time, 120);
    }

    #[test]
    fn first_tick_seeds_an_empty_series() {
        let mut bars = Vec::new();
        apply_tick(&mut bars, bar(60, 1.0));
        assert_eq!(bars.len(), 1);
    }
}
