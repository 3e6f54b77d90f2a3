use std::time::Duration;

use anyhow::{Context, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::traits::BarSource;
use common::models::Candle;

/// CryptoCompare-style minute-history envelope: `Response` is a status word,
/// the bars sit two levels deep under `Data.Data`.
#[derive(Deserialize, Debug)]
pub struct HistoMinuteEnvelope {
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
    #[serde(rename = "Data", default)]
    pub data: Option<HistoMinutePayload>,
}

#[derive(Deserialize, Debug, Default)]
pub struct HistoMinutePayload {
    #[serde(rename = "Data", default)]
    pub data: Vec<HistoMinuteBar>,
}

#[derive(Deserialize, Debug)]
pub struct HistoMinuteBar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl HistoMinuteEnvelope {
    pub fn into_bars(self) -> anyhow::Result<Vec<Candle>> {
        if self.response != "Success" {
            bail!(
                "provider error: {}",
                self.message.unwrap_or_else(|| self.response)
            );
        }

        let bars: Vec<Candle> = self
            .data
            .map(|payload| payload.data)
            .unwrap_or_default()
            .into_iter()
            .map(|bar| Candle {
                time: bar.time,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
            })
            .collect();

        if bars.is_empty() {
            bail!("provider returned no bars");
        }
        Ok(bars)
    }
}

/// Third-party market-data client, used only to seed the chart with recent
/// history. Everything it returns is display data, never traded on.
pub struct ProviderClient {
    client: Client,
    base_url: String,
}

impl ProviderClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .user_agent("tradesigx_terminal/0.1.0")
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client."),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl BarSource for ProviderClient {
    async fn minute_bars(
        &self,
        fsym: &str,
        tsym: &str,
        limit: u32,
    ) -> anyhow::Result<Vec<Candle>> {
        let url = format!("{}/data/v2/histominute", self.base_url);
        debug!("Fetching {} bars for {}/{}", limit, fsym, tsym);

        let envelope = self
            .client
            .get(&url)
            .query(&[("fsym", fsym), ("tsym", tsym), ("limit", &limit.to_string())])
            .send()
            .await
            .context("Failed to send request")?
            .json::<HistoMinuteEnvelope>()
            .await
            .context("Failed to parse JSON response")?;

        envelope.into_bars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_yields_bars() {
        let envelope: HistoMinuteEnvelope = serde_json::from_str(
            r#"{
                "Response": "Success",
                "Data": {
                    "Data": [
                        {"time": 1700000000, "open": 1.0, "high": 1.2, "low": 0.9, "close": 1.1, "volumefrom": 3.0},
                        {"time": 1700000060, "open": 1.1, "high": 1.3, "low": 1.0, "close": 1.2, "volumefrom": 2.0}
                    ]
                }
            }"#,
        )
        .unwrap();

        let bars = envelope.into_bars().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].time, 1_700_000_000);
        assert_eq!(bars[1].close, 1.2);
    }

    #[test]
    fn error_status_is_rejected() {
        let envelope: HistoMinuteEnvelope = serde_json::from_str(
            r#"{"Response": "Error", "Message": "fsym param is invalid"}"#,
        )
        .unwrap();

        let err = envelope.into_bars().unwrap_err();
        assert!(err.to_string().contains("fsym param is invalid"));
    }

    #[test]
    fn success_with_empty_data_is_rejected() {
        let envelope: HistoMinuteEnvelope =
            serde_json::from_str(r#"{"Response": "Success", "Data": {"Data": []}}"#).unwrap();
        assert!(envelope.into_bars().is_err());

        let envelope: HistoMinuteEnvelope =
            serde_json::from_str(r#"{"Response": "Success"}"#).unwrap();
        assert!(envelope.into_bars().is_err());
    }
}
