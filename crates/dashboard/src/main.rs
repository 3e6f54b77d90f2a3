use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use dotenvy::dotenv;
use tokio::sync::{broadcast, watch};
use tokio::time;
use tracing::{debug, info, warn};

use common::actors::ActorType;
use common::config::AppConfig;
use common::logger;
use gateway::remote::{BackendClient, ChannelEvent, ProviderClient};
use gateway::services::chart_supplier::{ChartSeries, ChartSupplier};
use gateway::services::live_channel::{ChannelState, LiveChannel};

use crate::actors::supervisor::Supervisor;
use crate::admin::AdminPanel;
use crate::services::chart_service::ChartService;
use crate::services::signal_feed::SignalFeedService;
use crate::services::status_line;
use crate::services::telegram_service::TelegramService;

mod actors;
mod admin;
mod commands;
mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::setup_logger();
    dotenv().ok();
    debug!("Terminal session starting up...");

    let config = AppConfig::from_env();
    let backend = BackendClient::new(&config.api_base_url);

    match backend.health().await {
        Ok(health) => info!(
            "Backend healthy: {} ({} active connections)",
            health.status,
            health.active_connections.unwrap_or(0)
        ),
        Err(e) => warn!("Backend health check failed: {}. Continuing anyway", e),
    }

    let mut supervisor = Supervisor::new();

    let (event_tx, _) = broadcast::channel::<Arc<ChannelEvent>>(1024);
    let (state_tx, state_rx) = watch::channel(ChannelState::Connecting);
    let (notify_tx, notify_rx) = broadcast::channel::<String>(64);
    let (select_tx, select_rx) = broadcast::channel::<String>(16);
    let (series_tx, series_rx) = watch::channel::<Option<ChartSeries>>(None);
    let shutdown = Arc::new(AtomicBool::new(false));

    let endpoint = config.ws_endpoint()?;
    let tx_for_channel = event_tx.clone();
    let state_for_channel = state_tx.clone();
    let shutdown_for_channel = shutdown.clone();
    supervisor.register_actor(
        ActorType::ChannelActor,
        Box::new(move || {
            Box::new(LiveChannel::new(
                endpoint.clone(),
                tx_for_channel.clone(),
                state_for_channel.clone(),
                shutdown_for_channel.clone(),
            ))
        }),
    );

    let rx_for_feed = event_tx.subscribe();
    let notify_for_feed = notify_tx.clone();
    supervisor.register_actor(
        ActorType::SignalFeedActor,
        Box::new(move || {
            Box::new(SignalFeedService::new(
                rx_for_feed.resubscribe(),
                notify_for_feed.clone(),
            ))
        }),
    );

    let supplier = Arc::new(ChartSupplier::new(ProviderClient::new(
        &config.provider_base_url,
    )));
    let rx_for_chart = event_tx.subscribe();
    let select_for_chart = select_rx;
    let series_for_chart = series_tx;
    let default_asset = config.default_asset.clone();
    supervisor.register_actor(
        ActorType::ChartActor,
        Box::new(move || {
            Box::new(ChartService::new(
                supplier.clone(),
                rx_for_chart.resubscribe(),
                select_for_chart.resubscribe(),
                series_for_chart.clone(),
                &default_asset,
            ))
        }),
    );

    if let Some(telegram) = TelegramService::from_env() {
        tokio::spawn(telegram.start(notify_rx));
    } else {
        debug!("Telegram cue disabled: TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set");
        drop(notify_rx);
    }

    tokio::spawn(status_line::run(state_rx));

    // Trace chart loads so a degraded (synthetic) session is visible in logs.
    let mut series_watch = series_rx;
    tokio::spawn(async move {
        while series_watch.changed().await.is_ok() {
            let snapshot = series_watch.borrow_and_update().clone();
            if let Some(series) = snapshot {
                debug!(
                    "Chart updated: {} bars for {} ({:?})",
                    series.bars.len(),
                    series.symbol,
                    series.origin
                );
            }
        }
    });

    if config.is_super_admin() {
        let mut panel = AdminPanel::new(backend.clone(), config.user_id.clone());
        match panel.load_users().await {
            Ok(stats) => info!(
                "Admin panel ready: {} users, {} verified",
                stats.total, stats.verified
            ),
            Err(e) => warn!("Error loading users: {}", e),
        }
    }

    // One market scan shortly after startup; the best find becomes the
    // charted asset, mirroring a scanner-card tap. With autotrade on, the
    // top signal is also submitted as a trade.
    let _select_keepalive = select_tx.clone();
    let scan_backend = backend.clone();
    let scan_user = config.user_id.clone();
    let autotrade = config.autotrade;
    tokio::spawn(async move {
        time::sleep(Duration::from_millis(500)).await;

        match scan_backend.market_scan().await {
            Ok(scan) if !scan.signals.is_empty() => {
                info!("Market scan: {} high-confidence signals", scan.signals.len());
                if let Some(top) = scan.signals.first() {
                    let _ = select_tx.send(top.asset.clone());

                    if autotrade {
                        let selection = commands::Selection {
                            user_id: scan_user,
                            asset: top.asset.clone(),
                        };
                        let action = commands::UiAction::SubmitTrade(top.direction);
                        let spec = commands::build_request(&action, &selection);

                        match scan_backend.send_command(&spec).await {
                            Ok(value) => {
                                let outcome = commands::outcome_from(&value);
                                if outcome.success {
                                    info!("Trade submitted: {} {}", top.asset, top.direction);
                                } else {
                                    warn!(
                                        "Trade rejected: {}",
                                        outcome.message.as_deref().unwrap_or("unknown error")
                                    );
                                }
                            }
                            Err(e) => warn!("Trade submission failed: {}", e),
                        }
                    }
                }
            }
            Ok(_) => info!("Market scan: nothing above the confidence bar right now"),
            Err(e) => warn!("Scan error: {}", e),
        }
    });

    supervisor.start().await;
    Ok(())
}
