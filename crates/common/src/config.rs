use std::env;

use anyhow::Context;
use url::Url;

/// Session configuration pulled from the environment. Every value has a
/// sensible localhost default so a dev session runs with an empty .env.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub ws_base_url: String,
    pub provider_base_url: String,
    pub user_id: String,
    pub super_admin_id: String,
    pub default_asset: String,
    pub autotrade: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            api_base_url: env::var("TRADESIGX_API_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            ws_base_url: env::var("TRADESIGX_WS_URL")
                .unwrap_or_else(|_| "ws://localhost:5000".to_string()),
            provider_base_url: env::var("MARKET_DATA_URL")
                .unwrap_or_else(|_| "https://min-api.cryptocompare.com".to_string()),
            user_id: env::var("TRADESIGX_USER_ID").unwrap_or_else(|_| "demo_user".to_string()),
            super_admin_id: env::var("SUPER_ADMIN_ID")
                .unwrap_or_else(|_| "1241907317".to_string()),
            default_asset: env::var("DEFAULT_ASSET").unwrap_or_else(|_| "BTC/USDT".to_string()),
            autotrade: env::var("AUTOTRADE_ENABLED")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }

    /// The admin panel is only wired up for the configured super admin.
    pub fn is_super_admin(&self) -> bool {
        self.user_id == self.super_admin_id
    }

    /// Streaming endpoint for this session's user.
    pub fn ws_endpoint(&self) -> anyhow::Result<Url> {
        let raw = format!(
            "{}/ws/{}",
            self.ws_base_url.trim_end_matches('/'),
            self.user_id
        );
        Url::parse(&raw).with_context(|| format!("Invalid websocket url: {}", raw))
    }
}
