pub mod chart_service;
pub mod signal_feed;
pub mod status_line;
pub mod telegram_service;
