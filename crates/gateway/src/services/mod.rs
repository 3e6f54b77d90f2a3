pub mod chart_supplier;
pub mod live_channel;
