pub mod backend_client;
pub mod provider_client;
pub mod stream_event;

pub use backend_client::{BackendClient, BackendError, HttpMethod, RequestSpec};
pub use provider_client::ProviderClient;
pub use stream_event::ChannelEvent;
