pub mod gateway;
pub mod relay_client;

pub use gateway::GatewayAdapter;
pub use relay_client::HttpRelayClient;
