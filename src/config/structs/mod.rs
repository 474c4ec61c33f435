mod app;
mod chat;
mod network;
mod provider;

pub use app::{AppConfig, UIConfig};
pub use chat::ChatConfig;
pub use network::NetworkConfig;
pub use provider::ProviderConfig;
