mod async_engine;
mod crypto_plugin;
mod socket_factory;
mod upstream_manager;

pub use async_engine::{AsyncEngine, AsyncHandle, ChannelId, EngineEvent, TimerToken};
pub use crypto_plugin::CryptoPlugin;
pub use socket_factory::{ConnectProgress, DnsSocket, RawDescriptor, SocketFactory};
pub use upstream_manager::{UpstreamHandle, UpstreamManager};
