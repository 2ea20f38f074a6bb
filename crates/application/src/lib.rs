//! rdns application layer: the ports through which the resolver engine talks
//! to its host (event loop, upstream selection, sockets, transport crypto).
pub mod ports;

pub use ports::{
    AsyncEngine, AsyncHandle, ChannelId, ConnectProgress, CryptoPlugin, DnsSocket, EngineEvent,
    RawDescriptor, SocketFactory, TimerToken, UpstreamHandle, UpstreamManager,
};
