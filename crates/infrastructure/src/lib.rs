//! rdns infrastructure: the resolver engine and the adapters that run it on
//! real sockets and a tokio event loop.
pub mod dns;
