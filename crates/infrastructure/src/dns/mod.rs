pub mod channel;
pub mod fake;
pub mod load_balancer;
pub mod request;
pub mod resolver;
pub mod runtime;
pub mod server;
pub mod transport;
pub mod wire;

pub use channel::{IoChannel, Transport};
pub use fake::{FakeReply, FakeReplyRegistry};
pub use load_balancer::HealthTrackingUpstreams;
pub use request::{ReplyCallback, RequestHandle, RequestOptions, RequestState};
pub use resolver::{RequestInfo, Resolver, ResolverBuilder, ResolverSettings};
pub use runtime::{EventLoop, TokioEngine};
pub use server::Server;
pub use transport::SystemSocketFactory;
