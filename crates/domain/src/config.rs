pub mod errors;
pub mod fake;
pub mod logging;
pub mod resolv_conf;
pub mod resolver;
pub mod root;
pub mod server;

pub use errors::ConfigError;
pub use fake::FakeReplyConfig;
pub use logging::LoggingConfig;
pub use resolv_conf::{ResolvConf, RESOLV_CONF};
pub use resolver::ResolverConfig;
pub use root::{CliOverrides, Config};
pub use server::ServerConfig;
