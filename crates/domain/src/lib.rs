//! rdns domain layer: value types shared by the resolver engine and its hosts.
pub mod config;
pub mod dns_query;
pub mod dns_record;
pub mod dns_reply;
pub mod errors;
pub mod result_code;

pub use config::{CliOverrides, Config, ConfigError};
pub use dns_query::{DnsQuery, RequestName};
pub use dns_record::{record_type_description, RecordData, RecordType, ReplyEntry};
pub use dns_reply::Reply;
pub use errors::DomainError;
pub use result_code::{rcode_description, ResultCode};
