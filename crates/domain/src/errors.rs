use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("DNS label is {0} bytes long (max 63)")]
    LabelTooLong(usize),

    #[error("DNS name is {0} bytes long (max 253)")]
    NameTooLong(usize),

    #[error("DNS query is {0} bytes long (max 65535)")]
    QueryTooLong(usize),

    #[error("Query carries {0} questions (max 65535)")]
    TooManyQuestions(usize),

    #[error("Query contains no names")]
    EmptyQuery,

    #[error("Invalid record data for {record_type}: {reason}")]
    InvalidRecordData { record_type: String, reason: String },

    #[error("Malformed DNS packet: {0}")]
    MalformedPacket(String),

    #[error("No DNS servers configured")]
    NoServers,

    #[error("No upstream server available for {0}")]
    NoUpstreamAvailable(String),

    #[error("No free transaction id on channel {0}")]
    NoFreeTransactionId(String),

    #[error("Failed to allocate IO channel for {server}: {reason}")]
    ChannelAllocation { server: String, reason: String },

    #[error("Crypto plugin {plugin} failed: {reason}")]
    CryptoFailure { plugin: String, reason: String },

    #[error("Invalid server address: {0}")]
    InvalidServerAddress(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
