//! DNS wire format: header packing, name encoding with compression-aware
//! decoding, query construction and reply parsing.

mod header;
mod message_builder;
mod name;
mod response_parser;

pub use header::Header;
pub use message_builder::MessageBuilder;
pub use name::{decode_name, encode_name, normalize_name, wire_name};
pub use response_parser::{ParsedReply, ResponseParser};

use rdns_domain::{DomainError, RecordType};
use thiserror::Error;

pub const HEADER_LEN: usize = 12;

/// Largest datagram read from or written to a UDP channel.
pub const UDP_PACKET_SIZE: usize = 4096;

/// Largest message a 2-byte TCP length prefix can describe.
pub const MAX_MESSAGE_LEN: usize = u16::MAX as usize;

pub const DNS_COMPRESSION_BITS: u8 = 0xC0;

pub const MAX_LABEL_LEN: usize = 63;

/// Presentation length limit (no trailing dot); 255 octets on the wire.
pub const MAX_NAME_LEN: usize = 253;

pub const CLASS_IN: u16 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("label of {0} bytes exceeds {MAX_LABEL_LEN}")]
    LabelTooLong(usize),

    #[error("name of {0} bytes exceeds {MAX_NAME_LEN}")]
    NameTooLong(usize),

    #[error("message of {0} bytes exceeds {MAX_MESSAGE_LEN}")]
    MessageTooLong(usize),

    #[error("{0} questions do not fit the 16-bit count")]
    TooManyQuestions(usize),

    #[error("empty label inside name")]
    EmptyLabel,

    #[error("message truncated at offset {offset}")]
    Truncated { offset: usize },

    #[error("compression pointer at {offset} targets {target}")]
    BadPointer { offset: usize, target: usize },

    #[error("unsupported label type {0:#04x}")]
    BadLabelType(u8),

    #[error("malformed {record_type} rdata: {reason}")]
    BadRdata {
        record_type: RecordType,
        reason: &'static str,
    },

    #[error("packet is not a reply")]
    NotAReply,

    #[error("reply questions do not match the request")]
    QuestionMismatch,
}

impl From<WireError> for DomainError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::LabelTooLong(len) => DomainError::LabelTooLong(len),
            WireError::NameTooLong(len) => DomainError::NameTooLong(len),
            WireError::MessageTooLong(len) => DomainError::QueryTooLong(len),
            WireError::TooManyQuestions(count) => DomainError::TooManyQuestions(count),
            WireError::EmptyLabel => DomainError::InvalidDomainName(err.to_string()),
            other => DomainError::MalformedPacket(other.to_string()),
        }
    }
}

pub(crate) fn read_u16(msg: &[u8], pos: usize) -> Result<u16, WireError> {
    msg.get(pos..pos + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(WireError::Truncated { offset: pos })
}

pub(crate) fn read_u32(msg: &[u8], pos: usize) -> Result<u32, WireError> {
    msg.get(pos..pos + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(WireError::Truncated { offset: pos })
}
