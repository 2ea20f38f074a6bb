use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordType {
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    SSHFP,
    TLSA,
    SPF,
    ANY,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::NS => "NS",
            RecordType::CNAME => "CNAME",
            RecordType::SOA => "SOA",
            RecordType::PTR => "PTR",
            RecordType::MX => "MX",
            RecordType::TXT => "TXT",
            RecordType::AAAA => "AAAA",
            RecordType::SRV => "SRV",
            RecordType::OPT => "OPT",
            RecordType::SSHFP => "SSHFP",
            RecordType::TLSA => "TLSA",
            RecordType::SPF => "SPF",
            RecordType::ANY => "ANY",
        }
    }

    pub fn to_u16(&self) -> u16 {
        match self {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::PTR => 12,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::OPT => 41,
            RecordType::SSHFP => 44,
            RecordType::TLSA => 52,
            RecordType::SPF => 99,
            RecordType::ANY => 255,
        }
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            1 => Some(RecordType::A),
            2 => Some(RecordType::NS),
            5 => Some(RecordType::CNAME),
            6 => Some(RecordType::SOA),
            12 => Some(RecordType::PTR),
            15 => Some(RecordType::MX),
            16 => Some(RecordType::TXT),
            28 => Some(RecordType::AAAA),
            33 => Some(RecordType::SRV),
            41 => Some(RecordType::OPT),
            44 => Some(RecordType::SSHFP),
            52 => Some(RecordType::TLSA),
            99 => Some(RecordType::SPF),
            255 => Some(RecordType::ANY),
            _ => None,
        }
    }

    /// Whether a caller may put this type in a question.
    pub fn is_requestable(&self) -> bool {
        !matches!(self, RecordType::OPT | RecordType::SSHFP)
    }

    /// True when an answer of type `answer` satisfies a question of this type.
    pub fn matches(&self, answer: RecordType) -> bool {
        *self == RecordType::ANY || *self == answer
    }

    pub fn description(&self) -> &'static str {
        match self {
            RecordType::A => "A request",
            RecordType::NS => "NS request",
            RecordType::CNAME => "CNAME request",
            RecordType::SOA => "SOA request",
            RecordType::PTR => "PTR request",
            RecordType::MX => "MX request",
            RecordType::TXT => "TXT request",
            RecordType::AAAA => "AAAA request",
            RecordType::SRV => "SRV request",
            RecordType::OPT => "OPT request",
            RecordType::SSHFP => "SSHFP request",
            RecordType::TLSA => "TLSA request",
            RecordType::SPF => "SPF request",
            RecordType::ANY => "ANY request",
        }
    }
}

/// Describes a raw qtype, returning `"unknown request"` for anything the
/// engine does not model.
pub fn record_type_description(code: u16) -> &'static str {
    RecordType::from_u16(code)
        .map(|t| t.description())
        .unwrap_or("unknown request")
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::NS),
            "CNAME" => Ok(RecordType::CNAME),
            "SOA" => Ok(RecordType::SOA),
            "PTR" => Ok(RecordType::PTR),
            "MX" => Ok(RecordType::MX),
            "TXT" => Ok(RecordType::TXT),
            "AAAA" => Ok(RecordType::AAAA),
            "SRV" => Ok(RecordType::SRV),
            "OPT" => Ok(RecordType::OPT),
            "SSHFP" => Ok(RecordType::SSHFP),
            "TLSA" => Ok(RecordType::TLSA),
            "SPF" => Ok(RecordType::SPF),
            "ANY" | "ALL" => Ok(RecordType::ANY),
            _ => Err(format!("Unknown record type: {}", s)),
        }
    }
}

impl TryFrom<String> for RecordType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(record_type: RecordType) -> Self {
        record_type.as_str().to_string()
    }
}
