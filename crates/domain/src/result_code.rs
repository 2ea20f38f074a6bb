use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome delivered to a request callback.
///
/// The first eleven variants are server rcodes passed through unchanged;
/// `Timeout`, `NetErr` and `NoRec` are produced by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResultCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    YxDomain,
    YxRrset,
    NxRrset,
    NotAuth,
    NotZone,
    Timeout,
    NetErr,
    NoRec,
}

impl ResultCode {
    /// Maps a 4-bit header rcode. Values outside 0..=10 have no meaning here.
    pub fn from_wire(rcode: u8) -> Option<Self> {
        match rcode {
            0 => Some(Self::NoError),
            1 => Some(Self::FormErr),
            2 => Some(Self::ServFail),
            3 => Some(Self::NxDomain),
            4 => Some(Self::NotImp),
            5 => Some(Self::Refused),
            6 => Some(Self::YxDomain),
            7 => Some(Self::YxRrset),
            8 => Some(Self::NxRrset),
            9 => Some(Self::NotAuth),
            10 => Some(Self::NotZone),
            _ => None,
        }
    }

    /// Wire value for server rcodes; engine-local codes have none.
    pub fn to_wire(&self) -> Option<u8> {
        match self {
            Self::NoError => Some(0),
            Self::FormErr => Some(1),
            Self::ServFail => Some(2),
            Self::NxDomain => Some(3),
            Self::NotImp => Some(4),
            Self::Refused => Some(5),
            Self::YxDomain => Some(6),
            Self::YxRrset => Some(7),
            Self::NxRrset => Some(8),
            Self::NotAuth => Some(9),
            Self::NotZone => Some(10),
            Self::Timeout | Self::NetErr | Self::NoRec => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoError => "NOERROR",
            Self::FormErr => "FORMERR",
            Self::ServFail => "SERVFAIL",
            Self::NxDomain => "NXDOMAIN",
            Self::NotImp => "NOTIMP",
            Self::Refused => "REFUSED",
            Self::YxDomain => "YXDOMAIN",
            Self::YxRrset => "YXRRSET",
            Self::NxRrset => "NXRRSET",
            Self::NotAuth => "NOTAUTH",
            Self::NotZone => "NOTZONE",
            Self::Timeout => "TIMEOUT",
            Self::NetErr => "NETERR",
            Self::NoRec => "NOREC",
        }
    }

    /// Human readable explanation, suitable for log lines.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NoError => "no error",
            Self::FormErr => "query format error",
            Self::ServFail => "server fail",
            Self::NxDomain => "no records with this name",
            Self::NotImp => "not implemented",
            Self::Refused => "query refused",
            Self::YxDomain => "YXDOMAIN",
            Self::YxRrset => "YXRRSET",
            Self::NxRrset => "NXRRSET",
            Self::NotAuth => "not authorized",
            Self::NotZone => "no such zone",
            Self::Timeout => "query timed out",
            Self::NetErr => "network error",
            Self::NoRec => "requested record is not found",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::NoError)
    }

    /// Codes produced locally rather than reported by a server.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Timeout | Self::NetErr | Self::NoRec)
    }
}

/// Describes a raw header rcode, returning `"unknown error"` outside the
/// range the engine understands.
pub fn rcode_description(rcode: u8) -> &'static str {
    ResultCode::from_wire(rcode)
        .map(|code| code.description())
        .unwrap_or("unknown error")
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NOERROR" => Ok(Self::NoError),
            "FORMERR" => Ok(Self::FormErr),
            "SERVFAIL" => Ok(Self::ServFail),
            "NXDOMAIN" => Ok(Self::NxDomain),
            "NOTIMP" => Ok(Self::NotImp),
            "REFUSED" => Ok(Self::Refused),
            "YXDOMAIN" => Ok(Self::YxDomain),
            "YXRRSET" => Ok(Self::YxRrset),
            "NXRRSET" => Ok(Self::NxRrset),
            "NOTAUTH" => Ok(Self::NotAuth),
            "NOTZONE" => Ok(Self::NotZone),
            "TIMEOUT" => Ok(Self::Timeout),
            "NETERR" => Ok(Self::NetErr),
            "NOREC" => Ok(Self::NoRec),
            _ => Err(format!("Unknown result code: {}", s)),
        }
    }
}

impl TryFrom<String> for ResultCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResultCode> for String {
    fn from(code: ResultCode) -> Self {
        code.as_str().to_string()
    }
}
