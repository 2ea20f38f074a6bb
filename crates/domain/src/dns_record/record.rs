use super::RecordType;
use crate::DomainError;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// Decoded RDATA of an answer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(Arc<str>),
    CNAME(Arc<str>),
    PTR(Arc<str>),
    MX {
        priority: u16,
        exchange: Arc<str>,
    },
    TXT(Arc<str>),
    SPF(Arc<str>),
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: Arc<str>,
    },
    SOA {
        mname: Arc<str>,
        admin: Arc<str>,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    TLSA {
        usage: u8,
        selector: u8,
        match_type: u8,
        data: Vec<u8>,
    },
}

impl RecordData {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordData::A(_) => RecordType::A,
            RecordData::AAAA(_) => RecordType::AAAA,
            RecordData::NS(_) => RecordType::NS,
            RecordData::CNAME(_) => RecordType::CNAME,
            RecordData::PTR(_) => RecordType::PTR,
            RecordData::MX { .. } => RecordType::MX,
            RecordData::TXT(_) => RecordType::TXT,
            RecordData::SPF(_) => RecordType::SPF,
            RecordData::SRV { .. } => RecordType::SRV,
            RecordData::SOA { .. } => RecordType::SOA,
            RecordData::TLSA { .. } => RecordType::TLSA,
        }
    }

    /// Parses presentation-format RDATA, as written in configuration files.
    ///
    /// `MX` takes `"<priority> <exchange>"`, `SRV` takes
    /// `"<priority> <weight> <port> <target>"`, `SOA` takes the seven usual
    /// fields and `TLSA` takes three numbers followed by hex data.
    pub fn parse(record_type: RecordType, text: &str) -> Result<Self, DomainError> {
        let invalid = |reason: &str| DomainError::InvalidRecordData {
            record_type: record_type.to_string(),
            reason: format!("{} ('{}')", reason, text),
        };
        let fields: Vec<&str> = text.split_whitespace().collect();

        match record_type {
            RecordType::A => text
                .trim()
                .parse()
                .map(RecordData::A)
                .map_err(|_| invalid("not an IPv4 address")),
            RecordType::AAAA => text
                .trim()
                .parse()
                .map(RecordData::AAAA)
                .map_err(|_| invalid("not an IPv6 address")),
            RecordType::NS => Ok(RecordData::NS(
                single_name(&fields).ok_or_else(|| invalid("expected a name"))?,
            )),
            RecordType::CNAME => Ok(RecordData::CNAME(
                single_name(&fields).ok_or_else(|| invalid("expected a name"))?,
            )),
            RecordType::PTR => Ok(RecordData::PTR(
                single_name(&fields).ok_or_else(|| invalid("expected a name"))?,
            )),
            RecordType::TXT => Ok(RecordData::TXT(Arc::from(text))),
            RecordType::SPF => Ok(RecordData::SPF(Arc::from(text))),
            RecordType::MX => match fields.as_slice() {
                [priority, exchange] => Ok(RecordData::MX {
                    priority: priority.parse().map_err(|_| invalid("bad priority"))?,
                    exchange: Arc::from(trim_dot(exchange)),
                }),
                _ => Err(invalid("expected '<priority> <exchange>'")),
            },
            RecordType::SRV => match fields.as_slice() {
                [priority, weight, port, target] => Ok(RecordData::SRV {
                    priority: priority.parse().map_err(|_| invalid("bad priority"))?,
                    weight: weight.parse().map_err(|_| invalid("bad weight"))?,
                    port: port.parse().map_err(|_| invalid("bad port"))?,
                    target: Arc::from(trim_dot(target)),
                }),
                _ => Err(invalid("expected '<priority> <weight> <port> <target>'")),
            },
            RecordType::SOA => match fields.as_slice() {
                [mname, admin, serial, refresh, retry, expire, minimum] => {
                    let number = |s: &str| s.parse::<u32>().map_err(|_| invalid("bad number"));
                    Ok(RecordData::SOA {
                        mname: Arc::from(trim_dot(mname)),
                        admin: Arc::from(trim_dot(admin)),
                        serial: number(serial)?,
                        refresh: number(refresh)?,
                        retry: number(retry)?,
                        expire: number(expire)?,
                        minimum: number(minimum)?,
                    })
                }
                _ => Err(invalid("expected seven SOA fields")),
            },
            RecordType::TLSA => match fields.as_slice() {
                [usage, selector, match_type, hex] => Ok(RecordData::TLSA {
                    usage: usage.parse().map_err(|_| invalid("bad usage"))?,
                    selector: selector.parse().map_err(|_| invalid("bad selector"))?,
                    match_type: match_type.parse().map_err(|_| invalid("bad matching type"))?,
                    data: decode_hex(hex).ok_or_else(|| invalid("bad hex data"))?,
                }),
                _ => Err(invalid("expected '<usage> <selector> <type> <hex>'")),
            },
            RecordType::OPT | RecordType::SSHFP | RecordType::ANY => {
                Err(invalid("record type cannot carry answer data"))
            }
        }
    }
}

/// Presentation format, the same one [`RecordData::parse`] accepts.
impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::A(ip) => write!(f, "{}", ip),
            RecordData::AAAA(ip) => write!(f, "{}", ip),
            RecordData::NS(name) | RecordData::CNAME(name) | RecordData::PTR(name) => {
                write!(f, "{}", name)
            }
            RecordData::MX { priority, exchange } => write!(f, "{} {}", priority, exchange),
            RecordData::TXT(text) | RecordData::SPF(text) => write!(f, "{}", text),
            RecordData::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target),
            RecordData::SOA {
                mname,
                admin,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{} {} {} {} {} {} {}",
                mname, admin, serial, refresh, retry, expire, minimum
            ),
            RecordData::TLSA {
                usage,
                selector,
                match_type,
                data,
            } => {
                write!(f, "{} {} {} ", usage, selector, match_type)?;
                data.iter().try_for_each(|b| write!(f, "{:02x}", b))
            }
        }
    }
}

/// One answer delivered to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEntry {
    pub ttl: u32,
    pub data: RecordData,
}

impl ReplyEntry {
    pub fn new(data: RecordData, ttl: u32) -> Self {
        Self { ttl, data }
    }

    pub fn record_type(&self) -> RecordType {
        self.data.record_type()
    }
}

fn single_name(fields: &[&str]) -> Option<Arc<str>> {
    match fields {
        [name] => Some(Arc::from(trim_dot(name))),
        _ => None,
    }
}

fn trim_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_records() {
        assert_eq!(
            RecordData::parse(RecordType::A, "192.0.2.1").unwrap(),
            RecordData::A(Ipv4Addr::new(192, 0, 2, 1))
        );
        assert_eq!(
            RecordData::parse(RecordType::AAAA, "2001:db8::1").unwrap(),
            RecordData::AAAA("2001:db8::1".parse().unwrap())
        );
        assert!(RecordData::parse(RecordType::A, "2001:db8::1").is_err());
    }

    #[test]
    fn test_parse_mx_strips_trailing_dot() {
        let data = RecordData::parse(RecordType::MX, "10 mail.example.com.").unwrap();
        assert_eq!(
            data,
            RecordData::MX {
                priority: 10,
                exchange: Arc::from("mail.example.com"),
            }
        );
    }

    #[test]
    fn test_parse_srv_requires_four_fields() {
        assert!(RecordData::parse(RecordType::SRV, "10 5 443").is_err());
        let data = RecordData::parse(RecordType::SRV, "10 5 443 sip.example.com").unwrap();
        assert_eq!(data.record_type(), RecordType::SRV);
    }

    #[test]
    fn test_parse_tlsa_hex() {
        let data = RecordData::parse(RecordType::TLSA, "3 1 1 0aff").unwrap();
        match data {
            RecordData::TLSA { data, .. } => assert_eq!(data, vec![0x0a, 0xff]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(RecordData::parse(RecordType::TLSA, "3 1 1 0af").is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for (record_type, text) in [
            (RecordType::MX, "10 mail.example.com"),
            (RecordType::SRV, "10 5 443 sip.example.com"),
            (RecordType::SOA, "ns1.example.com hostmaster.example.com 1 7200 900 1209600 300"),
            (RecordType::TLSA, "3 1 1 0aff"),
        ] {
            let data = RecordData::parse(record_type, text).unwrap();
            assert_eq!(data.to_string(), text);
        }
    }

    #[test]
    fn test_any_has_no_rdata() {
        assert!(RecordData::parse(RecordType::ANY, "whatever").is_err());
    }
}
