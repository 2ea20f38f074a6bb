use super::{
    decode_name, normalize_name, read_u16, read_u32, Header, WireError, CLASS_IN, HEADER_LEN,
};
use rdns_domain::{RecordData, RecordType, ReplyEntry, RequestName, ResultCode};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of decoding a reply against the request that produced it.
#[derive(Debug, Clone)]
pub struct ParsedReply {
    pub header: Header,
    pub code: ResultCode,
    pub entries: Vec<ReplyEntry>,
}

impl ParsedReply {
    pub fn truncated(&self) -> bool {
        self.header.tc
    }

    pub fn authenticated(&self) -> bool {
        self.header.ad
    }
}

pub struct ResponseParser;

impl ResponseParser {
    /// Decodes `packet` as the reply to `names`.
    ///
    /// The question section must echo the request exactly. Only answers of a
    /// requested type are kept; a successful reply that keeps nothing is
    /// reported as `NOREC`.
    pub fn parse(packet: &[u8], names: &[RequestName]) -> Result<ParsedReply, WireError> {
        let header = Header::parse(packet)?;
        if !header.qr {
            return Err(WireError::NotAReply);
        }

        let mut pos = Self::check_questions(packet, &header, names)?;

        let code = ResultCode::from_wire(header.rcode).unwrap_or_else(|| {
            debug!(rcode = header.rcode, "Unknown rcode in reply, treating as SERVFAIL");
            ResultCode::ServFail
        });

        let mut entries = Vec::with_capacity(header.ancount as usize);
        for _ in 0..header.ancount {
            match Self::parse_answer(packet, pos, names) {
                Ok((entry, next)) => {
                    if let Some(entry) = entry {
                        entries.push(entry);
                    }
                    pos = next;
                }
                // a truncated reply keeps whatever answers fit
                Err(WireError::Truncated { .. }) if header.tc => break,
                Err(e) => return Err(e),
            }
        }

        let code = if code == ResultCode::NoError && entries.is_empty() {
            ResultCode::NoRec
        } else {
            code
        };

        Ok(ParsedReply {
            header,
            code,
            entries,
        })
    }

    fn check_questions(
        packet: &[u8],
        header: &Header,
        names: &[RequestName],
    ) -> Result<usize, WireError> {
        if header.qdcount as usize != names.len() {
            return Err(WireError::QuestionMismatch);
        }

        let mut pos = HEADER_LEN;
        for expected in names {
            let (name, next) = decode_name(packet, pos)?;
            let qtype = read_u16(packet, next)?;
            let qclass = read_u16(packet, next + 2)?;

            if normalize_name(&name) != normalize_name(&expected.name)
                || qtype != expected.record_type.to_u16()
                || qclass != CLASS_IN
            {
                return Err(WireError::QuestionMismatch);
            }
            pos = next + 4;
        }
        Ok(pos)
    }

    fn parse_answer(
        packet: &[u8],
        pos: usize,
        names: &[RequestName],
    ) -> Result<(Option<ReplyEntry>, usize), WireError> {
        let (_, pos) = decode_name(packet, pos)?;
        let rtype = read_u16(packet, pos)?;
        let ttl = read_u32(packet, pos + 4)?;
        let rdlen = read_u16(packet, pos + 8)? as usize;
        let start = pos + 10;
        let end = start + rdlen;
        if end > packet.len() {
            return Err(WireError::Truncated { offset: start });
        }

        let Some(record_type) = RecordType::from_u16(rtype) else {
            trace!(rtype, "Skipping answer of unknown type");
            return Ok((None, end));
        };
        if !names.iter().any(|n| n.record_type.matches(record_type)) {
            return Ok((None, end));
        }

        let entry = decode_rdata(packet, record_type, start, end)?
            .map(|data| ReplyEntry::new(data, ttl));
        Ok((entry, end))
    }
}

/// Decodes one RDATA field spanning `start..end`. Returns `None` for types
/// we carry no representation for.
fn decode_rdata(
    packet: &[u8],
    record_type: RecordType,
    start: usize,
    end: usize,
) -> Result<Option<RecordData>, WireError> {
    let rdata = &packet[start..end];
    let bad = |reason| WireError::BadRdata {
        record_type,
        reason,
    };
    let name_at = |offset: usize| -> Result<(Arc<str>, usize), WireError> {
        let (name, next) = decode_name(packet, offset)?;
        if next > end {
            return Err(bad("name overruns rdata"));
        }
        Ok((name.into(), next))
    };

    let data = match record_type {
        RecordType::A => {
            let octets: [u8; 4] = rdata.try_into().map_err(|_| bad("expected 4 bytes"))?;
            RecordData::A(Ipv4Addr::from(octets))
        }
        RecordType::AAAA => {
            let octets: [u8; 16] = rdata.try_into().map_err(|_| bad("expected 16 bytes"))?;
            RecordData::AAAA(Ipv6Addr::from(octets))
        }
        RecordType::NS => RecordData::NS(name_at(start)?.0),
        RecordType::CNAME => RecordData::CNAME(name_at(start)?.0),
        RecordType::PTR => RecordData::PTR(name_at(start)?.0),
        RecordType::MX => {
            if rdata.len() < 3 {
                return Err(bad("too short"));
            }
            RecordData::MX {
                priority: read_u16(packet, start)?,
                exchange: name_at(start + 2)?.0,
            }
        }
        RecordType::TXT => RecordData::TXT(character_strings(rdata).ok_or(bad("bad string"))?),
        RecordType::SPF => RecordData::SPF(character_strings(rdata).ok_or(bad("bad string"))?),
        RecordType::SRV => {
            if rdata.len() < 7 {
                return Err(bad("too short"));
            }
            RecordData::SRV {
                priority: read_u16(packet, start)?,
                weight: read_u16(packet, start + 2)?,
                port: read_u16(packet, start + 4)?,
                target: name_at(start + 6)?.0,
            }
        }
        RecordType::SOA => {
            let (mname, next) = name_at(start)?;
            let (admin, next) = name_at(next)?;
            if next + 20 > end {
                return Err(bad("too short"));
            }
            RecordData::SOA {
                mname,
                admin,
                serial: read_u32(packet, next)?,
                refresh: read_u32(packet, next + 4)?,
                retry: read_u32(packet, next + 8)?,
                expire: read_u32(packet, next + 12)?,
                minimum: read_u32(packet, next + 16)?,
            }
        }
        RecordType::TLSA => {
            if rdata.len() < 3 {
                return Err(bad("too short"));
            }
            RecordData::TLSA {
                usage: rdata[0],
                selector: rdata[1],
                match_type: rdata[2],
                data: rdata[3..].to_vec(),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(data))
}

/// Concatenates the character-strings of a TXT-like record.
fn character_strings(mut rdata: &[u8]) -> Option<Arc<str>> {
    let mut text = String::new();
    while let Some((&len, rest)) = rdata.split_first() {
        let chunk = rest.get(..len as usize)?;
        text.push_str(&String::from_utf8_lossy(chunk));
        rdata = &rest[len as usize..];
    }
    Some(text.into())
}
