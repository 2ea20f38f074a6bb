use super::{encode_name, Header, WireError, CLASS_IN, MAX_MESSAGE_LEN, UDP_PACKET_SIZE};
use rdns_domain::{RecordType, RequestName};

const EDNS_DO_BIT: u16 = 0x8000;

pub struct MessageBuilder;

impl MessageBuilder {
    /// Builds a recursive query carrying every name as a question, followed
    /// by an EDNS0 OPT record advertising our UDP buffer size.
    ///
    /// Fails when the message could not be framed for TCP. Callers decide
    /// what to do with messages larger than a UDP datagram.
    pub fn build_query(
        id: u16,
        names: &[RequestName],
        dnssec: bool,
    ) -> Result<Vec<u8>, WireError> {
        let qdcount =
            u16::try_from(names.len()).map_err(|_| WireError::TooManyQuestions(names.len()))?;
        let mut header = Header::query(id, qdcount);
        header.arcount = 1;

        let mut buf = Vec::with_capacity(64 * names.len().max(1));
        buf.extend_from_slice(&header.to_bytes());

        for question in names {
            encode_name(&question.name, &mut buf)?;
            buf.extend_from_slice(&question.record_type.to_u16().to_be_bytes());
            buf.extend_from_slice(&CLASS_IN.to_be_bytes());
        }

        Self::append_opt(&mut buf, dnssec);
        if buf.len() > MAX_MESSAGE_LEN {
            return Err(WireError::MessageTooLong(buf.len()));
        }
        Ok(buf)
    }

    fn append_opt(buf: &mut Vec<u8>, dnssec: bool) {
        buf.push(0);
        buf.extend_from_slice(&RecordType::OPT.to_u16().to_be_bytes());
        buf.extend_from_slice(&(UDP_PACKET_SIZE as u16).to_be_bytes());
        // extended rcode and version
        buf.extend_from_slice(&[0, 0]);
        let flags = if dnssec { EDNS_DO_BIT } else { 0 };
        buf.extend_from_slice(&flags.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
    }
}
