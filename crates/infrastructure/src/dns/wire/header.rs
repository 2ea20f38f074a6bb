use super::{read_u16, WireError, HEADER_LEN};

const QR: u8 = 0x80;
const AA: u8 = 0x04;
const TC: u8 = 0x02;
const RD: u8 = 0x01;
const RA: u8 = 0x80;
const Z: u8 = 0x40;
const AD: u8 = 0x20;
const CD: u8 = 0x10;

/// The fixed 12-byte DNS header, always handled in network byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub id: u16,
    pub qr: bool,
    pub opcode: u8,
    pub aa: bool,
    pub tc: bool,
    pub rd: bool,
    pub ra: bool,
    pub z: bool,
    pub ad: bool,
    pub cd: bool,
    pub rcode: u8,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    /// Standard recursive query header.
    pub fn query(id: u16, qdcount: u16) -> Self {
        Self {
            id,
            rd: true,
            qdcount,
            ..Self::default()
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut flags_hi = (self.opcode & 0x0F) << 3;
        if self.qr {
            flags_hi |= QR;
        }
        if self.aa {
            flags_hi |= AA;
        }
        if self.tc {
            flags_hi |= TC;
        }
        if self.rd {
            flags_hi |= RD;
        }

        let mut flags_lo = self.rcode & 0x0F;
        if self.ra {
            flags_lo |= RA;
        }
        if self.z {
            flags_lo |= Z;
        }
        if self.ad {
            flags_lo |= AD;
        }
        if self.cd {
            flags_lo |= CD;
        }

        let mut buf = [0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&self.id.to_be_bytes());
        buf[2] = flags_hi;
        buf[3] = flags_lo;
        buf[4..6].copy_from_slice(&self.qdcount.to_be_bytes());
        buf[6..8].copy_from_slice(&self.ancount.to_be_bytes());
        buf[8..10].copy_from_slice(&self.nscount.to_be_bytes());
        buf[10..12].copy_from_slice(&self.arcount.to_be_bytes());
        buf
    }

    pub fn parse(buf: &[u8]) -> Result<Self, WireError> {
        if buf.len() < HEADER_LEN {
            return Err(WireError::Truncated { offset: buf.len() });
        }
        let flags_hi = buf[2];
        let flags_lo = buf[3];

        Ok(Self {
            id: read_u16(buf, 0)?,
            qr: flags_hi & QR != 0,
            opcode: (flags_hi >> 3) & 0x0F,
            aa: flags_hi & AA != 0,
            tc: flags_hi & TC != 0,
            rd: flags_hi & RD != 0,
            ra: flags_lo & RA != 0,
            z: flags_lo & Z != 0,
            ad: flags_lo & AD != 0,
            cd: flags_lo & CD != 0,
            rcode: flags_lo & 0x0F,
            qdcount: read_u16(buf, 4)?,
            ancount: read_u16(buf, 6)?,
            nscount: read_u16(buf, 8)?,
            arcount: read_u16(buf, 10)?,
        })
    }

    /// Transaction id of a packet without decoding the rest.
    pub fn peek_id(buf: &[u8]) -> Option<u16> {
        read_u16(buf, 0).ok()
    }

    /// Rewrites the transaction id in place.
    pub fn set_id(buf: &mut [u8], id: u16) {
        if buf.len() >= 2 {
            buf[0..2].copy_from_slice(&id.to_be_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_header_layout() {
        let bytes = Header::query(0xBEEF, 2).to_bytes();

        assert_eq!(&bytes[0..2], &[0xBE, 0xEF]);
        // RD only
        assert_eq!(bytes[2], 0x01);
        assert_eq!(bytes[3], 0x00);
        assert_eq!(&bytes[4..6], &[0x00, 0x02]);
    }

    #[test]
    fn test_flag_bits_match_rfc1035_layout() {
        let header = Header {
            qr: true,
            opcode: 2,
            aa: true,
            tc: true,
            rd: true,
            ra: true,
            ad: true,
            cd: true,
            rcode: 3,
            ..Header::default()
        };
        let bytes = header.to_bytes();

        assert_eq!(bytes[2], 0b1_0010_1_1_1);
        assert_eq!(bytes[3], 0b1_0_1_1_0011);
        assert_eq!(Header::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_parse_typical_response_flags() {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[2] = 0x81;
        bytes[3] = 0x83;

        let header = Header::parse(&bytes).unwrap();
        assert!(header.qr);
        assert!(header.rd);
        assert!(header.ra);
        assert!(!header.tc);
        assert_eq!(header.rcode, 3);
    }

    #[test]
    fn test_short_header_rejected() {
        assert_eq!(
            Header::parse(&[0u8; 11]),
            Err(WireError::Truncated { offset: 11 })
        );
    }

    #[test]
    fn test_set_id_rewrites_first_two_bytes() {
        let mut bytes = Header::query(1, 1).to_bytes().to_vec();
        Header::set_id(&mut bytes, 0x1234);
        assert_eq!(Header::peek_id(&bytes), Some(0x1234));
        assert_eq!(bytes[2], 0x01);
    }
}
