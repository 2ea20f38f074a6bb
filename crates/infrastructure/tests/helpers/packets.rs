use rdns_infrastructure::dns::wire::{decode_name, HEADER_LEN};
use std::net::Ipv4Addr;

pub const RCODE_NOERROR: u8 = 0;
pub const RCODE_SERVFAIL: u8 = 2;
pub const RCODE_NXDOMAIN: u8 = 3;

pub fn query_id(packet: &[u8]) -> u16 {
    u16::from_be_bytes([packet[0], packet[1]])
}

/// Length of the header plus question section of `query`.
fn question_end(query: &[u8]) -> usize {
    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    let mut pos = HEADER_LEN;
    for _ in 0..qdcount {
        let (_, next) = decode_name(query, pos).expect("query name");
        pos = next + 4;
    }
    pos
}

/// A reply echoing the questions of `query`, with raw answer records
/// appended verbatim.
pub fn reply_for(query: &[u8], rcode: u8, answers: &[Vec<u8>], truncated: bool) -> Vec<u8> {
    let end = question_end(query);
    let mut reply = Vec::with_capacity(end + answers.iter().map(Vec::len).sum::<usize>());
    reply.extend_from_slice(&query[0..2]);
    reply.push(0x81 | if truncated { 0x02 } else { 0x00 });
    reply.push(0x80 | (rcode & 0x0F));
    reply.extend_from_slice(&query[4..6]);
    reply.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    reply.extend_from_slice(&[0, 0, 0, 0]);
    reply.extend_from_slice(&query[HEADER_LEN..end]);
    for answer in answers {
        reply.extend_from_slice(answer);
    }
    reply
}

/// A reply whose first question name is replaced by `name`.
pub fn reply_with_question(query: &[u8], name: &str) -> Vec<u8> {
    let end = question_end(query);
    let mut reply = reply_for(query, RCODE_NOERROR, &[], false);
    reply.truncate(HEADER_LEN);
    reply[4..6].copy_from_slice(&1u16.to_be_bytes());
    for label in name.split('.') {
        reply.push(label.len() as u8);
        reply.extend_from_slice(label.as_bytes());
    }
    reply.push(0);
    reply.extend_from_slice(&query[end - 4..end]);
    reply
}

/// An A record owned by the first question name (compression pointer to
/// offset 12).
pub fn a_answer(ip: Ipv4Addr, ttl: u32) -> Vec<u8> {
    let mut rr = vec![0xC0, 0x0C, 0x00, 0x01, 0x00, 0x01];
    rr.extend_from_slice(&ttl.to_be_bytes());
    rr.extend_from_slice(&4u16.to_be_bytes());
    rr.extend_from_slice(&ip.octets());
    rr
}

/// Prefixes `message` with its two-byte length, as on a TCP stream.
pub fn framed(message: &[u8]) -> Vec<u8> {
    let mut out = (message.len() as u16).to_be_bytes().to_vec();
    out.extend_from_slice(message);
    out
}
