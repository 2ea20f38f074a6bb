//! Stream framing for TCP channels: the two-byte length prefix on the way
//! in, and a queue of partially written frames on the way out.

use crate::dns::request::RequestHandle;
use crate::dns::wire::WireError;
use bytes::{Bytes, BytesMut};
use std::collections::VecDeque;
use std::io;

const LENGTH_PREFIX: usize = 2;

/// Reassembles length-prefixed DNS messages from arbitrary read chunks.
#[derive(Debug, Default)]
pub struct TcpFramer {
    prefix: [u8; LENGTH_PREFIX],
    prefix_read: usize,
    expected: usize,
    body: BytesMut,
}

impl TcpFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes `data`, appending every completed message to `out`.
    pub fn feed(&mut self, mut data: &[u8], out: &mut Vec<Bytes>) {
        while !data.is_empty() {
            if self.prefix_read < LENGTH_PREFIX {
                self.prefix[self.prefix_read] = data[0];
                self.prefix_read += 1;
                data = &data[1..];

                if self.prefix_read == LENGTH_PREFIX {
                    self.expected = u16::from_be_bytes(self.prefix) as usize;
                    if self.expected == 0 {
                        self.prefix_read = 0;
                    } else {
                        self.body.reserve(self.expected);
                    }
                }
                continue;
            }

            let take = (self.expected - self.body.len()).min(data.len());
            self.body.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.body.len() == self.expected {
                out.push(self.body.split().freeze());
                self.prefix_read = 0;
                self.expected = 0;
            }
        }
    }

    /// True between messages.
    pub fn is_idle(&self) -> bool {
        self.prefix_read == 0
    }
}

#[derive(Debug)]
struct OutputFrame {
    request: RequestHandle,
    buf: Vec<u8>,
    written: usize,
}

/// FIFO of outbound frames. A frame is popped only once every byte of it,
/// prefix included, has been accepted by the socket.
#[derive(Debug, Default)]
pub struct OutputChain {
    frames: VecDeque<OutputFrame>,
}

impl OutputChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `packet` behind its length prefix. A packet the prefix cannot
    /// describe is refused and the chain is left untouched.
    pub fn push(&mut self, request: RequestHandle, packet: &[u8]) -> Result<(), WireError> {
        let len = u16::try_from(packet.len()).map_err(|_| WireError::MessageTooLong(packet.len()))?;
        let mut buf = Vec::with_capacity(LENGTH_PREFIX + packet.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(packet);
        self.frames.push_back(OutputFrame {
            request,
            buf,
            written: 0,
        });
        Ok(())
    }

    /// Drops queued frames of `request` that have not started going out. A
    /// frame already partially written stays so the stream keeps its framing.
    pub fn remove(&mut self, request: RequestHandle) {
        self.frames
            .retain(|frame| frame.request != request || frame.written > 0);
    }

    /// Writes as much as `write` accepts. Returns the requests whose frames
    /// went out completely. `WouldBlock` stops the drain without error.
    pub fn flush<W>(&mut self, mut write: W) -> io::Result<Vec<RequestHandle>>
    where
        W: FnMut(&[u8]) -> io::Result<usize>,
    {
        let mut sent = Vec::new();
        while let Some(head) = self.frames.front_mut() {
            match write(&head.buf[head.written..]) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                Ok(n) => {
                    head.written += n;
                    if head.written == head.buf.len() {
                        sent.push(head.request);
                        self.frames.pop_front();
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(sent)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Per-connection state of a TCP channel.
#[derive(Debug, Default)]
pub struct TcpChannel {
    pub framer: TcpFramer,
    pub output: OutputChain,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(messages: &[&[u8]]) -> Vec<u8> {
        let mut stream = Vec::new();
        for m in messages {
            stream.extend_from_slice(&(m.len() as u16).to_be_bytes());
            stream.extend_from_slice(m);
        }
        stream
    }

    #[test]
    fn test_whole_stream_at_once() {
        let stream = framed(&[b"first message", b"second"]);
        let mut framer = TcpFramer::new();
        let mut out = Vec::new();

        framer.feed(&stream, &mut out);

        assert_eq!(out, vec![Bytes::from_static(b"first message"), Bytes::from_static(b"second")]);
        assert!(framer.is_idle());
    }

    #[test]
    fn test_byte_at_a_time_matches_bulk() {
        let body: Vec<u8> = (0..=255u8).cycle().take(700).collect();
        let stream = framed(&[&body, b"tail"]);

        let mut bulk = Vec::new();
        TcpFramer::new().feed(&stream, &mut bulk);

        let mut framer = TcpFramer::new();
        let mut trickle = Vec::new();
        for byte in &stream {
            framer.feed(std::slice::from_ref(byte), &mut trickle);
        }

        assert_eq!(bulk, trickle);
        assert_eq!(trickle[0].as_ref(), body.as_slice());
    }

    #[test]
    fn test_split_inside_prefix() {
        let stream = framed(&[b"abc"]);
        let mut framer = TcpFramer::new();
        let mut out = Vec::new();

        framer.feed(&stream[..1], &mut out);
        assert!(out.is_empty());
        assert!(!framer.is_idle());
        framer.feed(&stream[1..], &mut out);
        assert_eq!(out, vec![Bytes::from_static(b"abc")]);
    }

    #[test]
    fn test_zero_length_frame_skipped() {
        let mut stream = vec![0, 0];
        stream.extend(framed(&[b"x"]));
        let mut out = Vec::new();
        TcpFramer::new().feed(&stream, &mut out);
        assert_eq!(out, vec![Bytes::from_static(b"x")]);
    }

    #[test]
    fn test_partial_writes_keep_order() {
        let mut chain = OutputChain::new();
        chain.push(RequestHandle(1), b"hello").unwrap();
        chain.push(RequestHandle(2), b"world!").unwrap();

        let mut wire = Vec::new();
        let mut budget = 3;
        let sent = chain
            .flush(|buf| {
                if budget == 0 {
                    return Err(io::ErrorKind::WouldBlock.into());
                }
                budget -= 1;
                let n = buf.len().min(3);
                wire.extend_from_slice(&buf[..n]);
                Ok(n)
            })
            .unwrap();
        // three writes of at most three bytes finish the 7-byte first frame
        assert_eq!(sent, vec![RequestHandle(1)]);
        assert_eq!(chain.len(), 1);

        let sent = chain
            .flush(|buf| {
                wire.extend_from_slice(buf);
                Ok(buf.len())
            })
            .unwrap();
        assert_eq!(sent, vec![RequestHandle(2)]);
        assert!(chain.is_empty());
        assert_eq!(wire, framed(&[b"hello", b"world!"]));
    }

    #[test]
    fn test_remove_keeps_started_frame() {
        let mut chain = OutputChain::new();
        chain.push(RequestHandle(1), b"abcd").unwrap();
        chain.push(RequestHandle(2), b"efgh").unwrap();

        let mut budget = 1;
        chain
            .flush(|_| {
                if budget == 0 {
                    return Err(io::ErrorKind::WouldBlock.into());
                }
                budget -= 1;
                Ok(1)
            })
            .unwrap();

        chain.remove(RequestHandle(1));
        chain.remove(RequestHandle(2));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_oversized_packet_refused() {
        let mut chain = OutputChain::new();
        let packet = vec![0u8; u16::MAX as usize + 1];
        assert_eq!(
            chain.push(RequestHandle(1), &packet),
            Err(WireError::MessageTooLong(65_536))
        );
        assert!(chain.is_empty());

        chain.push(RequestHandle(2), &packet[..u16::MAX as usize]).unwrap();
        let mut wire = Vec::new();
        chain
            .flush(|buf| {
                wire.extend_from_slice(buf);
                Ok(buf.len())
            })
            .unwrap();
        assert_eq!(&wire[..2], &[0xFF, 0xFF]);
        assert_eq!(wire.len(), 2 + u16::MAX as usize);
    }

    #[test]
    fn test_write_error_propagates() {
        let mut chain = OutputChain::new();
        chain.push(RequestHandle(1), b"abcd").unwrap();
        let err = chain
            .flush(|_| Err(io::ErrorKind::BrokenPipe.into()))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(chain.len(), 1);
    }
}
