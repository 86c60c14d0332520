//! Packet framing over a byte stream.
//!
//! [`Framer`] owns the transport and the packet sequence counter, turning
//! the stream of length-prefixed, sequence-numbered frames into whole
//! logical payloads and back:
//!
//! - on write, payloads of `MAX_PACKET_SIZE` bytes or more are split into
//!   successive max-size frames, with an explicit empty terminal frame
//!   when the payload is an exact multiple of the frame size;
//! - on read, full-size frames with consecutive sequence numbers are
//!   concatenated until a shorter frame arrives.
//!
//! Every frame's sequence number is verified against the counter. A
//! mismatch is a protocol violation and is never silently resynchronized;
//! the connection owning this framer must treat it as fatal.

use std::io::{Read, Write};

use sqlwire_core::{Error, Result};

use crate::protocol::{MAX_PACKET_SIZE, PacketHeader, writer::split_into_frames};

/// Frames and reassembles packets over a duplex byte stream.
#[derive(Debug)]
pub struct Framer<S> {
    stream: S,
    sequence_id: u8,
    max_frame: usize,
}

impl<S: Read + Write> Framer<S> {
    /// Create a framer over a freshly-connected stream.
    pub fn new(stream: S) -> Self {
        Self::with_max_frame(stream, MAX_PACKET_SIZE)
    }

    /// Create a framer with a non-standard frame size. Only useful for
    /// exercising the split/reassembly paths without 16MB payloads.
    pub(crate) fn with_max_frame(stream: S, max_frame: usize) -> Self {
        Self {
            stream,
            sequence_id: 0,
            max_frame,
        }
    }

    /// Rebuild a framer from a stream and an in-flight sequence counter.
    ///
    /// Used when the transport is swapped mid-handshake (TLS upgrade): the
    /// sequence numbering continues across the swap.
    pub fn from_parts(stream: S, sequence_id: u8) -> Self {
        Self {
            stream,
            sequence_id,
            max_frame: MAX_PACKET_SIZE,
        }
    }

    /// Tear the framer apart, returning the stream and the sequence counter.
    pub fn into_parts(self) -> (S, u8) {
        (self.stream, self.sequence_id)
    }

    /// The sequence number the next frame will carry (or must carry, on read).
    pub fn sequence(&self) -> u8 {
        self.sequence_id
    }

    /// Reset the sequence counter, done at the start of every command.
    pub fn reset_sequence(&mut self) {
        self.sequence_id = 0;
    }

    /// Mutable access to the underlying stream.
    pub fn stream_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Write one logical payload, splitting into frames as needed.
    pub fn write_packet(&mut self, payload: &[u8]) -> Result<()> {
        let framed = split_into_frames(payload, self.sequence_id, self.max_frame);

        let frames = if payload.len() < self.max_frame {
            1
        } else {
            payload.len() / self.max_frame + 1
        };
        self.sequence_id = self.sequence_id.wrapping_add(frames as u8);

        self.stream
            .write_all(&framed)
            .map_err(|e| Error::from_io(e, "failed to write packet"))?;
        self.stream
            .flush()
            .map_err(|e| Error::from_io(e, "failed to flush stream"))?;
        Ok(())
    }

    /// Read one logical payload, reassembling multi-frame messages.
    pub fn read_packet(&mut self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();

        loop {
            let header = self.read_frame_header()?;

            if header.sequence_id != self.sequence_id {
                return Err(Error::protocol(format!(
                    "packets out of order: got sequence {}, expected {}",
                    header.sequence_id, self.sequence_id
                )));
            }
            self.sequence_id = self.sequence_id.wrapping_add(1);

            let frame_len = header.payload_length as usize;
            if frame_len > 0 {
                let start = payload.len();
                payload.resize(start + frame_len, 0);
                self.stream
                    .read_exact(&mut payload[start..])
                    .map_err(|e| Error::from_io(e, "failed to read packet payload"))?;
            }

            if frame_len < self.max_frame {
                break;
            }
        }

        Ok(payload)
    }

    fn read_frame_header(&mut self) -> Result<PacketHeader> {
        let mut header_buf = [0u8; PacketHeader::SIZE];
        self.stream
            .read_exact(&mut header_buf)
            .map_err(|e| Error::from_io(e, "failed to read packet header"))?;
        Ok(PacketHeader::from_bytes(&header_buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlwire_core::ErrorKind;
    use std::io::Cursor;

    /// Duplex test stream: reads from a scripted buffer, captures writes.
    struct Pipe {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Pipe {
        fn new(input: Vec<u8>) -> Self {
            Self {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }
    }

    impl Read for Pipe {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Pipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn roundtrip(payload: &[u8], max_frame: usize) -> Vec<u8> {
        let mut writer = Framer::with_max_frame(Pipe::new(Vec::new()), max_frame);
        writer.write_packet(payload).unwrap();
        let (pipe, _) = writer.into_parts();

        let mut reader = Framer::with_max_frame(Pipe::new(pipe.output), max_frame);
        reader.read_packet().unwrap()
    }

    #[test]
    fn roundtrip_small_payload() {
        assert_eq!(roundtrip(b"hello", 16), b"hello");
        assert_eq!(roundtrip(b"", 16), b"");
    }

    #[test]
    fn roundtrip_split_payload() {
        let payload: Vec<u8> = (0..40u8).collect();
        assert_eq!(roundtrip(&payload, 16), payload);
    }

    #[test]
    fn roundtrip_exact_multiple_of_frame_size() {
        // Exact multiples must carry a trailing empty frame and still
        // reconstruct byte-for-byte.
        let payload = vec![0x5A; 48];
        assert_eq!(roundtrip(&payload, 16), payload);

        let payload = vec![0xA5; 16];
        assert_eq!(roundtrip(&payload, 16), payload);
    }

    #[test]
    fn split_consumes_consecutive_sequence_numbers() {
        // Three full frames plus the empty terminal frame: sequences 0-3.
        let payload = vec![1u8; 48];
        let mut writer = Framer::with_max_frame(Pipe::new(Vec::new()), 16);
        writer.write_packet(&payload).unwrap();
        assert_eq!(writer.sequence(), 4);

        let (pipe, _) = writer.into_parts();
        let wire = pipe.output;
        let seqs: Vec<u8> = wire
            .chunks(4 + 16)
            .map(|frame| frame[3])
            .collect();
        assert_eq!(seqs, vec![0, 1, 2, 3]);

        let mut reader = Framer::with_max_frame(Pipe::new(wire), 16);
        assert_eq!(reader.read_packet().unwrap(), payload);
        assert_eq!(reader.sequence(), 4);
    }

    #[test]
    fn sequence_mismatch_is_protocol_error() {
        // A frame claiming sequence 5 when 0 is expected.
        let wire = vec![0x02, 0x00, 0x00, 0x05, 0xAA, 0xBB];
        let mut framer = Framer::new(Pipe::new(wire));
        let err = framer.read_packet().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Protocol);
    }

    #[test]
    fn sequence_counter_wraps() {
        let mut framer = Framer::new(Pipe::new(Vec::new()));
        framer.sequence_id = 255;
        framer.write_packet(b"x").unwrap();
        assert_eq!(framer.sequence(), 0);
    }

    #[test]
    fn truncated_stream_is_connection_error() {
        // Header promises 10 bytes, stream ends after 2.
        let wire = vec![0x0A, 0x00, 0x00, 0x00, 0x01, 0x02];
        let mut framer = Framer::new(Pipe::new(wire));
        let err = framer.read_packet().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConnectionClosed);
    }
}
