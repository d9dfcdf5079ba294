//! Framed codec for the spectro wire protocol.
//!
//! # Wire Protocol
//!
//! ```text
//! Client ──► Server   one ASCII command token, `\n`-terminated
//!                     e.g. `DARK_REFERENCE\n`
//!
//! Server ──► Client   one JSON object per reply, `\n`-terminated
//!                     {"status":"ok","wavelength":[...],"intensity":[...]}
//! ```
//!
//! Framing is newline-delimited in **both** directions. The decoder is
//! resumable: bytes may arrive at arbitrary boundaries, and an
//! unterminated frame is reported as [`ProtocolError::Incomplete`]
//! (surfaced as `Ok(None)` through `tokio_util`'s `Decoder`), never as a
//! caller-visible failure. Numeric values are passed through unchanged:
//! no unit conversion, no NaN policing.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::command::Command;
use crate::error::{ClientError, ConnectionError, ProtocolError};
use crate::measurement::Reply;

/// Upper bound on one accumulated reply frame. A spectrum of a few
/// thousand samples is well under 1 MiB; anything past this cap is a
/// runaway or garbage stream.
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

// ── Pure decode core ─────────────────────────────────────────────

/// Try to split one complete reply frame off the front of `src`.
///
/// On success the frame (including its terminator) is consumed from
/// `src`. [`ProtocolError::Incomplete`] means "keep reading"; only
/// [`ProtocolError::Malformed`] is terminal.
pub fn decode_frame(src: &mut BytesMut) -> Result<Reply, ProtocolError> {
    let Some(pos) = src.iter().position(|&b| b == b'\n') else {
        if src.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::Malformed(format!(
                "unterminated reply exceeds {MAX_FRAME_SIZE} bytes"
            )));
        }
        return Err(ProtocolError::Incomplete);
    };

    let frame = src.split_to(pos + 1);
    let mut line = &frame[..pos];
    if line.last() == Some(&b'\r') {
        line = &line[..line.len() - 1];
    }
    parse_reply(line)
}

/// Parse one terminator-stripped reply line.
fn parse_reply(line: &[u8]) -> Result<Reply, ProtocolError> {
    let reply: Reply = serde_json::from_slice(line).map_err(ProtocolError::malformed)?;
    if reply.wavelength.len() != reply.intensity.len() {
        return Err(ProtocolError::Malformed(format!(
            "sample arrays disagree: {} wavelengths vs {} intensities",
            reply.wavelength.len(),
            reply.intensity.len()
        )));
    }
    Ok(reply)
}

// ── Codec ────────────────────────────────────────────────────────

/// `tokio_util` codec speaking the spectro wire protocol.
#[derive(Debug, Default)]
pub struct SpectroCodec;

impl Decoder for SpectroCodec {
    type Item = Reply;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match decode_frame(src) {
            Ok(reply) => Ok(Some(reply)),
            Err(ProtocolError::Incomplete) => Ok(None),
            Err(malformed) => Err(malformed.into()),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(reply) => Ok(Some(reply)),
            // Leftover bytes at EOF mean the peer closed mid-record.
            None if src.is_empty() => Ok(None),
            None => Err(ConnectionError::Closed.into()),
        }
    }
}

impl Encoder<Command> for SpectroCodec {
    type Error = ClientError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let token = item.token();
        dst.reserve(token.len() + 1);
        dst.put_slice(token.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use tokio_util::codec::Framed;

    use super::*;
    use crate::command::ALL_COMMANDS;

    const REPLY: &[u8] = br#"{"status":"ok","wavelength":[400.0,401.0],"intensity":[0.1,0.2]}"#;

    fn reply_line() -> BytesMut {
        let mut buf = BytesMut::from(REPLY);
        buf.put_u8(b'\n');
        buf
    }

    #[test]
    fn encode_appends_terminator() {
        let mut codec = SpectroCodec;
        for cmd in ALL_COMMANDS {
            let mut dst = BytesMut::new();
            codec.encode(cmd, &mut dst).unwrap();
            assert_eq!(&dst[..dst.len() - 1], cmd.token().as_bytes());
            assert_eq!(dst.last(), Some(&b'\n'));
        }
    }

    #[test]
    fn decode_one_shot() {
        let mut src = reply_line();
        let reply = decode_frame(&mut src).unwrap();
        assert_eq!(reply.status, "ok");
        assert_eq!(reply.wavelength, vec![400.0, 401.0]);
        assert_eq!(reply.intensity, vec![0.1, 0.2]);
        assert!(src.is_empty());
    }

    #[test]
    fn decode_without_terminator_is_incomplete() {
        let mut src = BytesMut::from(REPLY);
        assert!(matches!(
            decode_frame(&mut src),
            Err(ProtocolError::Incomplete)
        ));
        // The buffer is untouched so the caller can keep accumulating.
        assert_eq!(src.len(), REPLY.len());
    }

    /// Resumable-decode property: splitting the reply at every byte
    /// boundary yields the same result as feeding it in one shot.
    #[test]
    fn decode_at_every_split_point() {
        let full = reply_line();
        let mut expected = full.clone();
        let expected = decode_frame(&mut expected).unwrap();

        for split in 1..full.len() {
            let mut codec = SpectroCodec;
            let mut src = BytesMut::from(&full[..split]);
            let first = codec.decode(&mut src).unwrap();
            assert_eq!(first, None, "premature frame at split {split}");
            src.extend_from_slice(&full[split..]);
            let reply = codec.decode(&mut src).unwrap().unwrap();
            assert_eq!(reply, expected, "mismatch at split {split}");
        }
    }

    #[test]
    fn decode_two_frames_back_to_back() {
        let mut src = reply_line();
        src.extend_from_slice(&reply_line());
        let mut codec = SpectroCodec;
        assert!(codec.decode(&mut src).unwrap().is_some());
        assert!(codec.decode(&mut src).unwrap().is_some());
        assert!(codec.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn malformed_json_is_terminal() {
        let mut codec = SpectroCodec;
        let mut src = BytesMut::from(&b"this is not json\n"[..]);
        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn mismatched_arrays_are_malformed() {
        let mut src =
            BytesMut::from(&br#"{"status":"ok","wavelength":[400.0],"intensity":[]}"#[..]);
        src.put_u8(b'\n');
        let err = decode_frame(&mut src).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn missing_field_is_malformed() {
        let mut src = BytesMut::from(&br#"{"status":"ok","wavelength":[400.0]}"#[..]);
        src.put_u8(b'\n');
        assert!(matches!(
            decode_frame(&mut src),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut src = BytesMut::from(
            &br#"{"status":"ok","wavelength":[650.0],"intensity":[2000.0],"gain":4}"#[..],
        );
        src.put_u8(b'\n');
        let reply = decode_frame(&mut src).unwrap();
        assert_eq!(reply.wavelength, vec![650.0]);
    }

    #[test]
    fn eof_with_partial_frame_is_closed() {
        let mut codec = SpectroCodec;
        let mut src = BytesMut::from(&REPLY[..20]);
        let err = codec.decode_eof(&mut src).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Connection(ConnectionError::Closed)
        ));
    }

    #[test]
    fn eof_with_empty_buffer_is_clean() {
        let mut codec = SpectroCodec;
        let mut src = BytesMut::new();
        assert!(codec.decode_eof(&mut src).unwrap().is_none());
    }

    #[test]
    fn oversized_unterminated_frame_is_malformed() {
        let mut codec = SpectroCodec;
        // No terminator anywhere in sight and the cap already blown.
        let mut src = BytesMut::zeroed(MAX_FRAME_SIZE + 1);
        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Protocol(ProtocolError::Malformed(_))
        ));
    }

    /// Drive the codec through `Framed` against a scripted stream that
    /// delivers the reply in three arbitrary chunks.
    #[tokio::test]
    async fn framed_reassembles_partial_reads() {
        let mock = tokio_test::io::Builder::new()
            .write(b"DARK_REFERENCE\n")
            .read(&REPLY[..10])
            .read(&REPLY[10..40])
            .read(&reply_line()[40..])
            .build();

        let mut framed = Framed::new(mock, SpectroCodec);
        framed.send(Command::DarkReference).await.unwrap();
        let reply = framed.next().await.unwrap().unwrap();
        assert_eq!(reply.wavelength.len(), 2);
    }
}
