//! Message framing for stream transports.
//!
//! A frame is a 4-byte big-endian length followed by that many bytes of JSON.

use std::io::{ErrorKind as IoErrorKind, Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transport::TransportError;

/// Largest frame accepted unless configured otherwise (16 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

const HEADER_LEN: usize = 4;

pub fn encode<T: Serialize>(message: &T, max_frame_bytes: usize) -> Result<Vec<u8>, TransportError> {
    let body = serde_json::to_vec(message).map_err(|e| TransportError::Encode(e.to_string()))?;
    check_size(body.len(), max_frame_bytes)?;
    Ok(body)
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, TransportError> {
    serde_json::from_slice(body).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Read just the `request_id` of an envelope whose body does not decode.
pub fn peek_request_id(body: &[u8]) -> Option<Uuid> {
    #[derive(Deserialize)]
    struct IdOnly {
        request_id: Uuid,
    }
    serde_json::from_slice::<IdOnly>(body).ok().map(|id| id.request_id)
}

pub fn write_frame<W: Write>(
    writer: &mut W,
    body: &[u8],
    max_frame_bytes: usize,
) -> Result<(), TransportError> {
    check_size(body.len(), max_frame_bytes)?;
    let len = u32::try_from(body.len()).map_err(|_| TransportError::FrameTooLarge {
        size: body.len(),
        limit: u32::MAX as usize,
    })?;

    writer.write_all(&len.to_be_bytes()).map_err(map_io)?;
    writer.write_all(body).map_err(map_io)?;
    writer.flush().map_err(map_io)
}

/// Read one frame. A peer that hangs up (before or inside a frame) yields
/// [`TransportError::Closed`].
pub fn read_frame<R: Read>(reader: &mut R, max_frame_bytes: usize) -> Result<Vec<u8>, TransportError> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).map_err(map_io)?;

    let len = u32::from_be_bytes(header) as usize;
    check_size(len, max_frame_bytes)?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).map_err(map_io)?;
    Ok(body)
}

pub fn write_message<W: Write, T: Serialize>(
    writer: &mut W,
    message: &T,
    max_frame_bytes: usize,
) -> Result<(), TransportError> {
    let body = encode(message, max_frame_bytes)?;
    write_frame(writer, &body, max_frame_bytes)
}

pub fn read_message<R: Read, T: DeserializeOwned>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<T, TransportError> {
    let body = read_frame(reader, max_frame_bytes)?;
    decode(&body)
}

fn check_size(size: usize, limit: usize) -> Result<(), TransportError> {
    if size > limit {
        Err(TransportError::FrameTooLarge { size, limit })
    } else {
        Ok(())
    }
}

/// Classify I/O errors: read timeouts surface as `WouldBlock` or `TimedOut`
/// depending on the platform.
pub(crate) fn map_io(err: std::io::Error) -> TransportError {
    match err.kind() {
        IoErrorKind::WouldBlock | IoErrorKind::TimedOut => TransportError::Timeout,
        IoErrorKind::UnexpectedEof
        | IoErrorKind::BrokenPipe
        | IoErrorKind::ConnectionReset
        | IoErrorKind::ConnectionAborted => TransportError::Closed,
        _ => TransportError::Io(err),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use cmdgraph_core::{CommandValue, Kwargs};

    #[test]
    fn frame_round_trip() {
        let mut buf = Vec::new();
        write_message(&mut buf, &CommandValue::Map(Kwargs::new()), 1024).unwrap();
        assert_eq!(&buf[..4], &((buf.len() - 4) as u32).to_be_bytes());

        let back: CommandValue = read_message(&mut Cursor::new(buf), 1024).unwrap();
        assert_eq!(back, CommandValue::Map(Kwargs::new()));
    }

    #[test]
    fn oversized_frames_are_rejected_both_ways() {
        let big = CommandValue::from("x".repeat(64));
        let err = write_message(&mut Vec::new(), &big, 16).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { .. }));

        let mut buf = Vec::new();
        write_message(&mut buf, &big, 1024).unwrap();
        let err = read_frame(&mut Cursor::new(buf), 16).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { .. }));
    }

    #[test]
    fn truncated_stream_is_closed() {
        let mut buf = Vec::new();
        write_message(&mut buf, &CommandValue::Int(1), 1024).unwrap();
        buf.truncate(buf.len() - 1);
        let err = read_frame(&mut Cursor::new(buf), 1024).unwrap_err();
        assert!(matches!(err, TransportError::Closed));

        let err = read_frame(&mut Cursor::new(Vec::<u8>::new()), 1024).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"{not json", 1024).unwrap();
        let err = read_message::<_, CommandValue>(&mut Cursor::new(buf), 1024).unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}
