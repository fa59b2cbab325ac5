use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use d7kit_transport::ModemStream;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 512;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads and line noise internally; callers always get
/// complete frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. An
    /// expired read timeout surfaces as an I/O error for which
    /// [`FrameError::is_timeout`] holds; buffered partial input is kept, so
    /// the call can simply be retried.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<ModemStream> {
    /// Create a frame reader for `ModemStream` and apply read timeout from config.
    pub fn with_config_stream(inner: ModemStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: d7kit_transport::TransportError) -> FrameError {
    match err {
        d7kit_transport::TransportError::Io(io) | d7kit_transport::TransportError::Accept(io) => {
            FrameError::Io(io)
        }
        d7kit_transport::TransportError::Open { source, .. }
        | d7kit_transport::TransportError::Configure { source, .. }
        | d7kit_transport::TransportError::Bind { source, .. }
        | d7kit_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::{encode_frame, SYNC_BYTE};
    use crate::message_type::{ALP_DATA, LOGGING, REBOOTED};

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(ALP_DATA, 0, b"hello", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.msg_type, ALP_DATA);
        assert_eq!(frame.payload.as_ref(), b"hello");
    }

    #[test]
    fn read_mixed_message_types() {
        let mut wire = BytesMut::new();
        encode_frame(REBOOTED, 0, b"", &mut wire).unwrap();
        encode_frame(LOGGING, 1, b"init done", &mut wire).unwrap();
        encode_frame(ALP_DATA, 2, &[0x20, 0x40, 0x00, 0x01, 0xAA], &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));

        assert_eq!(reader.read_frame().unwrap().msg_type, REBOOTED);
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"init done");
        let alp = reader.read_frame().unwrap();
        assert_eq!(alp.counter, 2);
        assert_eq!(alp.payload.len(), 5);
    }

    #[test]
    fn partial_read_handling() {
        let mut wire = BytesMut::new();
        encode_frame(ALP_DATA, 4, b"slow", &mut wire).unwrap();

        let byte_reader = ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.counter, 4);
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn line_noise_before_frame_is_skipped() {
        let mut wire = BytesMut::from(&[0x00, 0xFF, 0x13][..]);
        encode_frame(ALP_DATA, 0, b"data", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        assert_eq!(reader.read_frame().unwrap().payload.as_ref(), b"data");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = BytesMut::new();
        partial.put_u8(SYNC_BYTE);
        partial.put_slice(&[0x00, 0x00, ALP_DATA, 16]);
        partial.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut wire = BytesMut::new();
        encode_frame(ALP_DATA, 0, &[0u8; 200], &mut wire).unwrap();

        let cfg = FrameConfig {
            max_payload_size: 16,
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.to_vec()), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn timeout_keeps_partial_frame() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = ModemStream::from_unix(left);
        let cfg = FrameConfig {
            read_timeout: Some(Duration::from_millis(20)),
            ..FrameConfig::default()
        };
        let mut reader =
            FrameReader::with_config_stream(ModemStream::from_unix(right), cfg).unwrap();

        let mut wire = BytesMut::new();
        encode_frame(ALP_DATA, 1, b"split", &mut wire).unwrap();
        std::io::Write::write_all(&mut writer, &wire[..3]).unwrap();

        let err = reader.read_frame().unwrap_err();
        assert!(err.is_timeout());

        std::io::Write::write_all(&mut writer, &wire[3..]).unwrap();
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.payload.as_ref(), b"split");
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_frame(ALP_DATA, 8, b"ok", &mut wire).unwrap();

        let reader = InterruptedThenData {
            interrupted: false,
            bytes: wire.to_vec(),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap();

        assert_eq!(frame.counter, 8);
        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    #[test]
    fn accessors_and_into_inner() {
        let reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert_eq!(reader.config().max_payload_size, 255);
        let _ = reader.get_ref();
        let _inner = reader.into_inner();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
