use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use d7kit_transport::ModemStream;

use crate::codec::{encode_frame, Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

/// Writes complete frames to any `Write` stream.
///
/// Owns the rolling frame counter: every frame written gets the next value,
/// wrapping at 255.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    counter: u8,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(HEADER_SIZE + config.max_payload_size),
            inner,
            config,
            counter: 0,
        }
    }

    /// Write a complete frame (blocking). The frame's own counter is ignored.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.msg_type, frame.payload.as_ref())
    }

    /// Encode and send a payload with the given message type.
    pub fn send(&mut self, msg_type: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        encode_frame(msg_type, self.counter, payload, &mut self.buf)?;
        self.counter = self.counter.wrapping_add(1);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Counter value the next frame will carry.
    pub fn next_counter(&self) -> u8 {
        self.counter
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl FrameWriter<ModemStream> {
    /// Create a frame writer for `ModemStream` and apply write timeout from config.
    pub fn with_config_stream(inner: ModemStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_frame, DEFAULT_MAX_PAYLOAD};
    use crate::message_type::{ALP_DATA, PING_REQUEST};
    use crate::reader::FrameReader;

    #[test]
    fn writes_encoded_frame() {
        let mut writer = FrameWriter::new(Vec::new());
        writer.send(ALP_DATA, &[0x01, 0x02]).unwrap();

        assert_eq!(
            writer.into_inner(),
            vec![0xC0, 0x00, 0x00, ALP_DATA, 0x02, 0x01, 0x02]
        );
    }

    #[test]
    fn counter_increments_and_wraps() {
        let mut writer = FrameWriter::new(Vec::new());
        for _ in 0..256 {
            writer.send(PING_REQUEST, b"").unwrap();
        }
        assert_eq!(writer.next_counter(), 0);

        let mut wire = BytesMut::from(writer.into_inner().as_slice());
        let first = decode_frame(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        let second = decode_frame(&mut wire, DEFAULT_MAX_PAYLOAD).unwrap().unwrap();
        assert_eq!((first.counter, second.counter), (0, 1));
    }

    #[test]
    fn rejects_payload_over_config_limit() {
        let cfg = FrameConfig {
            max_payload_size: 8,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Vec::new(), cfg);
        let err = writer.send(ALP_DATA, &[0u8; 9]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 9, max: 8 }));
        assert_eq!(writer.next_counter(), 0);
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn write_zero_is_connection_closed() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(ALP_DATA, b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer =
            FrameWriter::with_config_stream(ModemStream::from_unix(left), FrameConfig::default())
                .unwrap();
        let mut reader = FrameReader::new(ModemStream::from_unix(right));

        writer
            .write_frame(&Frame::new(ALP_DATA, b"command".to_vec()))
            .unwrap();
        writer.send(ALP_DATA, b"second").unwrap();

        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();
        assert_eq!((f1.counter, f1.payload.as_ref()), (0, b"command".as_ref()));
        assert_eq!((f2.counter, f2.payload.as_ref()), (1, b"second".as_ref()));
    }

    #[test]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(ModemStream::from_unix(left));
        let mut reader = FrameReader::new(ModemStream::from_unix(right));

        let reader_thread = std::thread::spawn(move || {
            for expected in 0..64u8 {
                let frame = reader.read_frame().unwrap();
                assert_eq!(frame.counter, expected);
                assert_eq!(frame.payload.as_ref(), format!("msg-{expected}").as_bytes());
            }
        });

        for i in 0..64u8 {
            writer.send(ALP_DATA, format!("msg-{i}").as_bytes()).unwrap();
        }

        reader_thread.join().unwrap();
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
