use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A connected modem stream. Implements Read + Write.
///
/// This is the fundamental I/O type returned by transport operations.
/// It wraps either a raw-mode serial TTY or a Unix domain socket stream.
pub struct ModemStream {
    inner: ModemStreamInner,
}

enum ModemStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
    #[cfg(unix)]
    Serial(crate::serial::SerialStream),
}

impl Read for ModemStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.read(buf),
            #[cfg(unix)]
            ModemStreamInner::Serial(stream) => stream.read(buf),
        }
    }
}

impl Write for ModemStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.write(buf),
            #[cfg(unix)]
            ModemStreamInner::Serial(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.flush(),
            #[cfg(unix)]
            ModemStreamInner::Serial(stream) => stream.flush(),
        }
    }
}

impl ModemStream {
    /// Wrap a connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: ModemStreamInner::Unix(stream),
        }
    }

    #[cfg(unix)]
    pub(crate) fn from_serial(stream: crate::serial::SerialStream) -> Self {
        Self {
            inner: ModemStreamInner::Serial(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    ///
    /// On a serial line the timeout is rounded up to whole deciseconds and
    /// capped at 25.5 s (termios `VTIME`). An expired read fails with
    /// `ErrorKind::TimedOut` or `ErrorKind::WouldBlock` depending on the
    /// variant; callers should treat both as "no data yet".
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ModemStreamInner::Serial(stream) => {
                stream.set_read_timeout(timeout).map_err(Into::into)
            }
        }
    }

    /// Set write timeout on the underlying stream.
    ///
    /// Serial writes are paced by the UART and always block; the timeout is
    /// ignored there.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ModemStreamInner::Serial(_) => Ok(()),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            ModemStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
            #[cfg(unix)]
            ModemStreamInner::Serial(stream) => Ok(Self::from_serial(stream.try_clone()?)),
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            ModemStreamInner::Unix(_) => "unix-domain-socket",
            #[cfg(unix)]
            ModemStreamInner::Serial(_) => "serial",
        }
    }
}

impl std::fmt::Debug for ModemStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModemStream")
            .field("type", &self.transport_name())
            .finish()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn unix_pair_reads_and_writes() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut left = ModemStream::from_unix(left);
        let mut right = ModemStream::from_unix(right);

        left.write_all(&[0xC0, 0x00]).unwrap();
        let mut buf = [0u8; 2];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0xC0, 0x00]);
        assert_eq!(left.transport_name(), "unix-domain-socket");
    }

    #[test]
    fn read_timeout_expires_without_data() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut stream = ModemStream::from_unix(left);
        stream
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();

        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::WouldBlock | ErrorKind::TimedOut
        ));
    }

    #[test]
    fn cloned_stream_shares_connection() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let left = ModemStream::from_unix(left);
        let mut writer = left.try_clone().unwrap();
        let mut right = ModemStream::from_unix(right);

        writer.write_all(b"uid").unwrap();
        let mut buf = [0u8; 3];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"uid");
        assert!(format!("{left:?}").contains("unix"));
    }
}
