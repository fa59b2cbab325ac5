use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::traits::ModemStream;

/// Open a modem endpoint by path.
///
/// A path naming a Unix domain socket is connected to; anything else is
/// treated as a serial device and opened at `rate`.
pub fn open_endpoint(path: impl AsRef<Path>, rate: u32) -> Result<ModemStream> {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;

        let is_socket = std::fs::metadata(path)
            .map(|m| m.file_type().is_socket())
            .unwrap_or(false);
        if is_socket {
            debug!(?path, "endpoint is a unix socket");
            return crate::uds::UnixDomainSocket::connect(path);
        }
        debug!(?path, rate, "endpoint is a serial device");
        crate::serial::SerialPort::open(path, rate)
    }

    #[cfg(not(unix))]
    {
        let _ = rate;
        Err(crate::error::TransportError::Open {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "d7kit transports require a Unix host",
            ),
        })
    }
}
