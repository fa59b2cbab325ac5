use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::ModemStream;

/// Serial TTY transport.
///
/// Opens the device node without making it the controlling terminal, puts
/// the line in raw 8N1 mode at the requested baud rate and discards any
/// bytes the modem emitted before we attached.
pub struct SerialPort;

impl SerialPort {
    /// Default baud rate of the modem serial interface.
    pub const DEFAULT_RATE: u32 = 115_200;

    /// Open and configure a serial device (blocking reads, no timeout).
    pub fn open(path: impl AsRef<Path>, rate: u32) -> Result<ModemStream> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(rate).ok_or(TransportError::UnsupportedRate(rate))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        configure_raw(&file, speed).map_err(|source| TransportError::Configure {
            path: path.clone(),
            source,
        })?;

        debug!(?path, rate, "opened serial device");

        Ok(ModemStream::from_serial(SerialStream {
            file,
            path,
            timed_reads: Arc::new(AtomicBool::new(false)),
        }))
    }

    /// Whether `rate` maps onto a termios speed on this platform.
    pub fn is_supported_rate(rate: u32) -> bool {
        baud_constant(rate).is_some()
    }
}

pub(crate) struct SerialStream {
    file: File,
    path: PathBuf,
    // A zero-length read on a raw TTY with VMIN=0 means VTIME expired.
    timed_reads: Arc<AtomicBool>,
}

impl SerialStream {
    pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> std::io::Result<()> {
        let fd = self.file.as_raw_fd();
        let mut tio = get_termios(fd)?;
        match timeout {
            Some(timeout) => {
                tio.c_cc[libc::VMIN] = 0;
                tio.c_cc[libc::VTIME] = deciseconds(timeout);
            }
            None => {
                tio.c_cc[libc::VMIN] = 1;
                tio.c_cc[libc::VTIME] = 0;
            }
        }
        set_termios(fd, &tio)?;
        self.timed_reads.store(timeout.is_some(), Ordering::Relaxed);
        debug!(path = ?self.path, ?timeout, "serial read timeout updated");
        Ok(())
    }

    pub(crate) fn try_clone(&self) -> std::io::Result<Self> {
        Ok(Self {
            file: self.file.try_clone()?,
            path: self.path.clone(),
            timed_reads: Arc::clone(&self.timed_reads),
        })
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.file.read(buf)?;
        if n == 0 && !buf.is_empty() && self.timed_reads.load(Ordering::Relaxed) {
            return Err(std::io::Error::from(ErrorKind::TimedOut));
        }
        Ok(n)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let fd = self.file.as_raw_fd();
        // SAFETY: `fd` is an open descriptor owned by `self.file`.
        let rc = unsafe { libc::tcdrain(fd) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }
}

fn configure_raw(file: &File, speed: libc::speed_t) -> std::io::Result<()> {
    let fd = file.as_raw_fd();
    let mut tio = get_termios(fd)?;

    // SAFETY: `tio` is a valid, initialized termios obtained from tcgetattr.
    unsafe { libc::cfmakeraw(&mut tio) };
    // SAFETY: as above; `speed` is one of the B* constants.
    if unsafe { libc::cfsetspeed(&mut tio, speed) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    tio.c_cflag |= libc::CLOCAL | libc::CREAD;
    tio.c_cflag &= !libc::CSTOPB;
    tio.c_cc[libc::VMIN] = 1;
    tio.c_cc[libc::VTIME] = 0;
    set_termios(fd, &tio)?;

    // SAFETY: `fd` is an open TTY descriptor.
    if unsafe { libc::tcflush(fd, libc::TCIOFLUSH) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn get_termios(fd: libc::c_int) -> std::io::Result<libc::termios> {
    let mut tio = std::mem::MaybeUninit::<libc::termios>::uninit();
    // SAFETY: `tio` points to writable storage of the right size; tcgetattr
    // fully initializes it on success.
    let rc = unsafe { libc::tcgetattr(fd, tio.as_mut_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: tcgetattr returned 0.
    Ok(unsafe { tio.assume_init() })
}

fn set_termios(fd: libc::c_int, tio: &libc::termios) -> std::io::Result<()> {
    // SAFETY: `tio` is a valid termios reference for the duration of the call.
    let rc = unsafe { libc::tcsetattr(fd, libc::TCSANOW, tio) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

fn deciseconds(timeout: Duration) -> u8 {
    let ds = timeout.as_millis().div_ceil(100);
    ds.clamp(1, u8::MAX as u128) as u8
}

fn baud_constant(rate: u32) -> Option<libc::speed_t> {
    let speed = match rate {
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        #[cfg(target_os = "linux")]
        460_800 => libc::B460800,
        #[cfg(target_os = "linux")]
        921_600 => libc::B921600,
        _ => return None,
    };
    Some(speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_rates_are_supported() {
        for rate in [9_600, 19_200, 38_400, 57_600, 115_200, 230_400] {
            assert!(SerialPort::is_supported_rate(rate), "rate {rate}");
        }
        assert!(!SerialPort::is_supported_rate(12_345));
    }

    #[test]
    fn unsupported_rate_fails_before_open() {
        let result = SerialPort::open("/nonexistent/tty", 12_345);
        assert!(matches!(result, Err(TransportError::UnsupportedRate(12_345))));
    }

    #[test]
    fn missing_device_reports_open_error() {
        let result = SerialPort::open("/nonexistent/ttyUSB9", SerialPort::DEFAULT_RATE);
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    fn regular_file_is_not_a_tty() {
        let dir = std::env::temp_dir().join(format!("d7kit-serial-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("not-a-tty");
        std::fs::write(&path, b"").unwrap();

        let result = SerialPort::open(&path, SerialPort::DEFAULT_RATE);
        assert!(matches!(result, Err(TransportError::Configure { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn timeout_rounds_up_to_deciseconds() {
        assert_eq!(deciseconds(Duration::from_millis(1)), 1);
        assert_eq!(deciseconds(Duration::from_millis(100)), 1);
        assert_eq!(deciseconds(Duration::from_millis(250)), 3);
        assert_eq!(deciseconds(Duration::from_secs(60)), 255);
    }
}
