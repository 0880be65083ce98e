use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};

/// Unix serial device access.
///
/// Opens a tty, switches it to raw mode (no echo, no line discipline, 8N1)
/// at the requested baud rate and hands back a plain byte stream.
pub struct SerialPort;

impl SerialPort {
    /// Baud rate used by [`open_default`](Self::open_default).
    pub const DEFAULT_BAUD: u32 = 115_200;

    /// Open `path` at [`DEFAULT_BAUD`](Self::DEFAULT_BAUD).
    pub fn open_default(path: impl AsRef<Path>) -> Result<SerialStream> {
        Self::open(path, Self::DEFAULT_BAUD)
    }

    /// Open `path` in raw mode at `baud`.
    pub fn open(path: impl AsRef<Path>, baud: u32) -> Result<SerialStream> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(baud).ok_or(TransportError::UnsupportedBaud(baud))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        // SAFETY: `fd` is an open descriptor owned by `file` for the duration
        // of this call.
        if unsafe { libc::isatty(fd) } != 1 {
            return Err(TransportError::NotATerminal { path });
        }

        let mut tio = get_attrs(fd, &path)?;

        // SAFETY: `tio` is a valid, initialized termios struct.
        unsafe {
            libc::cfmakeraw(&mut tio);
        }
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cc[libc::VMIN] = 1;
        tio.c_cc[libc::VTIME] = 0;

        // SAFETY: `tio` is valid and `speed` is one of the libc B* constants.
        let rc = unsafe {
            let rc_in = libc::cfsetispeed(&mut tio, speed);
            let rc_out = libc::cfsetospeed(&mut tio, speed);
            rc_in | rc_out
        };
        if rc != 0 {
            return Err(configure_error(&path));
        }
        set_attrs(fd, &tio, &path)?;

        info!(?path, baud, "opened serial device");

        Ok(SerialStream {
            file,
            path,
            baud,
            read_timeout: None,
        })
    }
}

fn get_attrs(fd: RawFd, path: &Path) -> Result<libc::termios> {
    // SAFETY: termios is plain data; tcgetattr fully initializes it on
    // success and we bail out before use on failure.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(fd, &mut tio) } != 0 {
        return Err(configure_error(path));
    }
    Ok(tio)
}

fn set_attrs(fd: RawFd, tio: &libc::termios, path: &Path) -> Result<()> {
    // SAFETY: `fd` is open and `tio` came from tcgetattr.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, tio) } != 0 {
        return Err(configure_error(path));
    }
    Ok(())
}

fn configure_error(path: &Path) -> TransportError {
    TransportError::Configure {
        path: path.to_path_buf(),
        source: std::io::Error::last_os_error(),
    }
}

/// VTIME counts tenths of a second in a `cc_t`.
fn vtime_for(timeout: Duration) -> libc::cc_t {
    let tenths = timeout.as_millis().div_ceil(100).clamp(1, 255);
    tenths as libc::cc_t
}

fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
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

/// An open, raw-mode serial device.
pub struct SerialStream {
    file: File,
    path: PathBuf,
    baud: u32,
    read_timeout: Option<Duration>,
}

impl SerialStream {
    /// Device path this stream was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured baud rate.
    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Bound how long a read waits for the first byte.
    ///
    /// A read that times out fails with `ErrorKind::WouldBlock`, the same
    /// way `TcpStream` reads do. The tty counts in tenths of a second, so
    /// the timeout is rounded up to that and capped at 25.5 s. `None`
    /// blocks until a byte arrives.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let fd = self.file.as_raw_fd();
        let mut tio = get_attrs(fd, &self.path)?;
        match timeout {
            Some(timeout) => {
                tio.c_cc[libc::VMIN] = 0;
                tio.c_cc[libc::VTIME] = vtime_for(timeout);
            }
            None => {
                tio.c_cc[libc::VMIN] = 1;
                tio.c_cc[libc::VTIME] = 0;
            }
        }
        set_attrs(fd, &tio, &self.path)?;
        self.read_timeout = timeout;
        debug!(path = ?self.path, ?timeout, "set serial read timeout");
        Ok(())
    }

    /// Current read timeout.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Try to clone this stream (duplicates the file descriptor), e.g. to
    /// read and write from separate threads.
    pub fn try_clone(&self) -> Result<Self> {
        let file = self.file.try_clone()?;
        debug!(path = ?self.path, "cloned serial stream");
        Ok(Self {
            file,
            path: self.path.clone(),
            baud: self.baud,
            read_timeout: self.read_timeout,
        })
    }
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.file.read(buf)?;
        // With VMIN = 0 an empty read means the timer ran out, not EOF.
        if n == 0 && !buf.is_empty() && self.read_timeout.is_some() {
            return Err(std::io::ErrorKind::WouldBlock.into());
        }
        Ok(n)
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialStream")
            .field("path", &self.path)
            .field("baud", &self.baud)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
