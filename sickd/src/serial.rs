//! Raw, non-blocking tty setup for sensor ports

use crate::error::DeviceError;
use nix::errno::Errno;
use nix::sys::termios::{self, BaudRate, ControlFlags, FlushArg, SetArg};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use tracing::{debug, info};

/// Open `port` non-blocking, without making it the controlling terminal,
/// and configure it as a raw 8N1 line at `baudrate`.
///
/// # Errors
///
/// `DeviceError::Open` if the port cannot be opened, `DeviceError::Configure`
/// if it is not a tty or the speed is not supported.
pub fn open_port(port: &str, baudrate: u32) -> Result<File, DeviceError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
        .open(port)
        .map_err(|source| DeviceError::Open {
            port: port.to_string(),
            source,
        })?;

    configure(&file, baudrate).map_err(|source| DeviceError::Configure {
        port: port.to_string(),
        source,
    })?;

    info!("Opened {} at {} baud", port, baudrate);
    Ok(file)
}

fn configure(file: &File, baudrate: u32) -> nix::Result<()> {
    let speed = baud_rate(baudrate)?;
    let mut tio = termios::tcgetattr(file)?;

    termios::cfmakeraw(&mut tio);
    termios::cfsetspeed(&mut tio, speed)?;
    tio.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
    tio.control_flags &= !(ControlFlags::CSTOPB | ControlFlags::PARENB);

    termios::tcsetattr(file, SetArg::TCSANOW, &tio)?;
    // Drop whatever the sensor sent before we were listening.
    termios::tcflush(file, FlushArg::TCIFLUSH)?;
    debug!("Line configured: raw 8N1, {} baud", baudrate);
    Ok(())
}

/// Termios speed for a supported line rate.
pub fn baud_rate(baudrate: u32) -> nix::Result<BaudRate> {
    match baudrate {
        9600 => Ok(BaudRate::B9600),
        19200 => Ok(BaudRate::B19200),
        38400 => Ok(BaudRate::B38400),
        500_000 => Ok(BaudRate::B500000),
        _ => Err(Errno::EINVAL),
    }
}
