//! Serial port implementation of the device channel

use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::{DeviceChannel, DeviceError, DeviceResult, LineBuffer};

/// How to find and open the counter's serial port
#[derive(Debug, Clone)]
pub struct SerialOptions {
    /// Stable path tried first (usually a `/dev/serial/by-id` symlink)
    pub preferred_port: PathBuf,
    /// Port name prefixes accepted when scanning
    pub scan_prefixes: Vec<String>,
    pub baud_rate: u32,
    pub read_timeout: Duration,
    /// Wait after opening while the board resets
    pub settle_delay: Duration,
}

/// Pick the port to open: the preferred path if it exists, otherwise the
/// first candidate matching one of the prefixes.
pub fn select_port(
    preferred: &Path,
    preferred_exists: bool,
    candidates: &[String],
    prefixes: &[String],
) -> Option<String> {
    if preferred_exists {
        return Some(preferred.to_string_lossy().into_owned());
    }

    candidates
        .iter()
        .find(|name| prefixes.iter().any(|p| name.starts_with(p.as_str())))
        .cloned()
}

/// Locate the counter's port on this machine
pub fn discover_port(options: &SerialOptions) -> DeviceResult<String> {
    let preferred_exists = options.preferred_port.exists();

    let candidates = if preferred_exists {
        Vec::new()
    } else {
        serialport::available_ports()
            .map_err(|e| DeviceError::Enumeration(e.to_string()))?
            .into_iter()
            .map(|p| p.port_name)
            .collect()
    };

    let port = select_port(
        &options.preferred_port,
        preferred_exists,
        &candidates,
        &options.scan_prefixes,
    )
    .ok_or_else(|| DeviceError::NotFound {
        preferred: options.preferred_port.clone(),
        prefixes: options.scan_prefixes.clone(),
    })?;

    if !preferred_exists {
        info!(port = %port, "Preferred port missing, using scanned port");
    }
    Ok(port)
}

/// Serial connection to the push-up counter
pub struct SerialDevice {
    name: String,
    port: Box<dyn serialport::SerialPort>,
    buffer: LineBuffer,
    read_timeout: Duration,
}

impl SerialDevice {
    /// Discover, open and settle the port
    pub fn open(options: &SerialOptions) -> DeviceResult<Self> {
        let name = discover_port(options)?;

        let port = serialport::new(name.as_str(), options.baud_rate)
            .timeout(options.read_timeout)
            .open()
            .map_err(|e| DeviceError::Open {
                port: name.clone(),
                message: e.to_string(),
            })?;

        // Opening the port resets the board
        std::thread::sleep(options.settle_delay);

        info!(port = %name, baud_rate = options.baud_rate, "Serial port opened");

        Ok(Self {
            name,
            port,
            buffer: LineBuffer::new(),
            read_timeout: options.read_timeout,
        })
    }
}

impl DeviceChannel for SerialDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_line(&mut self, line: &str) -> DeviceResult<()> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        debug!(port = %self.name, line = %line, "Line sent");
        Ok(())
    }

    fn read_line(&mut self) -> DeviceResult<Option<String>> {
        read_line_within(&mut self.port, &mut self.buffer, self.read_timeout)
    }
}

/// Read until a full line is buffered. Gives up with `Ok(None)` on a read
/// timeout, or once `timeout` has passed while bytes trickle in without a
/// newline; those bytes stay buffered for the next call.
fn read_line_within<R: Read + ?Sized>(
    reader: &mut R,
    buffer: &mut LineBuffer,
    timeout: Duration,
) -> DeviceResult<Option<String>> {
    if let Some(line) = buffer.next_line() {
        return Ok(Some(line));
    }

    let deadline = Instant::now() + timeout;
    let mut chunk = [0u8; 256];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => return Err(DeviceError::Disconnected),
            Ok(n) => {
                buffer.push(&chunk[..n]);
                if let Some(line) = buffer.next_line() {
                    return Ok(Some(line));
                }
                if Instant::now() >= deadline {
                    return Ok(None);
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
