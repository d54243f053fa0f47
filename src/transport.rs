//! Line-oriented byte stream to the generator.

use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use log::debug;
use serialport::{DataBits, Parity, SerialPort, StopBits};

use crate::error::{Error, Result};

/// A half-duplex, newline-terminated channel to one device.
pub trait Transport {
    /// Writes `line` followed by `\n`.
    fn write_line(&mut self, line: &str) -> Result<()>;

    /// Collects response lines until the read timeout expires. May be empty.
    fn read_lines(&mut self) -> Result<Vec<String>>;
}

/// Serial line parameters. The 409B runs at 19200 baud, 8N1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub path: String,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            path: String::from("/dev/ttyUSB0"),
            baud_rate: 19200,
            timeout: Duration::from_millis(1000),
        }
    }
}

/// [`Transport`] over a serial port.
pub struct SerialTransport {
    port: BufReader<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let port = serialport::new(&settings.path, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(settings.timeout)
            .open()?;
        debug!("opened {} at {} baud", settings.path, settings.baud_rate);
        Ok(Self {
            port: BufReader::new(port),
        })
    }
}

impl Transport for SerialTransport {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let port = self.port.get_mut();
        port.write_all(line.as_bytes())?;
        port.write_all(b"\n")?;
        port.flush()?;
        Ok(())
    }

    fn read_lines(&mut self) -> Result<Vec<String>> {
        read_lines_until_timeout(&mut self.port)
    }
}

/// Reads lines until the underlying reader times out, keeping a trailing partial line.
fn read_lines_until_timeout<R: BufRead>(reader: &mut R) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    loop {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                if lines.is_empty() {
                    return Err(Error::TransportClosed);
                }
                return Ok(lines);
            }
            Ok(_) => lines.push(to_line(&buf)),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                if !buf.is_empty() {
                    lines.push(to_line(&buf));
                }
                return Ok(lines);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn to_line(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches(&['\r', '\n'][..])
        .to_string()
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;

    use super::Transport;
    use crate::error::{Error, Result};

    /// Records written lines and answers each read with the next queued response.
    #[derive(Debug, Default)]
    pub struct MockTransport {
        pub written: Vec<String>,
        pub responses: VecDeque<Vec<String>>,
        /// Fail writes once this many lines have been written.
        pub fail_after: Option<usize>,
    }

    impl MockTransport {
        pub fn respond(&mut self, lines: &[&str]) {
            self.responses
                .push_back(lines.iter().map(|l| l.to_string()).collect());
        }
    }

    impl Transport for MockTransport {
        fn write_line(&mut self, line: &str) -> Result<()> {
            if self.fail_after == Some(self.written.len()) {
                return Err(Error::TransportClosed);
            }
            self.written.push(line.to_string());
            Ok(())
        }

        fn read_lines(&mut self) -> Result<Vec<String>> {
            Ok(self.responses.pop_front().unwrap_or_default())
        }
    }
}
