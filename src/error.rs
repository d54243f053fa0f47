use thiserror::Error;

/// Errors raised while talking to the generator.
#[derive(Debug, Error)]
pub enum Error {
    /// A value the protocol cannot express (frequency, dwell, index, channel, table shape).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A readback line that does not have the expected fields.
    #[error("malformed response {line:?}: {reason}")]
    MalformedResponse { line: String, reason: String },
    /// The device returned nothing where a response line was required.
    #[error("timed out waiting for a response from the generator")]
    TransportTimeout,
    /// The byte stream reached end of file.
    #[error("transport closed")]
    TransportClosed,
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Error::MalformedResponse {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
