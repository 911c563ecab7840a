//! Error types for promptssh.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for promptssh operations.
///
/// Each session operation reports failures through its own variant, wrapping
/// the underlying [`ChannelError`] that caused it.
#[derive(Error, Debug)]
pub enum Error {
    /// Logging in to the remote device failed
    #[error("Login failed: {0}")]
    Login(#[source] ChannelError),

    /// Running a command on the remote shell failed
    #[error("Command execution failed: {0}")]
    Execute(#[source] ChannelError),

    /// Copying a file to the remote device failed
    #[error("File copy failed: {0}")]
    FileCopy(#[source] ChannelError),

    /// Changing the remote account password failed
    #[error("Password change failed: {0}")]
    SetPassword(#[source] ChannelError),

    /// Terminating the login client failed
    #[error("Close failed: {0}")]
    Close(#[source] ChannelError),

    /// Session not logged in
    #[error("Session not connected - call login() first")]
    NotConnected,

    /// Session already logged in
    #[error("Session already connected")]
    AlreadyConnected,

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Channel layer errors (pattern matching, end-of-stream, process exit).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    Timeout(Duration),

    /// The remote side closed the stream before the expected pattern
    #[error("End of stream")]
    Eof,

    /// The client process exited with a non-zero status
    #[error("Client exited with status {0}")]
    Exited(u32),

    /// Process-level failure underneath the channel
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ChannelError {
    /// Whether this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ChannelError::Timeout(_))
    }

    /// Whether this error is an end-of-stream.
    pub fn is_eof(&self) -> bool {
        matches!(self, ChannelError::Eof)
    }
}

/// Transport layer errors (spawning and talking to the client process).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to spawn the client under a PTY
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<io::Error> for ChannelError {
    fn from(e: io::Error) -> Self {
        ChannelError::Transport(TransportError::Io(e))
    }
}

/// Result type alias using promptssh's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_wraps_cause() {
        let err = Error::Execute(ChannelError::Eof);
        assert_eq!(err.to_string(), "Command execution failed: End of stream");

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "End of stream");
    }

    #[test]
    fn test_channel_error_kinds() {
        assert!(ChannelError::Timeout(Duration::from_secs(1)).is_timeout());
        assert!(ChannelError::Eof.is_eof());
        assert!(!ChannelError::Exited(1).is_eof());

        let io = io::Error::new(io::ErrorKind::BrokenPipe, "gone");
        let err: ChannelError = io.into();
        assert!(matches!(err, ChannelError::Transport(TransportError::Io(_))));
    }
}
