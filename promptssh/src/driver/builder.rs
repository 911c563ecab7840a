//! Builder for creating remote sessions.

use std::time::Duration;

use secrecy::SecretString;

use super::session::RemoteSession;
use crate::channel::PtyConfig;
use crate::error::{Error, Result};
use crate::transport::config::{
    CommandTemplate, HostKeyVerification, PromptPatterns, SessionConfig,
};

/// Builder for constructing a [`RemoteSession`].
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use promptssh::SessionBuilder;
///
/// # fn example() -> Result<(), promptssh::Error> {
/// let session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .port(2222)
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: String,
    password: Option<SecretString>,
    timeout: Duration,
    prompts: PromptPatterns,
    login_command: CommandTemplate,
    copy_command: CommandTemplate,
    password_command: String,
    host_key_verification: HostKeyVerification,
    pty: PtyConfig,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: "root".to_string(),
            password: None,
            timeout: Duration::from_secs(5),
            prompts: PromptPatterns::default(),
            login_command: CommandTemplate::ssh_login(),
            copy_command: CommandTemplate::scp_copy(),
            password_command: "passwd".to_string(),
            host_key_verification: HostKeyVerification::default(),
            pty: PtyConfig::default(),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login username (default: `root`).
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the password answered at password prompts.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set the per-expect timeout for login, commands and password changes.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the password prompt regex.
    pub fn password_prompt(mut self, pattern: impl Into<String>) -> Self {
        self.prompts.password = pattern.into();
        self
    }

    /// Set the shell prompt regex.
    pub fn shell_prompt(mut self, pattern: impl Into<String>) -> Self {
        self.prompts.shell = pattern.into();
        self
    }

    /// Replace both prompt patterns.
    pub fn prompts(mut self, prompts: PromptPatterns) -> Self {
        self.prompts = prompts;
        self
    }

    /// Set the command spawned by `login()`.
    pub fn login_command(mut self, command: CommandTemplate) -> Self {
        self.login_command = command;
        self
    }

    /// Set the command spawned by `copy_file()`.
    pub fn copy_command(mut self, command: CommandTemplate) -> Self {
        self.copy_command = command;
        self
    }

    /// Set the command line sent by `set_password()` (default: `passwd`).
    pub fn password_command(mut self, command: impl Into<String>) -> Self {
        self.password_command = command.into();
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u16, height: u16) -> Self {
        self.pty.terminal_width = width;
        self.pty.terminal_height = height;
        self
    }

    /// Set how many trailing bytes of output are searched for prompts.
    pub fn search_depth(mut self, depth: usize) -> Self {
        self.pty.search_depth = depth;
        self
    }

    /// Enable or disable ANSI escape stripping (default: enabled).
    pub fn strip_ansi(mut self, strip: bool) -> Self {
        self.pty.strip_ansi = strip;
        self
    }

    /// Validate and produce the session configuration.
    pub fn config(self) -> Result<SessionConfig> {
        if self.host.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Host is required".to_string(),
            });
        }

        let password = self.password.ok_or_else(|| Error::InvalidConfig {
            message: "Password is required".to_string(),
        })?;

        if self.pty.search_depth == 0 {
            return Err(Error::InvalidConfig {
                message: "Search depth must be greater than zero".to_string(),
            });
        }

        Ok(SessionConfig {
            host: self.host,
            port: self.port,
            username: self.username,
            password,
            timeout: self.timeout,
            prompts: self.prompts,
            login_command: self.login_command,
            copy_command: self.copy_command,
            password_command: self.password_command,
            host_key_verification: self.host_key_verification,
            pty: self.pty,
        })
    }

    /// Build the session.
    ///
    /// This creates the session but does not connect. Call `login()` on the
    /// returned session, or use `enter()`/`scoped()`.
    pub fn build(self) -> Result<RemoteSession> {
        RemoteSession::new(self.config()?)
    }
}
