//! Remote session: login, command execution, file copy and password change.

use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, warn};
use secrecy::ExposeSecret;

use super::builder::SessionBuilder;
use super::response::{PasswordChange, Response, normalize_output, split_prompt_line};
use crate::channel::{CompiledPrompts, PtyChannel};
use crate::error::{ChannelError, Error, Result};
use crate::transport::{SessionConfig, TemplateVars};

/// Upper bound on prompt rounds while changing a password.
const MAX_PASSWORD_ROUNDS: usize = 3;

/// How long a file transfer client gets to report its exit status after
/// closing its output.
const EXIT_GRACE: Duration = Duration::from_secs(1);

/// An interactive shell session on a remote device.
///
/// The session drives an external `ssh` client over a PTY: it waits for the
/// password prompt, answers it, and then cycles commands against the shell
/// prompt. At most one client process is live per session.
///
/// # Example
///
/// ```rust,no_run
/// use promptssh::RemoteSession;
///
/// # async fn example() -> Result<(), promptssh::Error> {
/// let mut session = RemoteSession::builder("192.168.1.1")
///     .password("secret")
///     .build()?;
///
/// session.login().await?;
/// let response = session.execute("uname -a").await?;
/// println!("{}", response.result);
/// session.close()?;
/// # Ok(())
/// # }
/// ```
pub struct RemoteSession {
    /// Session configuration.
    config: SessionConfig,

    /// Compiled password and shell prompts.
    prompts: CompiledPrompts,

    /// The interactive client (None when not logged in).
    channel: Option<PtyChannel>,
}

impl RemoteSession {
    /// Create a session from a configuration. Does not connect.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let prompts = CompiledPrompts::compile(&config.prompts).map_err(|e| {
            Error::InvalidConfig {
                message: format!("invalid prompt pattern: {}", e),
            }
        })?;

        Ok(Self {
            config,
            prompts,
            channel: None,
        })
    }

    /// Start building a session for `host`.
    pub fn builder(host: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(host)
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Check if the session is logged in.
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Spawn the login client and authenticate.
    ///
    /// Waits up to the configured timeout for the password prompt, sends the
    /// password and waits for the shell prompt. There is no retry.
    pub async fn login(&mut self) -> Result<()> {
        if self.channel.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let command = self.config.login_command.render(&self.config.template_vars());
        debug!("Logging in to {} with '{}'", self.config.target(), command);

        let channel = PtyChannel::spawn(&command, &self.config.pty).map_err(Error::Login)?;
        self.login_over(channel).await
    }

    /// Run the login handshake over an already spawned channel.
    pub(crate) async fn login_over(&mut self, mut channel: PtyChannel) -> Result<()> {
        let timeout = self.config.timeout;

        channel
            .expect(&self.prompts.password, timeout)
            .await
            .map_err(Error::Login)?;
        channel
            .send_hidden_line(self.config.password.expose_secret())
            .map_err(Error::Login)?;
        channel
            .expect(&self.prompts.shell, timeout)
            .await
            .map_err(Error::Login)?;

        debug!("Logged in to {}", self.config.target());
        self.channel = Some(channel);
        Ok(())
    }

    /// Terminate the login client.
    ///
    /// Closing a session that is not logged in is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut channel) = self.channel.take() {
            debug!("Closing session to {}", self.config.target());
            channel.close().map_err(Error::Close)?;
        }
        Ok(())
    }

    /// Run a command and wait for the shell prompt to return.
    ///
    /// The session is one continuous shell, so state such as the working
    /// directory carries over between calls. If the remote closes the stream
    /// the session is marked closed.
    ///
    /// A timeout leaves the session open with the command still running.
    /// Whatever it prints later, including its prompt, stays buffered and is
    /// returned as part of the next call's output. Close and log in again to
    /// start from a clean shell.
    pub async fn execute(&mut self, command: &str) -> Result<Response> {
        let timeout = self.config.timeout;
        let channel = self.channel.as_mut().ok_or(Error::NotConnected)?;

        let start = Instant::now();
        channel.send_line(command).map_err(Error::Execute)?;

        let result = channel.expect(&self.prompts.shell, timeout).await;
        let m = match result {
            Ok(m) => m,
            Err(e) => {
                if e.is_eof() {
                    debug!("Remote closed the session during '{}'", command);
                    self.channel = None;
                }
                return Err(Error::Execute(e));
            }
        };

        let before = m.before_str();
        let (output, prompt_line) = split_prompt_line(&before);
        Ok(Response::new(
            command,
            output,
            format!("{}{}", prompt_line, m.matched_str()),
            start.elapsed(),
        ))
    }

    /// Run several commands in order, stopping at the first failure.
    pub async fn execute_many(&mut self, commands: &[&str]) -> Result<Vec<Response>> {
        let mut responses = Vec::with_capacity(commands.len());
        for command in commands {
            responses.push(self.execute(command).await?);
        }
        Ok(responses)
    }

    /// Copy a local file into `remote_dir` on the device.
    ///
    /// Runs a separate, short-lived transfer client with its own password
    /// exchange; it does not need or touch the login session. `timeout`
    /// bounds each wait (password prompt, then transfer completion).
    pub async fn copy_file(
        &self,
        local_file: impl AsRef<Path>,
        remote_dir: &str,
        timeout: Duration,
    ) -> Result<()> {
        let local_file = local_file.as_ref().to_string_lossy();
        let vars = TemplateVars {
            local_file: Some(&*local_file),
            remote_dir: Some(remote_dir),
            ..self.config.template_vars()
        };
        let command = self.config.copy_command.render(&vars);
        debug!("Copying {} to {}:{}", local_file, self.config.host, remote_dir);

        let channel = PtyChannel::spawn(&command, &self.config.pty).map_err(Error::FileCopy)?;
        self.copy_over(channel, timeout).await.map_err(Error::FileCopy)
    }

    /// Drive a transfer client to completion.
    pub(crate) async fn copy_over(
        &self,
        mut channel: PtyChannel,
        timeout: Duration,
    ) -> std::result::Result<(), ChannelError> {
        channel.expect(&self.prompts.password, timeout).await?;
        channel.send_hidden_line(self.config.password.expose_secret())?;

        let trailer = channel.expect_eof(timeout).await?;
        debug!(
            "Transfer client finished: {:?}",
            String::from_utf8_lossy(&trailer).trim()
        );

        match channel.wait_exit(EXIT_GRACE).await? {
            Some(code) if code != 0 => Err(ChannelError::Exited(code)),
            _ => Ok(()),
        }
    }

    /// Change the remote account's password.
    ///
    /// Sends the password-change command, then for up to three rounds waits
    /// for either a password prompt (answered with `new_password`) or the
    /// shell prompt (which ends the exchange).
    pub async fn set_password(&mut self, new_password: &str) -> Result<PasswordChange> {
        let timeout = self.config.timeout;
        let channel = self.channel.as_mut().ok_or(Error::NotConnected)?;

        debug!("Changing password on {}", self.config.target());
        channel
            .send_line(&self.config.password_command)
            .map_err(Error::SetPassword)?;

        let mut prompts_answered = 0;
        let mut completed = false;
        let mut output = String::new();

        for round in 0..MAX_PASSWORD_ROUNDS {
            let m = channel
                .expect_any(&[&self.prompts.password, &self.prompts.shell], timeout)
                .await
                .map_err(Error::SetPassword)?;
            let before = m.before_str();

            if m.index == 0 {
                debug!("Password prompt {} answered", round + 1);
                output.push_str(&before);
                output.push_str(&m.matched_str());
                channel
                    .send_hidden_line(new_password)
                    .map_err(Error::SetPassword)?;
                prompts_answered += 1;
            } else {
                output.push_str(split_prompt_line(&before).0);
                completed = true;
                break;
            }
        }

        if !completed {
            warn!(
                "Password change on {} still prompting after {} rounds",
                self.config.host, MAX_PASSWORD_ROUNDS
            );
        }

        Ok(PasswordChange {
            prompts_answered,
            completed,
            output: normalize_output(&output, &self.config.password_command),
        })
    }

    /// Log in if needed and return a guard that closes the session on drop.
    ///
    /// ```rust,no_run
    /// # async fn example(mut session: promptssh::RemoteSession) -> Result<(), promptssh::Error> {
    /// let mut guard = session.enter().await?;
    /// guard.execute("reboot").await?;
    /// // closed here, even on early return
    /// # Ok(())
    /// # }
    /// ```
    pub async fn enter(&mut self) -> Result<SessionGuard<'_>> {
        if !self.is_open() {
            self.login().await?;
        }
        Ok(SessionGuard { session: self })
    }

    /// Run `f` against a logged-in session and close it afterwards.
    ///
    /// The session is closed on every exit path, including errors returned
    /// by `f` and cancellation of the returned future. Errors from `f` are
    /// passed through unchanged.
    ///
    /// ```rust,no_run
    /// # async fn example(mut session: promptssh::RemoteSession) -> Result<(), promptssh::Error> {
    /// let uptime = session
    ///     .scoped(async |s| s.execute("uptime").await)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<T, F>(&mut self, f: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut RemoteSession) -> Result<T>,
    {
        let mut guard = self.enter().await?;
        let result = f(&mut *guard).await;
        drop(guard);
        result
    }
}

/// Scoped access to a logged-in [`RemoteSession`].
///
/// Closes the session when dropped.
pub struct SessionGuard<'a> {
    session: &'a mut RemoteSession,
}

impl Deref for SessionGuard<'_> {
    type Target = RemoteSession;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.session.close() {
            warn!("Failed to close session on scope exit: {}", e);
        }
    }
}
