//! PTY channel: send/expect over a spawned client's terminal.

use std::borrow::Cow;
use std::io::Write;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace};
use regex::bytes::Regex;
use tokio::sync::mpsc;

use super::buffer::PatternBuffer;
use crate::error::ChannelError;
use crate::transport::RenderedCommand;
use crate::transport::process::{self, ProcessHandle};

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Search depth for pattern matching.
    pub search_depth: usize,

    /// Terminal width.
    pub terminal_width: u16,

    /// Terminal height.
    pub terminal_height: u16,

    /// `TERM` value exported to the client.
    pub term: String,

    /// Strip ANSI escape sequences from received output.
    pub strip_ansi: bool,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            search_depth: 1000,
            terminal_width: 511,
            terminal_height: 24,
            term: "xterm".to_string(),
            strip_ansi: true,
        }
    }
}

/// Result of a successful expect.
#[derive(Debug, Clone)]
pub struct ExpectMatch {
    /// Index of the pattern that matched (always 0 for [`PtyChannel::expect`]).
    pub index: usize,

    /// Output received before the match.
    pub before: Vec<u8>,

    /// The matched text itself.
    pub matched: Vec<u8>,
}

impl ExpectMatch {
    /// Output before the match as a string (lossy UTF-8).
    pub fn before_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.before)
    }

    /// The matched text as a string (lossy UTF-8).
    pub fn matched_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.matched)
    }
}

/// Interactive channel to one client process.
///
/// Output is accumulated in a [`PatternBuffer`]; every expect consumes the
/// buffer up to the end of its match and leaves anything after it for the
/// next call.
pub struct PtyChannel {
    /// Output received but not yet consumed by an expect.
    buffer: PatternBuffer,

    /// Terminal input of the client.
    writer: Box<dyn Write + Send>,

    /// Output chunks from the client, closed at end-of-stream.
    output: mpsc::UnboundedReceiver<Bytes>,

    /// The client process; absent for channels built from raw parts.
    process: Option<ProcessHandle>,

    /// Whether the output stream has ended.
    eof: bool,
}

impl PtyChannel {
    /// Spawn `command` under a new PTY and wrap it in a channel.
    pub fn spawn(command: &RenderedCommand, config: &PtyConfig) -> Result<Self, ChannelError> {
        let client = process::spawn(command, config)?;
        let mut channel = Self::from_parts(client.writer, client.output, config);
        channel.process = Some(client.handle);
        Ok(channel)
    }

    /// Build a channel over an arbitrary writer and output stream.
    ///
    /// The output stream signals end-of-stream by closing.
    pub fn from_parts(
        writer: Box<dyn Write + Send>,
        output: mpsc::UnboundedReceiver<Bytes>,
        config: &PtyConfig,
    ) -> Self {
        Self {
            buffer: PatternBuffer::new(config.search_depth, config.strip_ansi),
            writer,
            output,
            process: None,
            eof: false,
        }
    }

    /// Write raw bytes to the client.
    pub fn send(&mut self, data: &[u8]) -> Result<(), ChannelError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Send a line of input followed by a newline.
    pub fn send_line(&mut self, line: &str) -> Result<(), ChannelError> {
        trace!("send: {:?}", line);
        self.send_terminated(line)
    }

    /// Send a secret followed by a newline without logging it.
    pub fn send_hidden_line(&mut self, secret: &str) -> Result<(), ChannelError> {
        trace!("send: ********");
        self.send_terminated(secret)
    }

    fn send_terminated(&mut self, line: &str) -> Result<(), ChannelError> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.send(&data)
    }

    /// Wait for `pattern` to appear in the output.
    pub async fn expect(
        &mut self,
        pattern: &Regex,
        timeout: Duration,
    ) -> Result<ExpectMatch, ChannelError> {
        self.expect_any(&[pattern], timeout).await
    }

    /// Wait for whichever of `patterns` matches first.
    ///
    /// The match that starts earliest in the output wins; ties go to the
    /// pattern listed first. Fails with [`ChannelError::Timeout`] when nothing
    /// matches within `timeout` and with [`ChannelError::Eof`] when the stream
    /// ends first.
    pub async fn expect_any(
        &mut self,
        patterns: &[&Regex],
        timeout: Duration,
    ) -> Result<ExpectMatch, ChannelError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(m) = self.buffer.find_earliest(patterns) {
                let mut before = self.buffer.consume(m.range.end);
                let matched = before.split_off(m.range.start);
                trace!(
                    "pattern {} matched {:?}",
                    m.index,
                    String::from_utf8_lossy(&matched)
                );
                return Ok(ExpectMatch {
                    index: m.index,
                    before,
                    matched,
                });
            }

            if self.eof {
                debug!(
                    "End of stream with {} unmatched bytes buffered",
                    self.buffer.len()
                );
                return Err(ChannelError::Eof);
            }

            self.fill_until(deadline, timeout).await?;
        }
    }

    /// Wait for the client to close its output, returning everything left.
    pub async fn expect_eof(&mut self, timeout: Duration) -> Result<Vec<u8>, ChannelError> {
        let deadline = tokio::time::Instant::now() + timeout;
        while !self.eof {
            self.fill_until(deadline, timeout).await?;
        }
        Ok(self.buffer.take())
    }

    /// Receive at least one chunk (or end-of-stream) before `deadline`,
    /// then drain whatever else is already queued.
    async fn fill_until(
        &mut self,
        deadline: tokio::time::Instant,
        timeout: Duration,
    ) -> Result<(), ChannelError> {
        match tokio::time::timeout_at(deadline, self.output.recv()).await {
            Ok(Some(chunk)) => {
                self.buffer.extend(&chunk);
                while let Ok(more) = self.output.try_recv() {
                    self.buffer.extend(&more);
                }
                Ok(())
            }
            Ok(None) => {
                self.eof = true;
                Ok(())
            }
            Err(_) => Err(ChannelError::Timeout(timeout)),
        }
    }

    /// Wait up to `grace` for the client to exit and return its exit code.
    ///
    /// Returns `None` for channels without a process or if the process is
    /// still running after `grace`.
    pub async fn wait_exit(&mut self, grace: Duration) -> Result<Option<u32>, ChannelError> {
        match self.process.as_mut() {
            Some(process) => Ok(process.wait_exit(grace).await?),
            None => Ok(None),
        }
    }

    /// Whether the output stream has ended.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Terminate the client process.
    pub fn close(&mut self) -> Result<(), ChannelError> {
        if let Some(mut process) = self.process.take() {
            process.kill()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::{Reply, ScriptedRemote};

    fn shell() -> Regex {
        Regex::new(r"[#$] $").unwrap()
    }

    fn password() -> Regex {
        Regex::new(r"(?i)password:").unwrap()
    }

    #[tokio::test]
    async fn test_expect_splits_before_and_match() {
        let (mut channel, _) = ScriptedRemote::new("Welcome\nroot@dev:~# ", vec![]);

        let m = channel.expect(&shell(), Duration::from_secs(1)).await.unwrap();
        assert_eq!(m.before_str(), "Welcome\nroot@dev:~");
        assert_eq!(m.matched_str(), "# ");
    }

    #[tokio::test]
    async fn test_expect_leaves_remainder_buffered() {
        let (mut channel, _) = ScriptedRemote::new("Password: \n$ ", vec![]);

        let m = channel.expect(&password(), Duration::from_secs(1)).await.unwrap();
        assert!(m.before.is_empty());

        let m = channel.expect(&shell(), Duration::from_secs(1)).await.unwrap();
        assert_eq!(m.before_str(), " \n");
    }

    #[tokio::test]
    async fn test_expect_any_reports_index() {
        let (mut channel, _) = ScriptedRemote::new("New password: ", vec![]);

        let m = channel
            .expect_any(&[&password(), &shell()], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(m.index, 0);
    }

    #[tokio::test]
    async fn test_expect_timeout() {
        let (mut channel, _) = ScriptedRemote::new("still booting", vec![]);

        let start = std::time::Instant::now();
        let err = channel
            .expect(&shell(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_expect_eof() {
        let (mut channel, sent) = ScriptedRemote::new("$ ", vec![Reply::Hangup]);
        channel.expect(&shell(), Duration::from_secs(1)).await.unwrap();

        channel.send_line("exit").unwrap();
        let err = channel.expect(&shell(), Duration::from_secs(1)).await.unwrap_err();
        assert!(err.is_eof());
        assert!(channel.is_eof());
        assert_eq!(*sent.lock().unwrap(), vec!["exit".to_string()]);
    }

    #[tokio::test]
    async fn test_expect_eof_returns_rest() {
        let (mut channel, _) = ScriptedRemote::new(
            "Password: ",
            vec![Reply::SendThenHangup("fw.bin  100%\n")],
        );
        channel.expect(&password(), Duration::from_secs(1)).await.unwrap();
        channel.send_hidden_line("secret").unwrap();

        let rest = channel.expect_eof(Duration::from_secs(1)).await.unwrap();
        assert_eq!(rest, b" fw.bin  100%\n");
        assert_eq!(channel.wait_exit(Duration::from_millis(10)).await.unwrap(), None);
    }
}
