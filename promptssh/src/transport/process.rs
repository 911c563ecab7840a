//! Spawning client processes under a pseudo-terminal.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use log::{debug, trace, warn};
use portable_pty::{Child, ChildKiller, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tokio::sync::mpsc;

use super::config::RenderedCommand;
use crate::channel::PtyConfig;
use crate::error::TransportError;

/// A freshly spawned client: its process handle plus both ends of the PTY.
pub struct SpawnedClient {
    /// Owns the child process and the PTY master.
    pub handle: ProcessHandle,

    /// Writes go to the client's terminal input.
    pub writer: Box<dyn Write + Send>,

    /// Output chunks from the client's terminal. Closed at end-of-stream.
    pub output: mpsc::UnboundedReceiver<Bytes>,
}

/// Spawn `command` attached to a new PTY.
///
/// A background thread forwards everything the client writes to its terminal
/// into the returned channel, and drops the sender once the PTY reports
/// end-of-stream.
pub fn spawn(command: &RenderedCommand, config: &PtyConfig) -> Result<SpawnedClient, TransportError> {
    let spawn_err = |e: Box<dyn std::error::Error + Send + Sync>| TransportError::Spawn {
        command: command.to_string(),
        source: e,
    };

    let pair = native_pty_system()
        .openpty(PtySize {
            rows: config.terminal_height,
            cols: config.terminal_width,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| spawn_err(e.into()))?;

    let mut cmd = CommandBuilder::new(&command.program);
    cmd.args(&command.args);
    cmd.env("TERM", &config.term);
    // Without an explicit cwd portable-pty starts the child in $HOME.
    cmd.cwd(std::env::current_dir()?);

    let child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| spawn_err(e.into()))?;

    // The child holds its own copy of the slave side. Keeping ours open
    // would stop the master from ever seeing end-of-stream.
    drop(pair.slave);

    let reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| spawn_err(e.into()))?;
    let writer = pair
        .master
        .take_writer()
        .map_err(|e| spawn_err(e.into()))?;

    let (tx, output) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("promptssh-pty-reader".to_string())
        .spawn(move || forward_output(reader, tx))?;

    debug!("Spawned '{}' (pid {:?})", command, child.process_id());

    Ok(SpawnedClient {
        handle: ProcessHandle {
            command: command.to_string(),
            child,
            _master: pair.master,
        },
        writer,
        output,
    })
}

fn forward_output(mut reader: Box<dyn Read + Send>, tx: mpsc::UnboundedSender<Bytes>) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                trace!("pty read {} bytes", n);
                if tx.send(Bytes::copy_from_slice(&buf[..n])).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // Linux reports EIO once the last slave descriptor closes.
            Err(_) => break,
        }
    }
}

/// Ownership of a spawned client process.
///
/// Dropping the handle kills the process if it is still running.
pub struct ProcessHandle {
    command: String,
    child: Box<dyn Child + Send + Sync>,
    _master: Box<dyn MasterPty + Send>,
}

impl ProcessHandle {
    /// Kill the process unless it has already exited.
    pub fn kill(&mut self) -> io::Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }
        debug!("Killing '{}'", self.command);
        self.child.kill()?;
        // Reap it so no zombie is left behind.
        let _ = self.child.wait();
        Ok(())
    }

    /// Wait up to `grace` for the process to exit and return its exit code.
    ///
    /// Returns `None` if the process is still running after `grace`.
    pub async fn wait_exit(&mut self, grace: Duration) -> io::Result<Option<u32>> {
        let deadline = tokio::time::Instant::now() + grace;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(Some(status.exit_code()));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Err(e) = self.kill() {
            warn!("Failed to kill '{}': {}", self.command, e);
        }
    }
}
