//! In-memory scripted remote for driving a [`PtyChannel`] in tests.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{PtyChannel, PtyConfig};

/// What the remote does after receiving one line of input.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    /// Write this text back.
    Send(&'static str),
    /// Write this text back, then close the stream.
    SendThenHangup(&'static str),
    /// Close the stream.
    Hangup,
    /// Say nothing.
    Silent,
}

/// Lines received by the remote, in order.
pub(crate) type SentLines = Arc<Mutex<Vec<String>>>;

/// A fake client that answers each line written to it with the next reply.
pub(crate) struct ScriptedRemote {
    tx: Option<mpsc::UnboundedSender<Bytes>>,
    replies: VecDeque<Reply>,
    pending: Vec<u8>,
    sent: SentLines,
}

impl ScriptedRemote {
    /// Build a channel whose remote writes `greeting` immediately and then
    /// answers input lines with `replies`.
    pub(crate) fn new(greeting: &'static str, replies: Vec<Reply>) -> (PtyChannel, SentLines) {
        let (tx, rx) = mpsc::unbounded_channel();
        if !greeting.is_empty() {
            let _ = tx.send(Bytes::from_static(greeting.as_bytes()));
        }

        let sent = SentLines::default();
        let remote = Self {
            tx: Some(tx),
            replies: replies.into(),
            pending: Vec::new(),
            sent: sent.clone(),
        };

        let channel = PtyChannel::from_parts(Box::new(remote), rx, &PtyConfig::default());
        (channel, sent)
    }

    /// Build a channel whose remote writes `greeting` and hangs up at once.
    pub(crate) fn hung_up(greeting: &'static str) -> PtyChannel {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Bytes::from_static(greeting.as_bytes()));
        drop(tx);

        PtyChannel::from_parts(Box::new(io::sink()), rx, &PtyConfig::default())
    }

    fn respond(&mut self, line: String) {
        self.sent.lock().unwrap().push(line);

        match self.replies.pop_front() {
            Some(Reply::Send(text)) => self.emit(text),
            Some(Reply::SendThenHangup(text)) => {
                self.emit(text);
                self.tx = None;
            }
            Some(Reply::Hangup) => self.tx = None,
            Some(Reply::Silent) | None => {}
        }
    }

    fn emit(&self, text: &'static str) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Bytes::from_static(text.as_bytes()));
        }
    }
}

impl Write for ScriptedRemote {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            self.respond(line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
