//! Remote command execution with streamed output.
//!
//! # Design
//! - A background task pumps channel data into a bounded queue; the caller
//!   reads it synchronously through [`CommandReader`]. Memory stays bounded by
//!   the queue depth regardless of output size.
//! - The exit status is delivered in-band: a non-zero status becomes the
//!   reader's final IO error, after all output has been read.
//! - Cancellation closes the channel and yields an `Interrupted` error.

use std::io::{self, Read};

use russh::ChannelMsg;
use russh::client::Msg;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use wpzip_core::RemoteError;

use crate::error::redact_command;

const STDERR_STREAM: u32 = 1;
const STDERR_TAIL: usize = 4096;

type Chunk = io::Result<Vec<u8>>;

/// Synchronous reader over a remote command's standard output.
pub struct CommandReader {
    rx: mpsc::Receiver<Chunk>,
    pending: Vec<u8>,
    offset: usize,
    done: bool,
}

impl CommandReader {
    pub(crate) const fn new(rx: mpsc::Receiver<Chunk>) -> Self {
        Self {
            rx,
            pending: Vec::new(),
            offset: 0,
            done: false,
        }
    }
}

impl Read for CommandReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.offset >= self.pending.len() {
            if self.done {
                return Ok(0);
            }
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Err(err);
                }
                None => {
                    self.done = true;
                    return Ok(0);
                }
            }
        }

        let available = &self.pending[self.offset..];
        let read = available.len().min(buf.len());
        buf[..read].copy_from_slice(&available[..read]);
        self.offset += read;
        Ok(read)
    }
}

/// Queue feeding a [`CommandReader`].
pub(crate) fn queue(depth: usize) -> (mpsc::Sender<Chunk>, CommandReader) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (tx, CommandReader::new(rx))
}

/// Forward everything `channel` produces into `tx` until the command exits.
pub(crate) async fn pump(
    mut channel: russh::Channel<Msg>,
    command: String,
    tx: mpsc::Sender<Chunk>,
    cancel: CancellationToken,
) {
    let mut status = None;
    let mut stderr = Vec::new();
    loop {
        let message = tokio::select! {
            () = cancel.cancelled() => None,
            message = channel.wait() => Some(message),
        };
        let Some(message) = message else {
            close(&channel, &command).await;
            if tx.send(Err(cancelled())).await.is_err() {
                debug!("reader dropped before cancellation");
            }
            return;
        };
        match message {
            Some(ChannelMsg::Data { data }) => {
                if tx.send(Ok(data.to_vec())).await.is_err() {
                    debug!(command = %redact_command(&command), "reader dropped; closing channel");
                    close(&channel, &command).await;
                    return;
                }
            }
            Some(ChannelMsg::ExtendedData { data, ext }) if ext == STDERR_STREAM => {
                stderr.extend_from_slice(&data);
                if stderr.len() > STDERR_TAIL {
                    stderr.drain(..stderr.len() - STDERR_TAIL);
                }
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => status = Some(exit_status),
            Some(_) => {}
            None => break,
        }
    }

    if status != Some(0) {
        let failure = RemoteError::CommandFailed {
            command: redact_command(&command),
            status,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        };
        if tx.send(Err(io::Error::other(failure))).await.is_err() {
            debug!("reader dropped before exit status was delivered");
        }
    }
}

async fn close(channel: &russh::Channel<Msg>, command: &str) {
    if let Err(err) = channel.close().await {
        debug!(command = %redact_command(command), error = %err, "channel close failed");
    }
}

fn cancelled() -> io::Error {
    io::Error::new(
        io::ErrorKind::Interrupted,
        RemoteError::Cancelled {
            operation: "exec",
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn feed(chunks: Vec<Chunk>) -> CommandReader {
        let (tx, reader) = queue(2);
        thread::spawn(move || {
            for chunk in chunks {
                if tx.blocking_send(chunk).is_err() {
                    break;
                }
            }
        });
        reader
    }

    #[test]
    fn chunks_are_read_in_order_across_small_buffers() -> anyhow::Result<()> {
        let mut reader = feed(vec![
            Ok(b"tar ".to_vec()),
            Ok(Vec::new()),
            Ok(b"stream".to_vec()),
        ]);
        let mut first = [0_u8; 3];
        reader.read_exact(&mut first)?;
        assert_eq!(&first, b"tar");

        let mut rest = String::new();
        reader.read_to_string(&mut rest)?;
        assert_eq!(rest, " stream");
        assert_eq!(reader.read(&mut first)?, 0);
        Ok(())
    }

    #[test]
    fn failure_surfaces_after_all_output() -> anyhow::Result<()> {
        let failure = RemoteError::CommandFailed {
            command: "tar -C /w -cf - .".to_string(),
            status: Some(2),
            stderr: "tar: ./private: Permission denied".to_string(),
        };
        let mut reader = feed(vec![Ok(b"partial".to_vec()), Err(io::Error::other(failure))]);

        let mut output = Vec::new();
        let err = match reader.read_to_end(&mut output) {
            Err(err) => err,
            Ok(_) => anyhow::bail!("non-zero exit must fail the read"),
        };
        assert_eq!(output, b"partial");
        let inner = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<RemoteError>());
        assert!(matches!(
            inner,
            Some(RemoteError::CommandFailed {
                status: Some(2),
                ..
            })
        ));
        assert_eq!(reader.read(&mut [0_u8; 4])?, 0);
        Ok(())
    }

    #[test]
    fn cancellation_is_an_interrupted_error() {
        let mut reader = feed(vec![Err(cancelled())]);
        let err = reader.read(&mut [0_u8; 8]).err();
        assert_eq!(err.map(|err| err.kind()), Some(io::ErrorKind::Interrupted));
    }
}
