//! Progress reporting seam.
//!
//! # Design
//! - The packager only counts bytes; rendering belongs to the caller.
//! - A known total yields a determinate bar, an unknown one a spinner.

use std::io::{self, Read};

/// Creates one progress task per long-running transfer.
pub trait ProgressReporter: Send + Sync {
    /// Begin tracking a transfer labelled `label` with an optional byte total.
    fn start(&self, label: &str, total: Option<u64>) -> Box<dyn ProgressTask>;
}

/// A single in-flight transfer.
pub trait ProgressTask: Send {
    /// Record `bytes` more bytes transferred.
    fn advance(&mut self, bytes: u64);

    /// Mark the transfer complete.
    fn finish(&mut self);
}

/// Reporter that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn start(&self, _label: &str, _total: Option<u64>) -> Box<dyn ProgressTask> {
        Box::new(SilentTask)
    }
}

struct SilentTask;

impl ProgressTask for SilentTask {
    fn advance(&mut self, _bytes: u64) {}

    fn finish(&mut self) {}
}

/// Forwards reads unchanged while advancing a progress task.
pub(crate) struct CountingReader<'a, R: ?Sized> {
    inner: &'a mut R,
    task: &'a mut dyn ProgressTask,
}

impl<'a, R: Read + ?Sized> CountingReader<'a, R> {
    pub(crate) fn new(inner: &'a mut R, task: &'a mut dyn ProgressTask) -> Self {
        Self { inner, task }
    }
}

impl<R: Read + ?Sized> Read for CountingReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.task.advance(u64::try_from(read).unwrap_or(u64::MAX));
        Ok(read)
    }
}
