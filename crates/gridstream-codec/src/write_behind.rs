use std::io::Write;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::warn;

use crate::error::{CodecError, Result};

/// Wire size of the vector element-count prefix that
/// [`submit_tail`](WriteBehind::submit_tail) skips.
const COUNT_PREFIX: usize = 4;

enum Job {
    Write(Vec<u8>),
    Flush(SyncSender<()>),
}

/// Single-slot hand-off of finished buffers to a background writer.
///
/// The coordinator owns the destination sink; a background thread performs
/// the writes, so a caller can hand off one buffer and immediately start
/// filling the next. At most one write is ever in flight: the hand-off
/// channel is a rendezvous, so [`submit`](Self::submit) blocks until the
/// previous write has fully completed. Buffers reach the sink in hand-off
/// order.
///
/// Background failures are parked in a shared slot rather than thrown across
/// the thread boundary; the next `submit`, [`flush`](Self::flush), or
/// [`finish`](Self::finish) surfaces the most recent one. Dropping the
/// coordinator joins the worker first — no background write outlives it.
///
/// `WriteBehind` implements [`Write`], making it interchangeable with a
/// direct sink under a [`Marshaller`](crate::Marshaller).
pub struct WriteBehind<W: Write + Send + 'static> {
    tx: Option<SyncSender<Job>>,
    worker: Option<JoinHandle<W>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl<W: Write + Send + 'static> WriteBehind<W> {
    /// Take ownership of `sink` and start the background writer.
    pub fn new(sink: W) -> Result<Self> {
        let (tx, rx) = sync_channel::<Job>(0);
        let failure = Arc::new(Mutex::new(None));
        let worker_failure = Arc::clone(&failure);
        let worker = std::thread::Builder::new()
            .name("write-behind".to_string())
            .spawn(move || worker_loop(sink, rx, worker_failure))?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
            failure,
        })
    }

    /// Hand off a private copy of `buf` for background transmission.
    ///
    /// Blocks until any prior hand-off has fully completed.
    pub fn submit(&mut self, buf: &[u8]) -> Result<()> {
        self.check_failure()?;
        self.send(Job::Write(buf.to_vec()))
    }

    /// Hand off `buf` minus its 4-byte element-count prefix.
    ///
    /// Used when the count was already written to the sink directly.
    pub fn submit_tail(&mut self, buf: &[u8]) -> Result<()> {
        self.check_failure()?;
        let tail = buf.get(COUNT_PREFIX..).unwrap_or(&[]);
        self.send(Job::Write(tail.to_vec()))
    }

    /// Wait for in-flight work to finish and flush the sink.
    pub fn flush(&mut self) -> Result<()> {
        let (done_tx, done_rx) = sync_channel(0);
        self.send(Job::Flush(done_tx))?;
        done_rx
            .recv()
            .map_err(|_| CodecError::BackgroundWrite("background writer exited".to_string()))?;
        self.check_failure()
    }

    /// Drain all in-flight work, stop the worker, and return the sink.
    ///
    /// Surfaces the most recent background failure, if any.
    pub fn finish(mut self) -> Result<W> {
        let sink = self.shutdown()?;
        self.check_failure()?;
        Ok(sink)
    }

    fn send(&mut self, job: Job) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| CodecError::BackgroundWrite("coordinator stopped".to_string()))?;
        tx.send(job)
            .map_err(|_| CodecError::BackgroundWrite("background writer exited".to_string()))
    }

    fn check_failure(&self) -> Result<()> {
        let slot = self.failure.lock().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(message) => Err(CodecError::BackgroundWrite(message.clone())),
            None => Ok(()),
        }
    }

    /// Close the channel and join the worker, recovering the sink.
    fn shutdown(&mut self) -> Result<W> {
        drop(self.tx.take());
        let worker = self
            .worker
            .take()
            .ok_or_else(|| CodecError::BackgroundWrite("coordinator stopped".to_string()))?;
        worker
            .join()
            .map_err(|_| CodecError::BackgroundWrite("background writer panicked".to_string()))
    }
}

fn worker_loop<W: Write>(mut sink: W, rx: Receiver<Job>, failure: Arc<Mutex<Option<String>>>) -> W {
    while let Ok(job) = rx.recv() {
        match job {
            Job::Write(bytes) => {
                if let Err(err) = sink.write_all(&bytes) {
                    record_failure(&failure, &err);
                }
            }
            Job::Flush(done) => {
                if let Err(err) = sink.flush() {
                    record_failure(&failure, &err);
                }
                let _ = done.send(());
            }
        }
    }
    sink
}

fn record_failure(failure: &Mutex<Option<String>>, err: &std::io::Error) {
    let mut slot = failure.lock().unwrap_or_else(|e| e.into_inner());
    // Most recent failure wins.
    *slot = Some(err.to_string());
}

impl<W: Write + Send + 'static> Drop for WriteBehind<W> {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("background writer panicked");
            }
            if let Err(err) = self.check_failure() {
                warn!(error = %err, "write-behind dropped with a pending failure");
            }
        }
    }
}

impl<W: Write + Send + 'static> Write for WriteBehind<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.submit(buf).map_err(into_io_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        WriteBehind::flush(self).map_err(into_io_error)
    }
}

fn into_io_error(err: CodecError) -> std::io::Error {
    match err {
        CodecError::Io(io) => io,
        other => std::io::Error::other(other),
    }
}
