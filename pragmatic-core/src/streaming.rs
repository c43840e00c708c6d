//! Background execution with incremental output.
//!
//! A [`StreamBridge`] runs one pipeline invocation on a spawned worker and
//! republishes the chunks its generation stage emits as a lazily consumed
//! [`Stream`]. Each pull waits at most the idle timeout. The session is
//! released on completion, timeout, failure, or when the consumer drops the
//! stream early, so a new stream can be started right away. A released worker
//! is kept until [`StreamBridge::stop`] joins it or the next worker joins it
//! before running.

use futures::{Stream, stream};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use strum::Display;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{PipelineError, Result, config::Settings};

/// Item carried over the session channel.
#[derive(Debug)]
enum StreamEvent {
    Chunk(String),
    Done,
    Failed(PipelineError),
}

/// Producer side of a streaming session, handed to the generation stage.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    sender: mpsc::Sender<StreamEvent>,
    cancelled: Arc<AtomicBool>,
}

impl ChunkSink {
    /// Whether the consumer has stopped reading.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.sender.is_closed()
    }

    /// Publish one chunk, waiting while the channel is full.
    pub async fn send<S: Into<String> + Send>(&self, chunk: S) -> Result<()> {
        if self.is_cancelled() {
            return Err(PipelineError::StreamCancelled);
        }
        self.sender
            .send(StreamEvent::Chunk(chunk.into()))
            .await
            .map_err(|_| PipelineError::StreamCancelled)
    }
}

/// Whether a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StreamState {
    /// No session; a stream may be started.
    Idle,
    /// A worker is running and its chunks have not been fully consumed.
    Streaming,
}

/// How the most recent session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum StreamOutcome {
    /// The worker finished and every chunk was delivered.
    Completed,
    /// No chunk arrived within the idle timeout.
    TimedOut,
    /// The consumer stopped before the worker finished.
    Cancelled,
    /// The pipeline run failed.
    Failed,
}

#[derive(Debug)]
struct Session {
    receiver: Option<mpsc::Receiver<StreamEvent>>,
    cancelled: Arc<AtomicBool>,
    worker: JoinHandle<()>,
}

impl Session {
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.receiver = None;
    }
}

/// Boxed chunk stream borrowed from a [`StreamBridge`].
pub type ChunkStream<'a> = Pin<Box<dyn Stream<Item = Result<String>> + Send + 'a>>;

/// Runs a pipeline on a background worker and exposes its output as a stream.
///
/// At most one session is active per bridge.
///
/// ```rust,no_run
/// use futures::StreamExt;
/// use pragmatic_core::streaming::StreamBridge;
/// use std::time::Duration;
///
/// # async fn example() -> pragmatic_core::Result<()> {
/// let mut bridge = StreamBridge::new(Duration::from_secs(60), 32);
/// bridge.start_stream(|sink| async move {
///     sink.send("Hello, ").await?;
///     sink.send("world").await
/// })?;
///
/// let mut chunks = bridge.chunks()?;
/// while let Some(chunk) = chunks.next().await {
///     print!("{}", chunk?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StreamBridge {
    timeout: Duration,
    buffer_size: usize,
    session: Option<Session>,
    pending: Option<JoinHandle<()>>,
    last_outcome: Option<StreamOutcome>,
}

impl StreamBridge {
    /// Create a bridge with the given idle timeout and channel capacity.
    pub fn new(timeout: Duration, buffer_size: usize) -> Self {
        Self {
            timeout,
            buffer_size: buffer_size.max(1),
            session: None,
            pending: None,
            last_outcome: None,
        }
    }

    /// Create a bridge from `streaming_timeout` and `stream_buffer_size`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.stream_timeout(), settings.stream_buffer_size)
    }

    /// Idle timeout applied to every pull.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current session state.
    pub fn state(&self) -> StreamState {
        if self.session.is_some() {
            StreamState::Streaming
        } else {
            StreamState::Idle
        }
    }

    /// Whether a released worker has not been joined yet.
    pub fn has_pending_worker(&self) -> bool {
        self.pending.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// How the most recent session ended, if one has.
    pub fn last_outcome(&self) -> Option<StreamOutcome> {
        self.last_outcome
    }

    /// Spawn a worker running `run` with a fresh sink.
    ///
    /// The worker first joins the previous session's worker, if it is still
    /// pending, then reports completion or failure through the channel after
    /// `run` returns. Fails with [`PipelineError::StreamAlreadyActive`] while
    /// another session is active.
    pub fn start_stream<F, Fut>(&mut self, run: F) -> Result<()>
    where
        F: FnOnce(ChunkSink) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.session.is_some() {
            return Err(PipelineError::StreamAlreadyActive);
        }

        let (sender, receiver) = mpsc::channel(self.buffer_size);
        let cancelled = Arc::new(AtomicBool::new(false));
        let sink = ChunkSink {
            sender: sender.clone(),
            cancelled: Arc::clone(&cancelled),
        };

        let previous = self.pending.take();
        let join_timeout = self.timeout;
        let worker = tokio::spawn(async move {
            if let Some(previous) = previous {
                join_worker(previous, join_timeout).await;
            }
            let event = match run(sink).await {
                Ok(()) => StreamEvent::Done,
                Err(e) => StreamEvent::Failed(e),
            };
            if sender.send(event).await.is_err() {
                debug!("Stream consumer gone before the worker finished");
            }
        });

        info!("Started stream session (timeout: {:?})", self.timeout);
        self.session = Some(Session {
            receiver: Some(receiver),
            cancelled,
            worker,
        });
        Ok(())
    }

    /// Take the chunk sequence of the active session.
    ///
    /// The sequence ends after the worker finishes; a failed run yields its
    /// error as the last item, and an idle timeout yields
    /// [`PipelineError::StreamTimeout`] and stops the session. Dropping the
    /// sequence early releases the session. It can be taken only once per
    /// session; otherwise [`PipelineError::NoActiveStream`] is returned.
    pub fn chunks(&mut self) -> Result<ChunkStream<'_>> {
        let receiver = self
            .session
            .as_mut()
            .and_then(|session| session.receiver.take())
            .ok_or(PipelineError::NoActiveStream)?;

        let timeout = self.timeout;
        let consumer = Consumer {
            bridge: self,
            receiver,
            timeout,
        };

        Ok(Box::pin(stream::unfold(Some(consumer), |state| async move {
            let mut consumer = state?;
            match tokio::time::timeout(consumer.timeout, consumer.receiver.recv()).await {
                Ok(Some(StreamEvent::Chunk(chunk))) => Some((Ok(chunk), Some(consumer))),
                Ok(Some(StreamEvent::Done)) => {
                    consumer.finish(StreamOutcome::Completed);
                    None
                }
                Ok(Some(StreamEvent::Failed(e))) => {
                    warn!("Streamed pipeline run failed: {}", e);
                    consumer.finish(StreamOutcome::Failed);
                    Some((Err(e), None))
                }
                Ok(None) => {
                    consumer.finish(StreamOutcome::Failed);
                    Some((
                        Err(PipelineError::component("stream worker exited without reporting")),
                        None,
                    ))
                }
                Err(_) => {
                    warn!("No chunk within {:?}, stopping stream", consumer.timeout);
                    consumer.finish(StreamOutcome::TimedOut);
                    Some((Err(PipelineError::StreamTimeout { timeout: consumer.timeout }), None))
                }
            }
        })))
    }

    /// Stop the active session and join its worker.
    ///
    /// Without an active session this joins the worker of the last released
    /// session, if any. The join waits at most the idle timeout, then aborts.
    pub async fn stop(&mut self) {
        let worker = match self.session.take() {
            Some(mut session) => {
                session.cancel();
                self.last_outcome = Some(StreamOutcome::Cancelled);
                Some(session.worker)
            }
            None => self.pending.take(),
        };
        let Some(worker) = worker else {
            return;
        };
        join_worker(worker, self.timeout).await;
        info!("Stream session stopped");
    }

    /// Release the session, keeping its worker pending until it is joined.
    fn release(&mut self, outcome: StreamOutcome) {
        if let Some(mut session) = self.session.take() {
            session.cancel();
            self.pending = Some(session.worker);
            self.last_outcome = Some(outcome);
            debug!("Stream session released: {}", outcome);
        }
    }
}

impl Drop for StreamBridge {
    fn drop(&mut self) {
        self.release(StreamOutcome::Cancelled);
        if let Some(worker) = self.pending.take() {
            worker.abort();
        }
    }
}

async fn join_worker(mut worker: JoinHandle<()>, timeout: Duration) {
    if tokio::time::timeout(timeout, &mut worker).await.is_err() {
        warn!("Stream worker did not stop within {:?}, aborting", timeout);
        worker.abort();
    }
}

/// Consumer state of a chunk sequence; releases the session when dropped.
struct Consumer<'a> {
    bridge: &'a mut StreamBridge,
    receiver: mpsc::Receiver<StreamEvent>,
    timeout: Duration,
}

impl Consumer<'_> {
    fn finish(&mut self, outcome: StreamOutcome) {
        self.receiver.close();
        self.bridge.release(outcome);
    }
}

impl Drop for Consumer<'_> {
    fn drop(&mut self) {
        self.receiver.close();
        self.bridge.release(StreamOutcome::Cancelled);
    }
}
