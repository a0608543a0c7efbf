//! Subscription streams that keep a local value in step with the server.
//!
//! Every subscription is a [`SyncStream`]: a reader task parses events off the response body and feeds them
//! through a bounded channel to the consumer, whose [`Materializer`] turns them into values. A
//! [`CancellationToken`] shared by both sides makes [`SyncStream::abort`] stop the reader (dropping the body, which
//! closes the connection) and wake any pending [`SyncStream::read`].
//!
//! | Stream | Materializer | Emits on |
//! | --- | --- | --- |
//! | [`ResourceStream`] | [`SingleResource`] | `initial`, `update`, `notModified` |
//! | [`FullListStream`] | [`FullList`] | `list`, `notModified` |
//! | [`DiffListStream`] | [`DiffList`] | `sync`, `notModified` |

use core::fmt::Display;
use std::time::Instant;

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    constants::MAX_EVENT_BUFFER,
    errors::Result,
    event::Event,
    event_stream::EventStream,
};

pub mod diff;
pub mod full;
pub mod list;
pub mod single;

pub use diff::{DiffList, DiffListStream};
pub use full::{FullList, FullListStream};
pub use list::{ListStream, StreamFormat};
pub use single::{ResourceStream, SingleResource};

/// State machine fed one [`Event`] at a time, producing the next materialised value when there is one
pub trait Materializer {
    type Output;

    /// Apply `event`. `Ok(None)` means nothing to emit yet.
    fn apply(&mut self, event: Event) -> Result<Option<Self::Output>>;
}

/// Why a stream stopped producing values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The server ended the response
    EndOfStream,
    /// [`SyncStream::abort`] (or a fatal error) stopped it
    Aborted,
    /// Reading the body failed
    TransportFailure(String),
}

#[derive(Debug, Clone)]
struct Liveness {
    last_event: Instant,
    termination: Option<Termination>,
}

/// Cloneable handle that aborts a [`SyncStream`] from anywhere, including while it is mid [`SyncStream::read`]
#[derive(Debug, Clone)]
pub struct AbortHandle(CancellationToken);

impl AbortHandle {
    /// Idempotent
    pub fn abort(&self) {
        self.0.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// A live subscription driven by a [`Materializer`]. Single consumer: reads take `&mut self`.
///
/// Needs a tokio runtime, the body is read by a spawned task.
#[derive(Debug)]
pub struct SyncStream<M> {
    materializer: M,
    events: mpsc::Receiver<Result<Event>>,
    cancel: CancellationToken,
    liveness: watch::Receiver<Liveness>,
    reader: Option<JoinHandle<()>>,
    ended: bool,
}

impl<M> SyncStream<M> {
    /// Starts reading `body` on a background task. At most `buffer` parsed events wait for the consumer,
    /// clamped to `1..=65536`.
    pub fn spawn<S, B, E>(body: S, materializer: M, buffer: usize) -> Self
    where
        S: Stream<Item = core::result::Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, events) = mpsc::channel(buffer.clamp(1, MAX_EVENT_BUFFER));
        let (liveness_tx, liveness) = watch::channel(Liveness {
            last_event: Instant::now(),
            termination: None,
        });
        let cancel = CancellationToken::new();
        let reader = tokio::spawn(read_events(body, tx, liveness_tx, cancel.clone()));

        Self {
            materializer,
            events,
            cancel,
            liveness,
            reader: Some(reader),
            ended: false,
        }
    }

    /// Signals the reader to drop the connection. Any pending and all later [`SyncStream::read`]s return `Ok(None)`.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(self.cancel.clone())
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// When the last event of any kind, heartbeats included, was received. Starts at the time the stream opened.
    pub fn last_event_received(&self) -> Instant {
        self.liveness.borrow().last_event
    }

    /// How the connection ended, [`None`] while it is still open
    pub fn termination(&self) -> Option<Termination> {
        self.liveness.borrow().termination.clone()
    }

    /// Aborts, then drains whatever was still buffered and waits for the reader to release the connection.
    /// Safe to call more than once.
    pub async fn close(&mut self) {
        self.abort();
        self.ended = true;
        while self.events.recv().await.is_some() {}
        if let Some(reader) = self.reader.take() {
            if let Err(e) = reader.await {
                tracing::debug!(error = %e, "event reader task did not finish cleanly");
            }
        }
    }

    pub fn materializer(&self) -> &M {
        &self.materializer
    }
}

impl<M: Materializer> SyncStream<M> {
    /// Next materialised value, or `Ok(None)` once the stream has ended or been aborted.
    ///
    /// Transport failures end the stream rather than erroring, check [`SyncStream::termination`] to tell them apart.
    /// Errors are fatal: the stream is aborted and every later read returns `Ok(None)`.
    pub async fn read(&mut self) -> Result<Option<M::Output>> {
        loop {
            if self.ended || self.cancel.is_cancelled() {
                return Ok(None);
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                next = self.events.recv() => next,
            };

            let Some(next) = next else {
                self.ended = true;
                return Ok(None);
            };

            match next.and_then(|event| self.materializer.apply(event)) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => continue,
                Err(e) => {
                    self.ended = true;
                    self.abort();
                    return Err(e);
                }
            }
        }
    }

    /// Continuous consumption: a [`Stream`] that keeps calling [`SyncStream::read`] until the subscription ends
    pub fn into_stream(self) -> impl Stream<Item = Result<M::Output>> {
        futures_util::stream::unfold(self, |mut stream| async move {
            match stream.read().await {
                Ok(Some(value)) => Some((Ok(value), stream)),
                Ok(None) => None,
                Err(e) => Some((Err(e), stream)),
            }
        })
    }
}

impl<M> Drop for SyncStream<M> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_events<S, B, E>(
    body: S,
    tx: mpsc::Sender<Result<Event>>,
    liveness: watch::Sender<Liveness>,
    cancel: CancellationToken,
) where
    S: Stream<Item = core::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let events = EventStream::from_bytes(body);
    futures_util::pin_mut!(events);

    let termination = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Termination::Aborted,
            next = events.next() => next,
        };

        let Some(next) = next else {
            break match events.transport_failure() {
                Some(e) => Termination::TransportFailure(e.to_string()),
                None => Termination::EndOfStream,
            };
        };

        liveness.send_modify(|liveness| liveness.last_event = Instant::now());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break Termination::Aborted,
            sent = tx.send(next) => {
                if sent.is_err() {
                    // consumer is gone
                    break Termination::Aborted;
                }
            }
        }
    };

    tracing::debug!(?termination, "event stream closed");
    liveness.send_modify(|liveness| liveness.termination = Some(termination));
}
