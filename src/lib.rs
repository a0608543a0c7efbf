//! Client-side sync engine for a resource API that serves both plain reads and long-lived change subscriptions.
//!
//! `restream` keeps a local copy of one resource or a whole collection current from a text event stream, and
//! cooperates with the server's entity tags so unchanged data is never sent twice.
//!
//! - [`Client`] - CRUD calls plus [`Client::stream_get`] and [`Client::stream_list`] subscriptions, over any
//!   [`Transport`][transport::Transport].
//! - [`Tagged`] - a fetched value paired with the revision tag it was served under. Hand it back as `prev` to make
//!   the next read or write conditional.
//! - [`SyncStream`][sync::SyncStream] - a live subscription. Events are parsed on a background task and folded into
//!   values by a [`Materializer`][sync::Materializer]: single resources, full list snapshots, or lists rebuilt from
//!   positional diffs.
//! - [`EventStream`] - the underlying parser, turning any `Stream<Item = Result<impl AsRef<[u8]>, E>>` into
//!   [`Event`]s. Usable on its own.
//!
//! # Subscribing to a collection
//!
//! ```ignore
//! use restream::{Client, ListOptions, reqwest::ReqwestTransport};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), restream::Error> {
//! let client = Client::new(ReqwestTransport::new("https://example.com/api"));
//!
//! let first = client.list::<serde_json::Map<_, _>>("notes", ListOptions::new()).await?;
//! let mut stream = client
//!     .stream_list("notes", ListOptions::new().stream("diff").prev(first))
//!     .await?;
//!
//! while let Some(notes) = stream.read().await? {
//!     println!("{} notes", notes.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Using `EventStream` directly
//!
//! ```rust
//! use bytes::Bytes;
//! use futures::StreamExt;
//! use restream::{EventKind, EventStream};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let chunks = vec![
//!     Ok::<_, std::io::Error>(Bytes::from("event: heartbeat\n\nevent: update\ndata: {}\n\n")),
//! ];
//! let mut stream = EventStream::from_bytes(futures::stream::iter(chunks));
//!
//! while let Some(Ok(event)) = stream.next().await {
//!     if event.kind == EventKind::Update {
//!         println!("{}", event.data);
//!     }
//! }
//! # }
//! ```
//!
//! # Feature flags
//!
//! | Feature | Default | Description |
//! | --- | --- | --- |
//! | `reqwest` | off | Provides [`ReqwestTransport`][reqwest::ReqwestTransport], a [`Transport`][transport::Transport] over [`reqwest`](https://docs.rs/reqwest). |
//!
//! Subscriptions read their body on a spawned task, so they need a tokio runtime.

pub mod client;
pub mod config;
pub(crate) mod constants;
pub mod errors;
pub mod event;
pub mod event_stream;
pub mod line_stream;
pub mod parser;
pub mod query;
#[cfg(feature = "reqwest")]
pub mod reqwest;
pub mod resource;
pub mod sync;
pub mod tagged;
pub mod transport;

pub use client::{Client, GetOptions, UpdateOptions};
pub use config::ClientConfig;
pub use errors::{Error, Result};
pub use event::{Event, EventKind};
pub use event_stream::EventStream;
pub use query::{Filter, ListOptions};
pub use resource::{Metadata, Resource};
pub use sync::{ListStream, ResourceStream, StreamFormat, SyncStream, Termination};
pub use tagged::{RevisionTag, Tagged};
