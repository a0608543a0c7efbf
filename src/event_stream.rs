//! Groups lines into [`Event`]s

use core::{
    pin::Pin,
    str::Utf8Error,
    task::{Context, Poll, ready},
};
use std::collections::HashMap;

use bytes_utils::{Str, StrMut};
use futures_core::Stream;

use crate::{
    errors::{Error, Result},
    event::{Event, EventKind},
    line_stream::LineStream,
    parser::{EventLine, classify_line},
};

#[derive(Debug)]
struct EventBuilder {
    event_type: Option<String>,
    params: HashMap<String, String>,
    data_buffer: StrMut,
    data_lines: usize,
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self {
            event_type: None,
            params: HashMap::new(),
            data_buffer: StrMut::new(),
            data_lines: 0,
        }
    }
}

impl EventBuilder {
    fn add(&mut self, line: EventLine<'_>) {
        match line {
            EventLine::Event(event_type) => self.event_type = Some(event_type.to_owned()),
            EventLine::Data(data) => {
                if self.data_lines > 0 {
                    self.data_buffer.push('\n');
                }
                self.data_buffer.push_str(data);
                self.data_lines += 1;
            }
            EventLine::Param { key, value } => {
                self.params.insert(key.to_owned(), value.to_owned());
            }
            // Empty is handled by the caller since it dispatches
            EventLine::Comment | EventLine::Ignored | EventLine::Empty => (),
        }
    }

    /// Finishes the current block. Blocks that never named an event type are skipped, unknown types are an error.
    fn dispatch(&mut self) -> Result<Option<Event>> {
        let EventBuilder {
            event_type,
            params,
            data_buffer,
            ..
        } = core::mem::take(self);

        let Some(event_type) = event_type else {
            if !params.is_empty() || !data_buffer.is_empty() {
                tracing::trace!("skipping event block without an event type");
            }
            return Ok(None);
        };

        let kind = EventKind::from_wire(&event_type)
            .ok_or_else(|| Error::protocol(format!("unknown event type {event_type:?}")))?;

        let event = Event {
            kind,
            params,
            data: data_buffer.freeze(),
        };
        tracing::trace!(kind = %event.kind, data_len = event.data.len(), "parsed event");
        Ok(Some(event))
    }
}

pin_project_lite::pin_project! {
    /// [`Stream`] of [`Event`]s parsed from a stream of lines.
    ///
    /// Each blank line completes an event. Comment lines and lines that aren't `event: `, `data: ` or `key: value`
    /// are ignored. If the lines run out mid event, that event is dropped and the stream ends.
    #[derive(Debug)]
    pub struct EventStream<L> {
        #[pin]
        lines: L,
        builder: EventBuilder,
        terminated: bool,
    }
}

impl<L> EventStream<L> {
    pub fn new(lines: L) -> Self {
        Self {
            lines,
            builder: EventBuilder::default(),
            terminated: false,
        }
    }
}

impl<S, E> EventStream<LineStream<S, E>> {
    /// Builds an [`EventStream`] straight from a stream of byte chunks
    pub fn from_bytes(stream: S) -> Self {
        Self::new(LineStream::new(stream))
    }

    /// The transport error that ended the underlying byte stream, if any
    pub fn transport_failure(&self) -> Option<&E> {
        self.lines.failure()
    }
}

impl<L> Stream for EventStream<L>
where
    L: Stream<Item = core::result::Result<Str, Utf8Error>>,
{
    type Item = Result<Event>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.terminated {
            return Poll::Ready(None);
        }

        loop {
            let line = match ready!(this.lines.as_mut().poll_next(cx)) {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    // the block is corrupt, start the next one clean
                    *this.builder = EventBuilder::default();
                    return Poll::Ready(Some(Err(Error::Utf8(e))));
                }
                None => {
                    *this.terminated = true;
                    *this.builder = EventBuilder::default();
                    return Poll::Ready(None);
                }
            };

            match classify_line(&line) {
                EventLine::Empty => match this.builder.dispatch() {
                    Ok(Some(event)) => return Poll::Ready(Some(Ok(event))),
                    Ok(None) => continue,
                    Err(e) => return Poll::Ready(Some(Err(e))),
                },
                other => this.builder.add(other),
            }
        }
    }
}
