//! Turns a chunked byte stream into a stream of lines

use core::{
    pin::Pin,
    str::Utf8Error,
    task::{Context, Poll, ready},
};

use bytes::{Buf, Bytes, BytesMut};
use bytes_utils::Str;
use futures_core::Stream;
use pin_project_lite::pin_project;

use crate::{constants::BOM, parser::parse_line_from_buffer};

fn validate_bytes(val: Bytes) -> Result<Str, Utf8Error> {
    match str::from_utf8(val.as_ref()) {
        // Safety: we just checked the bytes are valid utf8
        Ok(_) => Ok(unsafe { Str::from_inner_unchecked(val) }),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineStreamState {
    NotStarted,
    Started,
    Terminated,
}

pin_project! {
    /// [`Stream`] of newline delimited lines read from a stream of byte chunks.
    ///
    /// Partial lines are buffered across chunk boundaries and the delimiter (`\n` or `\r\n`) is stripped.
    /// A transport error ends the stream the same way a clean end of input does, the error is kept and can be inspected
    /// with [`LineStream::failure`]. An unterminated line at end of input is discarded.
    #[derive(Debug)]
    pub struct LineStream<S, E> {
        #[pin]
        stream: S,
        buffer: BytesMut,
        state: LineStreamState,
        failure: Option<E>,
    }
}

impl<S, E> LineStream<S, E> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: BytesMut::new(),
            state: LineStreamState::NotStarted,
            failure: None,
        }
    }

    /// The transport error that ended this stream, if that's how it ended
    pub fn failure(&self) -> Option<&E> {
        self.failure.as_ref()
    }

    pub fn is_terminated(&self) -> bool {
        self.state == LineStreamState::Terminated
    }
}

impl<S, E, B> Stream for LineStream<S, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: core::fmt::Display,
{
    type Item = Result<Str, Utf8Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(line) = parse_line_from_buffer(this.buffer) {
                return Poll::Ready(Some(validate_bytes(line)));
            }

            if *this.state == LineStreamState::Terminated {
                return Poll::Ready(None);
            }

            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => {
                    this.buffer.extend_from_slice(bytes.as_ref());
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "event stream transport failed, ending line stream");
                    *this.failure = Some(e);
                    *this.state = LineStreamState::Terminated;
                    this.buffer.clear();
                    return Poll::Ready(None);
                }
                None => {
                    if !this.buffer.is_empty() {
                        tracing::trace!(len = this.buffer.len(), "discarding unterminated line");
                    }
                    *this.state = LineStreamState::Terminated;
                    this.buffer.clear();
                    return Poll::Ready(None);
                }
            }

            if *this.state == LineStreamState::NotStarted {
                if this.buffer.len() < BOM.len() && BOM.starts_with(&this.buffer[..]) {
                    // could still turn out to be a BOM
                    continue;
                }
                *this.state = LineStreamState::Started;
                if this.buffer.starts_with(BOM) {
                    this.buffer.advance(BOM.len());
                }
            }
        }
    }
}
