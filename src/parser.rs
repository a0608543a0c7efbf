//! Line splitting and line classification for the subscription event stream

use bytes::{Buf, Bytes, BytesMut};

use crate::constants::{COMMENT_PREFIX, CR, DATA_PREFIX, EVENT_PREFIX, LF, PARAM_SEPARATOR};

/// One line of an event block, borrowed from the line it was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLine<'a> {
    /// Blank line, ends the current event
    Empty,
    /// `:` prefixed line
    Comment,
    /// `event: <type>`
    Event(&'a str),
    /// `data: <line>`
    Data(&'a str),
    /// `<key>: <value>`
    Param { key: &'a str, value: &'a str },
    /// Anything else, dropped without complaint
    Ignored,
}

/// Classifies a line with its delimiter already stripped.
///
/// Prefixes are matched including their trailing space, so `data:x` is neither data nor a param and is [EventLine::Ignored].
pub fn classify_line(line: &str) -> EventLine<'_> {
    if line.is_empty() {
        return EventLine::Empty;
    }
    if line.starts_with(COMMENT_PREFIX) {
        return EventLine::Comment;
    }
    if let Some(event_type) = line.strip_prefix(EVENT_PREFIX) {
        return EventLine::Event(event_type);
    }
    if let Some(data) = line.strip_prefix(DATA_PREFIX) {
        return EventLine::Data(data);
    }
    match line.split_once(PARAM_SEPARATOR) {
        Some((key, value)) => EventLine::Param { key, value },
        None => EventLine::Ignored,
    }
}

/// Takes the next complete line out of `buffer`, advancing it past the LF.
/// Returns [None] and leaves the buffer untouched if it holds no LF.
pub fn parse_line_from_buffer(buffer: &mut BytesMut) -> Option<Bytes> {
    let lf = memchr::memchr(LF, buffer)?;

    let mut line = buffer.split_to(lf).freeze();
    buffer.advance(1);

    if line.last() == Some(&CR) {
        line.truncate(line.len() - 1);
    }
    Some(line)
}
