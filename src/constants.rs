use bytes_utils::Str;

pub(crate) const LF: u8 = b'\n';
pub(crate) const CR: u8 = b'\r';

pub(crate) const EMPTY_STR: Str = Str::from_static("");

// line prefixes, the trailing space is part of the wire format
pub(crate) const COMMENT_PREFIX: &str = ":";
pub(crate) const EVENT_PREFIX: &str = "event: ";
pub(crate) const DATA_PREFIX: &str = "data: ";
pub(crate) const PARAM_SEPARATOR: &str = ": ";

// event params
pub(crate) const NEW_POSITION: &str = "new-position";
pub(crate) const OLD_POSITION: &str = "old-position";
pub(crate) const SNAPSHOT_ID: &str = "id";

// headers
pub(crate) const STREAM_FORMAT: &str = "stream-format";
pub(crate) const EVENT_STREAM_MIME: &str = "text/event-stream";
pub(crate) const JSON_MIME: &str = "application/json";

// list query parameters
pub(crate) const QUERY_STREAM: &str = "_stream";
pub(crate) const QUERY_LIMIT: &str = "_limit";
pub(crate) const QUERY_OFFSET: &str = "_offset";
pub(crate) const QUERY_AFTER: &str = "_after";
pub(crate) const QUERY_SORT: &str = "_sort";

pub(crate) const DEFAULT_EVENT_BUFFER: usize = 100;
pub(crate) const MAX_EVENT_BUFFER: usize = 1 << 16;

// bom           = %xFEFF ; U+FEFF BYTE ORDER MARK
pub(crate) const BOM: &[u8] = "\u{FEFF}".as_bytes();
