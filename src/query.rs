//! Collection query options and URL encoding

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::{
    constants::{QUERY_AFTER, QUERY_LIMIT, QUERY_OFFSET, QUERY_SORT, QUERY_STREAM},
    resource::Resource,
    tagged::Tagged,
};

// RFC 3986 unreserved characters pass through, everything else is escaped
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Escapes one path segment or query component
pub fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, COMPONENT).to_string()
}

/// Joins `key=value` pairs into a query string, without the leading `?`
pub fn encode_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// A per-field condition, sent as `<path>[<op>]=<value>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub path: String,
    pub op: String,
    pub value: String,
}

impl Filter {
    pub fn new(path: impl Into<String>, op: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            op: op.into(),
            value: value.into(),
        }
    }

    /// Matches ids starting with `short_id`
    pub fn id_prefix(short_id: impl Into<String>) -> Self {
        Self::new("id", "hp", short_id)
    }

    pub fn key(&self) -> String {
        format!("{}[{}]", self.path, self.op)
    }
}

/// Options for listing or subscribing to a collection
#[derive(Debug, Clone)]
pub struct ListOptions<T = serde_json::Map<String, serde_json::Value>> {
    /// Subscription mode name passed as `_stream`
    pub stream: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Pagination cursor
    pub after: Option<String>,
    /// Sort keys, `-` prefixed for descending
    pub sorts: Vec<String>,
    pub filters: Vec<Filter>,
    /// A list fetched earlier, sent as `If-None-Match`
    pub prev: Option<Tagged<Vec<Resource<T>>>>,
}

impl<T> ListOptions<T> {
    pub fn new() -> Self {
        Self {
            stream: None,
            limit: None,
            offset: None,
            after: None,
            sorts: Vec::new(),
            filters: Vec::new(),
            prev: None,
        }
    }

    pub fn stream(mut self, mode: impl Into<String>) -> Self {
        self.stream = Some(mode.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn sort(mut self, key: impl Into<String>) -> Self {
        self.sorts.push(key.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn prev(mut self, prev: Tagged<Vec<Resource<T>>>) -> Self {
        self.prev = Some(prev);
        self
    }

    /// Query parameters in the order they are sent. Sorts repeat, everything else appears at most once.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut set = |key: String, value: String| {
            match pairs.iter_mut().find(|pair| pair.0 == key) {
                Some((_, existing)) => *existing = value,
                None => pairs.push((key, value)),
            }
        };

        if let Some(stream) = &self.stream {
            set(QUERY_STREAM.to_owned(), stream.clone());
        }
        if let Some(limit) = self.limit {
            set(QUERY_LIMIT.to_owned(), limit.to_string());
        }
        if let Some(offset) = self.offset {
            set(QUERY_OFFSET.to_owned(), offset.to_string());
        }
        if let Some(after) = &self.after {
            set(QUERY_AFTER.to_owned(), after.clone());
        }
        for filter in &self.filters {
            set(filter.key(), filter.value.clone());
        }

        pairs.extend(
            self.sorts
                .iter()
                .map(|sort| (QUERY_SORT.to_owned(), sort.clone())),
        );
        pairs
    }
}

impl<T> Default for ListOptions<T> {
    fn default() -> Self {
        Self::new()
    }
}
