pub const DATA_LINE: &[u8] = b"data: {\"id\":\"a1\",\"etag\":\"e1\",\"generation\":3,\"text\":\"hello\"}\n";
pub const COMMENT_LINE: &[u8] = b": keep-alive\n";
pub const EVENT_LINE: &[u8] = b"event: update\n";
pub const PARAM_LINE: &[u8] = b"new-position: 42\n";
pub const EMPTY_LINE: &[u8] = b"\n";
pub const JUNK_LINE: &[u8] = b"data\n";

/// A diff stream of `n` batches, each adding an item at the front, moving it to the back and syncing
pub fn generate_diff_batches(n: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    for i in 0..n {
        buf.extend_from_slice(b"event: add\nnew-position: 0\n");
        buf.extend_from_slice(
            format!("data: {{\"id\":\"item-{i}\",\"etag\":\"e{i}\",\"generation\":1,\"n\":{i}}}\n\n")
                .as_bytes(),
        );
        buf.extend_from_slice(b"event: heartbeat\n\n");
        buf.extend_from_slice(format!("event: update\nold-position: 0\nnew-position: {i}\n").as_bytes());
        buf.extend_from_slice(
            format!("data: {{\"id\":\"item-{i}\",\"etag\":\"f{i}\",\"generation\":2,\"n\":{i}}}\n\n")
                .as_bytes(),
        );
        buf.extend_from_slice(format!("event: sync\nid: {i}\n\n").as_bytes());
    }
    buf
}

/// `n` full snapshots of a ten item list
pub fn generate_full_lists(n: usize) -> Vec<u8> {
    let items = (0..10)
        .map(|i| format!("{{\"id\":\"item-{i}\",\"etag\":\"e{i}\",\"generation\":1,\"n\":{i}}}"))
        .collect::<Vec<_>>()
        .join(",");

    let mut buf = Vec::new();
    for i in 0..n {
        buf.extend_from_slice(format!("event: list\nid: {i}\ndata: [{items}]\n\n").as_bytes());
        buf.extend_from_slice(COMMENT_LINE);
    }
    buf
}
