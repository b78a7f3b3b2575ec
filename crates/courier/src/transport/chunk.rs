//! Fixed-length message chunking.

/// Split `text` into consecutive slices of at most `limit` characters.
///
/// Order preserving and char-boundary safe; no attempt is made to avoid
/// splitting words or sentences. Empty input yields no chunks.
pub fn chunk_text(text: &str, limit: usize) -> Vec<&str> {
    assert!(limit > 0, "chunk limit must be positive");

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let split = rest
            .char_indices()
            .nth(limit)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(split);
        chunks.push(head);
        rest = tail;
    }
    chunks
}
