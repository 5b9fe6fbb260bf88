/// Number of trailing bytes in `buf` that form the start of a UTF-8 sequence
/// cut off by the end of the buffer.
///
/// Returns 0 when the buffer is valid, or when it contains an invalid
/// sequence anywhere (the caller's decoder will reject it as a whole).
pub fn incomplete_utf8_tail(buf: &[u8]) -> usize {
    match std::str::from_utf8(buf) {
        Ok(_) => 0,
        Err(e) if e.error_len().is_none() => buf.len() - e.valid_up_to(),
        Err(_) => 0,
    }
}

/// Byte index of the first char boundary at or after `idx`.
pub fn ceil_char_boundary(s: &str, idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    (idx..=s.len())
        .find(|i| s.is_char_boundary(*i))
        .unwrap_or(s.len())
}
