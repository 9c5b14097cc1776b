//! Tail truncation of text members.
//!
//! A line is a run of bytes ending in `\n` or at the end of the content; a
//! final `\n` does not open another (empty) line. Truncation slices the
//! original bytes at the start of the first kept line, so kept lines retain
//! their terminators (including `\r\n` and a trailing newline) and content
//! with at most `keep` lines is returned untouched.

/// Number of lines in `content` under the model above.
pub fn count_lines(content: &[u8]) -> usize {
    let newlines = content.iter().filter(|&&b| b == b'\n').count();
    match content.last() {
        None => 0,
        Some(b'\n') => newlines,
        Some(_) => newlines + 1,
    }
}

/// Byte offset where the last `keep` lines begin, or `None` when the content
/// has at most `keep` lines and nothing needs to be dropped.
pub fn tail_offset(content: &[u8], keep: usize) -> Option<usize> {
    // Ignore the terminator of the final line when walking backwards.
    let body = match content.last() {
        Some(b'\n') => &content[..content.len() - 1],
        _ => content,
    };

    let mut seen = 0;
    for (pos, &byte) in body.iter().enumerate().rev() {
        if byte == b'\n' {
            seen += 1;
            if seen == keep {
                return Some(pos + 1);
            }
        }
    }
    None
}

/// Keep the last `keep` lines of `content`. Returns `None` if nothing was cut.
pub fn tail_lines(content: &[u8], keep: usize) -> Option<&[u8]> {
    if keep == 0 {
        return (!content.is_empty()).then_some(&content[content.len()..]);
    }
    tail_offset(content, keep).map(|offset| &content[offset..])
}
