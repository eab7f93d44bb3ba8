//! Reading URL lists.

use std::io::{self, BufRead};

/// Lines starting with this are comments.
pub const COMMENT: char = '#';

/// Whether `line` holds a URL rather than being blank or a comment.
pub fn is_url_line(line: &str) -> bool {
    !line.is_empty() && !line.starts_with(COMMENT)
}

/// Yields the URL lines of `reader`, skipping blank and comment lines.
///
/// Bytes that are not UTF-8 are replaced with U+FFFD, so such a line still
/// reaches the auditor and fails there on its own. Only I/O errors are
/// passed through; the caller decides whether they are fatal.
pub fn url_lines<R: BufRead>(reader: R) -> impl Iterator<Item = io::Result<String>> {
    reader
        .split(b'\n')
        .map(|line| line.map(decode_line))
        .filter(|line| match line {
            Ok(line) => is_url_line(line),
            Err(_) => true,
        })
}

fn decode_line(mut line: Vec<u8>) -> String {
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8_lossy(&line).into_owned()
}
