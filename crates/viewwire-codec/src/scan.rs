//! Byte scanners for the response body.
//!
//! All scanners track JSON string literals: a `"` toggles string mode and a
//! `\` inside a string escapes the following byte. Structural characters
//! inside strings are never treated as delimiters or brackets.

use crate::error::{CodecError, MalformedKind};

/// Find the first `target` byte outside any string literal.
pub(crate) fn find_unquoted(buf: &[u8], target: u8) -> Option<usize> {
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in buf.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
        } else if b == b'"' {
            in_string = true;
        } else if b == target {
            return Some(i);
        }
    }
    None
}

/// Location of a top-level `"results": [` member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResultsStart {
    /// Offset of the opening quote of the `"results"` key.
    pub key: usize,
    /// Offset just past the `[`.
    pub rows: usize,
}

/// Find the `"results"` array of a query response document.
///
/// Only a key directly inside the outermost object counts. Returns `None`
/// until enough bytes are buffered to decide.
pub(crate) fn find_results_start(buf: &[u8]) -> Option<ResultsStart> {
    let mut depth = 0usize;
    let mut i = 0;
    while i < buf.len() {
        match buf[i] {
            b'"' => {
                let end = string_end(buf, i)?;
                let key = i;
                i = end + 1;
                if depth == 1 && &buf[key + 1..end] == b"results" {
                    let colon = skip_whitespace(buf, i);
                    if buf.get(colon)? != &b':' {
                        continue;
                    }
                    let open = skip_whitespace(buf, colon + 1);
                    if buf.get(open)? == &b'[' {
                        return Some(ResultsStart {
                            key,
                            rows: open + 1,
                        });
                    }
                }
            }
            b'{' | b'[' => {
                depth += 1;
                i += 1;
            }
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Offset of the quote closing the string that opens at `start`.
fn string_end(buf: &[u8], start: usize) -> Option<usize> {
    let mut escaped = false;
    for (i, &b) in buf.iter().enumerate().skip(start + 1) {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'"' {
            return Some(i);
        }
    }
    None
}

fn skip_whitespace(buf: &[u8], from: usize) -> usize {
    from + buf
        .get(from..)
        .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_whitespace()).count())
}

/// Bytes allowed between rows.
pub(crate) fn is_row_separator(b: u8) -> bool {
    b == b',' || b.is_ascii_whitespace()
}

/// Result of one [`RowScanner::scan`] step.
///
/// Every variant but `Incomplete` tells the caller how many bytes at the
/// front of the buffer to consume; the scanner has already reset itself for
/// the bytes that follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
    /// A complete row object occupies `..end`.
    Row(usize),
    /// `n` separator bytes precede the next row.
    Separator(usize),
    /// The `]` closing the row section; one byte.
    EndOfRows,
    /// More bytes are needed.
    Incomplete,
}

/// Resumable bracket-depth scanner over the row section.
///
/// Scanning state survives between calls, so bytes appended to the buffer
/// are examined once no matter how the body was chunked.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RowScanner {
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl RowScanner {
    /// Whether the scanner is inside a row object.
    pub fn in_row(&self) -> bool {
        self.depth > 0
    }

    pub fn scan(&mut self, buf: &[u8]) -> Result<Scan, CodecError> {
        if self.depth == 0 {
            let separators = buf.iter().take_while(|b| is_row_separator(**b)).count();
            if separators > 0 {
                return Ok(Scan::Separator(separators));
            }
            match buf.first() {
                None => return Ok(Scan::Incomplete),
                Some(b'{') => {
                    self.depth = 1;
                    self.pos = 1;
                }
                Some(b']') => return Ok(Scan::EndOfRows),
                Some(&byte) => {
                    return Err(CodecError::malformed(MalformedKind::UnexpectedByte { byte }));
                }
            }
        }

        while let Some(&b) = buf.get(self.pos) {
            self.pos += 1;
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }
            match b {
                b'"' => self.in_string = true,
                b'{' => self.depth += 1,
                b'}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let end = self.pos;
                        *self = Self::default();
                        return Ok(Scan::Row(end));
                    }
                }
                _ => {}
            }
        }
        Ok(Scan::Incomplete)
    }
}
