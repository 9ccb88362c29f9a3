/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Textual rewrite buffer.
//!
//! Edits are recorded against original byte offsets and applied in one pass.
//! A replacement that overlaps an earlier replacement, or falls outside the
//! buffer, is refused at insertion time; the planner logs and skips such
//! declarations instead of producing garbled text.

use std::fmt;

/// Error for an edit the buffer cannot apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteError {
    pub message: String,
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RewriteError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EditKind {
    InsertBefore,
    Replace,
    InsertAfter,
}

#[derive(Debug, Clone)]
struct Edit {
    start: usize,
    end: usize,
    kind: EditKind,
    seq: usize,
    text: String,
}

/// One file's worth of pending edits over its original text.
#[derive(Debug, Clone)]
pub struct RewriteBuffer {
    source: String,
    edits: Vec<Edit>,
}

impl RewriteBuffer {
    /// Creates a buffer over the original file contents.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            edits: Vec::new(),
        }
    }

    /// Returns true when no edits are recorded.
    pub fn is_unchanged(&self) -> bool {
        self.edits.is_empty()
    }

    /// Returns the original text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Replaces the byte range `[start, end)` with `text`.
    pub fn replace(&mut self, start: usize, end: usize, text: impl Into<String>) -> Result<(), RewriteError> {
        if start > end || end > self.source.len() {
            return Err(RewriteError {
                message: format!("replacement range {start}..{end} is out of bounds"),
            });
        }
        // Overlapping replacements would splice unrelated text together.
        for edit in &self.edits {
            if edit.kind == EditKind::Replace && start < edit.end && edit.start < end {
                return Err(RewriteError {
                    message: format!(
                        "replacement range {start}..{end} overlaps {}..{}",
                        edit.start, edit.end
                    ),
                });
            }
        }
        let seq = self.edits.len();
        self.edits.push(Edit {
            start,
            end,
            kind: EditKind::Replace,
            seq,
            text: text.into(),
        });
        Ok(())
    }

    /// Inserts `text` immediately before the byte offset.
    pub fn insert_before(&mut self, at: usize, text: impl Into<String>) -> Result<(), RewriteError> {
        self.insert(at, EditKind::InsertBefore, text.into())
    }

    /// Inserts `text` immediately after the byte offset.
    ///
    /// At the same offset, `insert_after` text lands after any
    /// `insert_before` text and after a replacement ending there.
    pub fn insert_after(&mut self, at: usize, text: impl Into<String>) -> Result<(), RewriteError> {
        self.insert(at, EditKind::InsertAfter, text.into())
    }

    fn insert(&mut self, at: usize, kind: EditKind, text: String) -> Result<(), RewriteError> {
        if at > self.source.len() {
            return Err(RewriteError {
                message: format!("insertion offset {at} is out of bounds"),
            });
        }
        for edit in &self.edits {
            if edit.kind == EditKind::Replace && at > edit.start && at < edit.end {
                return Err(RewriteError {
                    message: format!(
                        "insertion offset {at} falls inside replaced range {}..{}",
                        edit.start, edit.end
                    ),
                });
            }
        }
        let seq = self.edits.len();
        self.edits.push(Edit {
            start: at,
            end: at,
            kind,
            seq,
            text,
        });
        Ok(())
    }

    /// Applies all edits and returns the rewritten text.
    pub fn apply(&self) -> String {
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        edits.sort_by_key(|edit| (edit.start, edit.kind, edit.seq));

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0usize;
        for edit in edits {
            if edit.start > cursor {
                out.push_str(&self.source[cursor..edit.start]);
                cursor = edit.start;
            }
            out.push_str(&edit.text);
            if edit.kind == EditKind::Replace {
                cursor = edit.end;
            }
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_and_inserts_compose() {
        let mut buffer = RewriteBuffer::new("int *p = q;");
        buffer.replace(0, 6, "ptr<int> p").unwrap();
        buffer.insert_before(9, "(ptr<int>)").unwrap();
        assert_eq!(buffer.apply(), "ptr<int> p = (ptr<int>)q;");
    }

    #[test]
    fn inserts_at_same_offset_keep_order() {
        let mut buffer = RewriteBuffer::new("f(x)");
        buffer.insert_before(2, "cast(").unwrap();
        buffer.insert_after(3, ")").unwrap();
        assert_eq!(buffer.apply(), "f(cast(x))");
    }

    #[test]
    fn overlapping_replacements_are_refused() {
        let mut buffer = RewriteBuffer::new("abcdef");
        buffer.replace(0, 4, "x").unwrap();
        assert!(buffer.replace(2, 6, "y").is_err());
        assert_eq!(buffer.apply(), "xef");
    }

    #[test]
    fn out_of_bounds_edits_are_refused() {
        let mut buffer = RewriteBuffer::new("abc");
        assert!(buffer.replace(0, 10, "x").is_err());
        assert!(buffer.insert_before(10, "x").is_err());
    }

    #[test]
    fn untouched_buffer_round_trips() {
        let buffer = RewriteBuffer::new("int main(void) { return 0; }\n");
        assert!(buffer.is_unchanged());
        assert_eq!(buffer.apply(), "int main(void) { return 0; }\n");
    }
}
