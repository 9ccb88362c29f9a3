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

//! Parse diagnostics and driver-level errors.

use crate::ast::SourceSpan;
use std::fmt;

/// What the C grammar wanted at the point the parser stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// A named grammar element, e.g. `declarator name` or `struct name`.
    Grammar(String),
    /// A specific punctuation token.
    Token(char),
    /// More input; the unit ended inside a construct.
    Input,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Grammar(what) => write!(f, "expected {what}"),
            Expectation::Token(c) => write!(f, "expected '{c}'"),
            Expectation::Input => write!(f, "unexpected end of input"),
        }
    }
}

/// A translation unit the parser could not accept.
///
/// The failure is kept structurally: the position of the offending token,
/// its byte width, and the [`Expectation`] the grammar had there. The
/// source line is captured at construction so the driver can point at the
/// token without holding on to the unit text; the caret marker is rendered
/// on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Path label of the translation unit.
    pub file: String,
    /// 1-based line of the offending token; `0` when there is no position.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
    /// What the grammar wanted instead.
    pub expected: Expectation,
    /// The source line containing the failure.
    line_text: String,
    /// Byte width of the offending token range.
    width: usize,
}

impl ParseError {
    /// Builds a positioned error from the failing span in a unit's source.
    pub fn expected_at(
        expected: Expectation,
        file: impl Into<String>,
        source: &str,
        span: &SourceSpan,
    ) -> Self {
        let line_text = source
            .lines()
            .nth(span.line.saturating_sub(1))
            .unwrap_or("")
            .to_string();
        Self {
            file: file.into(),
            line: span.line,
            column: span.column,
            expected,
            line_text,
            width: span.len().max(1),
        }
    }

    /// Builds an error for a unit that ended mid-construct.
    pub fn incomplete(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: 0,
            column: 0,
            expected: Expectation::Input,
            line_text: String::new(),
            width: 0,
        }
    }

    /// Returns the source line the failure sits on.
    pub fn snippet(&self) -> &str {
        &self.line_text
    }

    /// Renders a caret marker aligned under the offending token.
    pub fn caret(&self) -> String {
        // Clamp to the captured line so a span reaching past the line end
        // still produces a well-formed marker.
        let line_len = self.line_text.chars().count();
        let lead = self.column.saturating_sub(1).min(line_len);
        let len = self.width.min(line_len.saturating_sub(lead).max(1));
        format!("{}{}", " ".repeat(lead), "^".repeat(len.max(1)))
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 || self.column == 0 {
            return write!(f, "{}: {}", self.file, self.expected);
        }
        write!(
            f,
            "{}:{}:{}: {}\n  {}\n  {}",
            self.file,
            self.line,
            self.column,
            self.expected,
            self.line_text,
            self.caret()
        )
    }
}

impl std::error::Error for ParseError {}

/// Errors produced by the conversion pipeline.
#[derive(Debug)]
pub enum ConvertError {
    /// A translation unit failed to parse; aborts the run.
    Parse(ParseError),
    /// Global symbols could not be reconciled at link time.
    Link(String),
    /// A source file could not be read or a path could not be resolved.
    Io { path: String, message: String },
    /// Invalid driver configuration (for example stdout output with
    /// multiple inputs).
    Usage(String),
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::Parse(err) => write!(f, "{err}"),
            ConvertError::Link(message) => write!(f, "Linking failed: {message}"),
            ConvertError::Io { path, message } => write!(f, "{path}: {message}"),
            ConvertError::Usage(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ConvertError {}

impl From<ParseError> for ConvertError {
    fn from(value: ParseError) -> Self {
        ConvertError::Parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(line: usize, column: usize, width: usize) -> SourceSpan {
        SourceSpan {
            start: 0,
            end: width,
            line,
            column,
        }
    }

    #[test]
    fn caret_aligns_under_the_offending_token() {
        let err = ParseError::expected_at(
            Expectation::Token(';'),
            "a.c",
            "int x\nint *p = q\n",
            &span(2, 5, 2),
        );
        assert_eq!(err.snippet(), "int *p = q");
        assert_eq!(err.caret(), "    ^^");
    }

    #[test]
    fn caret_is_clamped_to_the_line() {
        let err = ParseError::expected_at(
            Expectation::Grammar("declarator name".to_string()),
            "a.c",
            "int\n",
            &span(1, 40, 10),
        );
        assert_eq!(err.caret(), "   ^");
    }

    #[test]
    fn display_reports_position_and_expectation() {
        let err = ParseError::expected_at(
            Expectation::Token(')'),
            "b.c",
            "f(1;\n",
            &span(1, 4, 1),
        );
        let text = err.to_string();
        assert!(text.starts_with("b.c:1:4: expected ')'"));
        assert!(text.contains("f(1;"));
    }

    #[test]
    fn incomplete_input_has_no_position() {
        let err = ParseError::incomplete("c.c");
        assert_eq!(err.line, 0);
        assert_eq!(err.to_string(), "c.c: unexpected end of input");
    }
}
