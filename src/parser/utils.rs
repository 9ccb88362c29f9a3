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

//! Parser trivia and lexical helpers.
//!
//! All helpers skip *leading* trivia only. Spans computed by callers end at
//! the last significant token, never at swallowed whitespace.

use crate::ast::Span;
use nom::Parser;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{anychar, char, multispace1, not_line_ending},
    combinator::{map, map_res, opt, recognize, value, verify},
    error::context,
    multi::many0,
    sequence::{pair, preceded},
};

use super::PResult;

/// Reserved words that must not parse as identifiers.
const KEYWORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "const",
    "struct", "extern", "static", "if", "else", "while", "for", "return", "break", "continue",
    "sizeof", "va_list", "itype", "count", "byte_count", "_Assume_bounds_cast",
];

/// Skips zero-or-more whitespace, comments, and preprocessor lines.
pub(super) fn ws0(input: Span<'_>) -> PResult<'_, ()> {
    // Spaces, comments, and `#` lines are uniformly trivia.
    value(
        (),
        many0(alt((
            value((), multispace1),
            line_comment,
            block_comment,
            preprocessor_line,
        ))),
    )
    .parse(input)
}

/// Parses `// ...` to end of line.
fn line_comment(input: Span<'_>) -> PResult<'_, ()> {
    value((), pair(tag("//"), opt(not_line_ending))).parse(input)
}

/// Parses `/* ... */`, non-nesting.
fn block_comment(input: Span<'_>) -> PResult<'_, ()> {
    let (mut rest, _) = tag("/*")(input)?;
    loop {
        if let Ok((next, _)) = tag::<_, _, nom::error::VerboseError<Span<'_>>>("*/")(rest) {
            return Ok((next, ()));
        }
        let (next, _) = anychar(rest)?;
        rest = next;
    }
}

/// Parses a `#...` preprocessor directive to end of line.
fn preprocessor_line(input: Span<'_>) -> PResult<'_, ()> {
    value((), pair(char('#'), opt(not_line_ending))).parse(input)
}

/// Wraps a parser with leading trivia skipping.
pub(super) fn ws<'a, O, P>(mut parser: P) -> impl FnMut(Span<'a>) -> PResult<'a, O>
where
    P: FnMut(Span<'a>) -> PResult<'a, O>,
{
    move |input| preceded(ws0, &mut parser)(input)
}

/// Parses a specific character token after leading trivia.
pub(super) fn ws_char<'a>(c: char) -> impl FnMut(Span<'a>) -> PResult<'a, char> {
    ws(char(c))
}

/// Parses a specific multi-character operator after leading trivia.
pub(super) fn ws_tag<'a>(t: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    ws(tag(t))
}

/// Parses a reserved word as a whole token after leading trivia.
pub(super) fn keyword<'a>(kw: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    ws(verify(recognize_word, move |word: &Span<'_>| {
        *word.fragment() == kw
    }))
}

/// Recognizes one identifier-shaped word.
fn recognize_word(input: Span<'_>) -> PResult<'_, Span<'_>> {
    recognize(pair(
        take_while1(is_ident_start),
        take_while(is_ident_continue),
    ))(input)
}

/// Parses identifiers (`[A-Za-z_][A-Za-z0-9_]*`), rejecting reserved words.
pub(super) fn identifier(input: Span<'_>) -> PResult<'_, String> {
    map(
        ws(verify(recognize_word, |word: &Span<'_>| {
            !KEYWORDS.contains(word.fragment())
        })),
        |word: Span<'_>| word.fragment().to_string(),
    )
    .parse(input)
}

/// Returns whether a char can start an identifier.
fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Returns whether a char can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Parses an integer literal (decimal, hex, or character constant).
pub(super) fn integer_literal(input: Span<'_>) -> PResult<'_, i64> {
    ws(alt((hex_literal, decimal_literal, char_literal))).parse(input)
}

fn hex_literal(input: Span<'_>) -> PResult<'_, i64> {
    map_res(
        preceded(
            alt((tag("0x"), tag("0X"))),
            take_while1(|c: char| c.is_ascii_hexdigit()),
        ),
        |digits: Span<'_>| i64::from_str_radix(digits.fragment(), 16),
    )
    .parse(input)
}

fn decimal_literal(input: Span<'_>) -> PResult<'_, i64> {
    map_res(
        take_while1(|c: char| c.is_ascii_digit()),
        |digits: Span<'_>| digits.fragment().parse::<i64>(),
    )
    .parse(input)
}

/// Parses a character constant, with the common escapes.
fn char_literal(input: Span<'_>) -> PResult<'_, i64> {
    let (input, _) = char('\'')(input)?;
    let (input, ch) = anychar(input)?;
    let (input, code) = if ch == '\\' {
        let (input, escaped) = anychar(input)?;
        let code = match escaped {
            'n' => b'\n' as i64,
            't' => b'\t' as i64,
            'r' => b'\r' as i64,
            '0' => 0,
            other => other as i64,
        };
        (input, code)
    } else {
        (input, ch as i64)
    };
    let (input, _) = context("closing quote", char('\''))(input)?;
    Ok((input, code))
}

/// Parses a simple double-quoted string literal.
///
/// Escape processing is intentionally minimal: the converter keeps string
/// bodies as raw text.
pub(super) fn string_literal(input: Span<'_>) -> PResult<'_, String> {
    ws(map(
        nom::sequence::delimited(
            char('"'),
            recognize(many0(alt((
                recognize(pair(char('\\'), anychar)),
                recognize(verify(anychar, |c| *c != '"' && *c != '\\')),
            )))),
            context("closing quote", char('"')),
        ),
        |body: Span<'_>| body.fragment().to_string(),
    ))
    .parse(input)
}
