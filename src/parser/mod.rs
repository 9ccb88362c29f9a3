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

//! `nom` parser for the C subset.
//!
//! The grammar supports:
//! - struct definitions with named fields
//! - global variable declarations with several declarators per statement
//! - function declarations and definitions, variadic prototypes included
//! - pointer, array, and function-pointer declarators
//! - checked bounds annotations (`: itype(...)`, `: count(...)`,
//!   `: byte_count(...)`) on parameters
//! - the statement and expression forms listed in `crate::ast`
//!
//! Preprocessor lines (`#include`, `#define`, ...) are consumed as trivia,
//! like comments; the converter never observes macro-expanded declarations.
//!
//! Every parser consumes leading trivia only, so spans recorded in the AST
//! end exactly at the last significant token. The rewriter depends on that.

mod expr;
mod statements;
mod types;
mod utils;

use crate::ast::{SourceSpan, Span, TranslationUnit};
use crate::diagnostics::{Expectation, ParseError};
use nom::{
    IResult,
    combinator::all_consuming,
    error::{ErrorKind, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::terminated,
};

use self::statements::top_item;
use self::utils::ws0;

pub(crate) type PResult<'a, O> = IResult<Span<'a>, O, VerboseError<Span<'a>>>;

/// Parses full C source into a spanned translation unit.
pub fn parse_translation_unit(source: &str, source_name: &str) -> Result<TranslationUnit, ParseError> {
    let input = Span::new(source);
    // `all_consuming` ensures trailing garbage is treated as syntax error.
    let (_, items) = match all_consuming(terminated(many0(top_item), ws0))(input) {
        Ok(v) => v,
        Err(err) => return Err(parse_error_to_diagnostic(err, source_name, source)),
    };

    Ok(TranslationUnit { items })
}

/// Converts a `nom` verbose error to crate-level diagnostics.
fn parse_error_to_diagnostic(
    err: nom::Err<VerboseError<Span<'_>>>,
    source_name: &str,
    source: &str,
) -> ParseError {
    match err {
        nom::Err::Incomplete(_) => ParseError::incomplete(source_name),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            // Use the deepest recorded parser error as the diagnostic anchor.
            if let Some((span, kind)) = e.errors.last() {
                let span = SourceSpan::from_bounds(*span, *span);
                let expected = match kind {
                    VerboseErrorKind::Context(ctx) => Expectation::Grammar((*ctx).to_string()),
                    VerboseErrorKind::Char(c) => Expectation::Token(*c),
                    // `all_consuming` reports leftover text as an Eof miss.
                    VerboseErrorKind::Nom(ErrorKind::Eof) => {
                        Expectation::Grammar("end of file".to_string())
                    }
                    VerboseErrorKind::Nom(kind) => {
                        Expectation::Grammar(format!("a valid item ({kind:?})"))
                    }
                };
                ParseError::expected_at(expected, source_name, source, &span)
            } else {
                ParseError::incomplete(source_name)
            }
        }
    }
}
