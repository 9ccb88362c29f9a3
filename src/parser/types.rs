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

//! Type specifier and declarator parsers.

use crate::ast::{
    ArraySize, BaseType, BoundsAnnotation, CType, FnSig, ParamDecl, SourceSpan, Span, TypeLayer,
};
use nom::Parser;
use nom::{
    branch::alt,
    combinator::{map, opt, value},
    error::context,
    multi::{many0, many1, separated_list0},
    sequence::{delimited, preceded},
};

use super::PResult;
use super::expr::expr;
use super::utils::{identifier, integer_literal, keyword, ws0, ws_char, ws_tag};

/// Parses a base type specifier with optional leading `const`.
///
/// Checked pointer spellings (`ptr<T>`, `array_ptr<T>`, `nt_array_ptr<T>`)
/// are accepted here so converted output re-parses; they contribute pointer
/// layers that declarator layers stack on top of.
pub(super) fn type_specifier(input: Span<'_>) -> PResult<'_, CType> {
    if let Ok((rest, ty)) = checked_pointer_type(input) {
        return Ok((rest, ty));
    }
    let (input, is_const) = map(opt(keyword("const")), |c| c.is_some()).parse(input)?;
    let (input, base) = base_type(input)?;
    Ok((
        input,
        CType {
            base,
            is_const,
            layers: Vec::new(),
            fn_sig: None,
        },
    ))
}

/// Parses the base type keywords, longest spellings first.
fn base_type(input: Span<'_>) -> PResult<'_, BaseType> {
    alt((
        map(preceded(keyword("struct"), context("struct name", identifier)), BaseType::Struct),
        value(BaseType::VaList, keyword("va_list")),
        value(BaseType::Void, keyword("void")),
        unsigned_type,
        signed_type,
        value(
            BaseType::LongLong,
            preceded(keyword("long"), keyword("long")),
        ),
        value(BaseType::Long, keyword("long")),
        value(BaseType::Short, keyword("short")),
        value(BaseType::Char, keyword("char")),
        value(BaseType::Int, keyword("int")),
        value(BaseType::Float, keyword("float")),
        value(BaseType::Double, keyword("double")),
    ))
    .parse(input)
}

fn unsigned_type(input: Span<'_>) -> PResult<'_, BaseType> {
    preceded(
        keyword("unsigned"),
        alt((
            value(BaseType::UnsignedChar, keyword("char")),
            value(BaseType::UnsignedShort, keyword("short")),
            value(
                BaseType::UnsignedLongLong,
                preceded(keyword("long"), keyword("long")),
            ),
            value(BaseType::UnsignedLong, keyword("long")),
            value(BaseType::UnsignedInt, opt(keyword("int"))),
        )),
    )
    .parse(input)
}

fn signed_type(input: Span<'_>) -> PResult<'_, BaseType> {
    preceded(
        keyword("signed"),
        alt((
            value(BaseType::SignedChar, keyword("char")),
            value(BaseType::Int, opt(keyword("int"))),
        )),
    )
    .parse(input)
}

/// Declarator shape shared by named and abstract declarators.
#[derive(Debug, Clone)]
pub(super) struct DeclaratorParts {
    /// Declared name; abstract declarators have none.
    pub name: Option<String>,
    /// Span of the name token when present.
    pub name_span: Option<SourceSpan>,
    /// Indirection layers, outer-most first.
    pub layers: Vec<TypeLayer>,
    /// Function-pointer signature when the declarator is `(*name)(params)`.
    pub fn_sig: Option<Box<FnSig>>,
    /// End byte offset of the last declarator token.
    pub end: usize,
}

impl DeclaratorParts {
    /// Applies the declarator layers to a base type specifier.
    ///
    /// Declarator layers are outer relative to any layers the specifier
    /// already carries (checked pointer spellings).
    pub fn apply_to(&self, base: &CType) -> CType {
        let mut ty = base.clone();
        let mut layers = self.layers.clone();
        layers.extend(base.layers.iter().cloned());
        ty.layers = layers;
        ty.fn_sig = self.fn_sig.clone();
        ty
    }
}

/// Parses one named declarator: stars, name or function-pointer parens, and
/// array suffixes.
pub(super) fn named_declarator(input: Span<'_>) -> PResult<'_, DeclaratorParts> {
    declarator(input, true)
}

/// Parses an abstract declarator (parameter or cast position, name optional).
pub(super) fn abstract_declarator(input: Span<'_>) -> PResult<'_, DeclaratorParts> {
    declarator(input, false)
}

fn declarator(input: Span<'_>, require_name: bool) -> PResult<'_, DeclaratorParts> {
    let (input, stars) = many0(star).parse(input)?;

    // Function-pointer declarators carry their own parenthesized star.
    if let Ok((rest, parts)) = function_pointer_declarator(input, require_name) {
        let mut layers: Vec<TypeLayer> = stars;
        layers.extend(parts.layers.clone());
        return Ok((
            rest,
            DeclaratorParts {
                layers,
                ..parts
            },
        ));
    }

    let (input, name) = if require_name {
        map(context("declarator name", identifier), Some).parse(input)?
    } else {
        opt(identifier).parse(input)?
    };

    let name_span = name.as_ref().map(|n| name_span_before(input, n));

    let (input, arrays) = many0(array_suffix).parse(input)?;

    // Arrays are outer layers relative to the pointed-to value.
    let mut layers: Vec<TypeLayer> = arrays.into_iter().map(TypeLayer::Array).collect();
    layers.extend(stars);

    Ok((
        input,
        DeclaratorParts {
            name,
            name_span,
            layers,
            fn_sig: None,
            end: input.location_offset(),
        },
    ))
}

/// Parses `(*name)(params)` declarators.
fn function_pointer_declarator(
    input: Span<'_>,
    require_name: bool,
) -> PResult<'_, DeclaratorParts> {
    let (input, _) = ws_char('(')(input)?;
    let (input, inner_stars) = many1(star).parse(input)?;
    let (input, name) = if require_name {
        map(context("declarator name", identifier), Some).parse(input)?
    } else {
        opt(identifier).parse(input)?
    };
    let name_span = name.as_ref().map(|n| name_span_before(input, n));
    let (input, _) = context("')'", ws_char(')'))(input)?;

    let (input, (params, variadic)) = parameter_list(input)?;

    Ok((
        input,
        DeclaratorParts {
            name,
            name_span,
            layers: inner_stars,
            fn_sig: Some(Box::new(FnSig {
                // The return type is patched in by the caller, which owns the
                // base type specifier.
                ret: CType::scalar(BaseType::Void),
                params,
                variadic,
            })),
            end: input.location_offset(),
        },
    ))
}

/// Parses one `*` with optional `const`.
fn star(input: Span<'_>) -> PResult<'_, TypeLayer> {
    let (input, _) = ws_char('*')(input)?;
    let (input, is_const) = map(opt(keyword("const")), |c| c.is_some()).parse(input)?;
    Ok((input, TypeLayer::Pointer { is_const }))
}

/// Parses one `[n]` or `[]` suffix.
fn array_suffix(input: Span<'_>) -> PResult<'_, ArraySize> {
    delimited(
        ws_char('['),
        map(opt(integer_literal), |size| match size {
            Some(n) if n >= 0 => ArraySize::Sized(n as u64),
            Some(_) => ArraySize::Unsized,
            None => ArraySize::Unsized,
        }),
        context("']'", ws_char(']')),
    )
    .parse(input)
}

/// Parses a parenthesized parameter list, handling `(void)` and `...`.
pub(super) fn parameter_list(input: Span<'_>) -> PResult<'_, (Vec<ParamDecl>, bool)> {
    let (input, _) = ws_char('(')(input)?;

    // `(void)` declares an empty parameter list.
    if let Ok((rest, _)) = keyword("void")(input) {
        if let Ok((rest, _)) = ws_char(')')(rest) {
            return Ok((rest, (Vec::new(), false)));
        }
    }

    let (input, params) = separated_list0(ws_char(','), param_decl).parse(input)?;
    let (input, variadic) = if params.is_empty() {
        (input, false)
    } else {
        map(opt(preceded(ws_char(','), ws_tag("..."))), |dots| {
            dots.is_some()
        })
        .parse(input)?
    };
    let (input, _) = context("')'", ws_char(')'))(input)?;
    Ok((input, (params, variadic)))
}

/// Parses one parameter declaration with optional bounds annotation.
fn param_decl(input: Span<'_>) -> PResult<'_, ParamDecl> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (input, base) = type_specifier(input)?;
    let (input, parts) = abstract_declarator(input)?;
    let (input, bounds) = opt(bounds_annotation).parse(input)?;

    let mut ty = parts.apply_to(&base);
    if let Some(sig) = &mut ty.fn_sig {
        sig.ret = CType {
            base: base.base.clone(),
            is_const: base.is_const,
            layers: Vec::new(),
            fn_sig: None,
        };
    }

    let span = SourceSpan {
        start: start.location_offset(),
        end: parts.end.max(start.location_offset()),
        line: start.location_line() as usize,
        column: start.get_utf8_column(),
    };

    Ok((
        input,
        ParamDecl {
            name: parts.name,
            ty,
            bounds,
            span,
        },
    ))
}

/// Parses a checked bounds annotation after `:`.
pub(super) fn bounds_annotation(input: Span<'_>) -> PResult<'_, BoundsAnnotation> {
    preceded(
        ws_char(':'),
        alt((
            map(
                preceded(
                    keyword("itype"),
                    delimited(ws_char('('), type_name, context("')'", ws_char(')'))),
                ),
                BoundsAnnotation::Itype,
            ),
            map(
                preceded(
                    keyword("count"),
                    delimited(ws_char('('), expr, context("')'", ws_char(')'))),
                ),
                |e| BoundsAnnotation::Count(Box::new(e)),
            ),
            map(
                preceded(
                    keyword("byte_count"),
                    delimited(ws_char('('), expr, context("')'", ws_char(')'))),
                ),
                |e| BoundsAnnotation::ByteCount(Box::new(e)),
            ),
        )),
    )
    .parse(input)
}

/// Parses a full type name (cast, `sizeof`, or `itype` position).
///
/// Accepts checked pointer spellings (`ptr<T>`, `array_ptr<T>`,
/// `nt_array_ptr<T>`) so converted output re-parses to the same layers.
pub(super) fn type_name(input: Span<'_>) -> PResult<'_, CType> {
    if let Ok((rest, ty)) = checked_pointer_type(input) {
        return Ok((rest, ty));
    }

    let (input, base) = type_specifier(input)?;
    let (input, parts) = abstract_declarator(input)?;
    let mut ty = parts.apply_to(&base);
    if let Some(sig) = &mut ty.fn_sig {
        sig.ret = CType {
            base: base.base.clone(),
            is_const: base.is_const,
            layers: Vec::new(),
            fn_sig: None,
        };
    }
    Ok((input, ty))
}

/// Parses `ptr<T>` / `array_ptr<T>` / `nt_array_ptr<T>` back into a pointer
/// layer over the inner type.
fn checked_pointer_type(input: Span<'_>) -> PResult<'_, CType> {
    let (input, _) = alt((
        keyword("ptr"),
        keyword("array_ptr"),
        keyword("nt_array_ptr"),
    ))
    .parse(input)?;
    let (input, inner) = delimited(ws_char('<'), type_name, context("'>'", ws_char('>'))).parse(input)?;
    Ok((input, inner.pointer_to()))
}

/// Builds the span for a name that ends exactly where `rest` begins.
fn name_span_before(rest: Span<'_>, name: &str) -> SourceSpan {
    let end = rest.location_offset();
    SourceSpan {
        start: end - name.len(),
        end,
        line: rest.location_line() as usize,
        column: rest.get_utf8_column().saturating_sub(name.len()),
    }
}
