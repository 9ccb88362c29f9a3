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

//! C expression parser with the usual precedence ladder.

use crate::ast::{
    AssignOp, BinOp, Expr, ExprKind, PostfixOp, SourceSpan, Span, UnaryOp,
};
use nom::Parser;
use nom::{
    InputTake,
    branch::alt,
    combinator::{map, opt},
    error::context,
    multi::separated_list0,
    sequence::{delimited, preceded},
};

use super::PResult;
use super::types::type_name;
use super::utils::{identifier, integer_literal, keyword, string_literal, ws0, ws_char, ws_tag};

/// Top-level expression parser (assignment expression).
pub(crate) fn expr(input: Span<'_>) -> PResult<'_, Expr> {
    parse_assignment(input)
}

fn spanned(start: Span<'_>, end: Span<'_>, kind: ExprKind) -> Expr {
    Expr {
        kind,
        span: SourceSpan::from_bounds(start, end),
    }
}

/// Parses right-associative assignment expressions.
fn parse_assignment(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (input, lhs) = parse_conditional(input)?;

    let (next, op) = opt(assign_op).parse(input)?;
    let Some(op) = op else {
        return Ok((input, lhs));
    };

    // Right-associative fold: `a = b = c` becomes `a = (b = c)`.
    let (next, rhs) = parse_assignment(next)?;
    let span = SourceSpan::from_bounds(start, next);
    Ok((
        next,
        Expr {
            kind: ExprKind::Assign {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        },
    ))
}

fn assign_op(input: Span<'_>) -> PResult<'_, AssignOp> {
    alt((
        map(ws_tag("+="), |_| AssignOp::AddAssign),
        map(ws_tag("-="), |_| AssignOp::SubAssign),
        map(ws_tag("*="), |_| AssignOp::MulAssign),
        map(ws_tag("/="), |_| AssignOp::DivAssign),
        map(ws_tag("%="), |_| AssignOp::RemAssign),
        // Plain `=` must not swallow `==`.
        map(single_eq, |_| AssignOp::Assign),
    ))
    .parse(input)
}

fn single_eq(input: Span<'_>) -> PResult<'_, char> {
    let (rest, _) = ws_char('=')(input)?;
    if rest.fragment().starts_with('=') {
        return Err(nom::Err::Error(nom::error::VerboseError {
            errors: vec![(input, nom::error::VerboseErrorKind::Char('='))],
        }));
    }
    Ok((rest, '='))
}

/// Parses `cond ? a : b`.
fn parse_conditional(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (input, cond) = parse_binary(input, 0)?;

    let (next, question) = opt(ws_char('?')).parse(input)?;
    if question.is_none() {
        return Ok((input, cond));
    }

    let (next, then_expr) = parse_assignment(next)?;
    let (next, _) = context("':'", ws_char(':'))(next)?;
    let (next, else_expr) = parse_conditional(next)?;
    let span = SourceSpan::from_bounds(start, next);
    Ok((
        next,
        Expr {
            kind: ExprKind::Conditional {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        },
    ))
}

/// Binary operator tiers, loosest-binding first.
const BINARY_TIERS: &[&[(&str, BinOp)]] = &[
    &[("||", BinOp::LogicalOr)],
    &[("&&", BinOp::LogicalAnd)],
    &[("|", BinOp::BitOr)],
    &[("^", BinOp::BitXor)],
    &[("&", BinOp::BitAnd)],
    &[("==", BinOp::EqEq), ("!=", BinOp::Ne)],
    &[
        ("<=", BinOp::Le),
        (">=", BinOp::Ge),
        ("<", BinOp::Lt),
        (">", BinOp::Gt),
    ],
    &[("<<", BinOp::Shl), (">>", BinOp::Shr)],
    &[("+", BinOp::Add), ("-", BinOp::Sub)],
    &[("*", BinOp::Mul), ("/", BinOp::Div), ("%", BinOp::Rem)],
];

/// Parses left-associative binary tiers by index into [`BINARY_TIERS`].
fn parse_binary(input: Span<'_>, tier: usize) -> PResult<'_, Expr> {
    if tier >= BINARY_TIERS.len() {
        return parse_unary(input);
    }

    let (input, _) = ws0(input)?;
    let start = input;
    let (mut input, mut left) = parse_binary(input, tier + 1)?;

    loop {
        let Some((next, op)) = match_tier_op(input, tier) else {
            break;
        };
        // Left-associative fold within one tier.
        let (next, right) = parse_binary(next, tier + 1)?;
        let span = SourceSpan::from_bounds(start, next);
        left = Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(left),
                rhs: Box::new(right),
            },
            span,
        };
        input = next;
    }
    Ok((input, left))
}

/// Matches one operator of the given tier, refusing compound-assignment and
/// longer-operator prefixes.
fn match_tier_op<'a>(input: Span<'a>, tier: usize) -> Option<(Span<'a>, BinOp)> {
    let (rest, _) = ws0(input).ok()?;
    let text = rest.fragment();
    for (token, op) in BINARY_TIERS[tier] {
        if let Some(after) = text.strip_prefix(token) {
            // `a += b`, `a && b` vs `a & b`, `a || b` vs `a | b`, `<<`/`<=`.
            let conflict = match *token {
                "+" | "-" | "*" | "/" | "%" => after.starts_with('='),
                "&" => after.starts_with('&'),
                "|" => after.starts_with('|'),
                "<" => after.starts_with('<') || after.starts_with('='),
                ">" => after.starts_with('>') || after.starts_with('='),
                _ => false,
            };
            if conflict {
                continue;
            }
            let consumed = rest.take_split(token.len()).0;
            return Some((consumed, *op));
        }
    }
    None
}

/// Parses prefix operators, casts, and `sizeof`.
fn parse_unary(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = ws0(input)?;
    let start = input;

    // `sizeof(type)` or `sizeof expr`.
    if let Ok((next, _)) = keyword("sizeof")(input) {
        if let Ok((after, ty)) =
            delimited(ws_char('('), type_name, ws_char(')')).parse(next)
        {
            return Ok((after, spanned(start, after, ExprKind::SizeofType(ty))));
        }
        let (after, operand) = parse_unary(next)?;
        return Ok((
            after,
            spanned(start, after, ExprKind::SizeofExpr(Box::new(operand))),
        ));
    }

    // `_Assume_bounds_cast<T>(expr)`, as produced by the rewriter; parsed
    // like a cast so converted output re-analyzes to the same solution.
    if let Ok((next, _)) = keyword("_Assume_bounds_cast")(input) {
        let (next, ty) = delimited(
            ws_char('<'),
            type_name,
            context("'>'", ws_char('>')),
        )
        .parse(next)?;
        let ty_span = SourceSpan::from_bounds(start, next);
        let (next, operand) = delimited(
            ws_char('('),
            expr,
            context("')'", ws_char(')')),
        )
        .parse(next)?;
        return Ok((
            next,
            spanned(
                start,
                next,
                ExprKind::Cast {
                    ty,
                    ty_span,
                    operand: Box::new(operand),
                },
            ),
        ));
    }

    // C-style cast `(T)expr`; falls through to a parenthesized expression
    // when the parenthesized tokens do not form a type.
    if let Ok((after_paren, _)) = ws_char('(')(input) {
        if let Ok((after_ty, ty)) = type_name(after_paren) {
            if let Ok((after_close, _)) = ws_char(')')(after_ty) {
                let ty_span = SourceSpan::from_bounds(start, after_close);
                if let Ok((after_operand, operand)) = parse_unary(after_close) {
                    return Ok((
                        after_operand,
                        spanned(
                            start,
                            after_operand,
                            ExprKind::Cast {
                                ty,
                                ty_span,
                                operand: Box::new(operand),
                            },
                        ),
                    ));
                }
            }
        }
    }

    let prefix = alt((
        map(ws_tag("++"), |_| UnaryOp::PreInc),
        map(ws_tag("--"), |_| UnaryOp::PreDec),
        map(ws_char('*'), |_| UnaryOp::Deref),
        map(ws_char('&'), |_| UnaryOp::AddrOf),
        map(ws_char('-'), |_| UnaryOp::Neg),
        map(ws_char('!'), |_| UnaryOp::LogicalNot),
        map(ws_char('~'), |_| UnaryOp::BitNot),
    ));

    let (input, op) = opt(prefix).parse(input)?;
    match op {
        Some(op) => {
            let (input, operand) = parse_unary(input)?;
            Ok((
                input,
                spanned(
                    start,
                    input,
                    ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                ),
            ))
        }
        None => parse_postfix(input),
    }
}

/// Parses postfix chains: subscripts, calls, member access, `++`/`--`.
fn parse_postfix(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (mut input, mut expr_node) = parse_primary(input)?;

    loop {
        if let Ok((next, index)) = delimited(
            ws_char('['),
            expr,
            context("']'", ws_char(']')),
        )
        .parse(input)
        {
            expr_node = spanned(
                start,
                next,
                ExprKind::Index {
                    base: Box::new(expr_node),
                    index: Box::new(index),
                },
            );
            input = next;
            continue;
        }

        if let Ok((next, args)) = delimited(
            ws_char('('),
            separated_list0(ws_char(','), expr),
            context("')'", ws_char(')')),
        )
        .parse(input)
        {
            expr_node = spanned(
                start,
                next,
                ExprKind::Call {
                    callee: Box::new(expr_node),
                    args,
                },
            );
            input = next;
            continue;
        }

        if let Ok((next, field)) = preceded(ws_tag("->"), identifier).parse(input) {
            expr_node = spanned(
                start,
                next,
                ExprKind::Member {
                    base: Box::new(expr_node),
                    field,
                    arrow: true,
                },
            );
            input = next;
            continue;
        }

        if let Ok((next, field)) = preceded(member_dot, identifier).parse(input) {
            expr_node = spanned(
                start,
                next,
                ExprKind::Member {
                    base: Box::new(expr_node),
                    field,
                    arrow: false,
                },
            );
            input = next;
            continue;
        }

        if let Ok((next, _)) = ws_tag("++")(input) {
            expr_node = spanned(
                start,
                next,
                ExprKind::Postfix {
                    op: PostfixOp::PostInc,
                    operand: Box::new(expr_node),
                },
            );
            input = next;
            continue;
        }

        if let Ok((next, _)) = ws_tag("--")(input) {
            expr_node = spanned(
                start,
                next,
                ExprKind::Postfix {
                    op: PostfixOp::PostDec,
                    operand: Box::new(expr_node),
                },
            );
            input = next;
            continue;
        }

        break;
    }

    Ok((input, expr_node))
}

/// Parses `.` member access without consuming `...`.
fn member_dot(input: Span<'_>) -> PResult<'_, char> {
    let (rest, dot) = ws_char('.')(input)?;
    if rest.fragment().starts_with('.') {
        return Err(nom::Err::Error(nom::error::VerboseError {
            errors: vec![(input, nom::error::VerboseErrorKind::Char('.'))],
        }));
    }
    Ok((rest, dot))
}

/// Parses expression atoms.
fn parse_primary(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, _) = ws0(input)?;
    let start = input;

    if let Ok((next, value)) = integer_literal(input) {
        return Ok((next, spanned(start, next, ExprKind::IntLit(value))));
    }

    if let Ok((next, text)) = string_literal(input) {
        return Ok((next, spanned(start, next, ExprKind::StrLit(text))));
    }

    if let Ok((next, inner)) = delimited(
        ws_char('('),
        expr,
        context("')'", ws_char(')')),
    )
    .parse(input)
    {
        return Ok((next, spanned(start, next, ExprKind::Paren(Box::new(inner)))));
    }

    map(context("expression", identifier), |name| {
        ExprKind::Ident(name)
    })
    .parse(input)
    .map(|(next, kind)| (next, spanned(start, next, kind)))
}
