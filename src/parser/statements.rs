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

//! Statement, declaration, and top-level item parsers.

use crate::ast::{
    CType, Declarator, FieldDecl, FunctionDecl, ParamDecl, SourceSpan, Span, Stmt, StmtKind,
    Storage, StructDef, TopItem, VarDecl,
};
use nom::Parser;
use nom::{
    branch::alt,
    combinator::{map, opt, value},
    error::context,
    multi::{many0, separated_list1},
    sequence::preceded,
};

use super::PResult;
use super::expr::expr;
use super::types::{
    DeclaratorParts, bounds_annotation, named_declarator, parameter_list, type_specifier,
};
use super::utils::{keyword, ws0, ws_char};

/// Parses one top-level item.
pub(super) fn top_item(input: Span<'_>) -> PResult<'_, TopItem> {
    // Definitions are tried before variable declarations so that a function
    // header is not half-consumed as a declarator list.
    alt((
        map(struct_def, TopItem::Struct),
        map(function_decl, TopItem::Function),
        map(var_decl_stmt, TopItem::Var),
    ))
    .parse(input)
}

/// Parses `struct <name> { fields };`.
fn struct_def(input: Span<'_>) -> PResult<'_, StructDef> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (input, _) = keyword("struct")(input)?;
    let (input, name) = context("struct name", super::utils::identifier)(input)?;
    let (input, _) = ws_char('{')(input)?;
    let (input, fields) = many0(field_decl).parse(input)?;
    let (input, _) = context("'}'", ws_char('}'))(input)?;
    let (input, _) = context("';'", ws_char(';'))(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((input, StructDef { name, fields, span }))
}

/// Parses one struct field declaration.
fn field_decl(input: Span<'_>) -> PResult<'_, FieldDecl> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (input, base) = type_specifier(input)?;
    let (input, parts) = named_declarator(input)?;
    let end_offset = parts.end;
    let (input, _) = context("';'", ws_char(';'))(input)?;

    let ty = apply_declarator(&base, &parts);
    let name = parts.name.clone().unwrap_or_default();
    let name_span = parts
        .name_span
        .clone()
        .unwrap_or_else(|| SourceSpan::from_bounds(start, start));

    Ok((
        input,
        FieldDecl {
            name,
            ty,
            span: SourceSpan {
                start: start.location_offset(),
                end: end_offset,
                line: start.location_line() as usize,
                column: start.get_utf8_column(),
            },
            name_span,
        },
    ))
}

/// Parses a function declaration or definition.
fn function_decl(input: Span<'_>) -> PResult<'_, FunctionDecl> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (input, storage) = storage_class(input)?;
    // Anchor the return-type span after the storage class so a rewrite never
    // clobbers `extern`/`static`.
    let (input, _) = ws0(input)?;
    let ret_start = input;
    let (input, ret_base) = type_specifier(input)?;

    // Return-type stars belong to the return type, not the declarator.
    let (input, ret_stars) = many0(super_star).parse(input)?;
    let ret_end = input;
    let (input, name) = super::utils::identifier(input)?;
    let name_end = input;

    let mut ret = ret_base;
    let mut ret_layers = ret_stars;
    ret_layers.extend(ret.layers.iter().cloned());
    ret.layers = ret_layers;

    let (input, (params, variadic)) = parameter_list(input)?;

    let (input, body) = alt((
        map(compound_stmt_block, Some),
        value(None, context("';'", ws_char(';'))),
    ))
    .parse(input)?;

    let span = SourceSpan::from_bounds(start, input);
    let ret_span = SourceSpan {
        start: ret_start.location_offset(),
        end: ret_end.location_offset(),
        line: ret_start.location_line() as usize,
        column: ret_start.get_utf8_column(),
    };
    let name_span = SourceSpan {
        start: name_end.location_offset() - name.len(),
        end: name_end.location_offset(),
        line: name_end.location_line() as usize,
        column: name_end.get_utf8_column().saturating_sub(name.len()),
    };

    Ok((
        input,
        FunctionDecl {
            storage,
            name,
            ret,
            ret_span,
            params,
            variadic,
            body,
            span,
            name_span,
        },
    ))
}

/// Parses one `*` layer in return-type position.
fn super_star(input: Span<'_>) -> PResult<'_, crate::ast::TypeLayer> {
    let (input, _) = ws_char('*')(input)?;
    let (input, is_const) = map(opt(keyword("const")), |c| c.is_some()).parse(input)?;
    Ok((input, crate::ast::TypeLayer::Pointer { is_const }))
}

/// Parses a storage class specifier.
fn storage_class(input: Span<'_>) -> PResult<'_, Storage> {
    alt((
        value(Storage::Extern, keyword("extern")),
        value(Storage::Static, keyword("static")),
        |i| Ok((i, Storage::None)),
    ))
    .parse(input)
}

/// Parses a variable declaration statement with one or more declarators.
pub(super) fn var_decl_stmt(input: Span<'_>) -> PResult<'_, VarDecl> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (input, storage) = storage_class(input)?;
    let (input, base) = type_specifier(input)?;
    let (input, declarators) =
        separated_list1(ws_char(','), |i| init_declarator(i, &base)).parse(input)?;
    let (input, _) = context("';'", ws_char(';'))(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        VarDecl {
            storage,
            declarators,
            span,
        },
    ))
}

/// Parses one declarator with optional bounds annotation and initializer.
fn init_declarator<'a>(input: Span<'a>, base: &CType) -> PResult<'a, Declarator> {
    let (input, _) = ws0(input)?;
    let start = input;
    let (input, parts) = named_declarator(input)?;
    let (input, bounds) = opt(bounds_annotation).parse(input)?;
    let (input, init) = opt(preceded(single_eq, expr)).parse(input)?;

    let ty = apply_declarator(base, &parts);
    let name = parts.name.clone().unwrap_or_default();
    let name_span = parts
        .name_span
        .clone()
        .unwrap_or_else(|| SourceSpan::from_bounds(start, start));

    let end = init
        .as_ref()
        .map(|e| e.span.end)
        .unwrap_or(parts.end);

    Ok((
        input,
        Declarator {
            name,
            ty,
            init,
            bounds,
            span: SourceSpan {
                start: start.location_offset(),
                end,
                line: start.location_line() as usize,
                column: start.get_utf8_column(),
            },
            name_span,
            head_end: parts.end,
        },
    ))
}

/// Parses `=` without consuming `==`.
fn single_eq(input: Span<'_>) -> PResult<'_, char> {
    let (rest, eq) = ws_char('=')(input)?;
    if rest.fragment().starts_with('=') {
        return Err(nom::Err::Error(nom::error::VerboseError {
            errors: vec![(input, nom::error::VerboseErrorKind::Char('='))],
        }));
    }
    Ok((rest, eq))
}

/// Applies declarator layers to a base type, fixing up the function-pointer
/// return type that the declarator parser cannot see.
fn apply_declarator(base: &CType, parts: &DeclaratorParts) -> CType {
    let mut ty = parts.apply_to(base);
    if let Some(sig) = &mut ty.fn_sig {
        sig.ret = CType {
            base: base.base.clone(),
            is_const: base.is_const,
            layers: Vec::new(),
            fn_sig: None,
        };
    }
    ty
}

/// Parses a `{ ... }` block and returns its statements.
fn compound_stmt_block(input: Span<'_>) -> PResult<'_, Vec<Stmt>> {
    let (input, _) = ws_char('{')(input)?;
    let (input, stmts) = many0(statement).parse(input)?;
    let (input, _) = context("'}'", ws_char('}'))(input)?;
    Ok((input, stmts))
}

/// Parses one statement.
pub(super) fn statement(input: Span<'_>) -> PResult<'_, Stmt> {
    let (input, _) = ws0(input)?;
    let start = input;

    // `{ ... }`
    if let Ok((next, stmts)) = compound_stmt_block(input) {
        return Ok((
            next,
            Stmt {
                kind: StmtKind::Compound(stmts),
                span: SourceSpan::from_bounds(start, next),
            },
        ));
    }

    // `if (...) stmt [else stmt]`
    if let Ok((next, _)) = keyword("if")(input) {
        let (next, _) = context("'('", ws_char('('))(next)?;
        let (next, cond) = expr(next)?;
        let (next, _) = context("')'", ws_char(')'))(next)?;
        let (next, then_branch) = statement(next)?;
        let (next, else_branch) = opt(preceded(keyword("else"), statement)).parse(next)?;
        return Ok((
            next,
            Stmt {
                kind: StmtKind::If {
                    cond,
                    then_branch: Box::new(then_branch),
                    else_branch: else_branch.map(Box::new),
                },
                span: SourceSpan::from_bounds(start, next),
            },
        ));
    }

    // `while (...) stmt`
    if let Ok((next, _)) = keyword("while")(input) {
        let (next, _) = context("'('", ws_char('('))(next)?;
        let (next, cond) = expr(next)?;
        let (next, _) = context("')'", ws_char(')'))(next)?;
        let (next, body) = statement(next)?;
        return Ok((
            next,
            Stmt {
                kind: StmtKind::While {
                    cond,
                    body: Box::new(body),
                },
                span: SourceSpan::from_bounds(start, next),
            },
        ));
    }

    // `for (init; cond; step) stmt`
    if let Ok((next, _)) = keyword("for")(input) {
        let (next, _) = context("'('", ws_char('('))(next)?;
        let (next, init) = for_init(next)?;
        let (next, cond) = opt(expr).parse(next)?;
        let (next, _) = context("';'", ws_char(';'))(next)?;
        let (next, step) = opt(expr).parse(next)?;
        let (next, _) = context("')'", ws_char(')'))(next)?;
        let (next, body) = statement(next)?;
        return Ok((
            next,
            Stmt {
                kind: StmtKind::For {
                    init,
                    cond,
                    step,
                    body: Box::new(body),
                },
                span: SourceSpan::from_bounds(start, next),
            },
        ));
    }

    // `return [expr];`
    if let Ok((next, _)) = keyword("return")(input) {
        let (next, value) = opt(expr).parse(next)?;
        let (next, _) = context("';'", ws_char(';'))(next)?;
        return Ok((
            next,
            Stmt {
                kind: StmtKind::Return(value),
                span: SourceSpan::from_bounds(start, next),
            },
        ));
    }

    // `break;` / `continue;`
    if let Ok((next, _)) = keyword("break")(input) {
        let (next, _) = context("';'", ws_char(';'))(next)?;
        return Ok((
            next,
            Stmt {
                kind: StmtKind::Break,
                span: SourceSpan::from_bounds(start, next),
            },
        ));
    }
    if let Ok((next, _)) = keyword("continue")(input) {
        let (next, _) = context("';'", ws_char(';'))(next)?;
        return Ok((
            next,
            Stmt {
                kind: StmtKind::Continue,
                span: SourceSpan::from_bounds(start, next),
            },
        ));
    }

    // Declaration statement.
    if let Ok((next, decl)) = var_decl_stmt(input) {
        let span = decl.span.clone();
        return Ok((
            next,
            Stmt {
                kind: StmtKind::Decl(decl),
                span,
            },
        ));
    }

    // Lone `;`.
    if let Ok((next, _)) = ws_char(';')(input) {
        return Ok((
            next,
            Stmt {
                kind: StmtKind::Empty,
                span: SourceSpan::from_bounds(start, next),
            },
        ));
    }

    // Expression statement.
    let (next, value) = context("statement", expr)(input)?;
    let (next, _) = context("';'", ws_char(';'))(next)?;
    Ok((
        next,
        Stmt {
            kind: StmtKind::Expr(value),
            span: SourceSpan::from_bounds(start, next),
        },
    ))
}

/// Parses the init clause of a `for` statement.
fn for_init(input: Span<'_>) -> PResult<'_, Option<Box<Stmt>>> {
    let (input, _) = ws0(input)?;
    let start = input;

    if let Ok((next, decl)) = var_decl_stmt(input) {
        let span = decl.span.clone();
        return Ok((
            next,
            Some(Box::new(Stmt {
                kind: StmtKind::Decl(decl),
                span,
            })),
        ));
    }

    if let Ok((next, value)) = expr(input) {
        let (next, _) = context("';'", ws_char(';'))(next)?;
        return Ok((
            next,
            Some(Box::new(Stmt {
                kind: StmtKind::Expr(value),
                span: SourceSpan::from_bounds(start, next),
            })),
        ));
    }

    let (input, _) = context("';'", ws_char(';'))(input)?;
    Ok((input, None))
}
