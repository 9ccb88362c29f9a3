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

//! Expression resolution and assignment constraint rules.

use crate::ast::{BaseType, BinOp, CType, Expr, ExprKind, UnaryOp};
use crate::constraints::{Atom, Constraint, Kind};
use crate::program::VarId;
use log::debug;

use super::context::{BuildContext, callee_name};

/// Resolves an expression to the constraint variables it denotes.
///
/// The resolution is declaration-rooted: dereference, subscript, and
/// increment forms all resolve to the variables of the underlying
/// declaration, matching the flow-insensitive analysis. Address-of and
/// casts deliberately resolve to nothing; the assignment rules treat those
/// shapes specially.
pub(crate) fn expression_variables(ctx: &BuildContext<'_>, expr: &Expr) -> Vec<VarId> {
    match &expr.kind {
        ExprKind::Ident(name) => match ctx.resolve(name) {
            Some(binding) => binding.ids.clone(),
            // A bare function name denotes its function variable, so taking
            // a function's address constrains the receiving pointer.
            None => ctx
                .function(name)
                .map(|entry| vec![entry.id])
                .unwrap_or_default(),
        },
        ExprKind::Paren(inner) => expression_variables(ctx, inner),
        ExprKind::Unary { op, operand } => match op {
            UnaryOp::Deref | UnaryOp::PreInc | UnaryOp::PreDec => {
                expression_variables(ctx, operand)
            }
            // `&x` refers one level higher; there is no variable for it.
            UnaryOp::AddrOf => Vec::new(),
            UnaryOp::Neg | UnaryOp::LogicalNot | UnaryOp::BitNot => Vec::new(),
        },
        ExprKind::Postfix { operand, .. } => expression_variables(ctx, operand),
        ExprKind::Index { base, .. } => expression_variables(ctx, base),
        ExprKind::Member { base, field, .. } => {
            let Some(base_ty) = ctx.type_of(base) else {
                return Vec::new();
            };
            let BaseType::Struct(struct_name) = &base_ty.base else {
                return Vec::new();
            };
            ctx.info.field_vars(struct_name, field).to_vec()
        }
        ExprKind::Assign { lhs, .. } => expression_variables(ctx, lhs),
        ExprKind::Conditional {
            then_expr,
            else_expr,
            ..
        } => {
            // Either arm may flow into the result.
            let mut ids = expression_variables(ctx, then_expr);
            ids.extend(expression_variables(ctx, else_expr));
            ids
        }
        ExprKind::Call { callee, .. } => {
            let Some(name) = callee_name(callee) else {
                return Vec::new();
            };
            ctx.function(name)
                .map(|entry| {
                    ctx.info
                        .var(entry.id)
                        .as_function()
                        .map(|fv| fv.returns.clone())
                        .unwrap_or_default()
                })
                .unwrap_or_default()
        }
        ExprKind::Binary { op, lhs, rhs } => match op {
            // Pointer arithmetic produces a value aliasing its operands.
            BinOp::Add | BinOp::Sub => {
                let mut ids = expression_variables(ctx, lhs);
                ids.extend(expression_variables(ctx, rhs));
                ids
            }
            _ => Vec::new(),
        },
        // Casts are opaque here; the assignment rules look through them.
        ExprKind::Cast { .. } => Vec::new(),
        ExprKind::IntLit(_)
        | ExprKind::StrLit(_)
        | ExprKind::SizeofType(_)
        | ExprKind::SizeofExpr(_) => Vec::new(),
    }
}

/// Adds constraints for `lhs = rhs`, initializers included.
///
/// The cases, in order:
/// 1. The right side resolves to constraint variables: pairwise equality.
/// 2. Integer constants: null adds nothing, anything else forces wild.
/// 3. Address-of: safe, nothing to add.
/// 4. C-style casts: the malloc(sizeof) idiom adds nothing; structurally
///    equal casts propagate equality; everything else degrades both sides
///    to wild.
pub(crate) fn constrain_assign(
    ctx: &mut BuildContext<'_>,
    lhs_ids: &[VarId],
    lhs_ty: Option<&CType>,
    rhs: &Expr,
) {
    if lhs_ids.is_empty() {
        return;
    }

    let rhs_ids = expression_variables(ctx, rhs);
    if !rhs_ids.is_empty() {
        ctx.info.constrain_eq_sets(lhs_ids, &rhs_ids);
        return;
    }

    let rhs = rhs.ignore_parens();

    if rhs.as_int_constant().is_some() {
        // A null pointer constant leaves the left side as constrained as it
        // was; any other integer is an address fabricated from a number.
        if !rhs.is_null_pointer_constant() {
            debug!("non-null constant assignment forces wild");
            for id in lhs_ids {
                ctx.info.constrain_to(*id, Kind::Wild);
            }
        }
        return;
    }

    if matches!(
        rhs.kind,
        ExprKind::Unary {
            op: UnaryOp::AddrOf,
            ..
        }
    ) {
        return;
    }

    if let ExprKind::Cast { ty, operand, .. } = &rhs.kind {
        constrain_cast_assign(ctx, lhs_ids, lhs_ty, ty, operand);
    }
}

fn constrain_cast_assign(
    ctx: &mut BuildContext<'_>,
    lhs_ids: &[VarId],
    lhs_ty: Option<&CType>,
    cast_ty: &CType,
    operand: &Expr,
) {
    let operand_ids = expression_variables(ctx, operand);

    // The malloc(sizeof(T)) idiom is trusted when T* matches both sides of
    // the cast.
    if is_safe_malloc_cast(ctx, lhs_ty, cast_ty, operand) {
        debug!("trusting malloc(sizeof) cast");
        return;
    }

    let compatible = match lhs_ty {
        Some(lhs_ty) => {
            ctx.info.structural_equal(lhs_ty, cast_ty)
                && match ctx.type_of(operand) {
                    Some(src_ty) => ctx.info.structural_equal(cast_ty, &src_ty),
                    None => true,
                }
        }
        None => false,
    };

    if compatible {
        ctx.info.constrain_eq_sets(lhs_ids, &operand_ids);
        return;
    }

    // Conservative fall-back: everything on both sides goes wild. The
    // operand may itself be another cast, so strip every cast layer to
    // reach the variables that must be degraded.
    let wild_ids = if operand_ids.is_empty() {
        expression_variables(ctx, operand.ignore_casts())
    } else {
        operand_ids
    };
    for id in lhs_ids.iter().chain(wild_ids.iter()) {
        ctx.info.constrain_to(*id, Kind::Wild);
    }
}

/// Recognizes `(T*)malloc(sizeof(T))` where `T*` matches the destination.
fn is_safe_malloc_cast(
    ctx: &BuildContext<'_>,
    lhs_ty: Option<&CType>,
    cast_ty: &CType,
    operand: &Expr,
) -> bool {
    let ExprKind::Call { callee, args } = &operand.ignore_parens().kind else {
        return false;
    };
    if callee_name(callee) != Some("malloc") || args.len() != 1 {
        return false;
    }
    let ExprKind::SizeofType(arg_ty) = &args[0].ignore_parens().kind else {
        return false;
    };

    let pointed = arg_ty.pointer_to();
    let lhs_ok = lhs_ty.is_some_and(|ty| ctx.info.structural_equal(&pointed, ty));
    lhs_ok && ctx.info.structural_equal(&pointed, cast_ty)
}

/// Handles a cast visited on its own: incompatible casts degrade the source
/// expression's variables to wild.
pub(crate) fn constrain_standalone_cast(
    ctx: &mut BuildContext<'_>,
    cast_ty: &CType,
    operand: &Expr,
) {
    let operand_ids = expression_variables(ctx, operand);
    if operand_ids.is_empty() {
        return;
    }

    let compatible = match ctx.type_of(operand) {
        Some(src_ty) => ctx.info.structural_equal(cast_ty, &src_ty),
        None => false,
    };

    if !compatible {
        for id in operand_ids {
            ctx.info.constrain_to(id, Kind::Wild);
        }
    }
}

/// Forbids `Ptr` on the outer-most level of an expression used in pointer
/// arithmetic.
pub(crate) fn constrain_arith_operand(ctx: &mut BuildContext<'_>, expr: &Expr) {
    for id in expression_variables(ctx, expr) {
        if let Some(outer) = ctx.info.var(id).as_pointer().and_then(|pv| pv.outer_var()) {
            ctx.info.constraints_mut().add(Constraint::not_eq(
                Atom::Var(outer),
                Atom::Const(Kind::Ptr),
            ));
        }
    }
}

/// Requires at least `Arr` on the outer-most level of a subscripted
/// expression.
pub(crate) fn constrain_subscript_base(ctx: &mut BuildContext<'_>, expr: &Expr) {
    for id in expression_variables(ctx, expr) {
        if let Some(outer) = ctx.info.var(id).as_pointer().and_then(|pv| pv.outer_var()) {
            ctx.info
                .constraints_mut()
                .add_eq(Atom::Var(outer), Atom::Const(Kind::Arr));
        }
    }
}
