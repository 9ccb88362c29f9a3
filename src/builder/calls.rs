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

//! Call-site constraint rules.

use crate::ast::Expr;
use crate::constraints::Kind;
use crate::program::VarId;
use log::debug;

use super::context::{BuildContext, FnEntry, callee_name};
use super::exprs::{constrain_assign, expression_variables};

/// Adds constraints for one call expression.
///
/// Arguments to a resolvable callee are treated as assignments to the
/// matching parameter slot; arguments past the declared arity, and every
/// argument of an opaque callee, are forced wild.
pub(crate) fn constrain_call(ctx: &mut BuildContext<'_>, callee: &Expr, args: &[Expr]) {
    // Direct call to a function known in this unit.
    if let Some(name) = callee_name(callee) {
        if let Some(entry) = ctx.function(name).cloned() {
            constrain_args_against(ctx, &entry, args);
            return;
        }

        // A name bound to a function-pointer variable.
        if let Some(binding) = ctx.resolve(name).cloned() {
            constrain_pointer_call(ctx, &binding.ids, args);
            return;
        }

        // Known-safe allocation externs take no pointer arguments worth
        // constraining.
        if ctx.info.is_extern_okay(name) {
            return;
        }

        // Unknown external callee: nothing to match against.
        debug!("opaque callee '{name}', forcing argument variables wild");
        constrain_all_args_wild(ctx, args);
        return;
    }

    // Indirect call through an arbitrary expression.
    let callee_ids = expression_variables(ctx, callee);
    if callee_ids.is_empty() {
        constrain_all_args_wild(ctx, args);
        return;
    }
    constrain_pointer_call(ctx, &callee_ids, args);
}

/// Constrains arguments against a known function entry.
fn constrain_args_against(ctx: &mut BuildContext<'_>, entry: &FnEntry, args: &[Expr]) {
    for (idx, arg) in args.iter().enumerate() {
        if idx < entry.param_slots.len() {
            let slot = entry.param_slots[idx].clone();
            let param_ty = entry.param_types[idx].clone();
            constrain_assign(ctx, &slot, Some(&param_ty), arg);
        } else {
            // Variadic overflow cannot be matched to a declared parameter.
            constrain_arg_wild(ctx, arg);
        }
    }
}

/// Forces a pointer-valued argument's variables wild.
fn constrain_arg_wild(ctx: &mut BuildContext<'_>, arg: &Expr) {
    // An integer-valued argument that merely reads through a pointer says
    // nothing about the pointer itself.
    if ctx
        .type_of(arg)
        .is_some_and(|ty| !ty.is_pointer_like())
    {
        return;
    }
    for id in expression_variables(ctx, arg) {
        ctx.info.constrain_to(id, Kind::Wild);
    }
}

/// Constrains a call through pointer variables that may carry a nested
/// function variable.
fn constrain_pointer_call(ctx: &mut BuildContext<'_>, callee_ids: &[VarId], args: &[Expr]) {
    for &callee_id in callee_ids {
        let nested = match ctx.info.var(callee_id) {
            crate::program::ConstraintVariable::Pointer(pv) => pv.nested_fn,
            crate::program::ConstraintVariable::Function(_) => Some(callee_id),
        };

        let Some(fn_id) = nested else {
            // Calling through something that is not a function pointer, for
            // example a cast char*. Constrain everything.
            ctx.info.constrain_to(callee_id, Kind::Wild);
            constrain_all_args_wild(ctx, args);
            continue;
        };

        let Some(fv) = ctx.info.var(fn_id).as_function().cloned() else {
            continue;
        };

        for (idx, arg) in args.iter().enumerate() {
            if idx < fv.params.len() {
                let arg_ids = expression_variables(ctx, arg);
                ctx.info.constrain_eq_sets(&arg_ids, &fv.params[idx]);
            } else {
                constrain_arg_wild(ctx, arg);
            }
        }
    }
}

fn constrain_all_args_wild(ctx: &mut BuildContext<'_>, args: &[Expr]) {
    for arg in args {
        constrain_arg_wild(ctx, arg);
    }
}
