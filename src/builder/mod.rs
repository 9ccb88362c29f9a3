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

//! Constraint generation: a syntax-directed traversal of each translation
//! unit that allocates constraint variables and emits lattice constraints
//! into the program info.

mod calls;
pub(crate) mod context;
pub(crate) mod exprs;

use crate::ast::{
    AssignOp, BinOp, Expr, ExprKind, FunctionDecl, PostfixOp, Stmt, StmtKind, StructDef, TopItem,
    TranslationUnit, UnaryOp, VarDecl,
};
use crate::program::{PersistentSourceLoc, ProgramInfo};
use log::debug;

use self::calls::constrain_call;
use self::context::{BuildContext, FnEntry};
use self::exprs::{
    constrain_arith_operand, constrain_assign, constrain_standalone_cast, constrain_subscript_base,
    expression_variables,
};

/// Generates constraints for one translation unit.
pub fn build_unit(info: &mut ProgramInfo, file: &str, unit: &TranslationUnit) {
    debug!("analyzing {file}");
    let mut ctx = BuildContext::new(info, file);

    for item in &unit.items {
        match item {
            TopItem::Struct(def) => visit_struct(&mut ctx, def),
            TopItem::Var(decl) => visit_var_decl(&mut ctx, decl),
            TopItem::Function(func) => visit_function(&mut ctx, func),
        }
    }
}

/// Registers a struct's layout and allocates variables for pointer fields.
fn visit_struct(ctx: &mut BuildContext<'_>, def: &StructDef) {
    let fields: Vec<(String, crate::ast::CType)> = def
        .fields
        .iter()
        .map(|field| (field.name.clone(), field.ty.clone()))
        .collect();
    ctx.info.add_struct(&def.name, fields);

    for field in &def.fields {
        if !field.ty.is_pointer_like() {
            continue;
        }
        let loc = PersistentSourceLoc::new(ctx.file.clone(), &field.name_span);
        if let Some(id) = ctx.info.add_pointer_variable(loc, &field.name, &field.ty) {
            ctx.info.add_field_vars(&def.name, &field.name, vec![id]);
        }
    }
}

/// Allocates variables for one declaration statement and constrains its
/// initializers.
fn visit_var_decl(ctx: &mut BuildContext<'_>, decl: &VarDecl) {
    let multi = decl.declarators.len() > 1;

    for declarator in &decl.declarators {
        let loc = PersistentSourceLoc::new(ctx.file.clone(), &declarator.name_span);
        let ids = ctx
            .info
            .add_pointer_variable(loc.clone(), &declarator.name, &declarator.ty)
            .into_iter()
            .collect::<Vec<_>>();
        if multi && !ids.is_empty() {
            // The rewriter needs the whole statement to rebuild shared lines.
            ctx.info.record_multi_decl(loc, decl.span.clone());
        }
        ctx.bind(&declarator.name, ids, declarator.ty.clone());
    }

    // Initializers behave exactly like assignments.
    for declarator in &decl.declarators {
        if let Some(init) = &declarator.init {
            walk_expr(ctx, init);
            let lhs_ids = ctx
                .resolve(&declarator.name)
                .map(|binding| binding.ids.clone())
                .unwrap_or_default();
            constrain_assign(ctx, &lhs_ids, Some(&declarator.ty), init);
        }
    }
}

/// Allocates the function variable and, for definitions, walks the body.
fn visit_function(ctx: &mut BuildContext<'_>, func: &FunctionDecl) {
    let loc = PersistentSourceLoc::new(ctx.file.clone(), &func.name_span);
    let fn_id = ctx.info.add_function_variable(
        loc,
        &func.name,
        &func.ret,
        &func.params,
        func.variadic,
        true,
        func.is_definition(),
    );

    let fv = ctx
        .info
        .var(fn_id)
        .as_function()
        .cloned()
        .expect("function variable was just allocated");

    ctx.register_function(
        &func.name,
        FnEntry {
            id: fn_id,
            ret: func.ret.clone(),
            param_types: func.params.iter().map(|p| p.ty.clone()).collect(),
            param_slots: fv.params.clone(),
            variadic: func.variadic,
        },
        func.is_definition(),
    );

    let Some(body) = &func.body else {
        return;
    };

    ctx.push_scope();
    for (param, slot) in func.params.iter().zip(fv.params.iter()) {
        if let Some(name) = &param.name {
            ctx.bind(name, slot.clone(), param.ty.clone());
        }
    }
    ctx.current_returns = fv.returns.clone();
    ctx.current_ret_ty = Some(func.ret.clone());

    for stmt in body {
        walk_stmt(ctx, stmt);
    }

    ctx.current_returns = Vec::new();
    ctx.current_ret_ty = None;
    ctx.pop_scope();
}

fn walk_stmt(ctx: &mut BuildContext<'_>, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Decl(decl) => visit_var_decl(ctx, decl),
        StmtKind::Expr(expr) => walk_expr(ctx, expr),
        StmtKind::Compound(stmts) => {
            ctx.push_scope();
            for inner in stmts {
                walk_stmt(ctx, inner);
            }
            ctx.pop_scope();
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr(ctx, cond);
            walk_stmt(ctx, then_branch);
            if let Some(else_branch) = else_branch {
                walk_stmt(ctx, else_branch);
            }
        }
        StmtKind::While { cond, body } => {
            walk_expr(ctx, cond);
            walk_stmt(ctx, body);
        }
        StmtKind::For {
            init,
            cond,
            step,
            body,
        } => {
            ctx.push_scope();
            if let Some(init) = init {
                walk_stmt(ctx, init);
            }
            if let Some(cond) = cond {
                walk_expr(ctx, cond);
            }
            if let Some(step) = step {
                walk_expr(ctx, step);
            }
            walk_stmt(ctx, body);
            ctx.pop_scope();
        }
        StmtKind::Return(value) => {
            if let Some(value) = value {
                walk_expr(ctx, value);
                // A returned value is assigned to the function's return slot.
                let returns = ctx.current_returns.clone();
                let ret_ty = ctx.current_ret_ty.clone();
                constrain_assign(ctx, &returns, ret_ty.as_ref(), value);
            }
        }
        StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
    }
}

/// Walks one expression tree, firing the constraint rules at each node.
fn walk_expr(ctx: &mut BuildContext<'_>, expr: &Expr) {
    match &expr.kind {
        ExprKind::Assign { op, lhs, rhs } => {
            walk_expr(ctx, lhs);
            walk_expr(ctx, rhs);
            if *op == AssignOp::Assign {
                // Only pointer-valued stores constrain the left side; an
                // assignment through a subscript or dereference that lands
                // on a non-pointer value says nothing about the pointer.
                let lhs_ty = ctx.type_of(lhs);
                if lhs_ty.as_ref().map_or(true, |ty| ty.is_pointer_like()) {
                    let lhs_ids = expression_variables(ctx, lhs);
                    constrain_assign(ctx, &lhs_ids, lhs_ty.as_ref(), rhs);
                }
            } else if op.is_additive() {
                // `+=` and `-=` are pointer arithmetic on both sides; the
                // multiplicative compound forms are numeric only.
                constrain_arith_operand(ctx, lhs);
                constrain_arith_operand(ctx, rhs);
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            walk_expr(ctx, lhs);
            walk_expr(ctx, rhs);
            if matches!(op, BinOp::Add | BinOp::Sub) {
                constrain_arith_operand(ctx, lhs);
                constrain_arith_operand(ctx, rhs);
            }
        }
        ExprKind::Unary { op, operand } => {
            walk_expr(ctx, operand);
            if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec) {
                constrain_arith_operand(ctx, operand);
            }
        }
        ExprKind::Postfix { op, operand } => {
            walk_expr(ctx, operand);
            if matches!(op, PostfixOp::PostInc | PostfixOp::PostDec) {
                constrain_arith_operand(ctx, operand);
            }
        }
        ExprKind::Index { base, index } => {
            walk_expr(ctx, base);
            walk_expr(ctx, index);
            constrain_subscript_base(ctx, base);
        }
        ExprKind::Cast { ty, operand, .. } => {
            walk_expr(ctx, operand);
            constrain_standalone_cast(ctx, ty, operand);
        }
        ExprKind::Call { callee, args } => {
            for arg in args {
                walk_expr(ctx, arg);
            }
            constrain_call(ctx, callee, args);
        }
        ExprKind::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            walk_expr(ctx, cond);
            walk_expr(ctx, then_expr);
            walk_expr(ctx, else_expr);
        }
        ExprKind::Member { base, .. } => walk_expr(ctx, base),
        ExprKind::Paren(inner) => walk_expr(ctx, inner),
        ExprKind::SizeofExpr(operand) => walk_expr(ctx, operand),
        ExprKind::IntLit(_)
        | ExprKind::StrLit(_)
        | ExprKind::Ident(_)
        | ExprKind::SizeofType(_) => {}
    }
}
