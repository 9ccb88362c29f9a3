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

//! Cast insertion (phase B of rewrite planning).
//!
//! Where the solved kinds on the two sides of an assignment or call
//! argument disagree, the right-hand side is wrapped: in an
//! `_Assume_bounds_cast<T>(...)` when the receiver is the safer side, or in
//! a plain C-style cast when the receiver is the less safe side. An
//! existing C-style cast at the site is commented out textually, keeping
//! source offsets stable.

use crate::ast::{
    AssignOp, Expr, ExprKind, SourceSpan, Stmt, StmtKind, TopItem,
};
use crate::builder::context::{BuildContext, FnEntry, callee_name};
use crate::builder::exprs::expression_variables;
use crate::constraints::Assignment;
use crate::program::{PersistentSourceLoc, ProgramInfo, VarId};
use crate::project::SourceUnit;
use log::debug;
use std::cmp::Ordering;

use super::{FunctionIndex, PlannedEdit, RewritePlan, pointer_at, solved_kinds};

/// Plans cast insertions for one unit.
pub(super) fn plan_unit_casts(
    info: &mut ProgramInfo,
    solution: &Assignment,
    unit: &SourceUnit,
    index: &FunctionIndex,
    plan: &mut RewritePlan,
) {
    let mut ctx = BuildContext::new(info, unit.path.clone());

    // Re-register functions so calls and returns resolve exactly as they
    // did during generation; variables already exist, so bindings are
    // rebuilt from the variable map rather than allocated.
    for item in &unit.unit.items {
        if let TopItem::Function(func) = item {
            let loc = PersistentSourceLoc::new(unit.path.clone(), &func.name_span);
            let Some(fn_id) = ctx
                .info
                .variables_at(&loc)
                .iter()
                .copied()
                .find(|id| ctx.info.var(*id).as_function().is_some())
            else {
                continue;
            };
            let fv = ctx
                .info
                .var(fn_id)
                .as_function()
                .cloned()
                .expect("checked above");
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
        }
    }

    let mut walker = CastWalker {
        ctx,
        solution,
        index,
        plan,
        file: unit.path.clone(),
        source: unit.source.clone(),
    };

    for item in &unit.unit.items {
        match item {
            TopItem::Var(decl) => walker.visit_decl(decl),
            TopItem::Function(func) => walker.visit_function(func),
            TopItem::Struct(_) => {}
        }
    }
}

struct CastWalker<'a, 'p> {
    ctx: BuildContext<'p>,
    solution: &'a Assignment,
    index: &'a FunctionIndex,
    plan: &'a mut RewritePlan,
    file: String,
    source: String,
}

impl CastWalker<'_, '_> {
    fn visit_function(&mut self, func: &crate::ast::FunctionDecl) {
        let Some(body) = &func.body else {
            return;
        };

        self.ctx.push_scope();
        let loc = PersistentSourceLoc::new(self.file.clone(), &func.name_span);
        let fn_slots = self
            .ctx
            .info
            .variables_at(&loc)
            .iter()
            .copied()
            .find_map(|id| self.ctx.info.var(id).as_function().map(|fv| fv.params.clone()));
        if let Some(slots) = fn_slots {
            for (param, slot) in func.params.iter().zip(slots.iter()) {
                if let Some(name) = &param.name {
                    self.ctx.bind(name, slot.clone(), param.ty.clone());
                }
            }
        }

        for stmt in body {
            self.visit_stmt(stmt);
        }
        self.ctx.pop_scope();
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Decl(decl) => self.visit_decl(decl),
            StmtKind::Expr(expr) => self.visit_expr(expr),
            StmtKind::Compound(stmts) => {
                self.ctx.push_scope();
                for inner in stmts {
                    self.visit_stmt(inner);
                }
                self.ctx.pop_scope();
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(cond);
                self.visit_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_stmt(else_branch);
                }
            }
            StmtKind::While { cond, body } => {
                self.visit_expr(cond);
                self.visit_stmt(body);
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                self.ctx.push_scope();
                if let Some(init) = init {
                    self.visit_stmt(init);
                }
                if let Some(cond) = cond {
                    self.visit_expr(cond);
                }
                if let Some(step) = step {
                    self.visit_expr(step);
                }
                self.visit_stmt(body);
                self.ctx.pop_scope();
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.visit_expr(value);
                }
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Empty => {}
        }
    }

    /// Binds the declarators and treats initializers as assignment sites.
    fn visit_decl(&mut self, decl: &crate::ast::VarDecl) {
        for declarator in &decl.declarators {
            let loc = PersistentSourceLoc::new(self.file.clone(), &declarator.name_span);
            let ids = self.ctx.info.variables_at(&loc).to_vec();
            self.ctx.bind(&declarator.name, ids, declarator.ty.clone());
        }
        for declarator in &decl.declarators {
            if let Some(init) = &declarator.init {
                self.visit_expr(init);
                if declarator.ty.is_pointer_like() {
                    let loc =
                        PersistentSourceLoc::new(self.file.clone(), &declarator.name_span);
                    let lhs_ids = self.ctx.info.variables_at(&loc).to_vec();
                    self.assign_site(&lhs_ids, init);
                }
            }
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Assign { op, lhs, rhs } => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
                if *op == AssignOp::Assign
                    && self
                        .ctx
                        .type_of(lhs)
                        .is_some_and(|ty| ty.is_pointer_like())
                {
                    let lhs_ids = expression_variables(&self.ctx, lhs);
                    self.assign_site(&lhs_ids, rhs);
                }
            }
            ExprKind::Call { callee, args } => {
                for arg in args {
                    self.visit_expr(arg);
                }
                self.call_site(callee, args);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
            ExprKind::Unary { operand, .. } | ExprKind::Postfix { operand, .. } => {
                self.visit_expr(operand);
            }
            ExprKind::Index { base, index } => {
                self.visit_expr(base);
                self.visit_expr(index);
            }
            ExprKind::Member { base, .. } => self.visit_expr(base),
            ExprKind::Cast { operand, .. } => self.visit_expr(operand),
            ExprKind::Paren(inner) => self.visit_expr(inner),
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.visit_expr(cond);
                self.visit_expr(then_expr);
                self.visit_expr(else_expr);
            }
            ExprKind::SizeofExpr(operand) => self.visit_expr(operand),
            ExprKind::IntLit(_)
            | ExprKind::StrLit(_)
            | ExprKind::Ident(_)
            | ExprKind::SizeofType(_) => {}
        }
    }

    /// Places a cast at one assignment (or initializer) site if the solved
    /// kinds disagree.
    fn assign_site(&mut self, lhs_ids: &[VarId], rhs: &Expr) {
        if lhs_ids.is_empty() {
            return;
        }

        let stripped = rhs.ignore_parens();
        let mut rhs_ids = expression_variables(&self.ctx, stripped);
        let mut target = stripped.span.clone();
        let mut existing_cast: Option<SourceSpan> = None;

        // What we want may be hiding behind an explicit cast.
        if let ExprKind::Cast {
            ty_span, operand, ..
        } = &stripped.kind
        {
            if rhs_ids.is_empty() {
                rhs_ids = expression_variables(&self.ctx, operand);
            }
            target = operand.span.clone();
            existing_cast = Some(ty_span.clone());
        }
        if rhs_ids.is_empty() {
            return;
        }

        let Some(lhs_pv) = self.ctx.info.highest_of(lhs_ids, self.solution) else {
            return;
        };
        let Some(rhs_pv) = self.ctx.info.highest_of(&rhs_ids, self.solution) else {
            return;
        };

        let lhs_kinds = solved_kinds(lhs_pv, self.solution);
        let rhs_kinds = solved_kinds(rhs_pv, self.solution);
        if lhs_kinds == rhs_kinds {
            return;
        }

        let cast_to = lhs_pv.rewritten(self.solution, false);

        // The comment-out edits go in first so, at a shared offset, the
        // closing `*/` lands before the inserted cast text.
        if let Some(cast_span) = existing_cast {
            self.comment_out(&cast_span);
        }

        if lhs_kinds < rhs_kinds {
            self.wrap_assume(&target, &cast_to);
        } else {
            self.wrap_c_cast(target.start, &cast_to);
        }
        self.plan.stats_for(&self.file).casts_inserted += 1;
    }

    /// Places casts on call arguments whose solved kind disagrees with the
    /// parameter's.
    fn call_site(&mut self, callee: &Expr, args: &[Expr]) {
        let Some(name) = callee_name(callee) else {
            return;
        };
        let Some(views) = self.index.get(name) else {
            return;
        };
        if views.iter().any(|view| view.variadic) {
            return;
        }

        let definition = views.iter().find(|view| view.has_body);
        let declaration = views.iter().find(|view| !view.has_body);

        let param_count = views.iter().map(|view| view.params.len()).max().unwrap_or(0);
        for (idx, arg) in args.iter().enumerate() {
            if idx >= param_count {
                continue;
            }

            // Trust the author's existing bounds annotation.
            let annotated = views
                .iter()
                .filter_map(|view| view.params.get(idx))
                .any(|param| param.has_bounds);
            if annotated {
                debug!("parameter {idx} of '{name}' has bounds, skipping cast");
                continue;
            }

            let arg_ids = expression_variables(&self.ctx, arg);
            if arg_ids.is_empty() {
                continue;
            }
            let Some(arg_pv) = self.ctx.info.highest_of(&arg_ids, self.solution) else {
                continue;
            };

            let decl_view = declaration.or(definition);
            let Some(mut param_pv) = decl_view
                .and_then(|view| view.params.get(idx))
                .and_then(|param| pointer_at(self.ctx.info, &param.loc))
            else {
                continue;
            };

            // Prefer the definition's view when it is the safer one; that
            // side is what a bounds-safe interface exposes.
            if let Some(def_pv) = definition
                .and_then(|view| view.params.get(idx))
                .and_then(|param| pointer_at(self.ctx.info, &param.loc))
            {
                let def_kinds = solved_kinds(def_pv, self.solution);
                let param_kinds = solved_kinds(param_pv, self.solution);
                if def_kinds != param_kinds && def_kinds < param_kinds {
                    param_pv = def_pv;
                }
            }

            let arg_kinds = solved_kinds(arg_pv, self.solution);
            let param_kinds = solved_kinds(param_pv, self.solution);
            if arg_kinds == param_kinds {
                continue;
            }

            let cast_to = param_pv.rewritten(self.solution, false);
            let target = arg.ignore_parens().span.clone();
            match param_kinds.cmp(&arg_kinds) {
                Ordering::Less => self.wrap_assume(&target, &cast_to),
                _ => self.wrap_c_cast(target.start, &cast_to),
            }
            self.plan.stats_for(&self.file).casts_inserted += 1;
        }
    }

    fn wrap_assume(&mut self, target: &SourceSpan, cast_to: &str) {
        self.plan.edits.push(PlannedEdit::InsertBefore {
            file: self.file.clone(),
            at: target.start,
            text: format!("_Assume_bounds_cast<{cast_to}>("),
        });
        self.plan.edits.push(PlannedEdit::InsertAfter {
            file: self.file.clone(),
            at: target.end,
            text: ")".to_string(),
        });
    }

    fn wrap_c_cast(&mut self, at: usize, cast_to: &str) {
        self.plan.edits.push(PlannedEdit::InsertBefore {
            file: self.file.clone(),
            at,
            text: format!("({cast_to})"),
        });
    }

    /// Comments out an existing cast's type tokens rather than deleting
    /// them, so surrounding offsets stay valid. Best effort: a cast whose
    /// own text contains a comment terminator is left alone.
    fn comment_out(&mut self, cast_span: &SourceSpan) {
        let text = &self.source[cast_span.start..cast_span.end.min(self.source.len())];
        if text.contains("*/") {
            debug!("cannot comment out cast containing '*/'");
            return;
        }
        self.plan.edits.push(PlannedEdit::InsertBefore {
            file: self.file.clone(),
            at: cast_span.start,
            text: "/*".to_string(),
        });
        self.plan.edits.push(PlannedEdit::InsertBefore {
            file: self.file.clone(),
            at: cast_span.end,
            text: "*/".to_string(),
        });
    }
}
