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

//! Rewrite planning.
//!
//! Phase A turns the solved assignment into declaration rewrites: in-place
//! type replacements, bounds-safe interface clauses on declarations, and
//! multi-declarator line rebuilds. Phase B (see `casts`) inserts casts where
//! solved kinds disagree across an assignment or call. The planner emits
//! offset-addressed edits; `emit` applies them through [`RewriteBuffer`]s
//! under the file write policy.

mod buffer;
mod casts;
pub mod emit;

pub use buffer::{RewriteBuffer, RewriteError};

use crate::ast::{
    Declarator, FunctionDecl, Stmt, StmtKind, Storage, TopItem, VarDecl,
};
use crate::constraints::{Assignment, Kind};
use crate::program::{
    FileStats, PersistentSourceLoc, PointerVariable, ProgramInfo, compare_solved,
};
use crate::project::SourceUnit;
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};

/// One planned text edit, addressed by original byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedEdit {
    Replace {
        file: String,
        start: usize,
        end: usize,
        text: String,
    },
    InsertBefore {
        file: String,
        at: usize,
        text: String,
    },
    InsertAfter {
        file: String,
        at: usize,
        text: String,
    },
}

impl PlannedEdit {
    /// Returns the file the edit applies to.
    pub fn file(&self) -> &str {
        match self {
            PlannedEdit::Replace { file, .. }
            | PlannedEdit::InsertBefore { file, .. }
            | PlannedEdit::InsertAfter { file, .. } => file,
        }
    }
}

/// Planner output: edits plus per-file statistics.
#[derive(Debug, Default)]
pub struct RewritePlan {
    pub edits: Vec<PlannedEdit>,
    pub stats: BTreeMap<String, FileStats>,
}

impl RewritePlan {
    fn stats_for(&mut self, file: &str) -> &mut FileStats {
        self.stats.entry(file.to_string()).or_default()
    }
}

/// One observed declaration of a function, for the interface decision.
struct FnView {
    file: String,
    has_body: bool,
    variadic: bool,
    ret_span: crate::ast::SourceSpan,
    name_loc: PersistentSourceLoc,
    params: Vec<ParamView>,
}

struct ParamView {
    loc: PersistentSourceLoc,
    span: crate::ast::SourceSpan,
    has_bounds: bool,
    name: Option<String>,
}

type FunctionIndex = BTreeMap<String, Vec<FnView>>;

/// How one parameter's declaration sites are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterfaceCase {
    /// Rewrite the parameter at every declaration site.
    IncreaseCallers,
    /// Keep the definition's written type; annotate declarations with a
    /// bounds-safe interface clause.
    MakeBoundary,
    /// Leave every site untouched.
    DoNothing,
}

/// Plans all rewrites for the given units against the solved assignment.
pub fn plan(info: &mut ProgramInfo, solution: &Assignment, units: &[SourceUnit]) -> RewritePlan {
    let mut plan = RewritePlan::default();
    let sources: BTreeMap<&str, &str> = units
        .iter()
        .map(|unit| (unit.path.as_str(), unit.source.as_str()))
        .collect();

    let index = build_function_index(units);
    plan_functions(info, solution, &index, &sources, &mut plan);

    for unit in units {
        plan_unit_decls(info, solution, unit, &mut plan);
    }

    // Phase B runs after declaration planning so suppression decisions can
    // consult the same function index.
    for unit in units {
        casts::plan_unit_casts(info, solution, unit, &index, &mut plan);
    }

    plan
}

fn build_function_index(units: &[SourceUnit]) -> FunctionIndex {
    let mut index = FunctionIndex::new();
    for unit in units {
        for item in &unit.unit.items {
            let TopItem::Function(func) = item else {
                continue;
            };
            let params = func
                .params
                .iter()
                .map(|param| ParamView {
                    loc: PersistentSourceLoc::new(unit.path.clone(), &param.span),
                    span: param.span.clone(),
                    has_bounds: param.bounds.is_some(),
                    name: param.name.clone(),
                })
                .collect();
            index.entry(func.name.clone()).or_default().push(FnView {
                file: unit.path.clone(),
                has_body: func.is_definition(),
                variadic: func.variadic,
                ret_span: func.ret_span.clone(),
                name_loc: PersistentSourceLoc::new(unit.path.clone(), &func.name_span),
                params,
            });
        }
    }
    index
}

/// Returns the solved kinds of a pointer variable, outer-most first.
fn solved_kinds(pv: &PointerVariable, solution: &Assignment) -> Vec<Kind> {
    pv.vars.iter().map(|v| solution.get(*v)).collect()
}

/// Returns true when every level solved to `Wild` (the raw spelling).
fn all_wild(pv: &PointerVariable, solution: &Assignment) -> bool {
    solved_kinds(pv, solution)
        .iter()
        .all(|kind| *kind == Kind::Wild)
}

/// Returns the pointer variable a declaration site resolves to.
fn pointer_at<'p>(
    info: &'p ProgramInfo,
    loc: &PersistentSourceLoc,
) -> Option<&'p PointerVariable> {
    info.variables_at(loc)
        .iter()
        .find_map(|id| info.var(*id).as_pointer())
}

/// Plans return-type and parameter rewrites for every function.
fn plan_functions(
    info: &ProgramInfo,
    solution: &Assignment,
    index: &FunctionIndex,
    sources: &BTreeMap<&str, &str>,
    plan: &mut RewritePlan,
) {
    for views in index.values() {
        // Return types rewrite independently at each declaration site.
        for view in views {
            let Some(fn_id) = info
                .variables_at(&view.name_loc)
                .iter()
                .copied()
                .find(|id| info.var(*id).as_function().is_some())
            else {
                continue;
            };
            let fv = info.var(fn_id).as_function().expect("checked above");
            let Some(ret_pv) = fv
                .returns
                .first()
                .and_then(|id| info.var(*id).as_pointer())
            else {
                continue;
            };
            if !ret_pv.any_changes(solution) || all_wild(ret_pv, solution) {
                continue;
            }
            let mut text = ret_pv.rewritten(solution, false);
            // Keep a separator when the name follows the type immediately.
            let needs_space = sources
                .get(view.file.as_str())
                .and_then(|src| src[view.ret_span.end..].chars().next())
                .is_some_and(|c| !c.is_whitespace());
            if needs_space {
                text.push(' ');
            }
            plan.edits.push(PlannedEdit::Replace {
                file: view.file.clone(),
                start: view.ret_span.start,
                end: view.ret_span.end,
                text,
            });
            plan.stats_for(&view.file).decl_rewrites += 1;
        }

        let definition = views.iter().find(|view| view.has_body);
        let param_count = views.iter().map(|view| view.params.len()).max().unwrap_or(0);

        for idx in 0..param_count {
            let case = interface_case(info, solution, views, definition, idx);
            match case {
                InterfaceCase::MakeBoundary => {
                    let def = definition.expect("boundary requires a definition");
                    let def_pv = pointer_at(info, &def.params[idx].loc)
                        .expect("boundary requires a definition view");
                    let itype = def_pv.rewritten(solution, false);
                    for view in views.iter().filter(|view| !view.has_body) {
                        let Some(param) = view.params.get(idx) else {
                            continue;
                        };
                        let Some(source) = sources.get(view.file.as_str()) else {
                            continue;
                        };
                        let original = &source[param.span.start..param.span.end];
                        plan.edits.push(PlannedEdit::Replace {
                            file: view.file.clone(),
                            start: param.span.start,
                            end: param.span.end,
                            text: format!("{original} : itype({itype})"),
                        });
                        plan.stats_for(&view.file).boundary_interfaces += 1;
                    }
                }
                InterfaceCase::IncreaseCallers => {
                    for view in views {
                        let Some(param) = view.params.get(idx) else {
                            continue;
                        };
                        let Some(pv) = pointer_at(info, &param.loc) else {
                            continue;
                        };
                        if !pv.any_changes(solution) || all_wild(pv, solution) {
                            continue;
                        }
                        if pv.nested_fn.is_some() {
                            debug!("skipping function-pointer parameter '{}'", pv.name);
                            continue;
                        }
                        let with_name = param.name.is_some();
                        plan.edits.push(PlannedEdit::Replace {
                            file: view.file.clone(),
                            start: param.span.start,
                            end: param.span.end,
                            text: pv.rewritten(solution, with_name),
                        });
                        plan.stats_for(&view.file).decl_rewrites += 1;
                    }
                }
                InterfaceCase::DoNothing => {}
            }
        }
    }
}

/// Decides how one parameter index is rewritten across its views.
///
/// A bounds-safe interface needs a definition, a separate declaration, a
/// fixed arity, and a definition view that solved differently from the
/// declaration view without collapsing to wild. Everything else falls back
/// to rewriting each site in place.
fn interface_case(
    info: &ProgramInfo,
    solution: &Assignment,
    views: &[FnView],
    definition: Option<&FnView>,
    idx: usize,
) -> InterfaceCase {
    let Some(def) = definition else {
        return InterfaceCase::IncreaseCallers;
    };
    if def.variadic {
        return InterfaceCase::DoNothing;
    }
    let Some(decl) = views
        .iter()
        .find(|view| !view.has_body && view.params.len() > idx)
    else {
        return InterfaceCase::IncreaseCallers;
    };
    let Some(def_param) = def.params.get(idx) else {
        return InterfaceCase::IncreaseCallers;
    };

    let (Some(def_pv), Some(decl_pv)) = (
        pointer_at(info, &def_param.loc),
        pointer_at(info, &decl.params[idx].loc),
    ) else {
        return InterfaceCase::IncreaseCallers;
    };

    if !def_pv.any_changes(solution) || all_wild(def_pv, solution) {
        return InterfaceCase::IncreaseCallers;
    }

    if compare_solved(def_pv, decl_pv, solution) != std::cmp::Ordering::Equal {
        InterfaceCase::MakeBoundary
    } else {
        InterfaceCase::IncreaseCallers
    }
}

/// Plans rewrites for variable declarations and struct fields in one unit.
fn plan_unit_decls(
    info: &ProgramInfo,
    solution: &Assignment,
    unit: &SourceUnit,
    plan: &mut RewritePlan,
) {
    let mut planner = DeclPlanner {
        info,
        solution,
        file: unit.path.clone(),
        plan,
        handled_stmts: HashSet::new(),
    };

    for item in &unit.unit.items {
        match item {
            TopItem::Var(decl) => planner.plan_var_decl(decl),
            TopItem::Struct(def) => {
                for field in &def.fields {
                    planner.plan_field(field);
                }
            }
            TopItem::Function(func) => planner.plan_body(func),
        }
    }
}

struct DeclPlanner<'a> {
    info: &'a ProgramInfo,
    solution: &'a Assignment,
    file: String,
    plan: &'a mut RewritePlan,
    /// Multi-declarator statements already rebuilt, by start offset.
    handled_stmts: HashSet<usize>,
}

impl DeclPlanner<'_> {
    fn pointer_for(&self, declarator: &Declarator) -> Option<&PointerVariable> {
        let loc = PersistentSourceLoc::new(self.file.clone(), &declarator.name_span);
        pointer_at(self.info, &loc)
    }

    fn plan_body(&mut self, func: &FunctionDecl) {
        let Some(body) = &func.body else {
            return;
        };
        for stmt in body {
            self.plan_stmt(stmt);
        }
    }

    fn plan_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Decl(decl) => self.plan_var_decl(decl),
            StmtKind::Compound(stmts) => {
                for inner in stmts {
                    self.plan_stmt(inner);
                }
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.plan_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.plan_stmt(else_branch);
                }
            }
            StmtKind::While { body, .. } => self.plan_stmt(body),
            StmtKind::For { init, body, .. } => {
                if let Some(init) = init {
                    self.plan_stmt(init);
                }
                self.plan_stmt(body);
            }
            StmtKind::Expr(_)
            | StmtKind::Return(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Empty => {}
        }
    }

    fn plan_var_decl(&mut self, decl: &VarDecl) {
        if decl.declarators.len() == 1 {
            self.plan_single_declarator(decl);
        } else {
            self.plan_multi_declarator(decl);
        }
    }

    fn plan_single_declarator(&mut self, decl: &VarDecl) {
        let declarator = &decl.declarators[0];
        let Some(pv) = self.pointer_for(declarator) else {
            return;
        };
        if !pv.any_changes(self.solution) || all_wild(pv, self.solution) {
            return;
        }
        if pv.nested_fn.is_some() {
            // Function-pointer spellings cannot be reconstructed from level
            // kinds alone.
            warn!("skipping function-pointer declaration '{}'", pv.name);
            return;
        }

        let text = format!(
            "{}{}",
            storage_prefix(decl.storage),
            pv.rewritten(self.solution, true)
        );
        self.plan.edits.push(PlannedEdit::Replace {
            file: self.file.clone(),
            start: decl.span.start,
            end: declarator.head_end,
            text,
        });
        self.plan.stats_for(&self.file).decl_rewrites += 1;
    }

    fn plan_multi_declarator(&mut self, decl: &VarDecl) {
        // The statement span recorded at generation time is authoritative
        // for removal; a declarator the generator never saw keeps the AST
        // span as a fall-back.
        let stmt_span = decl
            .declarators
            .iter()
            .find_map(|declarator| {
                let loc = PersistentSourceLoc::new(self.file.clone(), &declarator.name_span);
                self.info.multi_decl_stmt(&loc).cloned()
            })
            .unwrap_or_else(|| decl.span.clone());

        if !self.handled_stmts.insert(stmt_span.start) {
            return;
        }

        let changed: Vec<bool> = decl
            .declarators
            .iter()
            .map(|declarator| {
                self.pointer_for(declarator).is_some_and(|pv| {
                    pv.any_changes(self.solution)
                        && !all_wild(pv, self.solution)
                        && pv.nested_fn.is_none()
                })
            })
            .collect();
        if !changed.iter().any(|c| *c) {
            return;
        }

        // Remove the original statement, then rebuild it declarator by
        // declarator, substituting rewritten types where the solution
        // changed and re-printing the original declaration for the rest.
        let mut lines = Vec::with_capacity(decl.declarators.len());
        for (declarator, is_changed) in decl.declarators.iter().zip(changed.iter()) {
            let head = if *is_changed {
                let pv = self.pointer_for(declarator).expect("changed declarator");
                format!(
                    "{}{}",
                    storage_prefix(decl.storage),
                    pv.rewritten(self.solution, true)
                )
            } else {
                format!(
                    "{}{}",
                    storage_prefix(decl.storage),
                    declarator.ty.render_with_name(&declarator.name)
                )
            };
            let line = match &declarator.init {
                Some(init) => format!("{head} = {};", init.render()),
                None => format!("{head};"),
            };
            lines.push(line);
            if *is_changed {
                self.plan.stats_for(&self.file).decl_rewrites += 1;
            }
        }

        self.plan.edits.push(PlannedEdit::Replace {
            file: self.file.clone(),
            start: stmt_span.start,
            end: stmt_span.end,
            text: String::new(),
        });
        self.plan.edits.push(PlannedEdit::InsertAfter {
            file: self.file.clone(),
            at: stmt_span.end,
            text: lines.join("\n"),
        });
    }

    fn plan_field(&mut self, field: &crate::ast::FieldDecl) {
        let loc = PersistentSourceLoc::new(self.file.clone(), &field.name_span);
        let Some(pv) = pointer_at(self.info, &loc) else {
            return;
        };
        if !pv.any_changes(self.solution) || all_wild(pv, self.solution) {
            return;
        }
        if pv.nested_fn.is_some() {
            warn!("skipping function-pointer field '{}'", pv.name);
            return;
        }
        self.plan.edits.push(PlannedEdit::Replace {
            file: self.file.clone(),
            start: field.span.start,
            end: field.span.end,
            text: pv.rewritten(self.solution, true),
        });
        self.plan.stats_for(&self.file).decl_rewrites += 1;
    }
}

fn storage_prefix(storage: Storage) -> &'static str {
    match storage {
        Storage::None => "",
        Storage::Extern => "extern ",
        Storage::Static => "static ",
    }
}
