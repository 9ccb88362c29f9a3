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

//! Program-wide analysis state.
//!
//! `ProgramInfo` owns the constraint store and a flat arena of constraint
//! variables keyed by persistent source location. It persists across
//! translation units; per-unit AST nodes are only borrowed while a unit is
//! being visited.

mod equality;
mod vars;

pub use vars::{
    ConstraintVariable, FunctionVariable, OriginalForm, PointerVariable, VarId, compare_solved,
};

pub(crate) use equality::StructTable;

use crate::ast::{BaseType, CType, ParamDecl, SourceSpan};
use crate::constraints::{Assignment, Atom, Constraint, ConstraintSet, Kind, QVar};
use std::collections::BTreeMap;
use std::fmt;

/// Stable location of a declaration: file path plus 1-based line/column.
///
/// Two translation units observing the same header declaration produce the
/// same persistent location, which is what the linker keys on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PersistentSourceLoc {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl PersistentSourceLoc {
    /// Builds a location from a file label and a span anchor.
    pub fn new(file: impl Into<String>, span: &SourceSpan) -> Self {
        Self {
            file: file.into(),
            line: span.line,
            column: span.column,
        }
    }
}

impl fmt::Display for PersistentSourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Per-file rewrite statistics, reported by `--dump-stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStats {
    /// Declarations whose type was rewritten in place.
    pub decl_rewrites: usize,
    /// Parameters given a bounds-safe interface clause.
    pub boundary_interfaces: usize,
    /// Casts inserted at assignments and call sites.
    pub casts_inserted: usize,
}

/// Owned structural snapshot of a constraint variable, used while emitting
/// constraints that mutate the store.
enum VarShape {
    Pointer {
        vars: Vec<QVar>,
        nested_fn: Option<VarId>,
    },
    Function {
        returns: Vec<VarId>,
        params: Vec<Vec<VarId>>,
    },
}

/// Program-wide constraint-variable table and constraint store.
#[derive(Debug, Default)]
pub struct ProgramInfo {
    constraints: ConstraintSet,
    arena: Vec<ConstraintVariable>,
    /// Constraint variables per declaration site.
    var_map: BTreeMap<PersistentSourceLoc, Vec<VarId>>,
    /// Declarator location -> span of its whole declaration statement, for
    /// statements declaring more than one name.
    multi_decl_stmts: BTreeMap<PersistentSourceLoc, SourceSpan>,
    /// External function names mapped to whether a body has been seen.
    extern_functions: BTreeMap<String, bool>,
    /// Function variables of the same external name across units.
    global_symbols: BTreeMap<String, Vec<VarId>>,
    /// Known struct layouts for structural equality.
    structs: StructTable,
    /// Constraint variables of struct fields, keyed by struct and field name.
    field_vars: BTreeMap<(String, String), Vec<VarId>>,
}

impl ProgramInfo {
    /// Creates an empty program info.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the constraint store.
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Returns the constraint store for constraint emission.
    pub fn constraints_mut(&mut self) -> &mut ConstraintSet {
        &mut self.constraints
    }

    /// Solves the current store.
    pub fn solve(&self) -> Assignment {
        self.constraints.solve()
    }

    /// Looks up one constraint variable.
    pub fn var(&self, id: VarId) -> &ConstraintVariable {
        &self.arena[id.0]
    }

    /// Returns the constraint variables recorded at a location.
    pub fn variables_at(&self, loc: &PersistentSourceLoc) -> &[VarId] {
        self.var_map.get(loc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates the variable map in location order.
    ///
    /// Location order keeps every downstream pass deterministic.
    pub fn iter_variables(
        &self,
    ) -> impl Iterator<Item = (&PersistentSourceLoc, &Vec<VarId>)> {
        self.var_map.iter()
    }

    /// Records the span of a multi-declarator statement for one declarator.
    pub fn record_multi_decl(&mut self, loc: PersistentSourceLoc, stmt_span: SourceSpan) {
        self.multi_decl_stmts.insert(loc, stmt_span);
    }

    /// Returns the enclosing multi-declarator statement span, if any.
    pub fn multi_decl_stmt(&self, loc: &PersistentSourceLoc) -> Option<&SourceSpan> {
        self.multi_decl_stmts.get(loc)
    }

    /// Registers a struct layout for structural equality.
    pub fn add_struct(&mut self, name: &str, fields: Vec<(String, CType)>) {
        self.structs.insert(name.to_string(), fields);
    }

    /// Records the constraint variables of one struct field.
    pub fn add_field_vars(&mut self, struct_name: &str, field: &str, ids: Vec<VarId>) {
        self.field_vars
            .insert((struct_name.to_string(), field.to_string()), ids);
    }

    /// Returns the constraint variables of one struct field.
    pub fn field_vars(&self, struct_name: &str, field: &str) -> &[VarId] {
        self.field_vars
            .get(&(struct_name.to_string(), field.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns the declared type of a struct field.
    pub fn field_type(&self, struct_name: &str, field: &str) -> Option<&CType> {
        self.structs
            .get(struct_name)
            .and_then(|fields| fields.iter().find(|(name, _)| name == field))
            .map(|(_, ty)| ty)
    }

    /// Component-wise type compatibility ignoring top-level qualifiers.
    pub fn structural_equal(&self, lhs: &CType, rhs: &CType) -> bool {
        equality::structural_equal(&self.structs, lhs, rhs)
    }

    /// Returns true for external symbols that are safe to leave
    /// unconstrained.
    pub fn is_extern_okay(&self, name: &str) -> bool {
        matches!(name, "malloc" | "calloc" | "realloc" | "free")
    }

    /// Notes that a function name has been observed, tracking whether any
    /// observation carried a body.
    pub fn see_function(&mut self, name: &str, has_body: bool) {
        let entry = self.extern_functions.entry(name.to_string()).or_insert(false);
        *entry |= has_body;
    }

    /// Iterates observed function names with their body-seen flag.
    pub fn extern_functions(&self) -> impl Iterator<Item = (&String, &bool)> {
        self.extern_functions.iter()
    }

    /// Records a function variable under its external name for linking.
    pub fn add_global_symbol(&mut self, name: &str, id: VarId) {
        self.global_symbols.entry(name.to_string()).or_default().push(id);
    }

    /// Iterates global function symbols in name order.
    pub fn global_symbols(&self) -> impl Iterator<Item = (&String, &Vec<VarId>)> {
        self.global_symbols.iter()
    }

    /// Returns the function variables registered under a name.
    pub fn functions_named(&self, name: &str) -> &[VarId] {
        self.global_symbols
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Allocates a pointer variable for a declared pointer-like type.
    ///
    /// One fresh qualifier variable is created per indirection level,
    /// outer-most first. `void*` and `va_list` declarations are constrained
    /// wild immediately; array levels are seeded to at least `Arr`.
    /// Returns `None` when the type has no pointer or array component.
    pub fn add_pointer_variable(
        &mut self,
        loc: PersistentSourceLoc,
        name: &str,
        ty: &CType,
    ) -> Option<VarId> {
        if !ty.is_pointer_like() && ty.base != BaseType::VaList {
            return None;
        }

        // Function-pointer declarations carry a nested function variable so
        // calls through them constrain like direct calls.
        let nested_fn = ty.fn_sig.as_ref().map(|sig| {
            self.allocate_function_variable(
                name,
                &sig.ret,
                &sig.params,
                sig.variadic,
                true,
                false,
                &loc,
            )
        });

        let level_vars: Vec<QVar> = ty
            .layers
            .iter()
            .map(|_| self.constraints.fresh_var())
            .collect();

        let pv = PointerVariable::from_type(ty, name, level_vars.clone(), nested_fn);
        let arr_forms: Vec<OriginalForm> = pv.forms.clone();

        let id = self.push_var(ConstraintVariable::Pointer(pv));
        self.var_map.entry(loc).or_default().push(id);

        // `void*` and `va_list` have no checked counterpart.
        if ty.base == BaseType::Void || ty.base == BaseType::VaList {
            for var in &level_vars {
                self.constraints
                    .add_eq(Atom::Var(*var), Atom::Const(Kind::Wild));
            }
        }

        // A level written as an array was already being indexed.
        for (var, form) in level_vars.iter().zip(arr_forms.iter()) {
            if !matches!(form, OriginalForm::Pointer) {
                self.constraints
                    .add_eq(Atom::Var(*var), Atom::Const(Kind::Arr));
            }
        }

        Some(id)
    }

    /// Allocates a function variable plus pointer variables for its return
    /// type and parameters, and registers it at `loc`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_function_variable(
        &mut self,
        loc: PersistentSourceLoc,
        name: &str,
        ret: &CType,
        params: &[ParamDecl],
        variadic: bool,
        has_proto: bool,
        has_body: bool,
    ) -> VarId {
        let id = self.allocate_function_variable(
            name, ret, params, variadic, has_proto, has_body, &loc,
        );
        self.var_map.entry(loc).or_default().push(id);
        self.add_global_symbol(name, id);
        self.see_function(name, has_body);
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn allocate_function_variable(
        &mut self,
        name: &str,
        ret: &CType,
        params: &[ParamDecl],
        variadic: bool,
        has_proto: bool,
        has_body: bool,
        loc: &PersistentSourceLoc,
    ) -> VarId {
        // Return slot first so its qualifier variables number lowest. The
        // return variable lives only inside the function variable, never in
        // the var map.
        let mut returns = Vec::new();
        if ret.is_pointer_like() {
            let level_vars: Vec<QVar> = ret
                .layers
                .iter()
                .map(|_| self.constraints.fresh_var())
                .collect();
            let pv = PointerVariable::from_type(ret, name, level_vars.clone(), None);
            let ret_id = self.push_var(ConstraintVariable::Pointer(pv));
            if ret.base == BaseType::Void {
                for var in &level_vars {
                    self.constraints
                        .add_eq(Atom::Var(*var), Atom::Const(Kind::Wild));
                }
            }
            returns.push(ret_id);
        }

        let mut param_slots = Vec::with_capacity(params.len());
        for (idx, param) in params.iter().enumerate() {
            let mut slot = Vec::new();
            if param.ty.is_pointer_like() || param.ty.base == BaseType::VaList {
                let param_name = param
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{name}.arg{idx}"));
                let param_loc = PersistentSourceLoc::new(loc.file.clone(), &param.span);
                if let Some(param_id) =
                    self.add_pointer_variable(param_loc, &param_name, &param.ty)
                {
                    slot.push(param_id);
                }
            }
            param_slots.push(slot);
        }

        self.push_var(ConstraintVariable::Function(FunctionVariable {
            name: name.to_string(),
            returns,
            params: param_slots,
            has_proto,
            has_body,
            variadic,
        }))
    }

    fn push_var(&mut self, var: ConstraintVariable) -> VarId {
        let id = VarId(self.arena.len());
        self.arena.push(var);
        id
    }

    /// Owned view of one constraint variable's structure, taken before the
    /// store is mutated.
    fn shape(&self, id: VarId) -> VarShape {
        match self.var(id) {
            ConstraintVariable::Pointer(pv) => VarShape::Pointer {
                vars: pv.vars.clone(),
                nested_fn: pv.nested_fn,
            },
            ConstraintVariable::Function(fv) => VarShape::Function {
                returns: fv.returns.clone(),
                params: fv.params.clone(),
            },
        }
    }

    /// Constrains every qualifier variable reachable from `id` to `kind`.
    pub fn constrain_to(&mut self, id: VarId, kind: Kind) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match self.shape(current) {
                VarShape::Pointer { vars, nested_fn } => {
                    if let Some(nested) = nested_fn {
                        stack.push(nested);
                    }
                    for var in vars {
                        self.constraints.add_eq(Atom::Var(var), Atom::Const(kind));
                    }
                }
                VarShape::Function { returns, params } => {
                    stack.extend(returns);
                    for slot in params {
                        stack.extend(slot);
                    }
                }
            }
        }
    }

    /// Constrains two sets of constraint variables to be equal, pairwise.
    pub fn constrain_eq_sets(&mut self, lhs: &[VarId], rhs: &[VarId]) {
        for &a in lhs {
            for &b in rhs {
                self.constrain_eq(a, b);
            }
        }
    }

    /// Constrains two constraint variables to be equal.
    ///
    /// Pointer variables of equal depth constrain level by level. Unequal
    /// depth ties every pair of qualifier variables, one step short of
    /// forcing wild. Function variables constrain return sets and, when
    /// arities match, parameter sets pairwise; otherwise both sides go wild.
    /// A pointer wrapping a nested function variable constrains through the
    /// function part; any other mixed pairing forces both sides wild.
    pub fn constrain_eq(&mut self, lhs: VarId, rhs: VarId) {
        match (self.shape(lhs), self.shape(rhs)) {
            (
                VarShape::Pointer { vars: left, .. },
                VarShape::Pointer { vars: right, .. },
            ) => {
                if left.len() == right.len() {
                    for (a, b) in left.iter().zip(right.iter()) {
                        self.constraints.add_eq(Atom::Var(*a), Atom::Var(*b));
                    }
                } else {
                    // Unequal arity: tie everything together rather than
                    // concluding wild outright.
                    for a in &left {
                        for b in &right {
                            self.constraints.add_eq(Atom::Var(*a), Atom::Var(*b));
                        }
                    }
                }
            }
            (
                VarShape::Function {
                    returns: l_returns,
                    params: l_params,
                },
                VarShape::Function {
                    returns: r_returns,
                    params: r_params,
                },
            ) => {
                self.constrain_eq_sets(&l_returns, &r_returns);
                if l_params.len() == r_params.len() {
                    for (a, b) in l_params.iter().zip(r_params.iter()) {
                        self.constrain_eq_sets(a, b);
                    }
                } else {
                    self.constrain_to(lhs, Kind::Wild);
                    self.constrain_to(rhs, Kind::Wild);
                }
            }
            (VarShape::Pointer { nested_fn, .. }, VarShape::Function { .. }) => match nested_fn {
                Some(nested) => self.constrain_eq(nested, rhs),
                None => {
                    self.constrain_to(lhs, Kind::Wild);
                    self.constrain_to(rhs, Kind::Wild);
                }
            },
            (VarShape::Function { .. }, VarShape::Pointer { nested_fn, .. }) => match nested_fn {
                Some(nested) => self.constrain_eq(lhs, nested),
                None => {
                    self.constrain_to(lhs, Kind::Wild);
                    self.constrain_to(rhs, Kind::Wild);
                }
            },
        }
    }

    /// Ties two pointer variables so that wildness propagates between them
    /// without equating the safer kinds.
    ///
    /// Used when linking a function's declaration view against its
    /// definition view: a wild caller poisons the definition and a wild body
    /// poisons the declaration, but an `Arr` proof inside the body stays
    /// local so the planner can still offer a bounds-safe interface.
    pub fn constrain_imply_wild(&mut self, lhs: VarId, rhs: VarId) {
        let (Some(pl), Some(pr)) = (self.var(lhs).as_pointer(), self.var(rhs).as_pointer())
        else {
            return;
        };
        let left = pl.vars.clone();
        let right = pr.vars.clone();

        let mut tie = |a: QVar, b: QVar, constraints: &mut ConstraintSet| {
            constraints.add(Constraint::Implies(
                Box::new(Constraint::Eq(Atom::Var(a), Atom::Const(Kind::Wild))),
                Box::new(Constraint::Eq(Atom::Var(b), Atom::Const(Kind::Wild))),
            ));
            constraints.add(Constraint::Implies(
                Box::new(Constraint::Eq(Atom::Var(b), Atom::Const(Kind::Wild))),
                Box::new(Constraint::Eq(Atom::Var(a), Atom::Const(Kind::Wild))),
            ));
        };

        if left.len() == right.len() {
            for (a, b) in left.iter().zip(right.iter()) {
                tie(*a, *b, &mut self.constraints);
            }
        } else {
            for a in &left {
                for b in &right {
                    tie(*a, *b, &mut self.constraints);
                }
            }
        }
    }

    /// Links two function variables observed under the same external name.
    ///
    /// Return sets are equated; parameter sets exchange wildness only, so a
    /// definition can stay provably safer than what its callers see.
    /// Mismatched arity forces both sides wild.
    pub fn link_functions(&mut self, lhs: VarId, rhs: VarId) {
        let (Some(fl), Some(fr)) = (
            self.var(lhs).as_function().cloned(),
            self.var(rhs).as_function().cloned(),
        ) else {
            return;
        };

        self.constrain_eq_sets(&fl.returns, &fr.returns);

        if fl.params.len() != fr.params.len() {
            self.constrain_to(lhs, Kind::Wild);
            self.constrain_to(rhs, Kind::Wild);
            return;
        }

        for (slot_l, slot_r) in fl.params.iter().zip(fr.params.iter()) {
            for &a in slot_l {
                for &b in slot_r {
                    self.constrain_imply_wild(a, b);
                }
            }
        }
    }

    /// Picks the least safe variable of a set under the current solution.
    pub fn highest_of<'a>(
        &'a self,
        ids: &[VarId],
        solution: &Assignment,
    ) -> Option<&'a PointerVariable> {
        let mut best: Option<&PointerVariable> = None;
        for id in ids {
            let Some(pv) = self.var(*id).as_pointer() else {
                continue;
            };
            best = match best {
                None => Some(pv),
                Some(current)
                    if compare_solved(current, pv, solution) == std::cmp::Ordering::Less =>
                {
                    Some(pv)
                }
                Some(current) => Some(current),
            };
        }
        best
    }

    /// Writes the variable map with solved kinds, for `--dump-intermediate`.
    pub fn dump(&self, solution: &Assignment, out: &mut impl std::io::Write) -> std::io::Result<()> {
        writeln!(
            out,
            "{} constraint variables, {} constraints",
            self.arena.len(),
            self.constraints.len()
        )?;
        for (loc, ids) in &self.var_map {
            for id in ids {
                match self.var(*id) {
                    ConstraintVariable::Pointer(pv) => {
                        let kinds: Vec<String> = pv
                            .vars
                            .iter()
                            .map(|v| solution.get(*v).to_string())
                            .collect();
                        writeln!(out, "{loc} {} -> [{}]", pv.name, kinds.join(" "))?;
                    }
                    ConstraintVariable::Function(fv) => {
                        writeln!(
                            out,
                            "{loc} fn {} (proto: {}, body: {})",
                            fv.name, fv.has_proto, fv.has_body
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}
