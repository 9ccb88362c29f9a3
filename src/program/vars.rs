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

//! Constraint variables attached to source declarations.
//!
//! A declaration of the form `int **p` is given two qualifier variables,
//! visualized as `int * q_(i+1) * q_i p`. The outer-most level of the type
//! holds the lowest-numbered variable for a given declaration.

use crate::ast::{ArraySize, CType, TypeLayer};
use crate::constraints::{Assignment, Kind, QVar};
use std::cmp::Ordering;
use std::fmt;

/// Index of a constraint variable in the program-wide arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

/// Original written form of one indirection level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginalForm {
    /// Written as a `*` declarator.
    Pointer,
    /// Written as `[n]`.
    SizedArray(u64),
    /// Written as `[]`.
    UnsizedArray,
}

impl OriginalForm {
    /// The lattice point the written form corresponds to.
    pub fn written_kind(&self) -> Kind {
        match self {
            OriginalForm::Pointer => Kind::Ptr,
            OriginalForm::SizedArray(_) | OriginalForm::UnsizedArray => Kind::Arr,
        }
    }

    fn from_layer(layer: &TypeLayer) -> Self {
        match layer {
            TypeLayer::Pointer { .. } => OriginalForm::Pointer,
            TypeLayer::Array(ArraySize::Sized(n)) => OriginalForm::SizedArray(*n),
            TypeLayer::Array(ArraySize::Unsized) => OriginalForm::UnsizedArray,
        }
    }
}

/// Constraints on one pointer-typed declaration.
///
/// May wrap a nested [`FunctionVariable`] for function-pointer declarations.
#[derive(Debug, Clone)]
pub struct PointerVariable {
    /// Rendered base type, e.g. `int` or `struct buf`.
    pub base_type: String,
    /// Declared C name.
    pub name: String,
    /// One qualifier variable per indirection level, outer-most first.
    pub vars: Vec<QVar>,
    /// Per-level `const` qualification.
    pub quals: Vec<bool>,
    /// Per-level original written form.
    pub forms: Vec<OriginalForm>,
    /// True when any level was written as an array.
    pub arr_present: bool,
    /// Nested function variable for function-pointer declarations.
    pub nested_fn: Option<VarId>,
}

impl PointerVariable {
    /// Builds level metadata from a declared type; qualifier variables are
    /// allocated by the caller, one per layer.
    pub fn from_type(ty: &CType, name: &str, vars: Vec<QVar>, nested_fn: Option<VarId>) -> Self {
        debug_assert_eq!(vars.len(), ty.layers.len());
        let quals = ty
            .layers
            .iter()
            .map(|layer| matches!(layer, TypeLayer::Pointer { is_const: true }))
            .collect();
        let forms: Vec<OriginalForm> = ty.layers.iter().map(OriginalForm::from_layer).collect();
        let arr_present = forms
            .iter()
            .any(|form| !matches!(form, OriginalForm::Pointer));
        Self {
            base_type: {
                let mut base = CType::scalar(ty.base.clone());
                base.is_const = ty.is_const;
                base.render()
            },
            name: name.to_string(),
            vars,
            quals,
            forms,
            arr_present,
            nested_fn,
        }
    }

    /// Returns the outer-most qualifier variable, if any level exists.
    pub fn outer_var(&self) -> Option<QVar> {
        self.vars.first().copied()
    }

    /// Returns true when any level solved away from its written form.
    pub fn any_changes(&self, solution: &Assignment) -> bool {
        self.vars
            .iter()
            .zip(self.forms.iter())
            .any(|(var, form)| solution.get(*var) != form.written_kind())
    }

    /// Renders the declaration with solved pointer kinds.
    ///
    /// Checked levels nest (`ptr<array_ptr<int>>`); from the first `Wild`
    /// level down, the original raw C spelling is kept.
    pub fn rewritten(&self, solution: &Assignment, with_name: bool) -> String {
        let mut text = self.render_levels(solution, 0);
        if with_name {
            if let Some(suffix) = self.array_suffix(solution) {
                // Array-form levels keep their bracket syntax after the name.
                text.push(' ');
                text.push_str(&self.name);
                text.push_str(&suffix);
            } else {
                if !text.ends_with('*') {
                    text.push(' ');
                }
                text.push_str(&self.name);
            }
        }
        text
    }

    fn render_levels(&self, solution: &Assignment, level: usize) -> String {
        if level >= self.vars.len() {
            return self.base_type.clone();
        }

        // Array-written levels that stay arrays render via `array_suffix`.
        if !matches!(self.forms[level], OriginalForm::Pointer)
            && solution.get(self.vars[level]) != Kind::Wild
        {
            return self.render_levels(solution, level + 1);
        }

        match solution.get(self.vars[level]) {
            Kind::Ptr => format!("ptr<{}>", self.render_levels(solution, level + 1)),
            Kind::Arr => format!("array_ptr<{}>", self.render_levels(solution, level + 1)),
            Kind::NtArr => format!("nt_array_ptr<{}>", self.render_levels(solution, level + 1)),
            Kind::Wild => {
                // Wild poisons everything below; emit the raw C spelling.
                let stars = self.vars.len() - level;
                format!("{} {}", self.base_type, "*".repeat(stars))
            }
        }
    }

    fn array_suffix(&self, solution: &Assignment) -> Option<String> {
        let mut suffix = String::new();
        for (form, var) in self.forms.iter().zip(self.vars.iter()) {
            if solution.get(*var) == Kind::Wild {
                break;
            }
            match form {
                OriginalForm::SizedArray(n) => suffix.push_str(&format!("[{n}]")),
                OriginalForm::UnsizedArray => suffix.push_str("[]"),
                OriginalForm::Pointer => break,
            }
        }
        if suffix.is_empty() {
            None
        } else {
            Some(suffix)
        }
    }
}

/// Constraints on a function symbol: one set per return slot and parameter.
///
/// Sets are used because the same external name may be observed through
/// several declarations.
#[derive(Debug, Clone, Default)]
pub struct FunctionVariable {
    /// Function or function-pointer name.
    pub name: String,
    /// Constraint variables of the return value.
    pub returns: Vec<VarId>,
    /// Constraint variables of each parameter slot.
    pub params: Vec<Vec<VarId>>,
    /// A prototype has been seen for this symbol.
    pub has_proto: bool,
    /// A body has been seen for this symbol.
    pub has_body: bool,
    /// The function is variadic.
    pub variadic: bool,
}

impl FunctionVariable {
    /// Returns the number of declared parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }
}

/// A constraint variable: either a pointer variable or a function variable.
#[derive(Debug, Clone)]
pub enum ConstraintVariable {
    Pointer(PointerVariable),
    Function(FunctionVariable),
}

impl ConstraintVariable {
    /// Returns the pointer arm, if this is one.
    pub fn as_pointer(&self) -> Option<&PointerVariable> {
        match self {
            ConstraintVariable::Pointer(pv) => Some(pv),
            ConstraintVariable::Function(_) => None,
        }
    }

    /// Returns the function arm, if this is one.
    pub fn as_function(&self) -> Option<&FunctionVariable> {
        match self {
            ConstraintVariable::Function(fv) => Some(fv),
            ConstraintVariable::Pointer(_) => None,
        }
    }

    /// Returns every qualifier variable reachable in this variable alone.
    ///
    /// Nested function variables are traversed by `ProgramInfo`, which owns
    /// the arena.
    pub fn own_qvars(&self) -> Vec<QVar> {
        match self {
            ConstraintVariable::Pointer(pv) => pv.vars.clone(),
            ConstraintVariable::Function(_) => Vec::new(),
        }
    }
}

impl fmt::Display for ConstraintVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintVariable::Pointer(pv) => {
                write!(f, "{} {} [", pv.base_type, pv.name)?;
                for (idx, var) in pv.vars.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{var}")?;
                }
                write!(f, "]")
            }
            ConstraintVariable::Function(fv) => {
                write!(
                    f,
                    "fn {}({} params{})",
                    fv.name,
                    fv.params.len(),
                    if fv.variadic { ", ..." } else { "" }
                )
            }
        }
    }
}

/// Compares two pointer variables by solved kinds, level by level.
///
/// Used to pick the least safe variable of a set and to order the
/// declaration view against the definition view of a parameter.
pub fn compare_solved(
    lhs: &PointerVariable,
    rhs: &PointerVariable,
    solution: &Assignment,
) -> Ordering {
    let lhs_kinds: Vec<Kind> = lhs.vars.iter().map(|v| solution.get(*v)).collect();
    let rhs_kinds: Vec<Kind> = rhs.vars.iter().map(|v| solution.get(*v)).collect();
    lhs_kinds.cmp(&rhs_kinds)
}
