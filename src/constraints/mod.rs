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

//! Pointer-kind qualifier lattice and the constraint store.
//!
//! The lattice is a four-point total order `Ptr < Arr < NtArr < Wild`, from
//! safest to least safe. Constraints relate constant lattice points and
//! integer-identified qualifier variables; the store is append-only and the
//! final solution is independent of insertion order.

mod solve;

pub use solve::Assignment;

use std::fmt;

/// One point of the pointer-kind lattice, ordered safest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// Single-object pointer; no arithmetic or subscripting.
    Ptr,
    /// Array pointer; subscripting and `+`/`-` allowed.
    Arr,
    /// Null-terminated array pointer. Kept as a distinct lattice point for
    /// forward compatibility; no generator rule currently produces it.
    NtArr,
    /// Unconstrained raw pointer.
    Wild,
}

impl Kind {
    /// Returns the least upper bound of two lattice points.
    pub fn join(self, other: Kind) -> Kind {
        self.max(other)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Ptr => "PTR",
            Kind::Arr => "ARR",
            Kind::NtArr => "NTARR",
            Kind::Wild => "WILD",
        };
        write!(f, "{name}")
    }
}

/// A qualifier variable, identified by a fresh integer.
///
/// Variables are allocated per indirection level of a declared pointer type,
/// outer-most level first, so the outer-most level holds the smallest id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QVar(pub u32);

impl fmt::Display for QVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q_{}", self.0)
    }
}

/// Either a constant lattice point or a qualifier variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atom {
    Const(Kind),
    Var(QVar),
}

impl Atom {
    /// Returns the constant payload; identity on constants, `None` on
    /// variables.
    pub fn as_const(&self) -> Option<Kind> {
        match self {
            Atom::Const(kind) => Some(*kind),
            Atom::Var(_) => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Const(kind) => write!(f, "{kind}"),
            Atom::Var(var) => write!(f, "{var}"),
        }
    }
}

/// One constraint formula over atoms.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `a = b`.
    Eq(Atom, Atom),
    /// Negated equality; used to state "this variable cannot be `Ptr`" for
    /// expressions involved in pointer arithmetic.
    Not(Box<Constraint>),
    /// `c1 => c2`; used for cast relationships.
    Implies(Box<Constraint>, Box<Constraint>),
}

impl Constraint {
    /// Builds `a != b`.
    pub fn not_eq(a: Atom, b: Atom) -> Self {
        Constraint::Not(Box::new(Constraint::Eq(a, b)))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Eq(a, b) => write!(f, "{a} = {b}"),
            Constraint::Not(inner) => write!(f, "~({inner})"),
            Constraint::Implies(premise, conclusion) => {
                write!(f, "({premise}) => ({conclusion})")
            }
        }
    }
}

/// Append-only store of constraints and the qualifier-variable allocator.
///
/// The store is extended during generation and linking, frozen before the
/// solver runs, and read-only thereafter.
#[derive(Debug, Default, Clone)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
    next_var: u32,
}

impl ConstraintSet {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh qualifier variable.
    pub fn fresh_var(&mut self) -> QVar {
        let var = QVar(self.next_var);
        self.next_var += 1;
        var
    }

    /// Appends one constraint. Nothing is ever removed.
    pub fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Shorthand for appending `a = b`.
    pub fn add_eq(&mut self, a: Atom, b: Atom) {
        self.add(Constraint::Eq(a, b));
    }

    /// Returns the number of stored constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Returns true when no constraints were recorded.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Returns the number of allocated qualifier variables.
    pub fn var_count(&self) -> usize {
        self.next_var as usize
    }

    /// Iterates stored constraints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Computes the least assignment satisfying the store.
    pub fn solve(&self) -> Assignment {
        solve::solve(self)
    }
}
