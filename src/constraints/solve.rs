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

//! Least-fixpoint solving over the qualifier lattice.

use super::{Atom, Constraint, ConstraintSet, Kind, QVar};

/// The solver's output: a total map from qualifier variables to constants.
///
/// Variables untouched by any constraint stay at the lattice bottom `Ptr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<Kind>,
}

impl Assignment {
    /// Returns the solved constant for one variable.
    pub fn get(&self, var: QVar) -> Kind {
        self.values
            .get(var.0 as usize)
            .copied()
            .unwrap_or(Kind::Ptr)
    }

    /// Returns the number of assigned variables.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no variables were allocated.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Runs the monotone fixpoint over the store.
///
/// Every constraint is satisfiable by raising variables toward `Wild`, so
/// the iteration always terminates with the least model and cannot conflict.
pub(super) fn solve(store: &ConstraintSet) -> Assignment {
    let mut values = vec![Kind::Ptr; store.var_count()];

    let mut changed = true;
    while changed {
        changed = false;
        for constraint in store.iter() {
            changed |= apply(constraint, &mut values);
        }
    }

    Assignment { values }
}

/// Applies one constraint to the current assignment, returning whether any
/// variable was raised.
fn apply(constraint: &Constraint, values: &mut [Kind]) -> bool {
    match constraint {
        Constraint::Eq(a, b) => apply_eq(*a, *b, values),
        Constraint::Not(inner) => apply_not(inner, values),
        Constraint::Implies(premise, conclusion) => {
            if entailed(premise, values) {
                apply(conclusion, values)
            } else {
                false
            }
        }
    }
}

fn apply_eq(a: Atom, b: Atom, values: &mut [Kind]) -> bool {
    match (a, b) {
        (Atom::Var(x), Atom::Var(y)) => {
            // Mutual raising to the join keeps both sides equal in the
            // least model.
            let joined = values[x.0 as usize].join(values[y.0 as usize]);
            let changed = values[x.0 as usize] != joined || values[y.0 as usize] != joined;
            values[x.0 as usize] = joined;
            values[y.0 as usize] = joined;
            changed
        }
        (Atom::Var(x), other) | (other, Atom::Var(x)) => {
            // Constants cannot be demoted; equality with a constant acts as
            // a lower bound on the variable.
            let c = other.as_const().expect("pair with one variable has one constant");
            let joined = values[x.0 as usize].join(c);
            let changed = values[x.0 as usize] != joined;
            values[x.0 as usize] = joined;
            changed
        }
        (a, b) => {
            debug_assert_eq!(
                a.as_const(),
                b.as_const(),
                "constant atoms only equate to themselves"
            );
            false
        }
    }
}

fn apply_not(inner: &Constraint, values: &mut [Kind]) -> bool {
    // The generator only emits the "cannot be Ptr" form; anything else would
    // be a non-monotone extension the lattice cannot express.
    match inner {
        Constraint::Eq(Atom::Var(x), Atom::Const(Kind::Ptr))
        | Constraint::Eq(Atom::Const(Kind::Ptr), Atom::Var(x)) => {
            let joined = values[x.0 as usize].join(Kind::Arr);
            let changed = values[x.0 as usize] != joined;
            values[x.0 as usize] = joined;
            changed
        }
        other => {
            debug_assert!(false, "unsupported negated constraint: {other}");
            false
        }
    }
}

fn entailed(constraint: &Constraint, values: &[Kind]) -> bool {
    let value_of = |atom: &Atom| match atom {
        Atom::Const(kind) => *kind,
        Atom::Var(var) => values[var.0 as usize],
    };
    match constraint {
        Constraint::Eq(a, b) => value_of(a) == value_of(b),
        Constraint::Not(inner) => match inner.as_ref() {
            Constraint::Eq(a, b) => value_of(a) != value_of(b),
            _ => false,
        },
        Constraint::Implies(premise, conclusion) => {
            !entailed(premise, values) || entailed(conclusion, values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconstrained_variables_stay_at_bottom() {
        let mut store = ConstraintSet::new();
        let a = store.fresh_var();
        let b = store.fresh_var();
        let solution = store.solve();
        assert_eq!(solution.get(a), Kind::Ptr);
        assert_eq!(solution.get(b), Kind::Ptr);
    }

    #[test]
    fn equality_with_constant_raises_variable() {
        let mut store = ConstraintSet::new();
        let a = store.fresh_var();
        store.add_eq(Atom::Var(a), Atom::Const(Kind::Arr));
        assert_eq!(store.solve().get(a), Kind::Arr);
    }

    #[test]
    fn equality_propagates_between_variables() {
        let mut store = ConstraintSet::new();
        let a = store.fresh_var();
        let b = store.fresh_var();
        let c = store.fresh_var();
        // Chain a = b = c with the wild seed at the far end.
        store.add_eq(Atom::Var(a), Atom::Var(b));
        store.add_eq(Atom::Var(b), Atom::Var(c));
        store.add_eq(Atom::Var(c), Atom::Const(Kind::Wild));
        let solution = store.solve();
        assert_eq!(solution.get(a), Kind::Wild);
        assert_eq!(solution.get(b), Kind::Wild);
        assert_eq!(solution.get(c), Kind::Wild);
    }

    #[test]
    fn negated_ptr_equality_forces_at_least_arr() {
        let mut store = ConstraintSet::new();
        let a = store.fresh_var();
        store.add(Constraint::not_eq(Atom::Var(a), Atom::Const(Kind::Ptr)));
        assert_eq!(store.solve().get(a), Kind::Arr);
    }

    #[test]
    fn negated_ptr_equality_does_not_demote_wild() {
        let mut store = ConstraintSet::new();
        let a = store.fresh_var();
        store.add_eq(Atom::Var(a), Atom::Const(Kind::Wild));
        store.add(Constraint::not_eq(Atom::Var(a), Atom::Const(Kind::Ptr)));
        assert_eq!(store.solve().get(a), Kind::Wild);
    }

    #[test]
    fn implication_fires_once_premise_is_entailed() {
        let mut store = ConstraintSet::new();
        let a = store.fresh_var();
        let b = store.fresh_var();
        store.add(Constraint::Implies(
            Box::new(Constraint::Eq(Atom::Var(a), Atom::Const(Kind::Wild))),
            Box::new(Constraint::Eq(Atom::Var(b), Atom::Const(Kind::Wild))),
        ));
        // Premise not yet entailed; b stays at bottom.
        assert_eq!(store.solve().get(b), Kind::Ptr);

        store.add_eq(Atom::Var(a), Atom::Const(Kind::Wild));
        let solution = store.solve();
        assert_eq!(solution.get(a), Kind::Wild);
        assert_eq!(solution.get(b), Kind::Wild);
    }

    #[test]
    fn solution_is_order_independent() {
        let mut forward = ConstraintSet::new();
        let a = forward.fresh_var();
        let b = forward.fresh_var();
        forward.add_eq(Atom::Var(a), Atom::Const(Kind::Arr));
        forward.add_eq(Atom::Var(a), Atom::Var(b));

        let mut reversed = ConstraintSet::new();
        let c = reversed.fresh_var();
        let d = reversed.fresh_var();
        reversed.add_eq(Atom::Var(c), Atom::Var(d));
        reversed.add_eq(Atom::Var(c), Atom::Const(Kind::Arr));

        let lhs = forward.solve();
        let rhs = reversed.solve();
        assert_eq!(lhs.get(a), rhs.get(c));
        assert_eq!(lhs.get(b), rhs.get(d));
        assert_eq!(lhs.get(b), Kind::Arr);
    }

    #[test]
    fn adding_constraints_is_monotone() {
        let mut store = ConstraintSet::new();
        let a = store.fresh_var();
        let b = store.fresh_var();
        store.add_eq(Atom::Var(a), Atom::Const(Kind::Arr));
        let before = store.solve();

        store.add_eq(Atom::Var(b), Atom::Const(Kind::Wild));
        store.add_eq(Atom::Var(a), Atom::Var(b));
        let after = store.solve();

        for var in [a, b] {
            assert!(before.get(var) <= after.get(var));
        }
        assert_eq!(after.get(a), Kind::Wild);
    }

    #[test]
    fn solving_twice_is_idempotent() {
        let mut store = ConstraintSet::new();
        let a = store.fresh_var();
        let b = store.fresh_var();
        store.add_eq(Atom::Var(a), Atom::Var(b));
        store.add(Constraint::not_eq(Atom::Var(b), Atom::Const(Kind::Ptr)));
        let first = store.solve();
        let second = store.solve();
        assert_eq!(first, second);
    }
}
