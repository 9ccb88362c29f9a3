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

//! Whole-program C pointer-kind inference and checked-pointer rewriting.
//!
//! This crate provides:
//! - A `nom` parser for a C subset with precise source spans.
//! - A constraint generator that maps every pointer-typed declaration to
//!   qualifier variables over the lattice `Ptr < Arr < NtArr < Wild`.
//! - A linker that reconciles global symbols across translation units.
//! - A least-fixpoint solver over the qualifier lattice.
//! - A rewrite planner that replaces declaration types, adds bounds-safe
//!   interface clauses, and inserts casts where solved kinds disagree.
//! - An emitter with a base-directory write policy.
//!
//! # Pipeline
//!
//! 1. Parse each translation unit into a spanned AST.
//! 2. Visit every unit, allocating constraint variables keyed by persistent
//!    source location and emitting constraints.
//! 3. Link global symbols across units.
//! 4. Solve once; every qualifier variable gets a constant kind.
//! 5. Plan declaration rewrites and cast insertions per unit.
//! 6. Apply edits and write files selected by the policy.

mod ast;
mod builder;
mod constraints;
mod diagnostics;
mod link;
mod parser;
mod program;
mod project;
mod rewrite;

#[cfg(test)]
mod tests;

pub use ast::{
    ArraySize, BaseType, BoundsAnnotation, CType, Declarator, Expr, ExprKind, FieldDecl, FnSig,
    FunctionDecl, ParamDecl, SourceSpan, Stmt, StmtKind, Storage, StructDef, TopItem,
    TranslationUnit, TypeLayer, VarDecl,
};
pub use builder::build_unit;
pub use constraints::{Assignment, Atom, Constraint, ConstraintSet, Kind, QVar};
pub use diagnostics::{ConvertError, Expectation, ParseError};
pub use link::link;
pub use parser::parse_translation_unit;
pub use program::{
    ConstraintVariable, FileStats, FunctionVariable, OriginalForm, PersistentSourceLoc,
    PointerVariable, ProgramInfo, VarId,
};
pub use project::{Conversion, DriverOptions, SourceUnit, convert_sources, convert_units, run};
pub use rewrite::emit::{EmitOptions, apply_plan, emit_files};
pub use rewrite::{PlannedEdit, RewriteBuffer, RewriteError, RewritePlan, plan};
