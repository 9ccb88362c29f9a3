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

//! Build context and scope management for constraint generation.

use crate::ast::{BaseType, CType, Expr, ExprKind, UnaryOp};
use crate::program::{ProgramInfo, VarId};
use std::collections::HashMap;

/// One resolved name: its constraint variables and declared type.
#[derive(Debug, Clone)]
pub(crate) struct Binding {
    pub ids: Vec<VarId>,
    pub ty: CType,
}

/// Call-resolution entry for a function name seen in this unit.
#[derive(Debug, Clone)]
pub(crate) struct FnEntry {
    pub id: VarId,
    pub ret: CType,
    pub param_types: Vec<CType>,
    pub param_slots: Vec<Vec<VarId>>,
    pub variadic: bool,
}

/// Traversal state for one translation unit.
///
/// Holds the scope stack for name resolution, the function table for call
/// resolution, and the enclosing-definition state needed by `return`.
pub(crate) struct BuildContext<'p> {
    pub info: &'p mut ProgramInfo,
    /// Source label used to form persistent locations.
    pub file: String,
    scopes: Vec<HashMap<String, Binding>>,
    functions: HashMap<String, FnEntry>,
    /// Return-slot variables of the function body being visited.
    pub current_returns: Vec<VarId>,
    /// Declared return type of the function body being visited.
    pub current_ret_ty: Option<CType>,
}

impl<'p> BuildContext<'p> {
    /// Creates a context with one global scope.
    pub fn new(info: &'p mut ProgramInfo, file: impl Into<String>) -> Self {
        Self {
            info,
            file: file.into(),
            scopes: vec![HashMap::new()],
            functions: HashMap::new(),
            current_returns: Vec::new(),
            current_ret_ty: None,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        let _ = self.scopes.pop();
    }

    /// Binds a declared name in the innermost scope.
    pub fn bind(&mut self, name: &str, ids: Vec<VarId>, ty: CType) {
        self.scopes
            .last_mut()
            .expect("traversal always runs within at least one scope")
            .insert(name.to_string(), Binding { ids, ty });
    }

    /// Resolves a name through the scope stack, innermost first.
    pub fn resolve(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Registers a function for call resolution in this unit.
    ///
    /// A definition replaces an earlier prototype entry so call sites
    /// constrain against the richest view.
    pub fn register_function(&mut self, name: &str, entry: FnEntry, is_definition: bool) {
        if is_definition || !self.functions.contains_key(name) {
            self.functions.insert(name.to_string(), entry);
        }
    }

    /// Resolves a direct callee name.
    pub fn function(&self, name: &str) -> Option<&FnEntry> {
        self.functions.get(name)
    }

    /// Computes the static type of an expression from declared types.
    ///
    /// This is not a typechecker; it resolves just enough structure for the
    /// cast-compatibility and call rules. Unknown shapes yield `None` and
    /// the callers fall back to their conservative path.
    pub fn type_of(&self, expr: &Expr) -> Option<CType> {
        match &expr.kind {
            ExprKind::IntLit(_) => Some(CType::scalar(BaseType::Int)),
            ExprKind::StrLit(_) => Some(CType::scalar(BaseType::Char).pointer_to()),
            ExprKind::Ident(name) => self.resolve(name).map(|binding| binding.ty.clone()),
            ExprKind::Paren(inner) => self.type_of(inner),
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Deref => {
                    let mut ty = self.type_of(operand)?;
                    if ty.layers.is_empty() {
                        return None;
                    }
                    ty.layers.remove(0);
                    Some(ty)
                }
                UnaryOp::AddrOf => Some(self.type_of(operand)?.pointer_to()),
                UnaryOp::PreInc | UnaryOp::PreDec => self.type_of(operand),
                UnaryOp::Neg | UnaryOp::LogicalNot | UnaryOp::BitNot => {
                    Some(CType::scalar(BaseType::Int))
                }
            },
            ExprKind::Postfix { operand, .. } => self.type_of(operand),
            ExprKind::Index { base, .. } => {
                let mut ty = self.type_of(base)?;
                if ty.layers.is_empty() {
                    return None;
                }
                ty.layers.remove(0);
                Some(ty)
            }
            ExprKind::Member { base, field, .. } => {
                let base_ty = self.type_of(base)?;
                let BaseType::Struct(struct_name) = &base_ty.base else {
                    return None;
                };
                self.info.field_type(struct_name, field).cloned()
            }
            ExprKind::Assign { lhs, .. } => self.type_of(lhs),
            ExprKind::Conditional { then_expr, .. } => self.type_of(then_expr),
            ExprKind::Call { callee, .. } => {
                let name = callee_name(callee)?;
                self.functions.get(name).map(|entry| entry.ret.clone())
            }
            ExprKind::Cast { ty, .. } => Some(ty.clone()),
            ExprKind::Binary { lhs, rhs, .. } => {
                // Pointer arithmetic keeps the pointer operand's type.
                let lhs_ty = self.type_of(lhs);
                if lhs_ty.as_ref().is_some_and(CType::is_pointer_like) {
                    return lhs_ty;
                }
                let rhs_ty = self.type_of(rhs);
                if rhs_ty.as_ref().is_some_and(CType::is_pointer_like) {
                    return rhs_ty;
                }
                lhs_ty.or(rhs_ty)
            }
            ExprKind::SizeofType(_) | ExprKind::SizeofExpr(_) => {
                Some(CType::scalar(BaseType::UnsignedLong))
            }
        }
    }
}

/// Extracts the identifier a callee expression names, if it is direct.
pub(crate) fn callee_name(callee: &Expr) -> Option<&str> {
    match &callee.ignore_parens().kind {
        ExprKind::Ident(name) => Some(name),
        _ => None,
    }
}
