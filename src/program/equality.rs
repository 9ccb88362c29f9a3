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

//! Structural type equality.
//!
//! Used only to decide whether a cast propagates equality or degrades both
//! sides to wild. Top-level qualifiers are ignored; pointer depth must match
//! and pointees compare recursively. Struct types compare field-by-field by
//! name through the program's struct table.

use crate::ast::{BaseType, CType};
use std::collections::BTreeMap;

/// Field table of the structs seen so far, keyed by struct name.
pub(crate) type StructTable = BTreeMap<String, Vec<(String, CType)>>;

/// Returns true when the two types are component-wise compatible.
pub(crate) fn structural_equal(table: &StructTable, lhs: &CType, rhs: &CType) -> bool {
    structural_equal_guarded(table, lhs, rhs, 0)
}

fn structural_equal_guarded(table: &StructTable, lhs: &CType, rhs: &CType, depth: usize) -> bool {
    // Self-referential structs (linked lists) bottom out here rather than
    // recursing forever.
    if depth > 16 {
        return true;
    }

    // Pointer vs array at the same level still counts as compatible
    // indirection; only the depth matters.
    if lhs.layers.len() != rhs.layers.len() {
        return false;
    }

    match (&lhs.base, &rhs.base) {
        (BaseType::Struct(a), BaseType::Struct(b)) => {
            if a != b {
                return false;
            }
            match (table.get(a), table.get(b)) {
                (Some(fields_a), Some(fields_b)) => {
                    fields_a.len() == fields_b.len()
                        && fields_a.iter().zip(fields_b.iter()).all(
                            |((name_a, ty_a), (name_b, ty_b))| {
                                name_a == name_b
                                    && structural_equal_guarded(table, ty_a, ty_b, depth + 1)
                            },
                        )
                }
                // An undefined struct compares by name alone.
                _ => true,
            }
        }
        (a, b) => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArraySize, TypeLayer};

    fn ptr_to(base: BaseType) -> CType {
        CType::scalar(base).pointer_to()
    }

    #[test]
    fn identical_pointers_are_equal() {
        let table = StructTable::new();
        assert!(structural_equal(
            &table,
            &ptr_to(BaseType::Int),
            &ptr_to(BaseType::Int)
        ));
    }

    #[test]
    fn different_bases_are_not_equal() {
        let table = StructTable::new();
        assert!(!structural_equal(
            &table,
            &ptr_to(BaseType::Int),
            &ptr_to(BaseType::Char)
        ));
    }

    #[test]
    fn depth_mismatch_is_not_equal() {
        let table = StructTable::new();
        let single = ptr_to(BaseType::Int);
        let double = single.pointer_to();
        assert!(!structural_equal(&table, &single, &double));
    }

    #[test]
    fn array_and_pointer_layers_are_compatible() {
        let table = StructTable::new();
        let mut array = CType::scalar(BaseType::Int);
        array.layers.push(TypeLayer::Array(ArraySize::Sized(4)));
        assert!(structural_equal(&table, &array, &ptr_to(BaseType::Int)));
    }

    #[test]
    fn structs_compare_fields_by_name() {
        let mut table = StructTable::new();
        table.insert(
            "node".to_string(),
            vec![
                ("value".to_string(), CType::scalar(BaseType::Int)),
                (
                    "next".to_string(),
                    ptr_to(BaseType::Struct("node".to_string())),
                ),
            ],
        );
        let lhs = ptr_to(BaseType::Struct("node".to_string()));
        assert!(structural_equal(&table, &lhs, &lhs.clone()));
    }
}
