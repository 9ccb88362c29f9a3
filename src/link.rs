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

//! Cross-unit linking.
//!
//! Runs once, after every translation unit has been visited. Function
//! variables sharing an external name are constrained equal, and functions
//! that are never defined anywhere are conservatively forced wild unless
//! they are on the known-safe extern list.

use crate::constraints::Kind;
use crate::diagnostics::ConvertError;
use crate::program::ProgramInfo;
use log::debug;

/// Links global symbols across translation units.
///
/// Merging is associative and commutative over equality constraints, so
/// the order units were visited in does not affect the final solution.
pub fn link(info: &mut ProgramInfo) -> Result<(), ConvertError> {
    // 1. Merge every observation of the same function name. Returns are
    //    equated; parameters exchange wildness only, which keeps the
    //    definition view distinguishable from the declaration view for the
    //    planner's bounds-safe interface decision.
    let names: Vec<String> = info.global_symbols().map(|(name, _)| name.clone()).collect();
    for name in &names {
        let ids = info.functions_named(name).to_vec();
        for pair in ids.windows(2) {
            info.link_functions(pair[0], pair[1]);
        }
    }

    // 2. Functions with no body anywhere cannot be reasoned about; their
    //    parameters and returns go wild unless the name is known safe.
    let undefined: Vec<String> = info
        .extern_functions()
        .filter(|(name, has_body)| !**has_body && !info.is_extern_okay(name))
        .map(|(name, _)| name.clone())
        .collect();
    for name in &undefined {
        debug!("extern '{name}' has no body, constraining wild");
        for id in info.functions_named(name).to_vec() {
            info.constrain_to(id, Kind::Wild);
        }
    }

    Ok(())
}
