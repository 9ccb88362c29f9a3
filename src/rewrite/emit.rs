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

//! Applying planned edits and writing output files.

use crate::diagnostics::ConvertError;
use crate::project::SourceUnit;
use crate::project::paths::{can_write, canonical, output_path};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{PlannedEdit, RewriteBuffer, RewritePlan};

/// Applies the plan in memory, returning rewritten text per file.
///
/// Edits the buffer refuses (overlapping or out-of-range, typically from a
/// declaration the planner could not place) are logged and skipped; the
/// remaining edits still apply.
pub fn apply_plan(units: &[SourceUnit], plan: &RewritePlan) -> BTreeMap<String, String> {
    let mut buffers: BTreeMap<&str, RewriteBuffer> = units
        .iter()
        .map(|unit| (unit.path.as_str(), RewriteBuffer::new(unit.source.clone())))
        .collect();

    for edit in &plan.edits {
        let Some(buffer) = buffers.get_mut(edit.file()) else {
            warn!("edit targets unknown file '{}'", edit.file());
            continue;
        };
        let result = match edit {
            PlannedEdit::Replace {
                start, end, text, ..
            } => buffer.replace(*start, *end, text.clone()),
            PlannedEdit::InsertBefore { at, text, .. } => {
                buffer.insert_before(*at, text.clone())
            }
            PlannedEdit::InsertAfter { at, text, .. } => buffer.insert_after(*at, text.clone()),
        };
        if let Err(err) = result {
            debug!("skipping unrewritable edit in '{}': {err}", edit.file());
        }
    }

    buffers
        .into_iter()
        .map(|(file, buffer)| (file.to_string(), buffer.apply()))
        .collect()
}

/// Output policy and destinations for [`emit_files`].
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Only descendants of this directory (or explicit inputs) are written.
    pub base_dir: PathBuf,
    /// Postfix inserted before the extension; `-` writes the main unit to
    /// the output stream instead.
    pub output_postfix: String,
    /// Files named on the command line, always writable.
    pub explicit: Vec<PathBuf>,
}

/// Writes rewritten files according to the write policy.
///
/// With the `-` postfix the first (main) unit's buffer goes to `out`.
/// Otherwise every writable analyzed file is emitted as
/// `<stem>.<postfix>.<ext>` next to the original; unwritable files are
/// silently skipped and unresolvable paths are warned about.
pub fn emit_files(
    units: &[SourceUnit],
    plan: &RewritePlan,
    options: &EmitOptions,
    out: &mut impl Write,
) -> Result<Vec<PathBuf>, ConvertError> {
    let outputs = apply_plan(units, plan);

    if options.output_postfix == "-" {
        if let Some(main) = units.first() {
            let text = outputs
                .get(&main.path)
                .expect("every unit has an output buffer");
            out.write_all(text.as_bytes()).map_err(|err| ConvertError::Io {
                path: "<stdout>".to_string(),
                message: err.to_string(),
            })?;
        }
        return Ok(Vec::new());
    }

    let mut written = Vec::new();
    for unit in units {
        let path = Path::new(&unit.path);
        if canonical(path).is_none() {
            warn!("cannot resolve '{}', skipping emit", unit.path);
            continue;
        }
        if !can_write(path, &options.explicit, &options.base_dir) {
            continue;
        }

        let target = output_path(path, &options.output_postfix);
        let text = outputs
            .get(&unit.path)
            .expect("every unit has an output buffer");
        match std::fs::write(&target, text) {
            Ok(()) => {
                debug!("wrote {}", target.display());
                written.push(target);
            }
            Err(err) => warn!("could not open file {}: {err}", target.display()),
        }
    }
    Ok(written)
}
