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

//! Whole-program conversion pipeline and driver.
//!
//! The pipeline runs each stage once, in order: every unit is parsed and
//! visited by the constraint generator, the linker merges global symbols,
//! the solver produces the final assignment, the planner derives edits, and
//! the emitter applies them under the write policy.

mod loader;
pub(crate) mod paths;

pub use loader::SourceUnit;

use crate::builder::build_unit;
use crate::constraints::Assignment;
use crate::diagnostics::ConvertError;
use crate::link::link;
use crate::program::ProgramInfo;
use crate::rewrite::emit::{EmitOptions, emit_files};
use crate::rewrite::{RewritePlan, plan};
use log::{debug, info as log_info};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything the pipeline produced for one run.
#[derive(Debug)]
pub struct Conversion {
    pub units: Vec<SourceUnit>,
    pub info: ProgramInfo,
    pub solution: Assignment,
    pub plan: RewritePlan,
    /// Rewritten text per analyzed file.
    pub outputs: BTreeMap<String, String>,
}

impl Conversion {
    /// Returns the rewritten text of one file.
    pub fn output_for(&self, path: &str) -> Option<&str> {
        self.outputs.get(path).map(String::as_str)
    }
}

/// Runs the full pipeline over parsed units.
pub fn convert_units(units: Vec<SourceUnit>) -> Result<Conversion, ConvertError> {
    let mut info = ProgramInfo::new();

    for unit in &units {
        build_unit(&mut info, &unit.path, &unit.unit);
    }

    link(&mut info)?;

    debug!("solving {} constraints", info.constraints().len());
    let solution = info.solve();
    debug!("constraints solved");

    let plan = plan(&mut info, &solution, &units);
    let outputs = crate::rewrite::emit::apply_plan(&units, &plan);

    Ok(Conversion {
        units,
        info,
        solution,
        plan,
        outputs,
    })
}

/// Parses in-memory sources and runs the pipeline; the test entry point.
pub fn convert_sources(sources: &[(&str, &str)]) -> Result<Conversion, ConvertError> {
    let units = sources
        .iter()
        .map(|(path, text)| SourceUnit::from_source(*path, *text))
        .collect::<Result<Vec<_>, _>>()?;
    convert_units(units)
}

/// Driver configuration assembled from the command line.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Input translation units.
    pub paths: Vec<PathBuf>,
    /// Base directory for the write policy; defaults to the current
    /// directory.
    pub base_dir: Option<PathBuf>,
    /// Output postfix; `-` emits the main unit to stdout.
    pub output_postfix: String,
    /// Dump program info and assignment after solving.
    pub dump_intermediate: bool,
    /// Dump per-file rewrite statistics after emitting.
    pub dump_stats: bool,
}

/// Runs the converter end to end for the CLI.
pub fn run(options: &DriverOptions) -> Result<(), ConvertError> {
    let base_dir = match &options.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|err| ConvertError::Io {
            path: ".".to_string(),
            message: format!("could not get current working dir: {err}"),
        })?,
    };

    if options.output_postfix == "-" && options.paths.len() > 1 {
        return Err(ConvertError::Usage(
            "cannot write more than one rewritten file to stdout".to_string(),
        ));
    }

    let explicit: Vec<PathBuf> = options
        .paths
        .iter()
        .filter_map(|path| paths::canonical(path))
        .collect();

    let units = options
        .paths
        .iter()
        .map(|path| SourceUnit::from_path(path))
        .collect::<Result<Vec<_>, _>>()?;

    let conversion = convert_units(units)?;

    if options.dump_intermediate {
        let mut err = std::io::stderr();
        conversion
            .info
            .dump(&conversion.solution, &mut err)
            .map_err(|e| ConvertError::Io {
                path: "<stderr>".to_string(),
                message: e.to_string(),
            })?;
    }

    let emit_options = EmitOptions {
        base_dir,
        output_postfix: options.output_postfix.clone(),
        explicit,
    };
    let written = emit_files(
        &conversion.units,
        &conversion.plan,
        &emit_options,
        &mut std::io::stdout(),
    )?;
    for path in &written {
        log_info!("wrote {}", path.display());
    }

    if options.dump_stats {
        // Statistics go to stderr so a `-` postfix run still emits clean
        // source on stdout.
        for (file, stats) in &conversion.plan.stats {
            eprintln!(
                "{file}: {} declaration rewrites, {} bounds-safe interfaces, {} casts",
                stats.decl_rewrites, stats.boundary_interfaces, stats.casts_inserted
            );
        }
    }

    Ok(())
}
