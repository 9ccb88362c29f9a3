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

//! Command-line front end for the checked-pointer converter.

use checked_convert::{DriverOptions, run};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(author, version, about = "Infer checked pointer kinds for C sources and rewrite them")]
struct Cli {
    /// Input translation units (C source files)
    #[arg(required = true, value_name = "FILE")]
    paths: Vec<PathBuf>,

    /// Base directory for the code being translated; files outside it are
    /// analyzed but never rewritten
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Postfix for rewritten file names; "-" writes the main unit to stdout
    #[arg(long, default_value = "-", value_name = "S")]
    output_postfix: String,

    /// Print verbose information
    #[arg(long)]
    verbose: bool,

    /// Dump program info and the solved assignment after solving
    #[arg(long)]
    dump_intermediate: bool,

    /// Dump per-file rewrite statistics
    #[arg(long)]
    dump_stats: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Warn
    };
    let _ = simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    );

    let options = DriverOptions {
        paths: cli.paths,
        base_dir: cli.base_dir,
        output_postfix: cli.output_postfix,
        dump_intermediate: cli.dump_intermediate,
        dump_stats: cli.dump_stats,
    };

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
