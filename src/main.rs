/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use mplgen::errors::CoreError;
use mplgen::target::Mode;

#[derive(Parser)]
#[clap(version = "0.1.0", author = "Connor Nolan")]
#[clap(group(
    ArgGroup::new("target")
        .args(["x86_protected", "x86_long", "arm_v7", "arm_v8", "portable"])
        .required(true)
))]
struct Opts {
    /// Path to a textual IR source file.
    input: PathBuf,

    /// Target protected mode (32-bit).
    #[clap(long = "x86-protected")]
    x86_protected: bool,

    /// Target long mode (64-bit).
    #[clap(long = "x86-long")]
    x86_long: bool,

    /// Accepted for forward compatibility; rejected once reached by the core.
    #[clap(long = "arm-v7")]
    arm_v7: bool,

    /// Accepted for forward compatibility; rejected once reached by the core.
    #[clap(long = "arm-v8")]
    arm_v8: bool,

    /// Emit machine-independent output; only valid alongside a concrete x86 mode.
    #[clap(short = 'p', long)]
    portable: bool,

    /// Output path; defaults to the input stem with a `.asm` extension.
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Write a companion `.dbg` trace file: one line per routine.
    #[clap(short, long = "debug-trace")]
    debug_trace: bool,

    /// Suppress warning output.
    #[clap(short, long)]
    quiet: bool,

    /// Print each warning as it is collected rather than only a summary count.
    #[clap(short, long)]
    verbose: bool,
}

fn resolve_mode(opts: &Opts) -> Result<Mode, CoreError> {
    if opts.arm_v7 || opts.arm_v8 {
        return Err(CoreError::InvalidMode("ARM targets are not supported by this backend".to_string()));
    }
    let mode = match (opts.x86_protected, opts.x86_long) {
        (true, false) => Mode::Protected,
        (false, true) => Mode::Long,
        (true, true) => {
            return Err(CoreError::InvalidMode("--x86-protected and --x86-long are mutually exclusive".to_string()))
        }
        (false, false) => {
            return Err(CoreError::InvalidMode("a target mode is required: --x86-protected or --x86-long".to_string()))
        }
    };
    if opts.portable {
        return Err(CoreError::InvalidMode("--portable has no concrete-mode output to select; drop the flag".to_string()));
    }
    Ok(mode)
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let mode = resolve_mode(&opts)?;

    let source = fs::read_to_string(&opts.input)
        .with_context(|| format!("Failed to read input file: {}", opts.input.display()))?;

    let mut container = mplgen::text_ir::lower::lower(&source).context("Failed during parsing")?;

    let result = mplgen::generate(&mut container, mode)?;

    let output_path = opts.output.clone().unwrap_or_else(|| opts.input.with_extension("asm"));
    fs::write(&output_path, &result.assembly)
        .with_context(|| format!("Failed to write output file: {}", output_path.display()))?;

    if !opts.quiet {
        if opts.verbose {
            for warning in &result.warnings {
                eprintln!("{warning}");
            }
        } else if !result.warnings.is_empty() {
            eprintln!("{} warning(s); pass -v to see them", result.warnings.len());
        }
    }

    if opts.debug_trace {
        let dbg_path = output_path.with_extension("dbg");
        let mut text = String::new();
        for trace in &result.traces {
            text.push_str(&format!(
                "{}: {} block(s), peak {} temp(s)\n",
                trace.name, trace.block_count, trace.peak_temp_count
            ));
        }
        fs::write(&dbg_path, text).with_context(|| format!("Failed to write debug trace: {}", dbg_path.display()))?;
    }

    println!("Successfully generated {} from {}", output_path.display(), opts.input.display());

    Ok(())
}
