//! The standalone-document compile step.

use std::fs;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use pgfkit_graphics::Inches;
use pgfkit_tex::preamble::setup_lines;
use pgfkit_tex::{FontLookup, TexConfig};

use crate::error::{CompileError, RenderError};

/// Base name of the files in the compile directory.
pub const FIGURE_STEM: &str = "figure";

/// Exit status and combined output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Exit status as printed, e.g. `exit status: 1`.
    pub status: String,
    pub output: String,
}

/// Runs a one-shot external program to completion.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> io::Result<CommandOutput>;
}

/// Runs programs found on `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> io::Result<CommandOutput> {
        let out = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(CommandOutput {
            success: out.status.success(),
            status: out.status.to_string(),
            output,
        })
    }
}

/// A document whose page is exactly `width` x `height` and holds only the
/// figure.
pub fn standalone_document(
    config: &TexConfig,
    lookup: &dyn FontLookup,
    width: Inches,
    height: Inches,
) -> String {
    let mut doc = String::from("\\documentclass[12pt]{minimal}\n");
    doc.push_str(&format!(
        "\\usepackage[paperwidth={}in, paperheight={}in, margin=0in]{{geometry}}\n",
        width.value(),
        height.value()
    ));
    for line in setup_lines(config, lookup) {
        doc.push_str(&line);
        doc.push('\n');
    }
    doc.push_str("\\usepackage{pgf}\n");
    doc.push_str("\\begin{document}\n");
    doc.push_str("\\centering\n");
    doc.push_str(&format!("\\input{{{FIGURE_STEM}.pgf}}\n"));
    doc.push_str("\\end{document}\n");
    doc
}

/// Write the fragment and document into `scratch`, run TeX there and copy
/// the PDF to `dest`.
pub(crate) fn compile_in(
    scratch: &Path,
    runner: &dyn CommandRunner,
    program: &str,
    fragment: &str,
    document: &str,
    dest: &Path,
) -> Result<(), RenderError> {
    fs::write(scratch.join(format!("{FIGURE_STEM}.pgf")), fragment)?;
    let tex_name = format!("{FIGURE_STEM}.tex");
    fs::write(scratch.join(&tex_name), document)?;

    let args = ["-interaction=nonstopmode", "-halt-on-error", tex_name.as_str()];
    log::debug!("running {program} {}", args.join(" "));
    let run = runner.run(program, &args, scratch)?;
    if !run.success {
        return Err(CompileError {
            program: program.to_owned(),
            status: run.status,
            output: run.output,
            fragment: fragment.to_owned(),
        }
        .into());
    }

    fs::copy(scratch.join(format!("{FIGURE_STEM}.pdf")), dest)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
