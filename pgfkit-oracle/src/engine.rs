//! TeX process abstraction.
//!
//! The oracle needs two things from a TeX installation: a one-shot batch
//! run to validate the header, and a long-lived interactive process it can
//! feed lines to. Both go through [`TexEngine`] so the protocol can be
//! exercised without TeX installed.

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use pgfkit_tex::TexSystem;

/// Result of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutput {
    pub success: bool,
    /// Everything the process printed.
    pub output: String,
}

/// A running interactive TeX process.
pub trait TexProcess: Send {
    /// The process's standard input.
    fn stdin(&mut self) -> &mut dyn Write;

    /// Hand over the process's standard output. Returns `None` after the
    /// first call.
    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>>;

    /// Kill the process and wait for it to exit.
    fn terminate(&mut self) -> io::Result<()>;
}

/// Something that can run TeX.
pub trait TexEngine: Send + Sync {
    /// Program name, for diagnostics.
    fn program(&self) -> &str;

    /// Run TeX on `input` to completion inside `workdir`.
    fn run_batch(&self, input: &str, workdir: &Path) -> io::Result<BatchOutput>;

    /// Start an interactive TeX process inside `workdir`.
    fn spawn(&self, workdir: &Path) -> io::Result<Box<dyn TexProcess>>;
}

// ---------------------------------------------------------------------------
// SystemTex
// ---------------------------------------------------------------------------

/// The TeX binary on `PATH`, run with `-halt-on-error`.
#[derive(Debug, Clone, Copy)]
pub struct SystemTex {
    texsystem: TexSystem,
}

impl SystemTex {
    pub const fn new(texsystem: TexSystem) -> Self {
        Self { texsystem }
    }

    fn command(&self, workdir: &Path) -> Command {
        let mut command = Command::new(self.texsystem.program());
        command
            .arg("-halt-on-error")
            .current_dir(workdir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped());
        command
    }
}

impl TexEngine for SystemTex {
    fn program(&self) -> &str {
        self.texsystem.program()
    }

    fn run_batch(&self, input: &str, workdir: &Path) -> io::Result<BatchOutput> {
        let mut child = self.command(workdir).stderr(Stdio::piped()).spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // TeX may stop reading early on an error; its output says why.
            match stdin.write_all(input.as_bytes()) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(e),
            }
        }
        let out = child.wait_with_output()?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(BatchOutput {
            success: out.status.success(),
            output,
        })
    }

    fn spawn(&self, workdir: &Path) -> io::Result<Box<dyn TexProcess>> {
        let mut child = self.command(workdir).stderr(Stdio::null()).spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("TeX stdin was not captured"))?;
        log::debug!("started {} (pid {})", self.program(), child.id());
        Ok(Box::new(SystemProcess { child, stdin }))
    }
}

struct SystemProcess {
    child: Child,
    stdin: ChildStdin,
}

impl TexProcess for SystemProcess {
    fn stdin(&mut self) -> &mut dyn Write {
        &mut self.stdin
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.child
            .stdout
            .take()
            .map(|s| Box::new(s) as Box<dyn Read + Send>)
    }

    fn terminate(&mut self) -> io::Result<()> {
        match self.child.kill() {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        let status = self.child.wait()?;
        log::debug!("TeX process exited with {status}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_follows_texsystem() {
        assert_eq!(SystemTex::new(TexSystem::Lualatex).program(), "lualatex");
        let cmd = SystemTex::new(TexSystem::Pdflatex).command(Path::new("/tmp"));
        assert_eq!(cmd.get_program(), "pdflatex");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["-halt-on-error"]);
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/tmp")));
    }
}
