//! Line-oriented PGF output.
//!
//! Every command line ends in `%` so TeX does not turn the line break into
//! a space inside the picture.

use std::io::{self, Write};

use pgfkit_graphics::units::fmt_scalar;
use pgfkit_graphics::{Rgba, TexPoint, TexPoints};

/// Writes PGF commands and formats the numbers in them.
#[derive(Debug)]
pub struct PgfWriter<W> {
    out: W,
    precision: usize,
}

impl<W: Write> PgfWriter<W> {
    pub const fn new(out: W, precision: usize) -> Self {
        Self { out, precision }
    }

    /// Write one command line.
    pub fn line(&mut self, command: &str) -> io::Result<()> {
        self.out.write_all(command.as_bytes())?;
        self.out.write_all(b"%\n")
    }

    /// Write a `%%` comment line. An empty `text` writes a bare `%%`.
    pub fn comment(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            self.out.write_all(b"%%\n")
        } else {
            writeln!(self.out, "%% {text}")
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // -- number formatting --

    pub fn num(&self, v: f64) -> String {
        fmt_scalar(v, self.precision)
    }

    /// A TeX dimension such as `12.5pt`.
    pub fn dim(&self, v: TexPoints) -> String {
        format!("{}pt", self.num(v.value()))
    }

    /// `\pgfqpoint{x}{y}`.
    pub fn point(&self, p: TexPoint) -> String {
        format!(r"\pgfqpoint{{{}}}{{{}}}", self.dim(p.x), self.dim(p.y))
    }

    /// `r,g,b` with components clamped to `[0, 1]`.
    pub fn rgb(&self, color: Rgba) -> String {
        let [r, g, b] = color.rgb();
        format!("{},{},{}", self.num(r), self.num(g), self.num(b))
    }
}
