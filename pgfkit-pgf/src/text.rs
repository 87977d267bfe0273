//! Text emission.

use std::io::{self, Write};

use crate::emit::Emitter;
use crate::scene::TextItem;

impl<W: Write> Emitter<W> {
    /// Place `item` with `\pgftext`.
    ///
    /// `font_commands` and `text` are inserted verbatim, so `text` must
    /// already be sanitized.
    pub fn text(&mut self, item: &TextItem, font_commands: &str, text: &str) -> io::Result<()> {
        self.out.line(r"\begin{pgfscope}")?;

        let alpha = item.color.a;
        if (alpha - 1.0).abs() >= f64::EPSILON {
            let a = self.out.num(alpha);
            self.out.line(&format!(r"\pgfsetfillopacity{{{a}}}"))?;
            self.out.line(&format!(r"\pgfsetstrokeopacity{{{a}}}"))?;
        }
        let define = format!(r"\definecolor{{textcolor}}{{rgb}}{{{}}}", self.out.rgb(item.color));
        self.out.line(&define)?;
        self.out.line(r"\pgfsetstrokecolor{textcolor}")?;
        self.out.line(r"\pgfsetfillcolor{textcolor}")?;

        let at = self.resolution.point_to_tex(item.position);
        let mut options = vec![
            format!("x={}", self.out.dim(at.x)),
            format!("y={}", self.out.dim(at.y)),
        ];
        options.extend(item.halign.anchor().map(str::to_owned));
        options.extend(item.valign.anchor().map(str::to_owned));
        if item.angle.abs() >= f64::EPSILON {
            options.push(format!("rotate={}", self.out.num(item.angle)));
        }

        let command = format!(
            r"\pgftext[{}]{{\color{{textcolor}}{font_commands} {text}}}",
            options.join(",")
        );
        self.out.line(&command)?;
        self.out.line(r"\end{pgfscope}")
    }
}
