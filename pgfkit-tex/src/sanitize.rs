//! Text sanitizing.
//!
//! Host strings mix plain text with `$...$` math. Before they reach TeX,
//! the plain runs need their reserved characters escaped and the math
//! runs need LaTeX math delimiters. A `$`, `%`, `_` or `^` counts as
//! escaped when it is preceded by an odd number of backslashes.

/// Macro some hosts wrap math in; TeX does not define it.
const MATHDEFAULT: &str = r"\mathdefault";

/// Characters that must be escaped in plain text.
const RESERVED: [char; 4] = ['_', '^', '$', '%'];

/// Rewrite `text` into a string that is safe to typeset.
///
/// Plain runs get `_ ^ $ %` escaped unless already escaped; math runs are
/// wrapped in `\(...\)`, prefixed with `\displaystyle` when
/// `display_math` is set. An unterminated `$` opens a math run that
/// extends to the end of the text.
pub fn texify(text: &str, display_math: bool) -> String {
    let text = strip_mathdefault(text);
    let mut out = String::with_capacity(text.len() + 16);
    for (i, run) in split_math(&text).into_iter().enumerate() {
        if i % 2 == 0 {
            escape_plain(run, &mut out);
        } else {
            out.push_str(r"\(");
            if display_math {
                out.push_str(r"\displaystyle ");
            }
            out.push_str(run);
            out.push_str(r"\)");
        }
    }
    out
}

/// Remove unescaped `\mathdefault` control words, keeping their argument.
fn strip_mathdefault(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut backslashes = 0usize;
    while let Some(c) = rest.chars().next() {
        if c == '\\' && backslashes % 2 == 0 {
            if let Some(after) = rest.strip_prefix(MATHDEFAULT) {
                if !after.starts_with(|n: char| n.is_ascii_alphabetic()) {
                    rest = after;
                    backslashes = 0;
                    continue;
                }
            }
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Split on unescaped `$`. Even indices are plain runs, odd indices math.
fn split_math(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut backslashes = 0usize;
    for (i, c) in text.char_indices() {
        if c == '$' && backslashes % 2 == 0 {
            runs.push(&text[start..i]);
            start = i + 1;
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
    }
    runs.push(&text[start..]);
    runs
}

fn escape_plain(run: &str, out: &mut String) {
    let mut backslashes = 0usize;
    for c in run.chars() {
        if RESERVED.contains(&c) && backslashes % 2 == 0 {
            out.push('\\');
        }
        backslashes = if c == '\\' { backslashes + 1 } else { 0 };
        out.push(c);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
