//! The metrics oracle: one interactive TeX process per render session.
//!
//! Lifecycle is `start` → `measure`* → `terminate`. A query that fails
//! in a way that leaves the conversation out of sync (halt, timeout,
//! cancellation, broken pipe) kills the process; every later query then
//! fails with [`OracleError::Terminated`]. The process is never restarted.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use pgfkit_tex::preamble::setup_lines;
use pgfkit_tex::{FontDescriptor, FontLookup, FontTranslator, TexConfig};
use tempfile::TempDir;

use crate::engine::{TexEngine, TexProcess};
use crate::error::OracleError;
use crate::metrics::{MetricsResult, parse_reply};
use crate::stream::{ByteStream, CancelToken, ExpectError};

/// Printed once the header has been read.
const READY_SENTINEL: &str = "*pgf_backend_query_start";

/// TeX's prompt for the next input line.
const PROMPT: &[u8] = b"\n*";

/// Asks TeX for the dimensions of box register 0.
const BOX_QUERY: &str = r"\typeout{\the\wd0,\the\ht0,\the\dp0}";

/// Files TeX leaves in its working directory.
const SIDE_EFFECT_FILES: [&str; 2] = ["texput.log", "texput.aux"];

/// The document TeX reads before the first query.
///
/// The line of text and math forces the fonts to load now; otherwise
/// their loading messages would arrive in the middle of a later reply.
pub fn query_header(config: &TexConfig, lookup: &dyn FontLookup) -> String {
    let mut header = String::from("\\documentclass{minimal}\n");
    header.push_str(&format!("% !TeX program = {}\n", config.texsystem));
    for line in setup_lines(config, lookup) {
        header.push_str(&line);
        header.push('\n');
    }
    header.push_str("\\begin{document}\n");
    header.push_str("text $math \\mu$ %force latex to load fonts now\n");
    header.push_str("\\typeout{pgf_backend_query_start}\n");
    header
}

/// A TeX process answering text-size queries.
pub struct MetricsOracle {
    program: String,
    process: Option<Box<dyn TexProcess>>,
    stream: ByteStream,
    workdir: Option<TempDir>,
    translator: FontTranslator,
    timeout: Duration,
    cancel: CancelToken,
    trace: bool,
    cache: HashMap<String, MetricsResult>,
    round_trips: usize,
}

impl MetricsOracle {
    /// Validate the TeX setup, then start the interactive process.
    pub fn start(
        config: &TexConfig,
        translator: FontTranslator,
        engine: &dyn TexEngine,
    ) -> Result<Self, OracleError> {
        Self::start_with_cancel(config, translator, engine, CancelToken::new())
    }

    /// Like [`Self::start`], with a token that aborts any pending read.
    pub fn start_with_cancel(
        config: &TexConfig,
        translator: FontTranslator,
        engine: &dyn TexEngine,
        cancel: CancelToken,
    ) -> Result<Self, OracleError> {
        let program = engine.program().to_owned();
        let startup = |message: String, output: String| OracleError::Startup {
            program: program.clone(),
            message,
            output,
        };

        let workdir = tempfile::Builder::new().prefix("pgfkit-oracle").tempdir()?;
        let header = query_header(config, translator.lookup());

        // A broken preamble or missing font fails here, in batch mode,
        // instead of leaving the interactive process stuck at an error.
        let mut probe = header.clone();
        probe.push_str("\\makeatletter\n\\@@end\n");
        let batch = engine
            .run_batch(&probe, workdir.path())
            .map_err(|e| startup(format!("cannot run {program}: {e}"), String::new()))?;
        if !batch.success {
            return Err(startup(
                "TeX rejected the header; check the preamble and the configured fonts".to_owned(),
                batch.output,
            ));
        }

        let mut process = engine
            .spawn(workdir.path())
            .map_err(|e| startup(format!("cannot spawn {program}: {e}"), String::new()))?;
        let stdout = process
            .take_stdout()
            .ok_or_else(|| startup("TeX output is not readable".to_owned(), String::new()))?;
        let stream = ByteStream::spawn(stdout)?;

        let mut oracle = Self {
            program,
            process: Some(process),
            stream,
            workdir: Some(workdir),
            translator,
            timeout: config.timeout(),
            cancel,
            trace: config.debug,
            cache: HashMap::new(),
            round_trips: 0,
        };

        if let Err(e) = oracle.handshake(&header) {
            oracle.terminate();
            return Err(e);
        }
        log::debug!("{} metrics oracle ready", oracle.program);
        Ok(oracle)
    }

    fn handshake(&mut self, header: &str) -> Result<(), OracleError> {
        let program = self.program.clone();
        let startup = |message: String, output: Vec<u8>| OracleError::Startup {
            program: program.clone(),
            message,
            output: String::from_utf8_lossy(&output).into_owned(),
        };
        let timeout = self.timeout;
        let not_ready = |e: ExpectError| {
            let reason = match &e {
                ExpectError::Halted(_) => "TeX exited before reaching the query prompt".to_owned(),
                ExpectError::TimedOut(_) => format!(
                    "timed out after {}s waiting for the query prompt",
                    timeout.as_secs()
                ),
                ExpectError::Cancelled(_) => {
                    "cancelled while waiting for the query prompt".to_owned()
                }
            };
            startup(reason, e.into_bytes())
        };

        let Some(process) = self.process.as_mut() else {
            return Err(OracleError::Terminated);
        };
        let stdin = process.stdin();
        stdin
            .write_all(header.as_bytes())
            .and_then(|()| stdin.flush())
            .map_err(|e| startup(format!("cannot write the header: {e}"), self.stream.drain()))?;

        // The sentinel counts only at the start of a line; the same text
        // may show up earlier inside an echoed or wrapped line.
        let deadline = Instant::now() + self.timeout;
        let mut at_line_start = true;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let before = self
                .stream
                .expect(READY_SENTINEL.as_bytes(), remaining, &self.cancel)
                .map_err(not_ready)?;
            let line_start = match before.last() {
                None => at_line_start,
                Some(&b) => b == b'\n',
            };
            if line_start {
                break;
            }
            at_line_start = false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        self.stream
            .expect(PROMPT, remaining, &self.cancel)
            .map_err(not_ready)?;
        Ok(())
    }

    /// The command that typesets `text` in `font` into box 0. Queries
    /// producing the same command share one cache entry.
    pub fn query_for(&self, text: &str, font: &FontDescriptor) -> String {
        format!(r"\sbox0{{{} {text}}}", self.translator.commands(font))
    }

    /// Width, total height and descent of `text` set in `font`.
    ///
    /// `text` must already be sanitized.
    pub fn measure(
        &mut self,
        text: &str,
        font: &FontDescriptor,
    ) -> Result<MetricsResult, OracleError> {
        let query = self.query_for(text, font);
        if let Some(&cached) = self.cache.get(&query) {
            log::debug!("metrics cache hit: {text}");
            return Ok(cached);
        }
        log::debug!("metrics query: {text}");

        self.exchange(&query, text)?;
        let output = self.exchange(BOX_QUERY, text)?;
        self.round_trips += 1;

        let reply = output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default();
        let Some(metrics) = parse_reply(reply) else {
            return Err(OracleError::MetricsParse {
                text: text.to_owned(),
                reply: reply.to_owned(),
                output,
            });
        };

        self.cache.insert(query, metrics);
        Ok(metrics)
    }

    /// Send one line and read up to the next prompt.
    fn exchange(&mut self, command: &str, text: &str) -> Result<String, OracleError> {
        let Some(process) = self.process.as_mut() else {
            return Err(OracleError::Terminated);
        };
        if self.trace {
            log::trace!("tex <- {command}");
        }

        let stdin = process.stdin();
        let sent = stdin
            .write_all(command.as_bytes())
            .and_then(|()| stdin.write_all(b"\n"))
            .and_then(|()| stdin.flush());
        if let Err(e) = sent {
            let output = String::from_utf8_lossy(&self.stream.drain()).into_owned();
            self.terminate();
            return Err(if e.kind() == io::ErrorKind::BrokenPipe {
                OracleError::ProcessHalted {
                    text: text.to_owned(),
                    output,
                }
            } else {
                OracleError::Io(e)
            });
        }

        match self.stream.expect(PROMPT, self.timeout, &self.cancel) {
            Ok(bytes) => {
                let reply = String::from_utf8_lossy(&bytes).into_owned();
                if self.trace {
                    log::trace!("tex -> {reply}");
                }
                Ok(reply)
            }
            Err(e) => {
                self.terminate();
                let text = text.to_owned();
                Err(match e {
                    ExpectError::Halted(b) => OracleError::ProcessHalted {
                        text,
                        output: String::from_utf8_lossy(&b).into_owned(),
                    },
                    ExpectError::TimedOut(b) => OracleError::Timeout {
                        text,
                        timeout: self.timeout,
                        output: String::from_utf8_lossy(&b).into_owned(),
                    },
                    ExpectError::Cancelled(b) => OracleError::Cancelled {
                        text,
                        output: String::from_utf8_lossy(&b).into_owned(),
                    },
                })
            }
        }
    }

    /// Number of queries that went to TeX (cache misses).
    pub const fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Number of cached answers.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub const fn is_running(&self) -> bool {
        self.process.is_some()
    }

    /// The directory TeX runs in, until [`Self::terminate`] removes it.
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_ref().map(TempDir::path)
    }

    /// A handle to the token that cancels this oracle's reads.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Kill TeX and remove its working files. Safe to call repeatedly.
    pub fn terminate(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.terminate() {
                log::warn!("cannot stop {}: {e}", self.program);
            }
        }
        if let Some(dir) = self.workdir.take() {
            for name in SIDE_EFFECT_FILES {
                match fs::remove_file(dir.path().join(name)) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => log::warn!("cannot remove {name}: {e}"),
                }
            }
            if let Err(e) = dir.close() {
                log::warn!("cannot remove the oracle directory: {e}");
            }
        }
    }
}

impl Drop for MetricsOracle {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for MetricsOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsOracle")
            .field("program", &self.program)
            .field("running", &self.process.is_some())
            .field("cached", &self.cache.len())
            .field("round_trips", &self.round_trips)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests may panic")]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use pgfkit_graphics::Points;
    use pgfkit_tex::{FamilySet, TexSystem};

    use super::*;
    use crate::scripted::{Reply, ScriptedEngine};

    fn translator() -> FontTranslator {
        FontTranslator::new(Arc::new(FamilySet::new()), TexSystem::Xelatex)
    }

    fn config() -> TexConfig {
        TexConfig {
            rcfonts: false,
            timeout_secs: 5,
            ..TexConfig::default()
        }
    }

    fn font() -> FontDescriptor {
        FontDescriptor::new("serif", Points(10.0))
    }

    #[test]
    fn header_layout() {
        let config = TexConfig {
            preamble: vec![r"\usepackage{amsmath}".to_owned()],
            rcfonts: false,
            ..TexConfig::default()
        };
        let header = query_header(&config, &FamilySet::new());
        let lines: Vec<_> = header.lines().collect();
        assert_eq!(lines[0], r"\documentclass{minimal}");
        assert_eq!(lines[1], "% !TeX program = xelatex");
        assert_eq!(lines[2], r"\usepackage{amsmath}");
        assert_eq!(lines[3], r"\usepackage{fontspec}");
        assert_eq!(lines[4], r"\begin{document}");
        assert_eq!(lines.last(), Some(&r"\typeout{pgf_backend_query_start}"));
    }

    #[test]
    fn measure_normalizes_height() {
        let engine = ScriptedEngine::with_metrics("12.34pt,8.9pt,2.1pt");
        let mut oracle = MetricsOracle::start(&config(), translator(), &engine).unwrap();
        let m = oracle.measure("Hello", &font()).unwrap();
        assert!((m.width.0 - 12.34).abs() < 1e-9);
        assert!((m.height.0 - 11.0).abs() < 1e-9);
        assert!((m.descent.0 - 2.1).abs() < 1e-9);
    }

    #[test]
    fn cache_is_exact_and_counts_round_trips() {
        let engine = ScriptedEngine::with_metrics("1pt,1pt,0pt");
        let mut oracle = MetricsOracle::start(&config(), translator(), &engine).unwrap();
        let first = oracle.measure("x", &font()).unwrap();
        let second = oracle.measure("x", &font()).unwrap();
        assert_eq!(first, second);
        assert_eq!(oracle.round_trips(), 1);
        assert_eq!(oracle.cached(), 1);

        oracle.measure("x ", &font()).unwrap();
        oracle.measure("x", &font().with_style(pgfkit_tex::FontStyle::Italic)).unwrap();
        assert_eq!(oracle.round_trips(), 3);

        let queries: Vec<_> = engine
            .sent_lines()
            .into_iter()
            .filter(|l| l.starts_with(r"\sbox0"))
            .collect();
        assert_eq!(queries.len(), 3);
        assert_eq!(
            queries[0],
            r"\sbox0{\rmfamily\fontsize{10.000000}{12.000000}\selectfont x}"
        );
    }

    #[test]
    fn failing_probe_is_startup_error() {
        let engine = ScriptedEngine::with_metrics("1pt,1pt,0pt")
            .failing_probe("! LaTeX Error: File `nosuch.sty' not found.");
        let err = MetricsOracle::start(&config(), translator(), &engine).unwrap_err();
        match err {
            OracleError::Startup { program, output, .. } => {
                assert_eq!(program, "scripted-tex");
                assert!(output.contains("nosuch.sty"));
            }
            other => panic!("expected startup error, got {other:?}"),
        }
        assert_eq!(engine.spawn_count(), 0, "no interactive process after a failed probe");
        let probe = &engine.batch_inputs()[0];
        assert!(probe.starts_with("\\documentclass{minimal}\n"));
        assert!(probe.ends_with("\\typeout{pgf_backend_query_start}\n\\makeatletter\n\\@@end\n"));
    }

    #[test]
    fn eof_mid_query_is_halted_and_spends_oracle() {
        let engine = ScriptedEngine::new(|line| {
            if line.contains("bad") {
                Reply::Hangup("! Undefined control sequence.\n".to_owned())
            } else if line.starts_with(r"\typeout") {
                Reply::Output("1pt,1pt,0pt\n*".to_owned())
            } else {
                Reply::Output("\n*".to_owned())
            }
        });
        let mut oracle = MetricsOracle::start(&config(), translator(), &engine).unwrap();
        oracle.measure("fine", &font()).unwrap();

        let err = oracle.measure(r"\bad", &font()).unwrap_err();
        match &err {
            OracleError::ProcessHalted { text, output } => {
                assert_eq!(text, r"\bad");
                assert!(output.contains("Undefined control sequence"));
            }
            other => panic!("expected halt, got {other:?}"),
        }
        assert!(!oracle.is_running());
        // cached answers survive, new queries do not
        assert!(oracle.measure("fine", &font()).is_ok());
        assert!(matches!(
            oracle.measure("other", &font()),
            Err(OracleError::Terminated)
        ));
    }

    #[test]
    fn garbage_reply_is_parse_error() {
        let engine = ScriptedEngine::new(|line| {
            if line.starts_with(r"\typeout") {
                Reply::Output("12.34pt;8.9pt\n*".to_owned())
            } else {
                Reply::Output("\n*".to_owned())
            }
        });
        let mut oracle = MetricsOracle::start(&config(), translator(), &engine).unwrap();
        let err = oracle.measure("y", &font()).unwrap_err();
        match err {
            OracleError::MetricsParse { text, reply, .. } => {
                assert_eq!(text, "y");
                assert_eq!(reply, "12.34pt;8.9pt");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        // the conversation is still in sync
        assert!(oracle.is_running());
        assert_eq!(oracle.cached(), 0);
    }

    #[test]
    fn silent_tex_times_out() {
        let engine = ScriptedEngine::new(|line| {
            if line.starts_with(r"\sbox0") {
                Reply::Silent
            } else {
                Reply::Output("\n*".to_owned())
            }
        });
        let config = TexConfig {
            timeout_secs: 1,
            ..config()
        };
        let mut oracle = MetricsOracle::start(&config, translator(), &engine).unwrap();
        let err = oracle.measure("z", &font()).unwrap_err();
        assert!(matches!(err, OracleError::Timeout { .. }), "{err:?}");
        assert!(!oracle.is_running());
    }

    #[test]
    fn cancel_token_aborts_query() {
        let engine = ScriptedEngine::new(|line| {
            if line.starts_with(r"\sbox0") {
                Reply::Silent
            } else {
                Reply::Output("\n*".to_owned())
            }
        });
        let mut oracle = MetricsOracle::start(&config(), translator(), &engine).unwrap();
        let token = oracle.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.cancel();
        });
        let err = oracle.measure("z", &font()).unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, OracleError::Cancelled { .. }), "{err:?}");
    }

    #[test]
    fn terminate_is_idempotent() {
        let engine = ScriptedEngine::with_metrics("1pt,1pt,0pt");
        let mut oracle = MetricsOracle::start(&config(), translator(), &engine).unwrap();
        assert!(oracle.is_running());
        oracle.terminate();
        oracle.terminate();
        assert!(matches!(
            oracle.measure("a", &font()),
            Err(OracleError::Terminated)
        ));
    }

    #[test]
    fn sentinel_inside_a_line_is_not_the_prompt() {
        let engine = ScriptedEngine::with_metrics("3pt,2pt,1pt")
            .with_startup("noise *pgf_backend_query_start here\n*pgf_backend_query_start\n*");
        let mut oracle = MetricsOracle::start(&config(), translator(), &engine).unwrap();
        let m = oracle.measure("w", &font()).unwrap();
        assert!((m.width.0 - 3.0).abs() < 1e-9);
        assert!((m.descent.0 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn startup_timeout_names_the_reason() {
        let engine = ScriptedEngine::with_metrics("1pt,1pt,0pt").with_startup("");
        let config = TexConfig {
            timeout_secs: 1,
            ..config()
        };
        let err = MetricsOracle::start(&config, translator(), &engine).unwrap_err();
        match err {
            OracleError::Startup { message, .. } => {
                assert!(message.contains("timed out after 1s"), "{message}");
            }
            other => panic!("expected startup error, got {other:?}"),
        }
    }

    #[test]
    fn terminate_removes_side_effect_files() {
        let engine = ScriptedEngine::with_metrics("1pt,1pt,0pt");
        let mut oracle = MetricsOracle::start(&config(), translator(), &engine).unwrap();
        let dir = oracle.workdir().unwrap().to_path_buf();
        fs::write(dir.join("texput.log"), "log").unwrap();
        fs::write(dir.join("texput.aux"), "aux").unwrap();

        oracle.terminate();
        assert!(oracle.workdir().is_none());
        assert!(!dir.join("texput.log").exists());
        assert!(!dir.join("texput.aux").exists());
        assert!(!dir.exists());
    }

    #[test]
    fn terminate_tolerates_missing_side_effect_files() {
        let engine = ScriptedEngine::with_metrics("1pt,1pt,0pt");
        let mut oracle = MetricsOracle::start(&config(), translator(), &engine).unwrap();
        let dir = oracle.workdir().unwrap().to_path_buf();
        fs::write(dir.join("texput.log"), "log").unwrap();

        oracle.terminate();
        assert!(!dir.exists());
    }
}
