//! An in-memory TeX stand-in.
//!
//! [`ScriptedEngine`] plays the TeX side of the oracle conversation: it
//! swallows the header, announces the query prompt when it sees the
//! sentinel `\typeout`, then hands every further input line to a
//! responder closure that decides what TeX "prints".

use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use crate::engine::{BatchOutput, TexEngine, TexProcess};

/// What the fake TeX does with one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print this text.
    Output(String),
    /// Print nothing; the reader waits.
    Silent,
    /// Print this text, then exit.
    Hangup(String),
}

type Responder = Box<dyn FnMut(&str) -> Reply + Send>;

const SENTINEL_LINE: &str = r"\typeout{pgf_backend_query_start}";

/// What TeX prints once it reaches the query prompt.
const READY_OUTPUT: &str = "*pgf_backend_query_start\n*";

/// A [`TexEngine`] driven by a closure.
pub struct ScriptedEngine {
    responder: Arc<Mutex<Responder>>,
    sent: Arc<Mutex<Vec<String>>>,
    batches: Arc<Mutex<Vec<String>>>,
    probe: BatchOutput,
    startup: String,
    spawns: AtomicUsize,
}

impl ScriptedEngine {
    /// An engine whose interactive process answers each line after the
    /// header with `responder`.
    pub fn new(responder: impl FnMut(&str) -> Reply + Send + 'static) -> Self {
        Self {
            responder: Arc::new(Mutex::new(Box::new(responder))),
            sent: Arc::default(),
            batches: Arc::default(),
            probe: BatchOutput {
                success: true,
                output: "Output written on texput.pdf.\n".to_owned(),
            },
            startup: READY_OUTPUT.to_owned(),
            spawns: AtomicUsize::new(0),
        }
    }

    /// An engine that reports `reply` (a `W,H,D` line) for every box
    /// query and a bare prompt for everything else.
    pub fn with_metrics(reply: &str) -> Self {
        let reply = format!("{reply}\n*");
        Self::new(move |line| {
            if line.starts_with(r"\typeout{\the\wd0") {
                Reply::Output(reply.clone())
            } else {
                Reply::Output("\n*".to_owned())
            }
        })
    }

    /// Make the validation run fail with `output`.
    #[must_use]
    pub fn failing_probe(mut self, output: &str) -> Self {
        self.probe = BatchOutput {
            success: false,
            output: output.to_owned(),
        };
        self
    }

    /// Print `output` instead of the usual ready line when the header
    /// ends. An empty string leaves TeX silent.
    #[must_use]
    pub fn with_startup(mut self, output: &str) -> Self {
        output.clone_into(&mut self.startup);
        self
    }

    /// Every line written to interactive processes, header included.
    pub fn sent_lines(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Inputs of the batch runs.
    pub fn batch_inputs(&self) -> Vec<String> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many interactive processes were started.
    pub fn spawn_count(&self) -> usize {
        self.spawns.load(Ordering::SeqCst)
    }
}

impl TexEngine for ScriptedEngine {
    fn program(&self) -> &str {
        "scripted-tex"
    }

    fn run_batch(&self, input: &str, _workdir: &Path) -> io::Result<BatchOutput> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(input.to_owned());
        Ok(self.probe.clone())
    }

    fn spawn(&self, _workdir: &Path) -> io::Result<Box<dyn TexProcess>> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel();
        Ok(Box::new(ScriptedProcess {
            input: ScriptedInput {
                out: Some(tx),
                partial: String::new(),
                in_header: true,
                startup: self.startup.clone(),
                responder: Arc::clone(&self.responder),
                sent: Arc::clone(&self.sent),
            },
            stdout: Some(ChannelReader {
                rx,
                buf: Vec::new(),
                pos: 0,
            }),
        }))
    }
}

struct ScriptedProcess {
    input: ScriptedInput,
    stdout: Option<ChannelReader>,
}

impl TexProcess for ScriptedProcess {
    fn stdin(&mut self) -> &mut dyn Write {
        &mut self.input
    }

    fn take_stdout(&mut self) -> Option<Box<dyn Read + Send>> {
        self.stdout
            .take()
            .map(|r| Box::new(r) as Box<dyn Read + Send>)
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.input.out = None;
        Ok(())
    }
}

/// The fake process's stdin: runs the responder on each complete line.
struct ScriptedInput {
    out: Option<Sender<Vec<u8>>>,
    partial: String,
    in_header: bool,
    startup: String,
    responder: Arc<Mutex<Responder>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ScriptedInput {
    fn emit(&self, text: &str) {
        if let Some(out) = &self.out {
            let _ = out.send(text.as_bytes().to_vec());
        }
    }

    fn handle_line(&mut self, line: &str) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());

        if self.in_header {
            if line == SENTINEL_LINE {
                self.in_header = false;
                if !self.startup.is_empty() {
                    self.emit(&self.startup);
                }
            }
            return;
        }

        let reply = {
            let mut responder = self.responder.lock().unwrap_or_else(PoisonError::into_inner);
            responder(line)
        };
        match reply {
            Reply::Output(text) => self.emit(&text),
            Reply::Silent => {}
            Reply::Hangup(text) => {
                self.emit(&text);
                self.out = None;
            }
        }
    }
}

impl Write for ScriptedInput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.out.is_none() {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(end) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=end).collect();
            self.handle_line(line.trim_end_matches(['\n', '\r']));
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The fake process's stdout.
struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    buf: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.buf.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
