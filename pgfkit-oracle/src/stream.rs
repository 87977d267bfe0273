//! Bounded reads from a subprocess's output.
//!
//! A blocking `read` on a pipe has no timeout, so a background thread owns
//! the reader and forwards chunks over a channel. [`ByteStream::expect`]
//! scans those bytes one at a time for a marker while polling the channel
//! with a deadline and a [`CancelToken`].

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a waiting read rechecks the cancel token.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// CancelToken
// ---------------------------------------------------------------------------

/// A shared flag that aborts pending reads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// ByteStream
// ---------------------------------------------------------------------------

/// Why [`ByteStream::expect`] gave up. Each variant carries the bytes read
/// so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectError {
    /// The stream ended before the marker.
    Halted(Vec<u8>),
    TimedOut(Vec<u8>),
    Cancelled(Vec<u8>),
}

impl ExpectError {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Halted(b) | Self::TimedOut(b) | Self::Cancelled(b) => b,
        }
    }
}

/// Output of a subprocess, readable with a deadline.
#[derive(Debug)]
pub struct ByteStream {
    rx: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    closed: bool,
}

impl ByteStream {
    /// Start a reader thread for `reader`.
    pub fn spawn(mut reader: Box<dyn Read + Send>) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("pgfkit-tex-reader".to_owned())
            .spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(e) => {
                            log::debug!("TeX output closed: {e}");
                            break;
                        }
                    }
                }
            })?;
        Ok(Self {
            rx,
            pending: VecDeque::new(),
            closed: false,
        })
    }

    /// Consume bytes up to and including `marker`.
    ///
    /// Returns the bytes before the marker. Bytes already received are
    /// scanned before the deadline or the token are checked, so a reply
    /// that has arrived is never reported as a timeout.
    pub fn expect(
        &mut self,
        marker: &[u8],
        timeout: Duration,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, ExpectError> {
        let deadline = Instant::now() + timeout;
        let mut captured = Vec::new();
        loop {
            while let Some(b) = self.pending.pop_front() {
                captured.push(b);
                if captured.ends_with(marker) {
                    captured.truncate(captured.len() - marker.len());
                    return Ok(captured);
                }
            }
            if self.closed {
                return Err(ExpectError::Halted(captured));
            }
            if cancel.is_cancelled() {
                return Err(ExpectError::Cancelled(captured));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(ExpectError::TimedOut(captured));
            }
            match self.rx.recv_timeout((deadline - now).min(POLL_INTERVAL)) {
                Ok(chunk) => self.pending.extend(chunk),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.closed = true,
            }
        }
    }

    /// Everything received so far, without waiting.
    pub fn drain(&mut self) -> Vec<u8> {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend(chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        self.pending.drain(..).collect()
    }

    /// Whether the writer side has gone away.
    pub const fn is_closed(&self) -> bool {
        self.closed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests may panic")]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LONG: Duration = Duration::from_secs(5);

    /// A reader that yields its chunks and then blocks until dropped.
    struct Trickle {
        chunks: VecDeque<Vec<u8>>,
        hold: Receiver<()>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if let Some(chunk) = self.chunks.pop_front() {
                buf[..chunk.len()].copy_from_slice(&chunk);
                return Ok(chunk.len());
            }
            // Blocks until the test drops the sender, then reports EOF.
            let _ = self.hold.recv();
            Ok(0)
        }
    }

    fn trickle(chunks: &[&str]) -> (ByteStream, mpsc::Sender<()>) {
        let (hold_tx, hold) = mpsc::channel();
        let reader = Trickle {
            chunks: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
            hold,
        };
        (ByteStream::spawn(Box::new(reader)).unwrap(), hold_tx)
    }

    #[test]
    fn finds_marker_across_chunks() {
        let (mut s, _hold) = trickle(&["12pt,3pt,1pt\n", "*rest\n*"]);
        let reply = s.expect(b"\n*", LONG, &CancelToken::new()).unwrap();
        assert_eq!(reply, b"12pt,3pt,1pt");
        let reply = s.expect(b"\n*", LONG, &CancelToken::new()).unwrap();
        assert_eq!(reply, b"rest");
    }

    #[test]
    fn star_inside_text_is_not_a_prompt() {
        let (mut s, _hold) = trickle(&["a*b ** c\n*"]);
        let reply = s.expect(b"\n*", LONG, &CancelToken::new()).unwrap();
        assert_eq!(reply, b"a*b ** c");
    }

    #[test]
    fn eof_before_marker_is_halted() {
        let mut s = ByteStream::spawn(Box::new(Cursor::new(b"! Emergency stop.\n".to_vec()))).unwrap();
        let err = s.expect(b"\n*", LONG, &CancelToken::new()).unwrap_err();
        assert_eq!(err, ExpectError::Halted(b"! Emergency stop.\n".to_vec()));
        assert!(s.is_closed());
    }

    #[test]
    fn silence_times_out_with_partial_output() {
        let (mut s, _hold) = trickle(&["partial"]);
        let started = Instant::now();
        let err = s
            .expect(b"\n*", Duration::from_millis(200), &CancelToken::new())
            .unwrap_err();
        assert_eq!(err, ExpectError::TimedOut(b"partial".to_vec()));
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn cancellation_interrupts_wait() {
        let (mut s, _hold) = trickle(&[]);
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });
        let started = Instant::now();
        let err = s.expect(b"\n*", Duration::from_secs(30), &token).unwrap_err();
        canceller.join().unwrap();
        assert_eq!(err, ExpectError::Cancelled(Vec::new()));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn drain_returns_pending_bytes() {
        let mut s = ByteStream::spawn(Box::new(Cursor::new(b"abc".to_vec()))).unwrap();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(s.drain(), b"abc");
        assert!(s.drain().is_empty());
    }
}
