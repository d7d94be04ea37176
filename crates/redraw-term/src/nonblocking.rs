// SPDX-License-Identifier: MIT
//
// NonBlockingReader: timeout and peek semantics over a blocking source.
//
// A blocking character source cannot be polled cooperatively, so the one
// blocking call lives on a dedicated background thread. The caller and
// that thread meet at a single shared slot guarded by one mutex: a
// pending character (or EOF), a pending error, a "thread is reading"
// flag, and the source itself, parked in the slot whenever nobody is
// reading from it.
//
// The handoff rules:
//
//   - A buffered result is returned immediately; peek leaves it in
//     place, read consumes it.
//   - A blocking read (no timeout) with no background read in flight
//     takes the source out of the slot and reads on the caller's own
//     thread. No handoff cost for the common case.
//   - A timed read asks the thread to do the read and waits on the
//     condvar. A timeout abandons the wait, never the read: whatever
//     the read eventually produces is parked in the slot for the next
//     call. No character is ever lost.
//   - Errors are captured, not thrown across threads, and surface
//     exactly once, to the next non-peek caller.
//
// The thread is spawned lazily on the first timed read and terminates
// itself after a minute without work; the next timed read respawns it.
// One logical reader per instance; `&mut self` on the read methods
// makes concurrent callers unrepresentable.

use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

/// How long the background thread lingers without work before exiting.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

// ─── CharSource ──────────────────────────────────────────────────────────────

/// A blocking character source.
///
/// `read_char` may block indefinitely; `Ok(None)` is end of input.
/// `close` is invoked by [`NonBlockingReader::close`] when no read is in
/// flight; sources that can interrupt a blocked read (an fd they can
/// shut down, a sender they can drop) should do so here.
pub trait CharSource: Send {
    fn read_char(&mut self) -> io::Result<Option<char>>;

    /// Whether a `read_char` would return without blocking. Best
    /// effort; `false` when unknowable.
    fn ready(&self) -> bool {
        false
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Adapt any `io::Read` into a `CharSource`, decoding UTF-8
/// incrementally (one character per call). Invalid bytes decode to
/// U+FFFD rather than erroring.
pub struct ReadSource<R> {
    inner: R,
}

impl<R: io::Read + Send> ReadSource<R> {
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: io::Read + Send> CharSource for ReadSource<R> {
    fn read_char(&mut self) -> io::Result<Option<char>> {
        let mut byte = [0u8; 1];
        if self.inner.read(&mut byte)? == 0 {
            return Ok(None);
        }
        let first = byte[0];
        let len = match first {
            0x00..=0x7F => return Ok(Some(char::from(first))),
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Ok(Some(char::REPLACEMENT_CHARACTER)),
        };
        let mut buf = [first, 0, 0, 0];
        for slot in buf.iter_mut().take(len).skip(1) {
            if self.inner.read(&mut byte)? == 0 {
                return Ok(Some(char::REPLACEMENT_CHARACTER));
            }
            *slot = byte[0];
        }
        Ok(Some(
            std::str::from_utf8(&buf[..len])
                .ok()
                .and_then(|s| s.chars().next())
                .unwrap_or(char::REPLACEMENT_CHARACTER),
        ))
    }
}

// ─── NonBlockingReader ───────────────────────────────────────────────────────

/// Outcome of a [`read`](NonBlockingReader::read) or
/// [`peek`](NonBlockingReader::peek).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult {
    Char(char),
    /// End of input.
    Eof,
    /// The timeout elapsed with nothing delivered.
    Expired,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Pending {
    Empty,
    Char(char),
    Eof,
}

struct State<S> {
    source: Option<S>,
    pending: Pending,
    error: Option<io::Error>,
    reading: bool,
    shutdown: bool,
    thread_live: bool,
}

struct Shared<S> {
    state: Mutex<State<S>>,
    cond: Condvar,
}

/// Timeout/peek reads over a blocking [`CharSource`].
pub struct NonBlockingReader<S: CharSource + 'static> {
    shared: Arc<Shared<S>>,
    name: String,
}

impl<S: CharSource + 'static> NonBlockingReader<S> {
    /// Wrap `source`. `name` labels the background thread.
    pub fn new(name: impl Into<String>, source: S) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    source: Some(source),
                    pending: Pending::Empty,
                    error: None,
                    reading: false,
                    shutdown: false,
                    thread_live: false,
                }),
                cond: Condvar::new(),
            }),
            name: name.into(),
        }
    }

    /// Read one character. `None` timeout blocks until input, end of
    /// input, or an error; `Some(d)` waits at most `d` and returns
    /// [`ReadResult::Expired`] when nothing arrived in time.
    ///
    /// # Errors
    ///
    /// A source error captured by either thread, surfaced exactly once;
    /// or an error for a reader that has been closed.
    pub fn read(&mut self, timeout: Option<Duration>) -> io::Result<ReadResult> {
        self.do_read(timeout, false)
    }

    /// Like [`read`](Self::read), but a delivered character stays
    /// buffered and will be returned again by the next call.
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read), but a pending error is retained for the
    /// next non-peek caller.
    pub fn peek(&mut self, timeout: Option<Duration>) -> io::Result<ReadResult> {
        self.do_read(timeout, true)
    }

    /// Blocking convenience over [`read`](Self::read): `Some(c)` for a
    /// character, `None` at end of input.
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read).
    pub fn read_char(&mut self) -> io::Result<Option<char>> {
        match self.read(None)? {
            ReadResult::Char(c) => Ok(Some(c)),
            ReadResult::Eof | ReadResult::Expired => Ok(None),
        }
    }

    /// Fill at most one character of `buf` (blocking). Returns how many
    /// characters were written: 1, or 0 at end of input.
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read).
    pub fn read_buffered(&mut self, buf: &mut [char]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.read_char()? {
            Some(c) => {
                buf[0] = c;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Whether a read would return immediately.
    #[must_use]
    pub fn ready(&self) -> bool {
        let st = self.shared.state.lock().unwrap();
        st.pending != Pending::Empty
            || st.error.is_some()
            || st.source.as_ref().is_some_and(CharSource::ready)
    }

    /// Close the underlying source (when it is not mid-read) and shut
    /// the background thread down. A source blocked in a read finishes
    /// that read first; its result is discarded with the reader.
    ///
    /// # Errors
    ///
    /// Whatever the source's own `close` reports.
    pub fn close(&mut self) -> io::Result<()> {
        let mut st = self.shared.state.lock().unwrap();
        st.shutdown = true;
        let res = match st.source.as_mut() {
            Some(source) => source.close(),
            None => Ok(()),
        };
        self.shared.cond.notify_all();
        res
    }

    fn do_read(&mut self, timeout: Option<Duration>, is_peek: bool) -> io::Result<ReadResult> {
        let mut st = self.shared.state.lock().unwrap();

        if let Some(result) = Self::take_outcome(&mut st, is_peek) {
            return result;
        }
        if st.shutdown {
            return Err(closed_error());
        }

        // Fast path: a plain blocking read with no background read in
        // flight happens right here on the caller's thread.
        if !is_peek && timeout.is_none() && !st.reading {
            let Some(mut source) = st.source.take() else {
                return Err(closed_error());
            };
            drop(st);
            let res = source.read_char();
            let mut st = self.shared.state.lock().unwrap();
            if st.shutdown {
                let _ = source.close();
            }
            st.source = Some(source);
            return match res {
                Ok(Some(c)) => Ok(ReadResult::Char(c)),
                Ok(None) => Ok(ReadResult::Eof),
                Err(e) => Err(e),
            };
        }

        // Ask the background thread to read on our behalf.
        if !st.reading {
            st.reading = true;
            if !st.thread_live {
                st.thread_live = true;
                self.spawn_thread();
            }
            self.shared.cond.notify_all();
        }

        let deadline = timeout.map(|d| Instant::now() + d);
        loop {
            st = match deadline {
                None => self.shared.cond.wait(st).unwrap(),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(ReadResult::Expired);
                    }
                    self.shared
                        .cond
                        .wait_timeout(st, deadline - now)
                        .unwrap()
                        .0
                }
            };
            if let Some(result) = Self::take_outcome(&mut st, is_peek) {
                return result;
            }
            if st.shutdown {
                return Err(closed_error());
            }
        }
    }

    /// Deliver a pending error or character, if there is one. Peeks
    /// leave both in place (errors are re-created, not cloned).
    fn take_outcome(st: &mut State<S>, is_peek: bool) -> Option<io::Result<ReadResult>> {
        if st.error.is_some() {
            if is_peek {
                let e = st.error.as_ref().unwrap();
                return Some(Err(io::Error::new(e.kind(), e.to_string())));
            }
            return Some(Err(st.error.take().unwrap()));
        }
        match st.pending {
            Pending::Empty => None,
            Pending::Char(c) => {
                if !is_peek {
                    st.pending = Pending::Empty;
                }
                Some(Ok(ReadResult::Char(c)))
            }
            Pending::Eof => {
                if !is_peek {
                    st.pending = Pending::Empty;
                }
                Some(Ok(ReadResult::Eof))
            }
        }
    }

    fn spawn_thread(&self) {
        let shared = Arc::clone(&self.shared);
        thread::Builder::new()
            .name(format!("{} non-blocking reader", self.name))
            .spawn(move || run_reader(&shared))
            .expect("failed to spawn reader thread");
    }
}

impl<S: CharSource + 'static> Drop for NonBlockingReader<S> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn closed_error() -> io::Error {
    io::Error::other("non-blocking reader is closed")
}

/// Background thread body: wait for a read request, perform the one
/// blocking call with the lock released, park the outcome, repeat.
/// Exits on shutdown or after a minute of idleness; every exit path
/// clears `thread_live` under the lock so a later read respawns it.
fn run_reader<S: CharSource>(shared: &Shared<S>) {
    debug!("non-blocking reader thread started");
    let mut st = shared.state.lock().unwrap();
    loop {
        if st.shutdown {
            break;
        }
        if !st.reading {
            st = shared.cond.wait_timeout(st, IDLE_TIMEOUT).unwrap().0;
            if !st.reading || st.shutdown {
                // Idle or shutting down. The decision to die is made
                // while holding the lock, so no request can be lost.
                break;
            }
        }
        let Some(mut source) = st.source.take() else {
            st.reading = false;
            shared.cond.notify_all();
            break;
        };
        drop(st);
        let res = source.read_char();
        st = shared.state.lock().unwrap();
        match res {
            Ok(Some(c)) => st.pending = Pending::Char(c),
            Ok(None) => st.pending = Pending::Eof,
            Err(e) => st.error = Some(e),
        }
        if st.shutdown {
            let _ = source.close();
        }
        st.source = Some(source);
        st.reading = false;
        shared.cond.notify_all();
    }
    st.thread_live = false;
    debug!("non-blocking reader thread exiting");
}

// ─── Tests ───────────────────────────────────────────────────────────────────
