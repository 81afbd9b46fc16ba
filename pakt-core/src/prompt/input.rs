// pakt-core/src/prompt/input.rs

//! Where prompt replies come from, and how time passes while waiting for them.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use tracing::{debug, warn};

const TTY_PATH: &str = "/dev/tty";

/// Line-oriented reply input for blocking prompts.
pub trait ReplySource {
    /// Prepares for a new prompt. Input typed ahead of the prompt is discarded.
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Reads one line without its line terminator. `Ok(None)` means end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Result of polling for a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPoll {
    Key(u8),
    Eof,
    /// Nothing arrived within the poll interval.
    Idle,
}

/// Character-oriented input for prompts bounded by a countdown.
pub trait KeySource {
    fn poll_key(&mut self, wait: Duration) -> io::Result<KeyPoll>;

    /// Consumes input up to and including the next newline.
    fn discard_line(&mut self) -> io::Result<()>;
}

pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Reads replies from the controlling terminal, whatever stdin is redirected to.
#[derive(Default)]
pub struct TtyReplies {
    reader: Option<BufReader<File>>,
}

impl TtyReplies {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReplySource for TtyReplies {
    fn begin(&mut self) -> io::Result<()> {
        self.reader = None;
        let tty = File::open(TTY_PATH)?;
        // SAFETY: the descriptor is owned by `tty` and stays open for the call.
        let rc = unsafe { libc::tcflush(tty.as_raw_fd(), libc::TCIFLUSH) };
        if rc != 0 {
            debug!(error = %io::Error::last_os_error(), "Could not flush pending terminal input.");
        }
        self.reader = Some(BufReader::new(tty));
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        if self.reader.is_none() {
            self.begin()?;
        }
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };
        // raw bytes: a reply in a foreign encoding is just an invalid answer
        let mut buf = Vec::new();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buf);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Polls raw bytes from file descriptor 0 without going through the
/// buffered `Stdin` handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinKeys;

impl StdinKeys {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        loop {
            // SAFETY: reads at most one byte into a valid, live buffer.
            let n = unsafe { libc::read(0, (&mut byte as *mut u8).cast(), 1) };
            match n {
                1 => return Ok(Some(byte)),
                0 => return Ok(None),
                _ => {
                    let err = io::Error::last_os_error();
                    if err.kind() == io::ErrorKind::Interrupted {
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl KeySource for StdinKeys {
    fn poll_key(&mut self, wait: Duration) -> io::Result<KeyPoll> {
        let mut pollfd = libc::pollfd {
            fd: 0,
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout = wait.as_millis().min(i32::MAX as u128) as libc::c_int;
        loop {
            // SAFETY: `pollfd` is a single valid entry.
            let rc = unsafe { libc::poll(&mut pollfd, 1, timeout) };
            if rc == 0 {
                return Ok(KeyPoll::Idle);
            }
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                warn!(error = %err, "poll() on stdin failed.");
                return Err(err);
            }
            return Ok(match self.read_byte()? {
                Some(byte) => KeyPoll::Key(byte),
                None => KeyPoll::Eof,
            });
        }
    }

    fn discard_line(&mut self) -> io::Result<()> {
        while let Some(byte) = self.read_byte()? {
            if byte == b'\n' {
                break;
            }
        }
        Ok(())
    }
}
