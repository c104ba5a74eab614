//! Line-oriented input over either a file or an in-memory reply buffer.
//!
//! Struct parsers consume a `&mut dyn LineStream` and never learn which
//! backing they read from. Output goes through `std::io::Write`, which both
//! `std::fs::File` and [`crate::MFile`] implement.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Default line capacity for struct parsers, including the terminator slot.
pub const LINE_LEN: usize = 4096;

pub trait LineStream {
    /// Return the next line including its `\n`, holding at most `len - 1`
    /// bytes. `None` marks end of input.
    fn fgets(&mut self, len: usize) -> Option<String>;

    /// `fgets` with the default line capacity.
    fn next_line(&mut self) -> Option<String> {
        self.fgets(LINE_LEN)
    }
}

/// Reads lines out of a borrowed reply buffer.
///
/// Only newline-terminated lines are returned; bytes after the final `\n`
/// are never yielded. A line longer than the requested capacity is cut and
/// the rest of it is skipped.
#[derive(Debug, Clone)]
pub struct MemStream<'a> {
    buf: &'a str,
    pos: usize,
}

impl<'a> MemStream<'a> {
    pub fn new(buf: &'a str) -> Self {
        Self { buf, pos: 0 }
    }

    /// Unread portion of the buffer.
    pub fn remaining(&self) -> &'a str {
        &self.buf[self.pos..]
    }
}

impl LineStream for MemStream<'_> {
    fn fgets(&mut self, len: usize) -> Option<String> {
        let rest = &self.buf[self.pos..];
        let nl = rest.find('\n')?;
        let line = &rest[..=nl];
        self.pos += nl + 1;
        Some(truncate_to_boundary(line, len.saturating_sub(1)).to_string())
    }
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Reads lines from any buffered reader, usually a file.
///
/// Follows C `fgets`: an over-long line is returned in pieces across
/// successive calls, and a final line without `\n` is still returned.
pub struct FileStream<R> {
    inner: R,
}

impl FileStream<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> FileStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> LineStream for FileStream<R> {
    fn fgets(&mut self, len: usize) -> Option<String> {
        let max = len.saturating_sub(1);
        let mut out = Vec::new();
        while out.len() < max {
            let available = match self.inner.fill_buf() {
                Ok(b) => b,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::debug!("line read failed: {}", e);
                    break;
                }
            };
            if available.is_empty() {
                break;
            }
            let want = (max - out.len()).min(available.len());
            let (n, done) = match available[..want].iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (want, false),
            };
            out.extend_from_slice(&available[..n]);
            self.inner.consume(n);
            if done {
                break;
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&out).into_owned())
        }
    }
}
