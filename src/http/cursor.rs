//! Input buffer shared by the parser and the body decoder.
//!
//! Bytes handed to [`Parser::feed`](crate::Parser::feed) are appended here.
//! Everything before `pos` belongs to already processed lines; everything
//! after it is either the rest of the current message or the start of the
//! next pipelined one.

use crate::errors::Error;
use memchr::memchr;

#[derive(Debug)]
pub(crate) struct Cursor {
    buf: Vec<u8>,
    pos: usize,
    /// Bytes after `pos` already searched for a line feed.
    scanned: usize,
}

impl Cursor {
    #[inline]
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            pos: 0,
            scanned: 0,
        }
    }

    #[inline]
    pub(crate) fn extend(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if bytes.is_empty() {
            return Ok(());
        }

        // Drop processed bytes before growing.
        if self.pos > 0 && self.buf.len() + bytes.len() > self.buf.capacity() {
            self.compact();
        }

        self.buf.try_reserve(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    #[inline(always)]
    pub(crate) fn remaining(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    #[inline(always)]
    pub(crate) fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.buf.len());
        self.scanned = 0;
    }

    /// Finds the next CRLF-terminated line.
    ///
    /// Returns the length of the line content (CRLF excluded) or `None` if
    /// the line is not complete yet. The cursor does not move; call
    /// [`advance`](Self::advance) with `len + 2` once the line is consumed.
    ///
    /// `max` bounds the line length including CRLF. A bare LF or a CR inside
    /// the line yields `invalid`.
    pub(crate) fn line(&mut self, max: usize, too_long: Error, invalid: Error) -> Result<Option<usize>, Error> {
        let rest = &self.buf[self.pos..];

        let Some(lf) = memchr(b'\n', &rest[self.scanned..]).map(|i| self.scanned + i) else {
            self.scanned = rest.len();

            if rest.len() >= max {
                return Err(too_long);
            }
            return Ok(None);
        };

        if lf + 1 > max {
            return Err(too_long);
        }

        match lf.checked_sub(1) {
            Some(cr) if rest[cr] == b'\r' => {
                if memchr(b'\r', &rest[..cr]).is_some() {
                    return Err(invalid);
                }
                Ok(Some(cr))
            }
            _ => Err(invalid),
        }
    }

    /// Moves unprocessed bytes to the front of the buffer.
    #[inline]
    pub(crate) fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }

        self.buf.drain(..self.pos);
        self.pos = 0;
    }

    /// Forgets everything, buffered leftovers included.
    #[inline]
    pub(crate) fn clear(&mut self) {
        self.buf.clear();
        self.pos = 0;
        self.scanned = 0;
    }

    /// Releases memory once a large message has been handed out.
    #[inline]
    pub(crate) fn shrink(&mut self, capacity: usize, max_retained: usize) {
        self.compact();

        if self.buf.capacity() > max_retained && self.buf.len() <= capacity {
            let mut buf = Vec::with_capacity(capacity);
            buf.extend_from_slice(&self.buf);
            self.buf = buf;
        }
    }

    #[cfg(test)]
    pub(crate) fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}
