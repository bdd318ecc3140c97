//! Message body framing: fixed length, chunked and read-until-close.

use crate::{
    errors::Error,
    http::{
        cursor::Cursor,
        headers::{split_line, HeaderMap},
        types::{hex_to_u64, trim_ows},
    },
    limits::ParserLimits,
};

/// Fields that frame or route the message and so may not arrive as trailers
/// ([RFC 7230, Section 4.1.2](https://tools.ietf.org/html/rfc7230#section-4.1.2)).
const FORBIDDEN_TRAILERS: [&str; 3] = ["Content-Length", "Transfer-Encoding", "Host"];

/// How the end of a body is found, decided once the headers are complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// No body at all.
    Empty,
    /// Exactly this many bytes (`Content-Length`).
    Fixed(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// Everything until the peer closes (responses only).
    UntilClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fixed { remaining: u64 },
    Size,
    Data { remaining: u64 },
    DataEnd,
    Trailers,
    UntilClose,
    Done,
}

#[derive(Debug)]
pub(crate) struct BodyDecoder {
    state: State,
    received: u64,
    expected: Option<u64>,
    limit: u64,
    trailer_bytes: usize,
    trailers: usize,
}

impl BodyDecoder {
    pub(crate) fn new(framing: Framing, limits: &ParserLimits) -> Result<Self, Error> {
        let (state, expected) = match framing {
            Framing::Empty | Framing::Fixed(0) => (State::Done, Some(0)),
            Framing::Fixed(len) if len > limits.body_size => return Err(Error::BodyTooLarge),
            Framing::Fixed(len) => (State::Fixed { remaining: len }, Some(len)),
            Framing::Chunked => (State::Size, None),
            Framing::UntilClose => (State::UntilClose, None),
        };

        Ok(Self {
            state,
            received: 0,
            expected,
            limit: limits.body_size,
            trailer_bytes: 0,
            trailers: 0,
        })
    }

    #[inline(always)]
    pub(crate) fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// `(decoded bytes so far, total if known)`.
    #[inline(always)]
    pub(crate) fn progress(&self) -> (u64, Option<u64>) {
        (self.received, self.expected)
    }

    /// Decodes as much buffered input as possible into `body`.
    ///
    /// Chunked trailers are appended to `headers`. Returns the number of
    /// wire bytes consumed; check [`is_done`](Self::is_done) afterwards.
    pub(crate) fn decode(
        &mut self,
        cursor: &mut Cursor,
        body: &mut Vec<u8>,
        headers: &mut HeaderMap,
        limits: &ParserLimits,
    ) -> Result<usize, Error> {
        let mut consumed = 0;

        loop {
            match self.state {
                State::Fixed { remaining } => {
                    let n = self.take(cursor, body, remaining)?;
                    consumed += n;

                    let remaining = remaining - n as u64;
                    if remaining > 0 {
                        self.state = State::Fixed { remaining };
                        return Ok(consumed);
                    }
                    self.state = State::Done;
                }
                State::Size => {
                    let Some(len) = cursor.line(
                        limits.chunk_line_size,
                        Error::InvalidChunkSize,
                        Error::InvalidChunk,
                    )?
                    else {
                        return Ok(consumed);
                    };

                    let line = &cursor.remaining()[..len];
                    let size = match memchr::memchr(b';', line) {
                        Some(ext) => &line[..ext],
                        None => line,
                    };
                    let size = hex_to_u64(trim_ows(size)).ok_or(Error::InvalidChunkSize)?;

                    if self.received.saturating_add(size) > limits.body_size {
                        return Err(Error::BodyTooLarge);
                    }

                    cursor.advance(len + 2);
                    consumed += len + 2;

                    self.state = match size {
                        0 => State::Trailers,
                        remaining => State::Data { remaining },
                    };
                }
                State::Data { remaining } => {
                    let n = self.take(cursor, body, remaining)?;
                    consumed += n;

                    let remaining = remaining - n as u64;
                    if remaining > 0 {
                        self.state = State::Data { remaining };
                        return Ok(consumed);
                    }
                    self.state = State::DataEnd;
                }
                State::DataEnd => match cursor.remaining() {
                    [b'\r', b'\n', ..] => {
                        cursor.advance(2);
                        consumed += 2;
                        self.state = State::Size;
                    }
                    [] | [b'\r'] => return Ok(consumed),
                    _ => return Err(Error::InvalidChunk),
                },
                State::Trailers => {
                    let Some(len) = cursor.line(
                        limits.header_line_size,
                        Error::LineTooLong,
                        Error::InvalidHeader,
                    )?
                    else {
                        return Ok(consumed);
                    };

                    self.trailer_bytes += len + 2;
                    if self.trailer_bytes > limits.header_block_size {
                        return Err(Error::HeadersTooLarge);
                    }

                    if len > 0 {
                        let line = &cursor.remaining()[..len];

                        if matches!(line, [b' ' | b'\t', ..]) {
                            // Only a trailer may be continued, never the head.
                            if self.trailers == 0 {
                                return Err(Error::InvalidFolding);
                            }
                            headers.push_line(line)?;
                        } else {
                            let (name, value) = split_line(line)?;
                            if FORBIDDEN_TRAILERS.iter().any(|f| name.eq_ignore_ascii_case(f)) {
                                return Err(Error::InvalidHeader);
                            }
                            if headers.len() >= limits.header_count {
                                return Err(Error::TooManyHeaders);
                            }
                            headers.push(name, value);
                            self.trailers += 1;
                        }
                    }

                    cursor.advance(len + 2);
                    consumed += len + 2;

                    if len == 0 {
                        self.expected = Some(self.received);
                        self.state = State::Done;
                    }
                }
                State::UntilClose => {
                    let n = self.take(cursor, body, u64::MAX)?;
                    return Ok(consumed + n);
                }
                State::Done => return Ok(consumed),
            }
        }
    }

    /// Signals end of input. Only a read-until-close body may end here.
    pub(crate) fn finish(&mut self) -> Result<(), Error> {
        match self.state {
            State::UntilClose | State::Done => {
                self.expected = Some(self.received);
                self.state = State::Done;
                Ok(())
            }
            _ => Err(Error::UnexpectedEof),
        }
    }

    /// Moves up to `max` buffered bytes into `body`.
    fn take(&mut self, cursor: &mut Cursor, body: &mut Vec<u8>, max: u64) -> Result<usize, Error> {
        let available = cursor.remaining();
        let n = (available.len() as u64).min(max) as usize;

        if self.received + n as u64 > self.limit {
            return Err(Error::BodyTooLarge);
        }

        body.try_reserve(n)?;
        body.extend_from_slice(&available[..n]);
        cursor.advance(n);
        self.received += n as u64;

        Ok(n)
    }
}
