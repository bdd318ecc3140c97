//! Reusable parsers for connection workers.

use crate::{limits::ParserLimits, Parser};
use crossbeam::queue::ArrayQueue;
use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

/// Bounded lock-free pool of parsers with their buffers already allocated.
///
/// A worker takes one parser per connection; the parser goes back to the
/// pool, reset, when the [`PooledParser`] is dropped. When the pool is empty
/// a fresh parser is built, and when it is full a returned parser is freed.
///
/// ```
/// use maker_http::{limits::ParserLimits, pool::ParserPool, Status};
/// use std::sync::Arc;
///
/// let pool = Arc::new(ParserPool::requests(ParserLimits::default(), 4));
///
/// let mut parser = pool.take();
/// assert!(matches!(parser.feed(b"GET / HTTP/1.1\r\n\r\n"), Ok(Status::Message(..))));
/// drop(parser);
///
/// assert_eq!(pool.idle(), 4);
/// ```
#[derive(Debug)]
pub struct ParserPool {
    queue: ArrayQueue<Parser>,
    limits: ParserLimits,
    responses: bool,
}

impl ParserPool {
    /// A pool of `capacity` request parsers, all created up front.
    pub fn requests(limits: ParserLimits, capacity: usize) -> Self {
        Self::new(limits, capacity, false)
    }

    /// A pool of `capacity` response parsers, all created up front.
    pub fn responses(limits: ParserLimits, capacity: usize) -> Self {
        Self::new(limits, capacity, true)
    }

    fn new(limits: ParserLimits, capacity: usize, responses: bool) -> Self {
        let queue = ArrayQueue::new(capacity.max(1));
        let pool = Self {
            queue,
            limits,
            responses,
        };

        for _ in 0..pool.queue.capacity() {
            let _ = pool.queue.push(pool.build());
        }
        pool
    }

    fn build(&self) -> Parser {
        match self.responses {
            true => Parser::response(&self.limits),
            false => Parser::request(&self.limits),
        }
    }

    /// Takes an idle parser, building a new one when none is left.
    pub fn take(self: &Arc<Self>) -> PooledParser {
        let parser = self.queue.pop().unwrap_or_else(|| {
            tracing::trace!(capacity = self.queue.capacity(), "parser pool empty");
            self.build()
        });

        PooledParser {
            parser: Some(parser),
            pool: Arc::clone(self),
        }
    }

    /// Number of parsers waiting in the pool.
    #[inline(always)]
    pub fn idle(&self) -> usize {
        self.queue.len()
    }

    #[inline(always)]
    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }
}

/// A [`Parser`] borrowed from a [`ParserPool`].
#[derive(Debug)]
pub struct PooledParser {
    parser: Option<Parser>,
    pool: Arc<ParserPool>,
}

impl Deref for PooledParser {
    type Target = Parser;

    #[inline(always)]
    fn deref(&self) -> &Parser {
        // Only `Drop` empties the option.
        match &self.parser {
            Some(parser) => parser,
            None => unreachable!(),
        }
    }
}

impl DerefMut for PooledParser {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Parser {
        match &mut self.parser {
            Some(parser) => parser,
            None => unreachable!(),
        }
    }
}

impl Drop for PooledParser {
    fn drop(&mut self) {
        if let Some(mut parser) = self.parser.take() {
            parser.reset();
            let _ = self.pool.queue.push(parser);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Phase, Status};

    #[test]
    fn take_and_return() {
        let pool = Arc::new(ParserPool::requests(ParserLimits::default(), 2));
        assert_eq!(pool.idle(), 2);

        let a = pool.take();
        let b = pool.take();
        let c = pool.take();
        assert_eq!(pool.idle(), 0);

        drop(a);
        drop(b);
        drop(c);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn returned_parsers_are_reset() {
        let pool = Arc::new(ParserPool::requests(ParserLimits::default(), 1));

        let mut parser = pool.take();
        assert_eq!(parser.feed(b"GET\r\n"), Err(Error::InvalidTarget));
        assert_eq!(parser.phase(), Phase::Failed);
        drop(parser);

        let mut parser = pool.take();
        assert_eq!(parser.phase(), Phase::Start);
        assert!(matches!(
            parser.feed(b"GET / HTTP/1.1\r\n\r\n"),
            Ok(Status::Message(_, 18))
        ));
    }

    #[test]
    fn response_pool() {
        let pool = Arc::new(ParserPool::responses(ParserLimits::default(), 1));

        let mut parser = pool.take();
        let Ok(Status::Message(message, _)) = parser.feed(b"HTTP/1.1 204 No Content\r\n\r\n") else {
            panic!("complete response expected");
        };
        assert_eq!(message.status(), Some(204));
    }
}
