use crate::{
    errors::Error,
    http::{
        message::Message,
        parser::{Phase, Status},
        response::{Handled, Response},
        types::{Method, Version},
    },
    limits::{ConnLimits, ParserLimits},
    pool::{ParserPool, PooledParser},
    upload::{UploadGuard, UploadRegistry},
};
use std::{future::Future, io, sync::Arc};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::{sleep, timeout},
};

/// A trait for answering parsed requests.
///
/// You can use:
/// - `&self` to store shared data (e.g. database, router, session store)
/// - `&mut S` to store connection data (e.g. authentication state)
///
/// # Examples
///
/// Basic request handler
/// ```
/// use maker_http::{Handled, Handler, Message, Response, StatusCode};
///
/// struct MyHandler;
///
/// impl Handler<()> for MyHandler {
///     async fn handle(&self, _: &mut (), req: &Message, resp: &mut Response) -> Handled {
///         match req.url().map(|url| url.path()) {
///             Some("/echo") => resp.status(StatusCode::Ok).body(req.body()),
///             _ => resp.status(StatusCode::NotFound).body("Not found :("),
///         }
///     }
/// }
/// ```
/// Handler with [`ConnectionData`]
/// ```
/// use maker_http::{ConnectionData, Handled, Handler, Message, Response, StatusCode};
///
/// struct CountingHandler;
///
/// impl Handler<State> for CountingHandler {
///     async fn handle(&self, data: &mut State, _: &Message, resp: &mut Response) -> Handled {
///         data.request_count += 1;
///
///         resp.status(StatusCode::Ok)
///             .body(format!("Request count: {}", data.request_count))
///     }
/// }
///
/// struct State {
///     request_count: usize,
/// }
///
/// impl ConnectionData for State {
///     fn new() -> Self {
///         Self { request_count: 0 }
///     }
///
///     fn reset(&mut self) {
///         self.request_count = 0;
///     }
/// }
/// ```
pub trait Handler<S>
where
    Self: Sync + Send + 'static,
    S: ConnectionData,
{
    /// Builds the response to one request.
    ///
    /// The request's body is already complete and decoded. Panics terminate
    /// the connection.
    fn handle(
        &self,
        connection_data: &mut S,
        req: &Message,
        resp: &mut Response,
    ) -> impl Future<Output = Handled> + Send;
}

/// Managing user data stored between requests within a single connection.
///
/// The state (authentication, multistep form status, cache...) is available
/// to every request of a keep-alive connection and is reset when
/// [`Connection::run`] starts on a new stream.
///
/// # Examples
/// ```
/// use maker_http::ConnectionData;
/// use std::collections::HashMap;
///
/// struct MyConnectionData {
///     user_id: Option<i32>,
///     cache: HashMap<usize, [u8; 4]>,
/// }
///
/// impl ConnectionData for MyConnectionData {
///     fn new() -> Self {
///         Self {
///             user_id: None,
///             cache: HashMap::new(),
///         }
///     }
///
///     fn reset(&mut self) {
///         self.user_id = None;
///         self.cache.clear(); // Saving the allocated memory
///     }
/// }
/// ```
pub trait ConnectionData: Sync + Send + 'static {
    /// Creates a new instance of user data.
    fn new() -> Self;

    /// Resets the internal state of the instance to its initial values.
    ///
    /// If implemented correctly, avoids any allocations.
    fn reset(&mut self);
}

impl ConnectionData for () {
    #[inline(always)]
    fn new() -> Self {}

    #[inline(always)]
    fn reset(&mut self) {}
}

enum Failure {
    Io(io::Error),
    Http(Error, Version),
}

impl From<io::Error> for Failure {
    fn from(error: io::Error) -> Self {
        Failure::Io(error)
    }
}

/// Drives one byte stream: reads requests, calls the [`Handler`] and
/// writes the responses, until the peer leaves or persistence ends.
///
/// A `Connection` is reusable: [`run`](Self::run) it on one stream after
/// another, its buffers stay allocated.
///
/// ```
/// use maker_http::{Connection, Handled, Handler, Message, Response, StatusCode};
/// use std::sync::Arc;
/// use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};
///
/// struct Hello;
///
/// impl Handler<()> for Hello {
///     async fn handle(&self, _: &mut (), _: &Message, resp: &mut Response) -> Handled {
///         resp.status(StatusCode::Ok).body("Hello")
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let (mut client, server) = duplex(4096);
/// let mut conn: Connection<Hello, ()> = Connection::new(Arc::new(Hello));
///
/// let (served, _) = tokio::join!(conn.run(server), async {
///     client.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();
/// });
/// served.unwrap();
///
/// let mut answer = String::new();
/// client.read_to_string(&mut answer).await.unwrap();
/// assert!(answer.starts_with("HTTP/1.0 200 OK\r\n"));
/// # });
/// ```
pub struct Connection<H: Handler<S>, S: ConnectionData> {
    handler: Arc<H>,
    data: S,

    parser: PooledParser,
    response: Response,
    read_buf: Vec<u8>,

    limits: ConnLimits,
    uploads: Option<Arc<UploadRegistry>>,
    request_count: usize,
}

impl<H: Handler<S>, S: ConnectionData> Connection<H, S> {
    /// A connection with default limits and its own parser.
    pub fn new(handler: Arc<H>) -> Self {
        let pool = Arc::new(ParserPool::requests(ParserLimits::default(), 1));
        Self::with_pool(handler, &pool, ConnLimits::default())
    }

    /// A connection whose parser comes from `pool` and goes back to it
    /// when the connection is dropped.
    pub fn with_pool(handler: Arc<H>, pool: &Arc<ParserPool>, limits: ConnLimits) -> Self {
        Self {
            handler,
            data: S::new(),

            parser: pool.take(),
            response: Response::with_limits(Version::Http11, &limits),
            read_buf: vec![0; limits.read_chunk_size.max(1)],

            limits,
            uploads: None,
            request_count: 0,
        }
    }

    /// Reports the body progress of requests carrying an upload token.
    pub fn track_uploads(mut self, registry: Arc<UploadRegistry>) -> Self {
        self.uploads = Some(registry);
        self
    }

    /// Serves `stream` until it closes or persistence ends, then shuts it down.
    ///
    /// A malformed request is answered with [`Error::as_http`] before
    /// closing. I/O failures, timeouts included, are returned.
    pub async fn run<T>(&mut self, mut stream: T) -> io::Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        self.parser.reset();
        self.data.reset();
        self.request_count = 0;

        let result = match self.serve(&mut stream).await {
            Ok(()) => Ok(()),
            Err(Failure::Io(error)) => Err(error),
            Err(Failure::Http(error, version)) => {
                let answer = error.as_http(version, self.limits.json_errors);
                self.write(&mut stream, answer).await
            }
        };

        let _ = stream.shutdown().await;
        tracing::trace!(requests = self.request_count, "connection closed");
        result
    }

    async fn serve<T>(&mut self, stream: &mut T) -> Result<(), Failure>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let mut pending = 0;
        let mut upload = Upload::default();

        loop {
            let status = match self.parser.feed(&self.read_buf[..pending]) {
                Ok(status) => status,
                Err(error) => {
                    upload.fail(error.status());

                    let version = self.parser.version().unwrap_or(Version::Http11);
                    return Err(Failure::Http(error, version));
                }
            };
            pending = 0;

            match status {
                Status::NeedMore => {
                    if self.parser.phase() == Phase::Body {
                        self.body_started(stream, &mut upload).await?;
                    }

                    pending = match self.read(stream).await? {
                        Some(n) => n,
                        None => return Ok(()),
                    };
                }
                Status::Message(message, _) => {
                    upload.finish(message.body().len() as u64);

                    let keep_alive = self.respond(stream, &message).await?;
                    self.parser.recycle(message);

                    if !keep_alive {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Called on every read while a body is arriving.
    async fn body_started<T>(&mut self, stream: &mut T, upload: &mut Upload) -> Result<(), Failure>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let Some((received, size)) = self.parser.body_progress() else {
            return Ok(());
        };

        if !upload.seen {
            upload.seen = true;

            if let Some(message) = self.parser.partial() {
                if let Some(registry) = &self.uploads {
                    if let Some(token) = registry.token(message) {
                        upload.guard = registry.begin(&token, size);
                    }
                }

                let expects_continue = message.version() == Version::Http11
                    && message.headers().has_token("Expect", "100-continue");
                if expects_continue && received == 0 {
                    self.write(stream, b"HTTP/1.1 100 Continue\r\n\r\n").await?;
                }
            }
        }

        if let Some(guard) = &upload.guard {
            guard.update(received);
        }
        Ok(())
    }

    /// Calls the handler and writes its response. Returns whether the
    /// connection stays open.
    async fn respond<T>(&mut self, stream: &mut T, message: &Message) -> Result<bool, Failure>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        self.request_count += 1;

        let keep_alive =
            message.keep_alive() && self.request_count < self.limits.max_requests_per_connection;
        let head = matches!(message.method(), Some(Method::Head));
        self.response
            .reset(message.version(), keep_alive, head, &self.limits);

        self.handler
            .handle(&mut self.data, message, &mut self.response)
            .await;

        tracing::trace!(
            requests = self.request_count,
            keep_alive = self.response.keep_alive(),
            "response ready"
        );

        self.write(stream, self.response.as_bytes()).await?;
        Ok(self.response.keep_alive())
    }

    /// Reads the next chunk of input. `None` means the stream is done
    /// between two requests.
    async fn read<T>(&mut self, stream: &mut T) -> Result<Option<usize>, Failure>
    where
        T: AsyncRead + Unpin,
    {
        let idle = self.parser.phase() == Phase::Start;

        let n = tokio::select! {
            biased;

            read_result = stream.read(&mut self.read_buf) => read_result?,
            _ = sleep(self.limits.socket_read_timeout) => {
                if idle {
                    tracing::trace!("idle connection timed out");
                    return Ok(None);
                }
                return Err(io::Error::new(io::ErrorKind::TimedOut, "read timeout").into());
            }
        };

        if n > 0 {
            return Ok(Some(n));
        }

        match self.parser.finish() {
            Ok(_) => Ok(None),
            Err(error) => {
                tracing::debug!(%error, "stream closed mid-request");
                Ok(None)
            }
        }
    }

    async fn write<T>(&self, stream: &mut T, bytes: &[u8]) -> io::Result<()>
    where
        T: AsyncWrite + Unpin,
    {
        match timeout(self.limits.socket_write_timeout, stream.write_all(bytes)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "write timeout")),
        }
    }
}

/// Upload bookkeeping of the request being read.
#[derive(Default)]
struct Upload {
    seen: bool,
    guard: Option<UploadGuard>,
}

impl Upload {
    fn finish(&mut self, received: u64) {
        if let Some(guard) = self.guard.take() {
            guard.update(received);
            guard.finish();
        }
        self.seen = false;
    }

    fn fail(&mut self, status: u16) {
        if let Some(guard) = self.guard.take() {
            guard.fail(status);
        }
        self.seen = false;
    }
}
