//! maker_http - Incremental HTTP/1.x message core for servers and clients
//!
//! A restartable parser that accepts input in arbitrary fragments, typed
//! views over the header fields, body decoders for every framing, and the
//! glue a small server needs around them: response building, sessions,
//! upload progress and a tokio connection driver.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1**: persistent connections, pipelining, chunked bodies with trailers
//! - **HTTP/1.0**: opt-in keep-alive, bodies delimited by connection close
//! - **Forms**: `application/x-www-form-urlencoded` and `multipart/form-data`
//!
//! # Characteristics
//!
//! - **Split-point invariant** - the same messages come out however the bytes are cut
//! - **Bounded memory** - every buffer is capped by [`limits`]
//! - **Buffer reuse** - parsers, messages and responses keep their allocations
//! - **Sticky failures** - after an error the parser keeps reporting it, the stream is done
//!
//! # Examples
//!
//! Parsing:
//! ```
//! use maker_http::{limits::ParserLimits, Parser, Status};
//!
//! let mut parser = Parser::request(&ParserLimits::default());
//!
//! assert_eq!(parser.feed(b"POST /form HTTP/1.1\r\nContent-Le"), Ok(Status::NeedMore));
//! assert_eq!(parser.feed(b"ngth: 7\r\n\r\nname=jo"), Ok(Status::NeedMore));
//!
//! let Ok(Status::Message(message, _)) = parser.feed(b"e") else { unreachable!() };
//! assert_eq!(message.form(), [("name".to_owned(), "joe".to_owned())]);
//! ```
//! Serving:
//! ```no_run
//! use maker_http::{
//!     limits::{ConnLimits, ParserLimits},
//!     pool::ParserPool,
//!     Connection, Handled, Handler, Message, Response, StatusCode,
//! };
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! struct MyHandler;
//!
//! impl Handler<()> for MyHandler {
//!     async fn handle(&self, _: &mut (), req: &Message, resp: &mut Response) -> Handled {
//!         match req.url().map(|url| url.path()) {
//!             Some("/") => resp.status(StatusCode::Ok).body("Hello World!"),
//!             _ => resp.status(StatusCode::NotFound).body("Not found"),
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let handler = Arc::new(MyHandler);
//!     let pool = Arc::new(ParserPool::requests(ParserLimits::default(), 256));
//!
//!     loop {
//!         let (stream, _) = listener.accept().await.unwrap();
//!         let mut conn: Connection<MyHandler, ()> =
//!             Connection::with_pool(handler.clone(), &pool, ConnLimits::default());
//!
//!         tokio::spawn(async move {
//!             let _ = conn.run(stream).await;
//!         });
//!     }
//! }
//! ```
//!
//! # Use Cases
//!
//! - **Embedded HTTP servers** - the driver handles framing, the handler only answers
//! - **Proxies and clients** - response parsing with `HEAD` and read-until-close support
//! - **Protocol tooling** - strict validation with detailed error kinds

pub(crate) mod http {
    pub(crate) mod base64;
    pub(crate) mod body;
    pub(crate) mod cursor;
    pub mod fields;
    pub(crate) mod headers;
    pub(crate) mod message;
    pub mod multipart;
    pub(crate) mod parser;
    pub mod query;
    pub(crate) mod response;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
}
pub(crate) mod errors;
pub mod limits;
pub mod pool;
pub mod session;
pub mod upload;

pub use crate::{
    errors::{Error, ErrorKind},
    http::{
        fields::{
            self, BasicAuth, ContentDisposition, ContentType, Cookie, Field, FieldName, SetCookie,
            TransferEncoding, WwwAuthenticate,
        },
        headers::HeaderMap,
        message::{Head, Message},
        multipart,
        parser::{Parser, Phase, Status},
        query,
        response::{
            write::{BodyWriter, WriteBuffer},
            Handled, Response,
        },
        types::{Method, StatusCode, Url, Version},
    },
    server::connection::{Connection, ConnectionData, Handler},
};
