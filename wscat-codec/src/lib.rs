#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

//! Tokio codecs for the exchanges made by `wscat`: HTTP/1.1 requests and responses, and proxy handshakes.
//!
//! Four codecs cover everything the client writes and reads:
//!
//! * [`RequestCodec`] encodes a `POST` request whose body is an explicit byte slice. Bodies are never treated as
//!   strings, so embedded zero bytes are sent like any other byte.
//! * [`ResponseCodec`] decodes a response incrementally into [`ResponseEvent`]s: one event per head line, then body
//!   bytes as soon as they arrive, then an end marker. `Content-Length`, `Transfer-Encoding: chunked` and
//!   read-until-close bodies are supported.
//! * [`ConnectCodec`] opens a tunnel through an HTTP proxy with `CONNECT`.
//! * [`SocksCodec`] runs the client side of a SOCKS5 handshake.
//!
//! This crate does not do any I/O directly. The `wscat` crate drives these codecs over blocking sockets.

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

mod connect;
mod head;
mod request;
mod response;
mod socks;

pub use crate::connect::ConnectCodec;
pub use crate::request::{Request, RequestCodec};
pub use crate::response::{ResponseCodec, ResponseEvent};
pub use crate::socks::{SocksCodec, SocksReply, SocksRequest, SocksTarget};

use std::error;
use std::result;

/// Represents errors that can be exposed by this crate.
pub type Error = Box<dyn error::Error + Send + Sync + 'static>;

/// Represents results returned by the non-async functions in this crate.
pub type Result<T> = result::Result<T, Error>;
