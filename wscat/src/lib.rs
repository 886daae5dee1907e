#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

//! Relays standard input to an HTTP endpoint, one request per chunk.
//!
//! `wscat` is a crude stand-in for a WebSocket client. Rather than performing an upgrade handshake, it reads a chunk
//! of input at a time and sends each one as the body of its own `POST` request, with a "protocol" label attached as a
//! header line. Response headers are copied to standard error and response bodies to standard output.
//!
//! The pieces are usable on their own:
//!
//! * [`Config`] holds the parsed command line.
//! * [`proxy::select`] picks a proxy from `http_proxy` / `https_proxy` according to the target's scheme.
//! * [`Session`] owns everything needed to make requests: the header set, the DNS cache and the TLS connector.
//! * [`relay::run`] is the transfer loop.
//!
//! `native_tls` provides the TLS functionality for `wss://...` and `https://...` targets by default; the
//! `ssl-openssl` feature switches to `openssl`.

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

mod client;
mod config;
mod dns;
mod error;
mod headers;
pub mod logging;
mod net;
pub mod proxy;
pub mod relay;
mod ssl;
mod sync;

pub use crate::client::{ResponseSink, Session};
pub use crate::config::{Config, DEFAULT_BUFFER_SIZE, DEFAULT_PROTOCOL, MAX_BUFFER_SIZE};
pub use crate::error::{Error, RequestError};
pub use crate::headers::HeaderSet;

use std::io::{Read, Write};

/// Used by [`Session`](struct.Session.html) to represent the connection a request travels over, whether plain TCP, a
/// proxy tunnel, TLS, or TLS inside a proxy tunnel.
pub trait NetworkStream: Read + Write {}

impl<S> NetworkStream for S where S: Read + Write {}
