use std::io;

use thiserror::Error;

/// Errors that stop `wscat` before the transfer loop starts.
#[derive(Debug, Error)]
pub enum Error {
    /// The client could not be set up, for instance because the TLS backend failed to initialize.
    #[error("failed to initialize client: {0}")]
    Init(String),

    /// A request failed and the run was abandoned.
    #[error("request failed: {0}")]
    Request(#[from] RequestError),
}

/// Reasons a single request/response cycle can fail.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Name resolution failed or returned no addresses.
    #[error("could not resolve host {host}: {source}")]
    Resolve {
        /// The name being resolved.
        host: String,
        /// The underlying failure.
        source: io::Error,
    },

    /// None of the resolved addresses accepted a connection.
    #[error("could not connect to {host} port {port}: {source}")]
    Connect {
        /// The host being connected to.
        host: String,
        /// The port being connected to.
        port: u16,
        /// The error from the last connection attempt.
        source: io::Error,
    },

    /// The proxy refused or broke the connection.
    #[error("proxy {proxy} failed: {message}")]
    Proxy {
        /// The proxy, as `host:port`.
        proxy: String,
        /// What went wrong.
        message: String,
    },

    /// The TLS handshake failed.
    #[error("TLS handshake with {domain} failed: {message}")]
    Tls {
        /// The name the certificate was checked against.
        domain: String,
        /// What went wrong.
        message: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    /// The server's response could not be parsed.
    #[error("malformed response: {0}")]
    Protocol(String),

    /// Writing the response to its destination failed.
    #[error("failed writing received data: {0}")]
    Write(#[source] io::Error),

    /// Reading from or writing to the connection failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}
