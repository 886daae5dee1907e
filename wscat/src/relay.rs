//! The transfer loop: one request per chunk of input.

use std::io::{self, Read, Write};

use tracing::{debug, trace, warn};

use crate::{RequestError, ResponseSink, Session};

/// Something that can carry one chunk of input to the server and stream back the response.
///
/// [`Session`](../struct.Session.html) is the real implementation.
pub trait Transport {
    /// Performs one complete request/response cycle with `body` as the request body.
    fn perform(&mut self, body: &[u8], sink: &mut dyn ResponseSink) -> Result<(), RequestError>;
}

impl Transport for Session {
    fn perform(&mut self, body: &[u8], sink: &mut dyn ResponseSink) -> Result<(), RequestError> {
        Session::perform(self, body, sink)
    }
}

/// How a run of the transfer loop ended.
#[derive(Debug)]
pub enum Outcome {
    /// The input ran out, or could no longer be read, and every request succeeded.
    Exhausted {
        /// The number of requests made.
        requests: usize,
    },

    /// A request failed. No further input was read.
    Aborted {
        /// The number of requests made, including the one that failed.
        requests: usize,
        /// Why the last request failed.
        error: RequestError,
    },
}

impl Outcome {
    /// Returns the number of requests made.
    pub fn requests(&self) -> usize {
        match self {
            Outcome::Exhausted { requests } | Outcome::Aborted { requests, .. } => *requests,
        }
    }
}

/// Writes response headers to one stream and response bodies to another, unbuffered.
pub struct Console<O, E> {
    out: O,
    err: E,
}

impl<O, E> Console<O, E> {
    /// Creates a `Console` that writes bodies to `out` and header lines to `err`.
    pub fn new(out: O, err: E) -> Self {
        Console { out, err }
    }

    /// Consumes the console, returning the body and header streams.
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}

impl<O: Write, E: Write> ResponseSink for Console<O, E> {
    fn header(&mut self, line: &[u8]) -> io::Result<()> {
        self.err.write_all(line)?;
        self.err.flush()
    }

    fn body(&mut self, data: &[u8]) -> io::Result<()> {
        self.out.write_all(data)?;
        self.out.flush()
    }
}

/// Reads up to `buffer_size` bytes at a time from `input` and sends each chunk with `transport`.
///
/// Each chunk is exactly what one `read` call returned; nothing is carried over between chunks. The loop ends
/// normally at end of input or when `input` fails, and ends early, without retrying, when a request fails.
pub fn run<T, R, K>(transport: &mut T, mut input: R, sink: &mut K, buffer_size: usize) -> Outcome
where
    T: Transport + ?Sized,
    R: Read,
    K: ResponseSink,
{
    let mut buf = vec![0; buffer_size];
    let mut requests = 0;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "reading input failed");
                break;
            }
        };

        requests += 1;
        trace!(request = requests, bytes = n, "read chunk");
        if let Err(error) = transport.perform(&buf[..n], sink) {
            return Outcome::Aborted { requests, error };
        }
    }

    debug!(requests, "input exhausted");
    Outcome::Exhausted { requests }
}
