use std::fmt;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::{Error, Result};

macro_rules! writeok {
    ($dst:expr, $($arg:tt)*) => {
        let _ = fmt::Write::write_fmt(&mut $dst, format_args!($($arg)*));
    }
}

/// A `POST` request carrying one chunk of data.
#[derive(Clone, Copy, Debug)]
pub struct Request<'a> {
    /// The request target: an origin-form path such as `/stream?query`, or an absolute URL when the request is
    /// forwarded by an HTTP proxy.
    pub target: &'a str,

    /// The value of the `Host` header.
    pub host: &'a str,

    /// Extra header lines, written verbatim and in order after the standard headers.
    pub headers: &'a [String],

    /// The request body. Its length is sent in `Content-Length`; the bytes are copied unchanged.
    pub body: &'a [u8],
}

/// Tokio encoder for [`Request`](struct.Request.html).
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestCodec;

impl RequestCodec {
    /// Returns a new `RequestCodec` object.
    #[must_use]
    pub fn new() -> Self {
        RequestCodec
    }
}

impl<'a> Encoder<Request<'a>> for RequestCodec {
    type Error = Error;

    fn encode(&mut self, item: Request<'a>, dst: &mut BytesMut) -> Result<()> {
        let mut s = String::new();
        writeok!(
            s,
            "POST {target} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Accept: */*\r\n",
            target = item.target,
            host = item.host
        );

        for line in item.headers {
            writeok!(s, "{line}\r\n", line = line);
        }

        writeok!(
            s,
            "Content-Length: {len}\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Connection: close\r\n\
             \r\n",
            len = item.body.len()
        );

        dst.reserve(s.len() + item.body.len());
        dst.put_slice(s.as_bytes());
        dst.put_slice(item.body);
        Ok(())
    }
}
