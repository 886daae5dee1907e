use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::head;
use crate::{Error, Result};

/// Tokio codec for opening a tunnel through an HTTP proxy.
///
/// The encoder writes a `CONNECT host:port` request. The decoder consumes the proxy's reply and yields its status code
/// when the proxy accepted the tunnel; any status outside `2xx` is an error.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConnectCodec;

impl ConnectCodec {
    /// Returns a new `ConnectCodec` object.
    #[must_use]
    pub fn new() -> Self {
        ConnectCodec
    }
}

impl<'a> Encoder<&'a str> for ConnectCodec {
    type Error = Error;

    fn encode(&mut self, authority: &'a str, dst: &mut BytesMut) -> Result<()> {
        let request = format!(
            "CONNECT {authority} HTTP/1.1\r\n\
             Host: {authority}\r\n\
             \r\n",
            authority = authority
        );

        dst.put_slice(request.as_bytes());
        Ok(())
    }
}

impl Decoder for ConnectCodec {
    type Item = u16;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<u16>> {
        let head = if let Some(head) = head::parse(&src[..])? {
            head
        } else {
            return Ok(None);
        };

        if !(200..300).contains(&head.code) {
            return Err(format!("proxy responded to CONNECT with HTTP error {code}", code = head.code).into());
        }

        src.advance(head.len);
        Ok(Some(head.code))
    }
}
