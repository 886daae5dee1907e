use std::net::SocketAddr;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::{Error, Result};

const VERSION: u8 = 5;
const METHOD_NO_AUTH: u8 = 0;
const METHOD_NONE_ACCEPTABLE: u8 = 0xff;
const CMD_CONNECT: u8 = 1;
const ATYP_IPV4: u8 = 1;
const ATYP_DOMAIN: u8 = 3;
const ATYP_IPV6: u8 = 4;

/// Where a SOCKS5 proxy is asked to connect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SocksTarget<'a> {
    /// An address the client resolved itself.
    Addr(SocketAddr),
    /// A host name for the proxy to resolve, and a port.
    Domain(&'a str, u16),
}

/// A message sent by the client during a SOCKS5 handshake.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SocksRequest<'a> {
    /// Offers the "no authentication required" method, and only that.
    Greeting,
    /// Asks the proxy to open a TCP connection to the target.
    Connect(SocksTarget<'a>),
}

/// A proxy reply that lets the handshake go on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SocksReply {
    /// The proxy agreed to go on without authentication.
    Authenticated,
    /// The proxy connected to the target. Everything after this reply belongs to the target.
    Connected,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Stage {
    Method,
    Connect,
    Done,
}

fn reply_message(code: u8) -> &'static str {
    match code {
        1 => "general SOCKS server failure",
        2 => "connection not allowed by ruleset",
        3 => "network unreachable",
        4 => "host unreachable",
        5 => "connection refused",
        6 => "TTL expired",
        7 => "command not supported",
        8 => "address type not supported",
        _ => "unknown failure",
    }
}

fn check_version(version: u8) -> Result<()> {
    if version == VERSION {
        Ok(())
    } else {
        Err(format!("proxy replied with SOCKS version {}, not 5", version).into())
    }
}

/// Tokio codec for the client side of a SOCKS5 handshake without authentication.
///
/// The encoder writes the greeting and the `CONNECT` command. The decoder reads the method selection and then the
/// command reply, in that order; a refusal at either step is an error.
#[derive(Debug)]
pub struct SocksCodec {
    stage: Stage,
}

impl SocksCodec {
    /// Returns a new `SocksCodec` object, expecting the proxy's method selection first.
    #[must_use]
    pub fn new() -> Self {
        SocksCodec { stage: Stage::Method }
    }
}

impl Default for SocksCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Encoder<SocksRequest<'a>> for SocksCodec {
    type Error = Error;

    fn encode(&mut self, item: SocksRequest<'a>, dst: &mut BytesMut) -> Result<()> {
        let target = match item {
            SocksRequest::Greeting => {
                dst.put_slice(&[VERSION, 1, METHOD_NO_AUTH]);
                return Ok(());
            }
            SocksRequest::Connect(target) => target,
        };

        dst.put_slice(&[VERSION, CMD_CONNECT, 0]);
        let port = match target {
            SocksTarget::Addr(SocketAddr::V4(addr)) => {
                dst.put_u8(ATYP_IPV4);
                dst.put_slice(&addr.ip().octets());
                addr.port()
            }
            SocksTarget::Addr(SocketAddr::V6(addr)) => {
                dst.put_u8(ATYP_IPV6);
                dst.put_slice(&addr.ip().octets());
                addr.port()
            }
            SocksTarget::Domain(host, port) => {
                if host.is_empty() || host.len() > usize::from(u8::MAX) {
                    return Err(format!("host name {:?} cannot be sent to a SOCKS5 proxy", host).into());
                }

                dst.put_u8(ATYP_DOMAIN);
                dst.put_u8(host.len() as u8);
                dst.put_slice(host.as_bytes());
                port
            }
        };

        dst.put_u16(port);
        Ok(())
    }
}

impl Decoder for SocksCodec {
    type Item = SocksReply;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<SocksReply>> {
        match self.stage {
            Stage::Method => {
                if src.len() < 2 {
                    return Ok(None);
                }

                check_version(src[0])?;
                match src[1] {
                    METHOD_NO_AUTH => {}
                    METHOD_NONE_ACCEPTABLE => {
                        return Err("SOCKS5 proxy requires authentication".into());
                    }
                    method => {
                        return Err(format!("SOCKS5 proxy chose unsupported method {}", method).into());
                    }
                }

                src.advance(2);
                self.stage = Stage::Connect;
                Ok(Some(SocksReply::Authenticated))
            }

            Stage::Connect => {
                if src.len() < 5 {
                    return Ok(None);
                }

                check_version(src[0])?;
                if src[1] != 0 {
                    return Err(format!("SOCKS5 proxy could not connect: {}", reply_message(src[1])).into());
                }

                let addr_len = match src[3] {
                    ATYP_IPV4 => 4,
                    ATYP_IPV6 => 16,
                    ATYP_DOMAIN => 1 + usize::from(src[4]),
                    atyp => return Err(format!("SOCKS5 reply has unknown address type {}", atyp).into()),
                };

                let len = 4 + addr_len + 2;
                if src.len() < len {
                    return Ok(None);
                }

                src.advance(len);
                self.stage = Stage::Done;
                Ok(Some(SocksReply::Connected))
            }

            Stage::Done => Ok(None),
        }
    }
}
