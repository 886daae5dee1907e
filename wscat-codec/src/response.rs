use std::cmp;
use std::str;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::head::{self, Framing};
use crate::{Error, Result};

const MAX_LINE_LEN: usize = 8 * 1024;

/// One piece of an HTTP response, in the order it appeared on the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponseEvent {
    /// One line of a response head or of a chunked trailer, including its line terminator.
    ///
    /// The status line, each header and the blank line that ends the head are reported separately. Interim `1xx`
    /// responses are reported too, followed by the lines of the final response.
    Header(Bytes),

    /// Decoded body bytes. Chunked framing has been removed; content codings have not.
    Body(Bytes),

    /// The response is complete.
    End,
}

#[derive(Clone, Copy, Debug)]
enum State {
    Head,
    HeadLines { remaining: usize, framing: Framing },
    Length(u64),
    ChunkSize,
    ChunkData(u64),
    ChunkDataEnd,
    Trailers,
    Close,
    Done,
}

impl From<Framing> for State {
    fn from(framing: Framing) -> Self {
        match framing {
            Framing::Interim => State::Head,
            Framing::Empty => State::Length(0),
            Framing::Length(n) => State::Length(n),
            Framing::Chunked => State::ChunkSize,
            Framing::Close => State::Close,
        }
    }
}

fn take_line(src: &mut BytesMut) -> Result<Option<BytesMut>> {
    if let Some(i) = src.iter().position(|&b| b == b'\n') {
        Ok(Some(src.split_to(i + 1)))
    } else if src.len() > MAX_LINE_LEN {
        Err("line in chunked body is too long".into())
    } else {
        Ok(None)
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<u64> {
    let size = line.split(|&b| b == b';').next().unwrap_or_default();
    let size = str::from_utf8(head::trim(size))?;
    if size.is_empty() {
        return Err("missing chunk size".into());
    }

    u64::from_str_radix(size, 16).map_err(|_| format!("invalid chunk size: {:?}", size).into())
}

fn take_data(src: &mut BytesMut, remaining: u64) -> (Bytes, u64) {
    let n = cmp::min(remaining, src.len() as u64) as usize;
    (src.split_to(n).freeze(), remaining - n as u64)
}

/// Tokio decoder for an HTTP/1.1 response.
///
/// Body bytes are yielded as soon as they are buffered, without waiting for the rest of the body.
#[derive(Debug)]
pub struct ResponseCodec {
    state: State,
    status: Option<u16>,
}

impl ResponseCodec {
    /// Returns a new `ResponseCodec` object, ready to decode one response.
    #[must_use]
    pub fn new() -> Self {
        ResponseCodec {
            state: State::Head,
            status: None,
        }
    }

    /// Returns the status code of the most recent response head decoded so far.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl Default for ResponseCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ResponseCodec {
    type Item = ResponseEvent;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ResponseEvent>> {
        loop {
            match self.state {
                State::Head => {
                    let head = if let Some(head) = head::parse(&src[..])? {
                        head
                    } else {
                        return Ok(None);
                    };

                    self.status = Some(head.code);
                    self.state = State::HeadLines {
                        remaining: head.len,
                        framing: head.framing,
                    };
                }

                State::HeadLines { remaining: 0, framing } => {
                    self.state = framing.into();
                }

                State::HeadLines { remaining, framing } => {
                    let len = src[..remaining]
                        .iter()
                        .position(|&b| b == b'\n')
                        .map_or(remaining, |i| i + 1);

                    self.state = State::HeadLines {
                        remaining: remaining - len,
                        framing,
                    };

                    return Ok(Some(ResponseEvent::Header(src.split_to(len).freeze())));
                }

                State::Length(0) => {
                    self.state = State::Done;
                    return Ok(Some(ResponseEvent::End));
                }

                State::Length(remaining) => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    let (data, remaining) = take_data(src, remaining);
                    self.state = State::Length(remaining);
                    return Ok(Some(ResponseEvent::Body(data)));
                }

                State::ChunkSize => {
                    let line = if let Some(line) = take_line(src)? {
                        line
                    } else {
                        return Ok(None);
                    };

                    self.state = match parse_chunk_size(&line)? {
                        0 => State::Trailers,
                        n => State::ChunkData(n),
                    };
                }

                State::ChunkData(0) => {
                    self.state = State::ChunkDataEnd;
                }

                State::ChunkData(remaining) => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    let (data, remaining) = take_data(src, remaining);
                    self.state = State::ChunkData(remaining);
                    return Ok(Some(ResponseEvent::Body(data)));
                }

                State::ChunkDataEnd => {
                    let line = if let Some(line) = take_line(src)? {
                        line
                    } else {
                        return Ok(None);
                    };

                    if !head::trim(&line).is_empty() {
                        return Err("chunk data is not followed by CRLF".into());
                    }

                    self.state = State::ChunkSize;
                }

                State::Trailers => {
                    let line = if let Some(line) = take_line(src)? {
                        line
                    } else {
                        return Ok(None);
                    };

                    if head::trim(&line).is_empty() {
                        self.state = State::Length(0);
                    } else {
                        return Ok(Some(ResponseEvent::Header(line.freeze())));
                    }
                }

                State::Close => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    return Ok(Some(ResponseEvent::Body(src.split().freeze())));
                }

                State::Done => return Ok(None),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<ResponseEvent>> {
        match self.state {
            State::Close if src.is_empty() => {
                self.state = State::Done;
                Ok(Some(ResponseEvent::End))
            }

            State::Done => Ok(None),

            State::Head if src.is_empty() && self.status.is_none() => Err("empty reply from server".into()),

            _ => {
                if let Some(event) = self.decode(src)? {
                    Ok(Some(event))
                } else {
                    Err("connection closed before the response was complete".into())
                }
            }
        }
    }
}
