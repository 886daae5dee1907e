use std::io::{self, Read, Write};

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

const READ_SIZE: usize = 8 * 1024;

/// Drives a Tokio codec over a blocking stream.
pub struct Framed<S, C> {
    stream: S,
    codec: C,
    read_buf: BytesMut,
    write_buf: BytesMut,
}

impl<S, C> Framed<S, C> {
    pub fn new(stream: S, codec: C) -> Self {
        Framed {
            stream,
            codec,
            read_buf: BytesMut::new(),
            write_buf: BytesMut::new(),
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn replace_codec<D>(self, codec: D) -> Framed<S, D> {
        Framed {
            stream: self.stream,
            codec,
            read_buf: self.read_buf,
            write_buf: self.write_buf,
        }
    }

    /// Returns the stream along with any bytes that were read but not decoded.
    pub fn into_parts(self) -> (S, BytesMut) {
        (self.stream, self.read_buf)
    }
}

impl<S: Write, C> Framed<S, C> {
    pub fn send<Item>(&mut self, item: Item) -> Result<(), C::Error>
    where
        C: Encoder<Item>,
    {
        self.write_buf.clear();
        self.codec.encode(item, &mut self.write_buf)?;
        self.stream.write_all(&self.write_buf)?;
        self.stream.flush()?;
        Ok(())
    }
}

impl<S: Read, C: Decoder> Framed<S, C> {
    fn fill(&mut self) -> io::Result<usize> {
        let len = self.read_buf.len();
        self.read_buf.resize(len + READ_SIZE, 0);
        let result = loop {
            match self.stream.read(&mut self.read_buf[len..]) {
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                result => break result,
            }
        };

        self.read_buf.truncate(len + *result.as_ref().unwrap_or(&0));
        result
    }

    pub fn receive(&mut self) -> Result<Option<C::Item>, C::Error> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.read_buf)? {
                return Ok(Some(frame));
            }

            if self.fill()? == 0 {
                return self.codec.decode_eof(&mut self.read_buf);
            }
        }
    }
}
