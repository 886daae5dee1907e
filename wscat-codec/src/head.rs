use std::str;

use httparse::{Header, Response, Status};

use crate::Result;

const MAX_HEADERS: usize = 64;

/// The most bytes a response head may take before it is rejected.
pub const MAX_HEAD_LEN: usize = 64 * 1024;

/// How the body following a response head is delimited.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Framing {
    /// An interim `1xx` response; another head follows.
    Interim,
    /// No body at all.
    Empty,
    /// Exactly this many bytes.
    Length(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// Everything up to the end of the stream.
    Close,
}

#[derive(Debug)]
pub struct Head {
    pub code: u16,
    pub len: usize,
    pub framing: Framing,
}

fn is_chunked(value: &[u8]) -> bool {
    value
        .rsplit(|&b| b == b',')
        .next()
        .map_or(false, |coding| trim(coding).eq_ignore_ascii_case(b"chunked"))
}

fn content_length(headers: &[Header<'_>]) -> Result<Option<u64>> {
    let mut length = None;
    for header in headers.iter().filter(|h| h.name.eq_ignore_ascii_case("Content-Length")) {
        let value = str::from_utf8(trim(header.value))?;
        let n: u64 = value
            .parse()
            .map_err(|_| format!("invalid Content-Length header: {:?}", value))?;

        match length {
            Some(prev) if prev != n => {
                return Err(format!("conflicting Content-Length headers: {} and {}", prev, n).into());
            }
            _ => length = Some(n),
        }
    }

    Ok(length)
}

pub fn trim(mut s: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = s {
        s = rest;
    }

    while let [rest @ .., b' ' | b'\t' | b'\r' | b'\n'] = s {
        s = rest;
    }

    s
}

/// Parses a response head at the start of `data`.
///
/// Returns `Ok(None)` until the whole head, including the blank line that ends it, is present. A head that is still
/// incomplete after [`MAX_HEAD_LEN`] bytes is an error.
pub fn parse(data: &[u8]) -> Result<Option<Head>> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = Response::new(&mut headers);
    let len = match response.parse(data)? {
        Status::Complete(len) => len,
        Status::Partial if data.len() > MAX_HEAD_LEN => {
            return Err(format!("response head exceeds {} bytes", MAX_HEAD_LEN).into());
        }
        Status::Partial => return Ok(None),
    };

    let code = response.code.ok_or("response has no status code")?;

    let chunked = response
        .headers
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case("Transfer-Encoding"))
        .any(|h| is_chunked(h.value));

    let framing = match code {
        100..=199 => Framing::Interim,
        204 | 304 => Framing::Empty,
        _ if chunked => Framing::Chunked,
        _ => match content_length(response.headers)? {
            Some(0) => Framing::Empty,
            Some(n) => Framing::Length(n),
            None => Framing::Close,
        },
    };

    Ok(Some(Head { code, len, framing }))
}

#[cfg(test)]
mod tests {
    use crate::head::{self, Framing};

    fn framing(data: &str) -> Framing {
        head::parse(data.as_bytes()).unwrap().unwrap().framing
    }

    #[test]
    fn partial_head() {
        assert!(head::parse(b"HTTP/1.1 200 OK\r\nContent-Le").unwrap().is_none());
    }

    #[test]
    fn oversized_head_is_an_error() {
        let mut data = b"HTTP/1.1 200 OK\r\nX: ".to_vec();
        data.resize(head::MAX_HEAD_LEN, b'a');
        assert!(head::parse(&data).unwrap().is_none());

        data.push(b'a');
        let err = head::parse(&data).unwrap_err();
        assert!(err.to_string().contains("response head exceeds"), "{}", err);
    }

    #[test]
    fn head_length_excludes_body() {
        let data = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi";
        let head = head::parse(data).unwrap().unwrap();
        assert_eq!(200, head.code);
        assert_eq!(data.len() - 2, head.len);
    }

    #[test]
    fn chunked_wins_over_content_length() {
        assert_eq!(
            Framing::Chunked,
            framing("HTTP/1.1 200 OK\r\nContent-Length: 4\r\ntransfer-encoding: gzip, Chunked\r\n\r\n")
        );
    }

    #[test]
    fn bodiless_statuses() {
        assert_eq!(Framing::Interim, framing("HTTP/1.1 100 Continue\r\n\r\n"));
        assert_eq!(Framing::Empty, framing("HTTP/1.1 204 No Content\r\nContent-Length: 9\r\n\r\n"));
        assert_eq!(Framing::Empty, framing("HTTP/1.1 304 Not Modified\r\n\r\n"));
        assert_eq!(Framing::Empty, framing("HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n"));
    }

    #[test]
    fn no_length_reads_until_close() {
        assert_eq!(Framing::Close, framing("HTTP/1.0 200 OK\r\nServer: x\r\n\r\n"));
    }

    #[test]
    fn rejects_bad_content_length() {
        assert!(head::parse(b"HTTP/1.1 200 OK\r\nContent-Length: ten\r\n\r\n").is_err());
        assert!(head::parse(b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n").is_err());
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(b"a b", head::trim(b" \ta b \r\n"));
        assert_eq!(b"", head::trim(b"  "));
    }
}
