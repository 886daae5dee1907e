use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio_util::codec::Decoder;
use tracing::{debug, info, warn};
use url::{Host, Url};
use wscat_codec::{
    ConnectCodec, Request, RequestCodec, ResponseCodec, ResponseEvent, SocksCodec, SocksRequest, SocksTarget,
};

use crate::dns::DnsCache;
use crate::net::{self, Deadline, TimedStream};
use crate::proxy::{Proxy, ProxyKind};
use crate::ssl::{Connector, HandshakeFailure};
use crate::sync::Framed;
use crate::{Config, Error, HeaderSet, NetworkStream, RequestError};

/// Receives the pieces of a response as they arrive.
pub trait ResponseSink {
    /// Called with each response header line, including its line terminator.
    fn header(&mut self, line: &[u8]) -> io::Result<()>;

    /// Called with each run of body bytes, in order.
    fn body(&mut self, data: &[u8]) -> io::Result<()>;
}

/// Where requests go, worked out once from the target URL.
#[derive(Debug)]
struct Target {
    host: String,
    port: u16,
    tls: bool,
    host_header: String,
    authority: String,
    origin: String,
    absolute: String,
}

impl Target {
    fn from_url(url: &Url) -> Result<Self, Error> {
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_owned(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => return Err(Error::Init(format!("URL {} has no host", url))),
        };

        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::Init(format!("URL {} has no port", url)))?;

        let tls = matches!(url.scheme(), "wss" | "https");
        let host_str = url.host_str().unwrap_or(&host);
        let host_header = match url.port() {
            Some(port) => format!("{}:{}", host_str, port),
            None => host_str.to_owned(),
        };

        let mut origin = url.path().to_owned();
        if let Some(query) = url.query() {
            origin.push('?');
            origin.push_str(query);
        }

        let absolute = format!("{}://{}{}", if tls { "https" } else { "http" }, host_header, origin);
        let authority = format!("{}:{}", host_str, port);

        Ok(Target {
            host,
            port,
            tls,
            host_header,
            authority,
            origin,
            absolute,
        })
    }
}

/// A configured client, reused for every request of a run.
///
/// The session owns the header set, the DNS cache and the TLS connectors. Each call to
/// [`perform`](#method.perform) opens a fresh connection, sends one request and streams the response to a
/// [`ResponseSink`](trait.ResponseSink.html).
pub struct Session {
    target: Target,
    headers: HeaderSet,
    proxy: Option<Proxy>,
    dns: DnsCache,
    tls: Connector,
    proxy_tls: Option<Connector>,
    timeout: Duration,
}

impl Session {
    /// Sets up a session for `config`, sending requests through `proxy` if one is given.
    ///
    /// `--insecure` applies to the target only. The certificate of an `https://` proxy is always verified.
    ///
    /// # Errors
    ///
    /// This method returns an `Err` result if the TLS backend cannot be initialized.
    pub fn new(config: &Config, proxy: Option<Proxy>) -> Result<Self, Error> {
        let target = Target::from_url(&config.url)?;
        let tls = Connector::new(config.insecure)?;
        if tls.is_insecure() {
            warn!("TLS certificate and hostname verification is disabled");
        }

        let proxy_tls = match &proxy {
            Some(proxy) if proxy.kind() == ProxyKind::Https => Some(Connector::new(false)?),
            _ => None,
        };

        if let Some(proxy) = &proxy {
            info!(kind = %proxy.kind(), %proxy, "using proxy");
        }

        Ok(Session {
            target,
            headers: HeaderSet::new(&config.protocol, config.deflate),
            proxy,
            dns: DnsCache::new(config.dns_timeout),
            tls,
            proxy_tls,
            timeout: config.timeout,
        })
    }

    /// Returns the header lines sent with every request.
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Performs one request/response cycle with `body` as the request body.
    ///
    /// # Errors
    ///
    /// This method returns an `Err` result if connecting, sending, receiving or writing to `sink` fails, or if the
    /// whole cycle takes longer than the configured timeout.
    pub fn perform(&mut self, body: &[u8], sink: &mut dyn ResponseSink) -> Result<(), RequestError> {
        let deadline = Deadline::after(self.timeout);
        debug!(bytes = body.len(), "sending request");
        let stream = self.open(deadline)?;
        self.perform_on(stream, body, sink)
    }

    /// Sends one request over an already established stream and streams the response to `sink`.
    ///
    /// This method assumes that the connection to the server, through any proxy and TLS, has already been made.
    ///
    /// # Errors
    ///
    /// This method returns an `Err` result if writing to or reading from the stream fails, if the response is
    /// malformed, or if `sink` fails.
    pub fn perform_on<S: Read + Write>(
        &self,
        stream: S,
        body: &[u8],
        sink: &mut dyn ResponseSink,
    ) -> Result<(), RequestError> {
        let target: &str = if self.forwards() {
            &self.target.absolute
        } else {
            &self.target.origin
        };

        let mut framed = Framed::new(stream, RequestCodec::new());
        framed
            .send(Request {
                target,
                host: &self.target.host_header,
                headers: self.headers.lines(),
                body,
            })
            .map_err(|e| self.wire_error(e))?;

        let mut framed = framed.replace_codec(ResponseCodec::new());
        loop {
            match framed.receive().map_err(|e| self.wire_error(e))? {
                Some(ResponseEvent::Header(line)) => sink.header(&line).map_err(RequestError::Write)?,
                Some(ResponseEvent::Body(data)) => sink.body(&data).map_err(RequestError::Write)?,
                Some(ResponseEvent::End) | None => break,
            }
        }

        if let Some(status) = framed.codec().status() {
            info!(status, "response received");
        }

        Ok(())
    }

    /// Clear-text requests through an HTTP proxy are forwarded rather than tunnelled.
    fn forwards(&self) -> bool {
        !self.target.tls && self.proxy.as_ref().map_or(false, |proxy| proxy.kind().is_http())
    }

    fn open(&mut self, deadline: Deadline) -> Result<Box<dyn NetworkStream>, RequestError> {
        let proxy = if let Some(proxy) = self.proxy.clone() {
            proxy
        } else {
            let socket = self.dial(&self.target.host.clone(), self.target.port, deadline)?;
            return self.secure(Box::new(TimedStream::new(socket, deadline)));
        };

        match proxy.kind() {
            ProxyKind::Http | ProxyKind::Https => {
                let socket = self.dial(proxy.host(), proxy.port(), deadline)?;
                let mut stream: Box<dyn NetworkStream> = Box::new(TimedStream::new(socket, deadline));
                if let Some(tls) = &self.proxy_tls {
                    let secured = tls
                        .wrap(proxy.host(), stream)
                        .map_err(|e| self.tls_error(proxy.host(), e))?;

                    stream = Box::new(secured);
                }

                if self.target.tls {
                    let stream = self.tunnel(stream, &proxy)?;
                    self.secure(stream)
                } else {
                    Ok(stream)
                }
            }

            ProxyKind::Socks5 | ProxyKind::Socks5Hostname => {
                let resolved = if proxy.kind() == ProxyKind::Socks5 {
                    Some(self.dns.resolve(&self.target.host, self.target.port)?[0])
                } else {
                    None
                };

                let socket = self.dial(proxy.host(), proxy.port(), deadline)?;
                let stream = Box::new(TimedStream::new(socket, deadline));
                let stream = self.socks_connect(stream, &proxy, resolved)?;
                self.secure(stream)
            }
        }
    }

    fn dial(&mut self, host: &str, port: u16, deadline: Deadline) -> Result<std::net::TcpStream, RequestError> {
        let addrs = self.dns.resolve(host, port)?;
        net::connect(&addrs, deadline).map_err(|source| {
            if net::is_timeout(&source) {
                RequestError::Timeout(self.timeout.as_secs())
            } else {
                RequestError::Connect {
                    host: host.to_owned(),
                    port,
                    source,
                }
            }
        })
    }

    fn secure(&self, stream: Box<dyn NetworkStream>) -> Result<Box<dyn NetworkStream>, RequestError> {
        if !self.target.tls {
            return Ok(stream);
        }

        let domain = &self.target.host;
        let stream = self.tls.wrap(domain, stream).map_err(|e| self.tls_error(domain, e))?;
        Ok(Box::new(stream))
    }

    fn tunnel(&self, stream: Box<dyn NetworkStream>, proxy: &Proxy) -> Result<Box<dyn NetworkStream>, RequestError> {
        let mut framed = Framed::new(stream, ConnectCodec::new());
        framed
            .send(self.target.authority.as_str())
            .map_err(|e| self.handshake_error(proxy, e))?;

        let code = self.proxy_reply(&mut framed, proxy)?;
        debug!(code, %proxy, "proxy tunnel established");
        self.handed_over(framed, proxy)
    }

    /// Asks a SOCKS5 proxy to connect to the target, by address if `resolved` is given and by name otherwise.
    fn socks_connect(
        &self,
        stream: Box<dyn NetworkStream>,
        proxy: &Proxy,
        resolved: Option<SocketAddr>,
    ) -> Result<Box<dyn NetworkStream>, RequestError> {
        let target = match (resolved, self.target.host.parse::<IpAddr>()) {
            (Some(addr), _) => SocksTarget::Addr(addr),
            (None, Ok(ip)) => SocksTarget::Addr(SocketAddr::new(ip, self.target.port)),
            (None, Err(_)) => SocksTarget::Domain(&self.target.host, self.target.port),
        };

        let mut framed = Framed::new(stream, SocksCodec::new());
        framed
            .send(SocksRequest::Greeting)
            .map_err(|e| self.handshake_error(proxy, e))?;

        self.proxy_reply(&mut framed, proxy)?;
        framed
            .send(SocksRequest::Connect(target))
            .map_err(|e| self.handshake_error(proxy, e))?;

        self.proxy_reply(&mut framed, proxy)?;
        debug!(%proxy, ?target, "SOCKS5 connection established");
        self.handed_over(framed, proxy)
    }

    fn proxy_reply<C>(
        &self,
        framed: &mut Framed<Box<dyn NetworkStream>, C>,
        proxy: &Proxy,
    ) -> Result<C::Item, RequestError>
    where
        C: Decoder<Error = wscat_codec::Error>,
    {
        match framed.receive() {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => Err(self.proxy_error(proxy, "connection closed during handshake".to_owned())),
            Err(e) => Err(self.handshake_error(proxy, e)),
        }
    }

    /// Returns the stream once a proxy handshake is over, making sure the proxy sent nothing past its reply.
    fn handed_over<C>(
        &self,
        framed: Framed<Box<dyn NetworkStream>, C>,
        proxy: &Proxy,
    ) -> Result<Box<dyn NetworkStream>, RequestError> {
        let (stream, leftover) = framed.into_parts();
        if !leftover.is_empty() {
            return Err(self.proxy_error(proxy, "unexpected data after handshake reply".to_owned()));
        }

        Ok(stream)
    }

    fn proxy_error(&self, proxy: &Proxy, message: String) -> RequestError {
        RequestError::Proxy {
            proxy: proxy.to_string(),
            message,
        }
    }

    fn handshake_error(&self, proxy: &Proxy, e: wscat_codec::Error) -> RequestError {
        match e.downcast::<io::Error>() {
            Ok(e) => self.io_error(*e),
            Err(e) => self.proxy_error(proxy, e.to_string()),
        }
    }

    fn tls_error(&self, domain: &str, failure: HandshakeFailure) -> RequestError {
        match failure {
            HandshakeFailure::TimedOut => RequestError::Timeout(self.timeout.as_secs()),
            HandshakeFailure::Failed(message) => RequestError::Tls {
                domain: domain.to_owned(),
                message,
            },
        }
    }

    fn io_error(&self, e: io::Error) -> RequestError {
        if net::is_timeout(&e) {
            RequestError::Timeout(self.timeout.as_secs())
        } else {
            RequestError::Io(e)
        }
    }

    fn wire_error(&self, e: wscat_codec::Error) -> RequestError {
        match e.downcast::<io::Error>() {
            Ok(e) => self.io_error(*e),
            Err(e) => RequestError::Protocol(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor, Read, Write};
    use std::str;

    use structopt::StructOpt;

    use crate::client::{ResponseSink, Session};
    use crate::proxy::Proxy;
    use crate::{Config, RequestError};

    pub struct ReadWritePair<R, W>(pub R, pub W);

    impl<R: Read, W> Read for ReadWritePair<R, W> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl<R, W: Write> Write for ReadWritePair<R, W> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.1.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.1.flush()
        }
    }

    #[derive(Default)]
    struct Capture {
        head: Vec<u8>,
        body: Vec<u8>,
    }

    impl ResponseSink for Capture {
        fn header(&mut self, line: &[u8]) -> io::Result<()> {
            self.head.extend_from_slice(line);
            Ok(())
        }

        fn body(&mut self, data: &[u8]) -> io::Result<()> {
            self.body.extend_from_slice(data);
            Ok(())
        }
    }

    struct BrokenPipe;

    impl ResponseSink for BrokenPipe {
        fn header(&mut self, _line: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn body(&mut self, _data: &[u8]) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    static RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
                             Content-Length: 5\r\n\
                             \r\n\
                             hello";

    fn session(args: &[&str], proxy: Option<&str>) -> Session {
        let config = Config::from_iter_safe(Some("wscat").into_iter().chain(args.iter().copied())).unwrap();
        Session::new(&config, proxy.and_then(Proxy::parse)).unwrap()
    }

    fn exchange(session: &Session, body: &[u8], response: &str) -> (String, Capture, Result<(), RequestError>) {
        let mut input = Cursor::new(response);
        let mut output = Vec::new();
        let mut capture = Capture::default();
        let result = session.perform_on(ReadWritePair(&mut input, &mut output), body, &mut capture);
        (String::from_utf8_lossy(&output).into_owned(), capture, result)
    }

    #[test]
    fn can_perform_on() {
        let session = session(&["ws://localhost:8000/stream?query"], None);
        let (request, capture, result) = exchange(&session, b"hello", RESPONSE);
        result.unwrap();

        assert_eq!(
            "POST /stream?query HTTP/1.1\r\n\
             Host: localhost:8000\r\n\
             Accept: */*\r\n\
             wscat-protocol\r\n\
             Content-Length: 5\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Connection: close\r\n\
             \r\n\
             hello",
            request
        );

        assert_eq!("HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\n", str::from_utf8(&capture.head).unwrap());
        assert_eq!(b"hello", &capture.body[..]);
    }

    #[test]
    fn default_port_is_left_out_of_host_header() {
        let session = session(&["wss://example.com/"], None);
        let (request, _, result) = exchange(&session, b"x", RESPONSE);
        result.unwrap();
        assert!(request.contains("\r\nHost: example.com\r\n"));
    }

    #[test]
    fn deflate_and_custom_protocol() {
        let session = session(&["-z", "-p", "Sec-WebSocket-Protocol: chat", "ws://localhost/"], None);
        let (request, _, result) = exchange(&session, b"x", RESPONSE);
        result.unwrap();

        assert_eq!(1, request.matches("Accept-Encoding: deflate\r\n").count());
        assert!(request.contains("\r\nSec-WebSocket-Protocol: chat\r\n"));
        assert_eq!(
            vec!["Accept-Encoding: deflate", "Sec-WebSocket-Protocol: chat"],
            session.headers().lines()
        );
    }

    #[test]
    fn insecure_applies_to_target_only() {
        let insecure = session(&["-k", "wss://example.com/"], Some("https://proxy:8443"));
        assert!(insecure.tls.is_insecure());
        assert!(!insecure.proxy_tls.as_ref().unwrap().is_insecure());

        let strict = session(&["wss://example.com/"], None);
        assert!(!strict.tls.is_insecure());
        assert!(strict.proxy_tls.is_none());
    }

    #[test]
    fn headers_are_identical_for_every_request() {
        let session = session(&["-z", "ws://localhost/"], None);
        let (first, _, _) = exchange(&session, b"one", RESPONSE);
        let (second, _, _) = exchange(&session, b"two", RESPONSE);
        let head = |request: &str| request.split("\r\n\r\n").next().unwrap().replace("Content-Length: 3", "");
        assert_eq!(head(&first), head(&second));
    }

    #[test]
    fn body_with_zero_bytes_is_not_truncated() {
        let session = session(&["ws://localhost/"], None);
        let (request, _, result) = exchange(&session, b"a\0b\0", RESPONSE);
        result.unwrap();

        assert!(request.contains("Content-Length: 4\r\n"));
        assert!(request.ends_with("\r\n\r\na\0b\0"));
    }

    #[test]
    fn forwards_through_http_proxy() {
        let session = session(&["ws://example.com:8080/chat?room=1"], Some("http://proxy:3128"));
        let (request, _, result) = exchange(&session, b"x", RESPONSE);
        result.unwrap();
        assert!(request.starts_with("POST http://example.com:8080/chat?room=1 HTTP/1.1\r\nHost: example.com:8080\r\n"));
    }

    #[test]
    fn socks_proxy_uses_origin_form() {
        let session = session(&["ws://example.com/chat"], Some("socks5h://proxy"));
        let (request, _, result) = exchange(&session, b"x", RESPONSE);
        result.unwrap();
        assert!(request.starts_with("POST /chat HTTP/1.1\r\n"));
    }

    #[test]
    fn malformed_response_is_a_protocol_error() {
        let session = session(&["ws://localhost/"], None);
        let (_, _, result) = exchange(&session, b"x", "SPDY/3 200 OK\r\n\r\n");
        assert!(matches!(result, Err(RequestError::Protocol(_))));
    }

    #[test]
    fn empty_reply_is_a_protocol_error() {
        let session = session(&["ws://localhost/"], None);
        let (_, _, result) = exchange(&session, b"x", "");
        assert!(matches!(result, Err(RequestError::Protocol(_))));
    }

    #[test]
    fn sink_failure_is_a_write_error() {
        let session = session(&["ws://localhost/"], None);
        let mut input = Cursor::new(RESPONSE);
        let mut output = Vec::new();
        let result = session.perform_on(ReadWritePair(&mut input, &mut output), b"x", &mut BrokenPipe);
        assert!(matches!(result, Err(RequestError::Write(_))));
    }
}
