//! Proxy selection.
//!
//! Only `http_proxy` is consulted for `ws://` targets and only `https_proxy` for `wss://` targets. Other targets never
//! use a proxy.

use std::fmt;

use tracing::{debug, warn};
use url::{Host, Url};

/// How `wscat` talks to a proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProxyKind {
    /// A plain HTTP proxy. Clear-text requests are forwarded; TLS targets are reached through `CONNECT`.
    Http,
    /// An HTTP proxy reached over TLS.
    Https,
    /// A SOCKS5 proxy. Target names are resolved locally.
    Socks5,
    /// A SOCKS5 proxy that resolves target names itself.
    Socks5Hostname,
}

const SCHEMES: [(&str, ProxyKind); 4] = [
    ("http://", ProxyKind::Http),
    ("https://", ProxyKind::Https),
    ("socks5://", ProxyKind::Socks5),
    ("socks5h://", ProxyKind::Socks5Hostname),
];

impl ProxyKind {
    fn default_port(self) -> u16 {
        match self {
            ProxyKind::Https => 443,
            _ => 1080,
        }
    }

    /// Returns `true` for the proxy kinds that speak HTTP.
    pub fn is_http(self) -> bool {
        matches!(self, ProxyKind::Http | ProxyKind::Https)
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProxyKind::Http => "HTTP",
            ProxyKind::Https => "HTTPS",
            ProxyKind::Socks5 => "SOCKS5",
            ProxyKind::Socks5Hostname => "SOCKS5h",
        };

        f.write_str(s)
    }
}

/// A proxy to send every request through.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proxy {
    kind: ProxyKind,
    host: String,
    port: u16,
}

fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn parse_authority(authority: &str) -> Option<(String, Option<u16>)> {
    let authority = authority.split(|c| c == '/' || c == '?' || c == '#').next().unwrap_or("");
    let authority = match authority.rfind('@') {
        Some(i) => {
            warn!("ignoring credentials in proxy URL");
            &authority[i + 1..]
        }
        None => authority,
    };

    if authority.is_empty() {
        return None;
    }

    // A scheme with no default port, so that an explicit port is always kept.
    let url = Url::parse(&format!("proxy://{}", authority)).ok()?;
    let host = match url.host()? {
        Host::Domain(domain) => domain.to_owned(),
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    };

    if host.is_empty() {
        return None;
    }

    Some((host, url.port()))
}

impl Proxy {
    /// Parses a proxy URL such as `socks5h://127.0.0.1:1080`.
    ///
    /// The scheme is matched case-insensitively against `http://`, `https://`, `socks5://` and `socks5h://`, in that
    /// order. Anything else, or a URL with no host after the scheme, yields `None`.
    pub fn parse(url: &str) -> Option<Self> {
        let (prefix, kind) = SCHEMES
            .iter()
            .copied()
            .find(|(prefix, _)| starts_with_ignore_ascii_case(url, prefix))?;

        let (host, port) = parse_authority(&url[prefix.len()..])?;
        Some(Proxy {
            kind,
            host,
            port: port.unwrap_or_else(|| kind.default_port()),
        })
    }

    /// Returns how to talk to this proxy.
    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    /// Returns the proxy's host name or address, without brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the proxy's port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Picks the proxy for `target`: `http_proxy` for `ws://` targets, `https_proxy` for `wss://` targets, none otherwise.
pub fn select(target: &Url, http_proxy: Option<&str>, https_proxy: Option<&str>) -> Option<Proxy> {
    let candidate = match target.scheme() {
        "ws" => http_proxy,
        "wss" => https_proxy,
        _ => None,
    }?;

    let proxy = Proxy::parse(candidate);
    if proxy.is_none() {
        debug!(proxy = candidate, "proxy URL not recognised; connecting directly");
    }

    proxy
}
