use std::collections::HashMap;
use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::RequestError;

struct Entry {
    resolved_at: Instant,
    addrs: Vec<SocketAddr>,
}

/// Remembers resolved addresses for a fixed lifetime. A lifetime of zero disables caching.
pub struct DnsCache {
    ttl: Duration,
    entries: HashMap<(String, u16), Entry>,
}

fn lookup(host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
    Ok((host, port).to_socket_addrs()?.collect())
}

impl DnsCache {
    pub fn new(ttl: Duration) -> Self {
        DnsCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn resolve(&mut self, host: &str, port: u16) -> Result<Vec<SocketAddr>, RequestError> {
        self.resolve_with(host, port, Instant::now(), lookup)
    }

    fn resolve_with<F>(
        &mut self,
        host: &str,
        port: u16,
        now: Instant,
        lookup: F,
    ) -> Result<Vec<SocketAddr>, RequestError>
    where
        F: FnOnce(&str, u16) -> io::Result<Vec<SocketAddr>>,
    {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(vec![SocketAddr::new(ip, port)]);
        }

        let key = (host.to_owned(), port);
        if let Some(entry) = self.entries.get(&key) {
            if now.duration_since(entry.resolved_at) < self.ttl {
                trace!(host, port, "DNS cache hit");
                return Ok(entry.addrs.clone());
            }
        }

        let addrs = lookup(host, port).map_err(|source| RequestError::Resolve {
            host: host.to_owned(),
            source,
        })?;

        if addrs.is_empty() {
            return Err(RequestError::Resolve {
                host: host.to_owned(),
                source: io::Error::new(io::ErrorKind::NotFound, "no addresses found"),
            });
        }

        debug!(host, port, addrs = ?addrs, "resolved");

        if self.ttl > Duration::from_secs(0) {
            self.entries.insert(
                key,
                Entry {
                    resolved_at: now,
                    addrs: addrs.clone(),
                },
            );
        } else {
            self.entries.remove(&key);
        }

        Ok(addrs)
    }
}
