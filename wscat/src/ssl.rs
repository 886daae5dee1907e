use std::error;
use std::io;

use crate::net;

#[cfg(all(feature = "ssl-native-tls", feature = "ssl-openssl"))]
compile_error!("Features ssl-native-tls and ssl-openssl can't be used at the same time");

/// Why a TLS handshake did not complete.
#[derive(Debug)]
pub enum HandshakeFailure {
    /// The deadline passed while waiting for the peer.
    TimedOut,
    /// The handshake failed, for instance because the certificate did not verify.
    Failed(String),
}

/// Returns `true` if `e`, or anything in its chain of sources, is an I/O timeout.
fn caused_by_timeout(e: &(dyn error::Error + 'static)) -> bool {
    let mut next = Some(e);
    while let Some(e) = next {
        if e.downcast_ref::<io::Error>().map_or(false, net::is_timeout) {
            return true;
        }

        next = e.source();
    }

    false
}

#[cfg(feature = "ssl-native-tls")]
mod inner {
    use std::io::{Read, Write};

    use native_tls::{HandshakeError, TlsConnector, TlsStream};

    use super::{caused_by_timeout, HandshakeFailure};
    use crate::Error;

    pub struct Connector {
        cx: TlsConnector,
        insecure: bool,
    }

    impl Connector {
        pub fn new(insecure: bool) -> Result<Self, Error> {
            let mut builder = TlsConnector::builder();
            if insecure {
                builder.danger_accept_invalid_certs(true);
                builder.danger_accept_invalid_hostnames(true);
            }

            let cx = builder.build().map_err(|e| Error::Init(e.to_string()))?;
            Ok(Connector { cx, insecure })
        }

        pub fn is_insecure(&self) -> bool {
            self.insecure
        }

        pub fn wrap<S: Read + Write>(&self, domain: &str, stream: S) -> Result<TlsStream<S>, HandshakeFailure> {
            self.cx.connect(domain, stream).map_err(|e| match e {
                // Blocking sockets only report WouldBlock once a read or write timeout expires.
                HandshakeError::WouldBlock(_) => HandshakeFailure::TimedOut,
                HandshakeError::Failure(e) if caused_by_timeout(&e) => HandshakeFailure::TimedOut,
                HandshakeError::Failure(e) => HandshakeFailure::Failed(e.to_string()),
            })
        }
    }
}

#[cfg(feature = "ssl-openssl")]
mod inner {
    use std::fmt;
    use std::io::{Read, Write};

    use openssl::ssl::{ErrorCode, SslConnector, SslMethod, SslStream, SslVerifyMode};

    use super::{caused_by_timeout, HandshakeFailure};
    use crate::Error;

    fn failed(e: impl fmt::Display) -> HandshakeFailure {
        HandshakeFailure::Failed(e.to_string())
    }

    pub struct Connector {
        cx: SslConnector,
        insecure: bool,
    }

    impl Connector {
        pub fn new(insecure: bool) -> Result<Self, Error> {
            let mut builder = SslConnector::builder(SslMethod::tls()).map_err(|e| Error::Init(e.to_string()))?;
            if insecure {
                builder.set_verify(SslVerifyMode::NONE);
            }

            Ok(Connector {
                cx: builder.build(),
                insecure,
            })
        }

        pub fn is_insecure(&self) -> bool {
            self.insecure
        }

        pub fn wrap<S: Read + Write>(&self, domain: &str, stream: S) -> Result<SslStream<S>, HandshakeFailure> {
            let mut config = self.cx.configure().map_err(failed)?;
            config.set_verify_hostname(!self.insecure);

            let ssl = config.into_ssl(domain).map_err(failed)?;
            let mut stream = SslStream::new(ssl, stream).map_err(failed)?;
            stream.connect().map_err(|e| {
                let stalled = e.code() == ErrorCode::WANT_READ || e.code() == ErrorCode::WANT_WRITE;
                if stalled || caused_by_timeout(&e) {
                    HandshakeFailure::TimedOut
                } else {
                    failed(e)
                }
            })?;

            Ok(stream)
        }
    }
}

#[cfg(not(any(feature = "ssl-native-tls", feature = "ssl-openssl")))]
mod inner {
    use std::io::{Read, Write};

    use super::HandshakeFailure;
    use crate::Error;

    pub struct Connector {
        insecure: bool,
    }

    impl Connector {
        pub fn new(insecure: bool) -> Result<Self, Error> {
            Ok(Connector { insecure })
        }

        pub fn is_insecure(&self) -> bool {
            self.insecure
        }

        pub fn wrap<S: Read + Write>(&self, _domain: &str, _stream: S) -> Result<S, HandshakeFailure> {
            Err(HandshakeFailure::Failed("TLS support was not compiled in".to_owned()))
        }
    }
}

pub use self::inner::*;
