use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use tracing::debug;

/// The point in time by which the current request must have finished.
#[derive(Clone, Copy, Debug)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Starts the clock. A zero `timeout` means no deadline.
    pub fn after(timeout: Duration) -> Self {
        let at = if timeout == Duration::from_secs(0) {
            None
        } else {
            Some(Instant::now() + timeout)
        };

        Deadline { at }
    }

    /// Returns the time left, `None` if there is no deadline, or a `TimedOut` error once it has passed.
    pub fn remaining(&self) -> io::Result<Option<Duration>> {
        let at = if let Some(at) = self.at {
            at
        } else {
            return Ok(None);
        };

        let now = Instant::now();
        if now >= at {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed"));
        }

        Ok(Some(at - now))
    }
}

/// A TCP connection whose reads and writes fail once the deadline passes.
#[derive(Debug)]
pub struct TimedStream {
    socket: TcpStream,
    deadline: Deadline,
}

impl TimedStream {
    pub fn new(socket: TcpStream, deadline: Deadline) -> Self {
        TimedStream { socket, deadline }
    }
}

impl Read for TimedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.set_read_timeout(self.deadline.remaining()?)?;
        self.socket.read(buf)
    }
}

impl Write for TimedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.socket.set_write_timeout(self.deadline.remaining()?)?;
        self.socket.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.socket.flush()
    }
}

/// Connects to the first of `addrs` that accepts, bounding each attempt by the deadline.
pub fn connect(addrs: &[SocketAddr], deadline: Deadline) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in addrs {
        let result = match deadline.remaining()? {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        };

        match result {
            Ok(socket) => {
                socket.set_nodelay(true)?;
                debug!(%addr, "connected");
                return Ok(socket);
            }
            Err(e) => {
                debug!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no addresses to connect to")))
}

/// Returns `true` for the error kinds a blocking socket reports when its timeout expires.
pub fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
