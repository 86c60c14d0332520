//! Connection transport: plain TCP or TLS-wrapped TCP.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use sqlwire_core::{Error, ErrorKind, Result};

#[cfg(feature = "tls")]
use crate::tls::TlsStream;

/// The duplex byte stream a connection talks over.
///
/// Starts out plain; the handshake may swap it for a TLS-wrapped stream in
/// place before credentials are sent.
pub enum Stream {
    /// Plain TCP stream
    Plain(TcpStream),
    /// TLS-wrapped TCP stream
    #[cfg(feature = "tls")]
    Tls(Box<TlsStream<TcpStream>>),
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stream::Plain(_) => f.write_str("Stream::Plain"),
            #[cfg(feature = "tls")]
            Stream::Tls(_) => f.write_str("Stream::Tls"),
        }
    }
}

impl Stream {
    /// The underlying TCP socket.
    pub fn socket(&self) -> &TcpStream {
        match self {
            Stream::Plain(s) => s,
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.get_ref(),
        }
    }

    /// Set the read timeout for subsequent socket reads.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket()
            .set_read_timeout(timeout)
            .map_err(|e| Error::from_io(e, "failed to set read timeout"))
    }

    /// Set the write timeout for subsequent socket writes.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket()
            .set_write_timeout(timeout)
            .map_err(|e| Error::from_io(e, "failed to set write timeout"))
    }

    /// Shut down both directions of the socket. Errors are ignored: this
    /// runs on already-failed connections.
    pub fn shutdown(&self) {
        let _ = self.socket().shutdown(Shutdown::Both);
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.flush(),
        }
    }
}

/// Resolve `host:port` and open a TCP connection within `timeout`.
///
/// Resolution failures and unreachable peers are classified directly to
/// connection-class errors; no server ERR packet exists at this point.
pub fn connect_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addrs: Vec<_> = (host, port)
        .to_socket_addrs()
        .map_err(|e| {
            Error::new(
                ErrorKind::Connection,
                format!("failed to resolve {host}:{port}: {e}"),
            )
            .with_source(e)
        })?
        .collect();

    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_nodelay(true).ok();
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(match last_err {
        Some(e) => Error::from_io(e, &format!("failed to connect to {host}:{port}")),
        None => Error::new(
            ErrorKind::Connection,
            format!("no addresses resolved for {host}:{port}"),
        ),
    })
}
