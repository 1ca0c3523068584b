//! Wraps a raw TCP (or TLS) connection behind a shared, interior-mutability stream handle.
//!
//! Read and write paths use independent locks so a WebSocket connection's background reader
//! thread and the application thread sending frames never contend with each other (see the
//! WebSocket supervisor in `websocket/supervisor.rs`).

use crate::util::unwrap_poison;
use std::fmt::Debug;
use std::io;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use unowned_buf::{UnownedReadBuffer, UnownedWriteBuffer};

/// A connection to a peer: read, write, and addressing, safe to use from more than one thread
/// concurrently (though not to call `read`/`write` from two threads at once on the same side).
pub trait ConnectionStream: ConnectionStreamRead + ConnectionStreamWrite {
  /// A new handle referring to the same underlying connection.
  fn try_clone(&self) -> Box<dyn ConnectionStream>;
  /// The remote peer's address, for logging.
  fn peer_addr(&self) -> io::Result<String>;
  /// Shuts down both halves of the underlying socket, unblocking any in-progress read. Used to
  /// force-close a WebSocket connection when its endpoint is torn down.
  fn shutdown(&self) -> io::Result<()>;
}

/// The read half of a [`ConnectionStream`]. Buffers internally so `read_until`/`read_exact` can
/// be mixed freely without losing bytes.
pub trait ConnectionStreamRead: Send + Sync + Debug {
  /// Reads at least one byte into `buf`, unless at EOF.
  fn read(&self, buf: &mut [u8]) -> io::Result<usize>;
  /// Reads until `buf.len()` bytes have been read or an error/EOF occurs.
  fn read_exact(&self, buf: &mut [u8]) -> io::Result<()>;
  /// Reads until `end` is seen or `limit` bytes have been buffered, appending to `buf`.
  fn read_until(&self, end: u8, limit: usize, buf: &mut Vec<u8>) -> io::Result<usize>;
  /// Sets a timeout for subsequent reads; `None` blocks indefinitely.
  fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()>;
}

/// The write half of a [`ConnectionStream`].
pub trait ConnectionStreamWrite: Send + Sync + Debug {
  /// Writes `buf`, returning the number of bytes actually written.
  fn write(&self, buf: &[u8]) -> io::Result<usize>;
  /// Writes all of `buf`.
  fn write_all(&self, buf: &[u8]) -> io::Result<()>;
  /// Flushes any buffered output.
  fn flush(&self) -> io::Result<()>;
  /// Sets a timeout for subsequent writes; `None` blocks indefinitely.
  fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()>;
}

/// A raw TCP connection or a `rustls`-wrapped TLS connection, type-erased behind the traits
/// above so the dispatch pipeline and WebSocket supervisor don't need to care which transport
/// accepted the connection.
#[derive(Debug, Clone)]
pub enum Transport {
  /// Plain TCP.
  Plain(PlainStream),
  /// TLS over TCP.
  #[cfg(feature = "tls")]
  Tls(crate::tls::TlsStream),
}

impl Transport {
  /// The peer's address, for logging.
  pub fn peer_addr(&self) -> io::Result<String> {
    match self {
      Transport::Plain(s) => s.peer_addr(),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.peer_addr(),
    }
  }

  /// A new handle to the same connection.
  pub fn try_clone(&self) -> Box<dyn ConnectionStream> {
    match self {
      Transport::Plain(s) => Box::new(s.clone()),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => Box::new(s.clone()),
    }
  }

  /// Shuts down both halves of the underlying socket.
  pub fn shutdown(&self) -> io::Result<()> {
    match self {
      Transport::Plain(s) => s.shutdown(),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.shutdown(),
    }
  }
}

impl ConnectionStreamRead for Transport {
  fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
    match self {
      Transport::Plain(s) => s.read(buf),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.read(buf),
    }
  }
  fn read_exact(&self, buf: &mut [u8]) -> io::Result<()> {
    match self {
      Transport::Plain(s) => s.read_exact(buf),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.read_exact(buf),
    }
  }
  fn read_until(&self, end: u8, limit: usize, buf: &mut Vec<u8>) -> io::Result<usize> {
    match self {
      Transport::Plain(s) => s.read_until(end, limit, buf),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.read_until(end, limit, buf),
    }
  }
  fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    match self {
      Transport::Plain(s) => s.set_read_timeout(dur),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.set_read_timeout(dur),
    }
  }
}

impl ConnectionStreamWrite for Transport {
  fn write(&self, buf: &[u8]) -> io::Result<usize> {
    match self {
      Transport::Plain(s) => s.write(buf),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.write(buf),
    }
  }
  fn write_all(&self, buf: &[u8]) -> io::Result<()> {
    match self {
      Transport::Plain(s) => s.write_all(buf),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.write_all(buf),
    }
  }
  fn flush(&self) -> io::Result<()> {
    match self {
      Transport::Plain(s) => s.flush(),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.flush(),
    }
  }
  fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    match self {
      Transport::Plain(s) => s.set_write_timeout(dur),
      #[cfg(feature = "tls")]
      Transport::Tls(s) => s.set_write_timeout(dur),
    }
  }
}

/// A plain (non-TLS) TCP connection.
#[derive(Debug, Clone)]
pub struct PlainStream(Arc<PlainStreamInner>);

#[derive(Debug)]
struct PlainStreamInner {
  read_mutex: Mutex<UnownedReadBuffer<0x4000>>,
  write_mutex: Mutex<UnownedWriteBuffer<0x4000>>,
  stream: TcpStream,
}

impl PlainStream {
  /// Wraps an accepted `TcpStream`.
  pub fn new(stream: TcpStream) -> Self {
    PlainStream(Arc::new(PlainStreamInner {
      read_mutex: Mutex::new(UnownedReadBuffer::new()),
      write_mutex: Mutex::new(UnownedWriteBuffer::new()),
      stream,
    }))
  }

  fn peer_addr(&self) -> io::Result<String> {
    Ok(self.0.stream.peer_addr()?.to_string())
  }

  fn shutdown(&self) -> io::Result<()> {
    self.0.stream.shutdown(std::net::Shutdown::Both)
  }
}

impl ConnectionStreamRead for PlainStream {
  fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
    unwrap_poison(self.0.read_mutex.lock())?.read(&mut &self.0.stream, buf)
  }
  fn read_exact(&self, buf: &mut [u8]) -> io::Result<()> {
    unwrap_poison(self.0.read_mutex.lock())?.read_exact(&mut &self.0.stream, buf)
  }
  fn read_until(&self, end: u8, limit: usize, buf: &mut Vec<u8>) -> io::Result<usize> {
    unwrap_poison(self.0.read_mutex.lock())?.read_until_limit(&mut &self.0.stream, end, limit, buf)
  }
  fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    self.0.stream.set_read_timeout(dur)
  }
}

impl ConnectionStreamWrite for PlainStream {
  fn write(&self, buf: &[u8]) -> io::Result<usize> {
    unwrap_poison(self.0.write_mutex.lock())?.write(&mut &self.0.stream, buf)
  }
  fn write_all(&self, buf: &[u8]) -> io::Result<()> {
    unwrap_poison(self.0.write_mutex.lock())?.write_all(&mut &self.0.stream, buf)
  }
  fn flush(&self) -> io::Result<()> {
    unwrap_poison(self.0.write_mutex.lock())?.flush(&mut &self.0.stream)
  }
  fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    self.0.stream.set_write_timeout(dur)
  }
}

impl ConnectionStream for Transport {
  fn try_clone(&self) -> Box<dyn ConnectionStream> {
    Transport::try_clone(self)
  }
  fn peer_addr(&self) -> io::Result<String> {
    Transport::peer_addr(self)
  }
  fn shutdown(&self) -> io::Result<()> {
    Transport::shutdown(self)
  }
}
