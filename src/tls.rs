//! TLS transport (`tls` feature): wraps an accepted `TcpStream` in a `rustls::StreamOwned` once
//! the handshake completes, exposed behind the same [`ConnectionStreamRead`]/
//! [`ConnectionStreamWrite`] split as the plain transport.
//!
//! `rustls::StreamOwned` does not support splitting a connection into independently lockable
//! read/write halves the way a raw `TcpStream` does, so unlike `PlainStream`, reads and writes
//! to a `TlsStream` serialize behind one lock (documented in `DESIGN.md`).

use crate::error::{Error, Result};
use crate::stream::{ConnectionStreamRead, ConnectionStreamWrite};
use crate::util::unwrap_poison;
use rustls::{ServerConfig, ServerConnection, StreamOwned};
use std::io;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use unowned_buf::UnownedReadBuffer;

/// A completed-handshake TLS connection.
#[derive(Debug, Clone)]
pub struct TlsStream(Arc<Mutex<TlsStreamInner>>, String);

struct TlsStreamInner {
  read_buffer: UnownedReadBuffer<0x4000>,
  stream: StreamOwned<ServerConnection, TcpStream>,
}

impl std::fmt::Debug for TlsStreamInner {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("TlsStreamInner")
  }
}

impl TlsStream {
  /// Completes a server-side TLS handshake on `tcp` using `config`.
  pub fn accept(tcp: TcpStream, config: Arc<ServerConfig>) -> Result<Self> {
    let peer_addr = tcp.peer_addr().map(|a| a.to_string()).unwrap_or_default();
    let connection = ServerConnection::new(config).map_err(|e| Error::Other(Box::new(e)))?;
    let stream = StreamOwned::new(connection, tcp);
    let inner = TlsStreamInner { read_buffer: UnownedReadBuffer::new(), stream };
    Ok(TlsStream(Arc::new(Mutex::new(inner)), peer_addr))
  }

  pub(crate) fn peer_addr(&self) -> io::Result<String> {
    Ok(self.1.clone())
  }

  pub(crate) fn shutdown(&self) -> io::Result<()> {
    crate::util::unwrap_poison(self.0.lock())?.stream.get_ref().shutdown(std::net::Shutdown::Both)
  }
}

/// Loads a certificate chain + private key pair from PEM files, for `ServerBuilder::with_tls`.
pub fn load_server_config(
  cert_path: impl AsRef<Path>,
  key_path: impl AsRef<Path>,
) -> Result<ServerConfig> {
  let cert_file = std::fs::File::open(cert_path)?;
  let mut cert_reader = io::BufReader::new(cert_file);
  let certs: std::result::Result<Vec<_>, _> = rustls_pemfile::certs(&mut cert_reader).collect();
  let certs = certs.map_err(Error::Io)?;

  let key_file = std::fs::File::open(key_path)?;
  let mut key_reader = io::BufReader::new(key_file);
  let key = rustls_pemfile::private_key(&mut key_reader)
    .map_err(Error::Io)?
    .ok_or_else(|| Error::Io(io::Error::new(io::ErrorKind::InvalidData, "no private key found in key file")))?;

  ServerConfig::builder()
    .with_no_client_auth()
    .with_single_cert(certs, key)
    .map_err(|e| Error::Other(Box::new(e)))
}

impl ConnectionStreamRead for TlsStream {
  fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
    let mut guard = unwrap_poison(self.0.lock())?;
    let TlsStreamInner { read_buffer, stream } = &mut *guard;
    read_buffer.read(stream, buf)
  }
  fn read_exact(&self, buf: &mut [u8]) -> io::Result<()> {
    let mut guard = unwrap_poison(self.0.lock())?;
    let TlsStreamInner { read_buffer, stream } = &mut *guard;
    read_buffer.read_exact(stream, buf)
  }
  fn read_until(&self, end: u8, limit: usize, buf: &mut Vec<u8>) -> io::Result<usize> {
    let mut guard = unwrap_poison(self.0.lock())?;
    let TlsStreamInner { read_buffer, stream } = &mut *guard;
    read_buffer.read_until_limit(stream, end, limit, buf)
  }
  fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    let guard = unwrap_poison(self.0.lock())?;
    guard.stream.get_ref().set_read_timeout(dur)
  }
}

impl ConnectionStreamWrite for TlsStream {
  fn write(&self, buf: &[u8]) -> io::Result<usize> {
    unwrap_poison(self.0.lock())?.stream.write(buf)
  }
  fn write_all(&self, buf: &[u8]) -> io::Result<()> {
    unwrap_poison(self.0.lock())?.stream.write_all(buf)
  }
  fn flush(&self) -> io::Result<()> {
    unwrap_poison(self.0.lock())?.stream.flush()
  }
  fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    let guard = unwrap_poison(self.0.lock())?;
    guard.stream.get_ref().set_write_timeout(dur)
  }
}
