//! A blocking companion client: plain HTTP verbs plus a WebSocket client with a background
//! reader thread. Layered as a small convenience on top of the core transport/frame types
//! rather than baked into the core server, keeping blocking helpers out of the core traits.
//!
//! The TLS client path accepts any server certificate it's offered, which is fine for talking
//! to this crate's own TLS listener in tests but not a substitute for a real HTTP client in
//! production: a host program that needs certificate validation should bring its own client.

use crate::error::{ClientError, ConfigError, Error, HandlerError, RequestHeadError, Result};
use crate::http::headers::Headers;
use crate::http::method::Method;
use crate::http::status::StatusCode;
use crate::stream::{ConnectionStreamRead, ConnectionStreamWrite};
use crate::websocket::frame::{Frame, Opcode};
use crate::websocket::message::Message;
use crate::{trace_log, warn_log};
use base64::prelude::{Engine, BASE64_STANDARD};
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use unowned_buf::UnownedReadBuffer;

#[cfg(feature = "tls")]
use rustls::{ClientConfig, ClientConnection, StreamOwned};

const MAX_HEAD_LINE: usize = 0x4000;

struct Target {
  secure: bool,
  host: String,
  port: u16,
  path: String,
}

fn parse_target(url: &str) -> Result<Target> {
  let (scheme, rest) = url.split_once("://").ok_or_else(|| Error::from(ConfigError::InvalidAddress(url.to_string())))?;
  let secure = match scheme {
    "http" | "ws" => false,
    "https" | "wss" => true,
    other => return Err(Error::from(ConfigError::UnsupportedScheme(other.to_string()))),
  };
  let (host_port, path) = match rest.find('/') {
    Some(index) => (&rest[..index], rest[index..].to_string()),
    None => (rest, "/".to_string()),
  };
  let (host, port) = match host_port.rsplit_once(':') {
    Some((host, port)) => {
      let port = port.parse::<u16>().map_err(|_| Error::from(ConfigError::InvalidAddress(url.to_string())))?;
      (host.to_string(), port)
    }
    None => (host_port.to_string(), if secure { 443 } else { 80 }),
  };
  if host.is_empty() {
    return Err(Error::from(ConfigError::InvalidAddress(url.to_string())));
  }
  Ok(Target { secure, host, port, path })
}

enum ClientStream {
  Plain(TcpStream),
  #[cfg(feature = "tls")]
  Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl ClientStream {
  fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    match self {
      ClientStream::Plain(s) => s.set_read_timeout(dur),
      #[cfg(feature = "tls")]
      ClientStream::Tls(s) => s.get_ref().set_read_timeout(dur),
    }
  }
  fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    match self {
      ClientStream::Plain(s) => s.set_write_timeout(dur),
      #[cfg(feature = "tls")]
      ClientStream::Tls(s) => s.get_ref().set_write_timeout(dur),
    }
  }
}

impl Read for ClientStream {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    match self {
      ClientStream::Plain(s) => s.read(buf),
      #[cfg(feature = "tls")]
      ClientStream::Tls(s) => s.read(buf),
    }
  }
}

impl Write for ClientStream {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    match self {
      ClientStream::Plain(s) => s.write(buf),
      #[cfg(feature = "tls")]
      ClientStream::Tls(s) => s.write(buf),
    }
  }
  fn flush(&mut self) -> io::Result<()> {
    match self {
      ClientStream::Plain(s) => s.flush(),
      #[cfg(feature = "tls")]
      ClientStream::Tls(s) => s.flush(),
    }
  }
}

#[cfg(feature = "tls")]
mod danger {
  use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
  use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
  use rustls::{DigitallySignedStruct, Error as TlsError, SignatureScheme};

  /// Accepts any server certificate. The client's transport hardening is out of scope for this
  /// crate; a host program that needs real certificate validation should bring its own client.
  #[derive(Debug)]
  pub(super) struct AcceptAnyCertificate;

  impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
      &self,
      _end_entity: &CertificateDer<'_>,
      _intermediates: &[CertificateDer<'_>],
      _server_name: &ServerName<'_>,
      _ocsp_response: &[u8],
      _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, TlsError> {
      Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
      &self,
      _message: &[u8],
      _cert: &CertificateDer<'_>,
      _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
      Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
      &self,
      _message: &[u8],
      _cert: &CertificateDer<'_>,
      _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
      Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
      vec![
        SignatureScheme::RSA_PKCS1_SHA256,
        SignatureScheme::RSA_PKCS1_SHA384,
        SignatureScheme::RSA_PKCS1_SHA512,
        SignatureScheme::ECDSA_NISTP256_SHA256,
        SignatureScheme::ECDSA_NISTP384_SHA384,
        SignatureScheme::ED25519,
        SignatureScheme::RSA_PSS_SHA256,
      ]
    }
  }
}

#[cfg(feature = "tls")]
fn connect_tls(tcp: TcpStream, host: &str) -> Result<ClientStream> {
  let config = ClientConfig::builder()
    .dangerous()
    .with_custom_certificate_verifier(Arc::new(danger::AcceptAnyCertificate))
    .with_no_client_auth();
  let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
    .map_err(|_| Error::from(ConfigError::InvalidAddress(host.to_string())))?;
  let connection = ClientConnection::new(Arc::new(config), server_name).map_err(|e| Error::Other(Box::new(e)))?;
  Ok(ClientStream::Tls(Box::new(StreamOwned::new(connection, tcp))))
}

fn connect_stream(target: &Target, timeout: Option<Duration>) -> Result<ClientStream> {
  let tcp = TcpStream::connect((target.host.as_str(), target.port))?;
  if let Some(timeout) = timeout {
    tcp.set_read_timeout(Some(timeout))?;
    tcp.set_write_timeout(Some(timeout))?;
  }
  if target.secure {
    #[cfg(feature = "tls")]
    {
      return connect_tls(tcp, &target.host);
    }
    #[cfg(not(feature = "tls"))]
    {
      return Err(Error::from(ConfigError::NotSecure));
    }
  }
  Ok(ClientStream::Plain(tcp))
}

struct ClientConnInner {
  read_buffer: UnownedReadBuffer<0x4000>,
  stream: ClientStream,
}

/// A shared handle to one client connection: buffered reads plus a write passthrough, behind
/// one lock (same single-lock tradeoff `tls::TlsStream` makes, since neither `TcpStream`'s TLS
/// wrapper nor a plain socket split cleanly into independently lockable halves here).
#[derive(Clone)]
struct ClientConn(Arc<Mutex<ClientConnInner>>);

impl ClientConn {
  fn new(stream: ClientStream) -> Self {
    ClientConn(Arc::new(Mutex::new(ClientConnInner { read_buffer: UnownedReadBuffer::new(), stream })))
  }
}

impl std::fmt::Debug for ClientConn {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str("ClientConn")
  }
}

impl ConnectionStreamRead for ClientConn {
  fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
    let mut guard = crate::util::unwrap_poison(self.0.lock())?;
    let ClientConnInner { read_buffer, stream } = &mut *guard;
    read_buffer.read(stream, buf)
  }
  fn read_exact(&self, buf: &mut [u8]) -> io::Result<()> {
    let mut guard = crate::util::unwrap_poison(self.0.lock())?;
    let ClientConnInner { read_buffer, stream } = &mut *guard;
    read_buffer.read_exact(stream, buf)
  }
  fn read_until(&self, end: u8, limit: usize, buf: &mut Vec<u8>) -> io::Result<usize> {
    let mut guard = crate::util::unwrap_poison(self.0.lock())?;
    let ClientConnInner { read_buffer, stream } = &mut *guard;
    read_buffer.read_until_limit(stream, end, limit, buf)
  }
  fn set_read_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    crate::util::unwrap_poison(self.0.lock())?.stream.set_read_timeout(dur)
  }
}

impl ConnectionStreamWrite for ClientConn {
  fn write(&self, buf: &[u8]) -> io::Result<usize> {
    crate::util::unwrap_poison(self.0.lock())?.stream.write(buf)
  }
  fn write_all(&self, buf: &[u8]) -> io::Result<()> {
    crate::util::unwrap_poison(self.0.lock())?.stream.write_all(buf)
  }
  fn flush(&self) -> io::Result<()> {
    crate::util::unwrap_poison(self.0.lock())?.stream.flush()
  }
  fn set_write_timeout(&self, dur: Option<Duration>) -> io::Result<()> {
    crate::util::unwrap_poison(self.0.lock())?.stream.set_write_timeout(dur)
  }
}

fn read_line(conn: &ClientConn) -> Result<String> {
  let mut buf = Vec::with_capacity(256);
  let count = conn.read_until(b'\n', MAX_HEAD_LINE, &mut buf)?;
  if count == 0 {
    return Err(Error::from_io_kind(io::ErrorKind::UnexpectedEof));
  }
  let line = String::from_utf8_lossy(&buf).to_string();
  let line = line.strip_suffix("\r\n").or_else(|| line.strip_suffix('\n')).unwrap_or(&line);
  Ok(line.to_string())
}

/// The response to a blocking HTTP request made through [`get`]/[`post`]/[`put`]/[`patch`]/
/// [`delete`].
#[derive(Debug)]
pub struct ClientResponse {
  status: StatusCode,
  headers: Headers,
  body: Vec<u8>,
}

impl ClientResponse {
  /// The response status code.
  pub fn status(&self) -> &StatusCode {
    &self.status
  }

  /// The response headers.
  pub fn headers(&self) -> &Headers {
    &self.headers
  }

  /// The response body.
  pub fn body(&self) -> &[u8] {
    &self.body
  }
}

/// Sends one request and blocks for the response. `timeout` applies to both connect and every
/// subsequent read/write.
pub fn request(method: Method, url: &str, headers: &[(&str, &str)], body: &[u8], timeout: Option<Duration>) -> Result<ClientResponse> {
  let target = parse_target(url)?;
  let conn = ClientConn::new(connect_stream(&target, timeout)?);

  let mut head = format!("{} {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n", method.as_str(), target.path, target.host);
  if !body.is_empty() {
    head.push_str(&format!("Content-Length: {}\r\n", body.len()));
  }
  for (name, value) in headers {
    head.push_str(&format!("{name}: {value}\r\n"));
  }
  head.push_str("\r\n");

  conn.write_all(head.as_bytes())?;
  if !body.is_empty() {
    conn.write_all(body)?;
  }
  conn.flush()?;

  let status_line = read_line(&conn)?;
  let mut parts = status_line.splitn(3, ' ');
  let _version = parts.next();
  let code = parts
    .next()
    .and_then(|raw| raw.parse::<u16>().ok())
    .ok_or_else(|| Error::from(RequestHeadError::MalformedRequestLine))?;
  let reason = parts.next().unwrap_or("").to_string();

  let mut response_headers = Headers::new();
  loop {
    let line = read_line(&conn)?;
    if line.is_empty() {
      break;
    }
    let (name, value) = line.split_once(':').ok_or_else(|| Error::from(RequestHeadError::MalformedHeaderLine))?;
    response_headers.add(name.trim(), value.trim());
  }

  if code != 200 {
    return Err(Error::from(HandlerError::with_message(StatusCode::from_u16(code), reason)));
  }

  let content_length: usize = match response_headers.get("Content-Length") {
    Some(raw) => raw
      .trim()
      .parse()
      .map_err(|_| Error::from(RequestHeadError::InvalidContentLength(raw.to_string())))?,
    None => return Err(Error::from(ClientError::MissingContentLength)),
  };
  let mut response_body = vec![0u8; content_length];
  if content_length > 0 {
    conn.read_exact(&mut response_body)?;
  }

  trace_log!("client request {method} {url} -> {code}");
  Ok(ClientResponse { status: StatusCode::from_u16(code), headers: response_headers, body: response_body })
}

/// Sends a blocking `GET`.
pub fn get(url: &str, headers: &[(&str, &str)], timeout: Option<Duration>) -> Result<ClientResponse> {
  request(Method::Get, url, headers, &[], timeout)
}

/// Sends a blocking `POST`.
pub fn post(url: &str, headers: &[(&str, &str)], body: &[u8], timeout: Option<Duration>) -> Result<ClientResponse> {
  request(Method::Post, url, headers, body, timeout)
}

/// Sends a blocking `PUT`.
pub fn put(url: &str, headers: &[(&str, &str)], body: &[u8], timeout: Option<Duration>) -> Result<ClientResponse> {
  request(Method::Put, url, headers, body, timeout)
}

/// Sends a blocking `PATCH`.
pub fn patch(url: &str, headers: &[(&str, &str)], body: &[u8], timeout: Option<Duration>) -> Result<ClientResponse> {
  request(Method::Patch, url, headers, body, timeout)
}

/// Sends a blocking `DELETE`.
pub fn delete(url: &str, headers: &[(&str, &str)], timeout: Option<Duration>) -> Result<ClientResponse> {
  request(Method::Delete, url, headers, &[], timeout)
}

fn masking_key() -> [u8; 4] {
  let mut key = [0u8; 4];
  let seed = crate::util::next_id().wrapping_mul(0x9E3779B97F4A7C15);
  key.copy_from_slice(&seed.to_le_bytes()[..4]);
  key
}

fn handshake_key() -> String {
  let mut nonce = [0u8; 16];
  let a = crate::util::next_id().wrapping_mul(0x9E3779B97F4A7C15).to_le_bytes();
  let b = crate::util::next_id().wrapping_mul(0xC2B2AE3D27D4EB4F).to_le_bytes();
  nonce[..8].copy_from_slice(&a);
  nonce[8..].copy_from_slice(&b);
  BASE64_STANDARD.encode(nonce)
}

/// Builds a [`WebSocketClient`], optionally installing `on_open`/`on_error`/`on_close`
/// callbacks before connecting.
#[derive(Default)]
pub struct WebSocketClientBuilder {
  on_open: Option<Box<dyn Fn() + Send + Sync>>,
  on_error: Option<Box<dyn Fn(&Error) + Send + Sync>>,
  on_close: Option<Box<dyn Fn() + Send + Sync>>,
  binary_mode: bool,
}

impl WebSocketClientBuilder {
  /// A builder with no callbacks installed.
  pub fn new() -> Self {
    WebSocketClientBuilder::default()
  }

  /// Installs a callback run once the handshake completes.
  pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
    self.on_open = Some(Box::new(f));
    self
  }

  /// Installs a callback run when the background reader thread hits an I/O or protocol error.
  pub fn on_error(mut self, f: impl Fn(&Error) + Send + Sync + 'static) -> Self {
    self.on_error = Some(Box::new(f));
    self
  }

  /// Installs a callback run once the connection closes (peer close or error).
  pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
    self.on_close = Some(Box::new(f));
    self
  }

  /// Frames outgoing messages as binary instead of text.
  pub fn binary_mode(mut self) -> Self {
    self.binary_mode = true;
    self
  }

  /// Connects to `url` (scheme `ws`/`wss`), performs the RFC 6455 handshake, and spawns the
  /// background reader thread.
  pub fn connect(self, url: &str, on_message: impl Fn(Message) + Send + Sync + 'static) -> Result<WebSocketClient> {
    let target = parse_target(url)?;
    let conn = ClientConn::new(connect_stream(&target, None)?);

    let key = handshake_key();
    let request = format!(
      "GET {} HTTP/1.1\r\nHost: {}\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: {key}\r\nSec-WebSocket-Version: 13\r\n\r\n",
      target.path, target.host,
    );
    conn.write_all(request.as_bytes())?;
    conn.flush()?;

    let status_line = read_line(&conn)?;
    if !status_line.contains(" 101 ") {
      return Err(Error::from(RequestHeadError::MalformedRequestLine));
    }

    let mut accept = None;
    loop {
      let line = read_line(&conn)?;
      if line.is_empty() {
        break;
      }
      if let Some((name, value)) = line.split_once(':') {
        if name.trim().eq_ignore_ascii_case("Sec-WebSocket-Accept") {
          accept = Some(value.trim().to_string());
        }
      }
    }

    if accept.as_deref() != Some(crate::websocket::accept_key(&key).as_str()) {
      return Err(Error::from(RequestHeadError::MalformedRequestLine));
    }

    if let Some(on_open) = &self.on_open {
      on_open();
    }

    let client = WebSocketClient { conn: conn.clone(), binary_mode: self.binary_mode };
    let on_error = self.on_error;
    let on_close = self.on_close;
    std::thread::spawn(move || run_reader(conn, on_message, on_error, on_close));
    Ok(client)
  }
}

fn run_reader(
  conn: ClientConn,
  on_message: impl Fn(Message) + Send + Sync + 'static,
  on_error: Option<Box<dyn Fn(&Error) + Send + Sync>>,
  on_close: Option<Box<dyn Fn() + Send + Sync>>,
) {
  const MAX_FRAME_PAYLOAD: u64 = 8 * 1024 * 1024;
  let mut pending: Vec<Frame> = Vec::new();

  loop {
    let frame = match Frame::read_from(&conn, MAX_FRAME_PAYLOAD) {
      Ok(frame) => frame,
      Err(Error::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
      Err(e) => {
        warn_log!("websocket client read error: {e}");
        if let Some(on_error) = &on_error {
          on_error(&e);
        }
        break;
      }
    };

    match frame.opcode() {
      Opcode::Ping => {
        let pong: Vec<u8> = Frame::new_masked(Opcode::Pong, Vec::new(), masking_key()).into();
        if conn.write_all(&pong).is_err() {
          break;
        }
        continue;
      }
      Opcode::Pong => continue,
      Opcode::Close => break,
      Opcode::Continuation if pending.is_empty() => break,
      _ => {}
    }

    let fin = frame.fin;
    pending.push(frame);
    if !fin {
      continue;
    }

    let frames = std::mem::take(&mut pending);
    let opcode = frames[0].opcode();
    let mut payload = Vec::with_capacity(frames.iter().map(|f| f.payload().len()).sum());
    for frame in frames {
      payload.extend_from_slice(frame.payload());
    }

    let message = match opcode {
      Opcode::Text => match String::from_utf8(payload) {
        Ok(text) => Message::Text(text),
        Err(_) => break,
      },
      Opcode::Binary => Message::Binary(payload),
      _ => break,
    };
    on_message(message);
  }

  if let Some(on_close) = on_close {
    on_close();
  }
}

/// A connected WebSocket client handle. Cloning shares the same underlying connection.
#[derive(Clone)]
pub struct WebSocketClient {
  conn: ClientConn,
  binary_mode: bool,
}

impl WebSocketClient {
  /// Connects with no callbacks but `on_message`. Shorthand for
  /// `WebSocketClientBuilder::new().connect(url, on_message)`.
  pub fn connect(url: &str, on_message: impl Fn(Message) + Send + Sync + 'static) -> Result<Self> {
    WebSocketClientBuilder::new().connect(url, on_message)
  }

  /// Sends a message, masked per RFC 6455 (client frames must be masked).
  pub fn send(&self, message: impl Into<Vec<u8>>) -> Result<()> {
    let opcode = if self.binary_mode { Opcode::Binary } else { Opcode::Text };
    let bytes: Vec<u8> = Frame::new_masked(opcode, message.into(), masking_key()).into();
    self.conn.write_all(&bytes)?;
    Ok(())
  }

  /// Sends a close frame. Does not wait for the server's close frame in return.
  pub fn close(&self) {
    let bytes: Vec<u8> = Frame::new_masked(Opcode::Close, Vec::new(), masking_key()).into();
    let _ = self.conn.write_all(&bytes);
  }
}
