//! The embeddable server: builder, route/directory/WebSocket registration, and the
//! per-connection accept-and-serve loop.
//!
//! The accept loop is one OS thread per listener; each accepted connection gets its own thread
//! running an HTTP/1.1 keep-alive loop, a synchronous, thread-per-connection model rather than
//! an async runtime.

use crate::dispatch::{self, Outcome};
use crate::error::{ConfigError, Error, HandlerError, Result};
use crate::http::method::Method;
use crate::http::request::{HttpVersion, Request, RequestHead};
use crate::http::response::Response;
use crate::http::status::StatusCode;
use crate::route::table::{Handler as RouteHandler, RouteTable};
use crate::stream::{ConnectionStreamRead, ConnectionStreamWrite, PlainStream, Transport};
use crate::token::Token;
use crate::websocket::connection::{Sender, WebSocketHandler};
use crate::websocket::supervisor::{Factory as WsFactory, WsEndpoint};
use crate::{debug_log, error_log, info_log, trace_log, warn_log};
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(feature = "tls")]
use rustls::ServerConfig;

/// Invoked when dispatch fails before a route handler runs (malformed request, I/O error).
pub type ErrorHandler = dyn Fn(&Error) -> Response + Send + Sync;
/// Invoked when no route, directory mount, or WebSocket endpoint matched the request.
pub type NotFoundHandler = dyn Fn(&Request) -> Response + Send + Sync;
/// A directory mount's serving closure.
pub type DirectoryHandler = dyn Fn(&Request) -> Response + Send + Sync;

struct DirectoryMount {
  prefix: String,
  handler: Arc<DirectoryHandler>,
}

fn fallback_error_handler(error: &Error) -> Response {
  error_log!("unhandled dispatch error: {error}");
  match error.as_handler_error() {
    Some(handler_error) => {
      let mut response = Response::new(*handler_error.status());
      if let Some(message) = handler_error.message() {
        response = response.with_reason(message.to_string());
      }
      response
    }
    None => Response::new(StatusCode::INTERNAL_SERVER_ERROR),
  }
}

fn fallback_not_found_handler(_request: &Request) -> Response {
  Response::new(StatusCode::NOT_FOUND)
}

struct Address {
  secure: bool,
  host: String,
  port: u16,
}

fn parse_address(addr: &str) -> Result<Address> {
  let (scheme, rest) = addr.split_once("://").ok_or_else(|| Error::from(ConfigError::InvalidAddress(addr.to_string())))?;
  let secure = match scheme {
    "http" | "ws" => false,
    "https" | "wss" => true,
    other => return Err(Error::from(ConfigError::UnsupportedScheme(other.to_string()))),
  };
  let host_port = rest.split('/').next().unwrap_or(rest);
  let (host, port) = match host_port.rsplit_once(':') {
    Some((host, port)) => {
      let port = port.parse::<u16>().map_err(|_| Error::from(ConfigError::InvalidAddress(addr.to_string())))?;
      (host.to_string(), port)
    }
    None => (host_port.to_string(), if secure { 443 } else { 80 }),
  };
  if host.is_empty() {
    return Err(Error::from(ConfigError::InvalidAddress(addr.to_string())));
  }
  Ok(Address { secure, host, port })
}

/// Builds a [`Server`]. Every `with_*` method validates eagerly and returns `Result<Self>`, so
/// misconfiguration is caught at the call site rather than surfacing later from `start()`.
pub struct ServerBuilder {
  max_head_buffer_size: usize,
  max_body_size: usize,
  connection_timeout: Option<Duration>,
  read_timeout: Option<Duration>,
  write_timeout: Option<Duration>,
  keep_alive_timeout: Option<Duration>,
  request_body_timeout: Option<Duration>,
  error_handler: Arc<ErrorHandler>,
  not_found_handler: Arc<NotFoundHandler>,
}

impl Default for ServerBuilder {
  fn default() -> Self {
    ServerBuilder {
      max_head_buffer_size: 0x2000,
      max_body_size: 10 * 1024 * 1024,
      connection_timeout: None,
      read_timeout: Some(Duration::from_secs(30)),
      write_timeout: Some(Duration::from_secs(30)),
      keep_alive_timeout: Some(Duration::from_secs(10)),
      request_body_timeout: Some(Duration::from_secs(30)),
      error_handler: Arc::new(fallback_error_handler),
      not_found_handler: Arc::new(fallback_not_found_handler),
    }
  }
}

impl ServerBuilder {
  /// A builder with the crate's default configuration.
  pub fn new() -> Self {
    ServerBuilder::default()
  }

  /// Overrides the buffer size used to read the request line and each header line. Rejects
  /// anything under `0x100`.
  pub fn with_max_head_buffer_size(mut self, size: usize) -> Result<Self> {
    if size < 0x100 {
      return Err(Error::from(ConfigError::InvalidAddress(format!("head buffer size {size} is too small"))));
    }
    self.max_head_buffer_size = size;
    Ok(self)
  }

  /// Overrides the maximum request body size this server will read before rejecting the
  /// request.
  pub fn with_max_body_size(mut self, size: usize) -> Result<Self> {
    self.max_body_size = size;
    Ok(self)
  }

  /// Overrides the accept-to-first-byte timeout. `None` blocks indefinitely.
  pub fn with_connection_timeout(mut self, timeout: Option<Duration>) -> Result<Self> {
    self.connection_timeout = timeout;
    Ok(self)
  }

  /// Overrides the per-read timeout applied while reading a request head.
  pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Result<Self> {
    self.read_timeout = timeout;
    Ok(self)
  }

  /// Overrides the per-write timeout applied while writing a response.
  pub fn with_write_timeout(mut self, timeout: Option<Duration>) -> Result<Self> {
    self.write_timeout = timeout;
    Ok(self)
  }

  /// Overrides how long an idle keep-alive connection waits for the next request line.
  pub fn with_keep_alive_timeout(mut self, timeout: Option<Duration>) -> Result<Self> {
    self.keep_alive_timeout = timeout;
    Ok(self)
  }

  /// Overrides the timeout applied while reading a request body.
  pub fn with_request_body_timeout(mut self, timeout: Option<Duration>) -> Result<Self> {
    self.request_body_timeout = timeout;
    Ok(self)
  }

  /// Overrides the handler invoked when dispatch fails before a route handler runs.
  pub fn with_error_handler(mut self, handler: impl Fn(&Error) -> Response + Send + Sync + 'static) -> Self {
    self.error_handler = Arc::new(handler);
    self
  }

  /// Overrides the handler invoked when no route, directory mount, or WebSocket endpoint
  /// matched the request.
  pub fn with_not_found_handler(mut self, handler: impl Fn(&Request) -> Response + Send + Sync + 'static) -> Self {
    self.not_found_handler = Arc::new(handler);
    self
  }

  /// Builds the server. It does not listen until [`Server::start`] is called.
  pub fn build(self) -> Arc<Server> {
    Arc::new(Server {
      routes: Mutex::new(RouteTable::new()),
      directories: Mutex::new(BTreeMap::new()),
      ws_endpoints: Mutex::new(HashMap::new()),
      error_handler: self.error_handler,
      not_found_handler: self.not_found_handler,
      max_head_buffer_size: self.max_head_buffer_size,
      max_body_size: self.max_body_size,
      connection_timeout: self.connection_timeout,
      read_timeout: self.read_timeout,
      write_timeout: self.write_timeout,
      keep_alive_timeout: self.keep_alive_timeout,
      request_body_timeout: self.request_body_timeout,
      #[cfg(feature = "tls")]
      tls_config: Mutex::new(None),
      port: Mutex::new(None),
      shutdown: AtomicBool::new(false),
      next_directory_id: AtomicU64::new(0),
    })
  }
}

/// An embeddable HTTP/1.1 + WebSocket server: a dynamic route table, directory mounts, and
/// WebSocket endpoints, all mutable at runtime via [`Token`]-scoped registration.
pub struct Server {
  routes: Mutex<RouteTable>,
  directories: Mutex<BTreeMap<u64, DirectoryMount>>,
  ws_endpoints: Mutex<HashMap<String, Arc<WsEndpoint>>>,
  error_handler: Arc<ErrorHandler>,
  not_found_handler: Arc<NotFoundHandler>,
  max_head_buffer_size: usize,
  max_body_size: usize,
  connection_timeout: Option<Duration>,
  read_timeout: Option<Duration>,
  write_timeout: Option<Duration>,
  keep_alive_timeout: Option<Duration>,
  request_body_timeout: Option<Duration>,
  #[cfg(feature = "tls")]
  tls_config: Mutex<Option<Arc<ServerConfig>>>,
  port: Mutex<Option<u16>>,
  shutdown: AtomicBool,
  next_directory_id: AtomicU64,
}

impl Server {
  pub(crate) fn routes(&self) -> &Mutex<RouteTable> {
    &self.routes
  }

  pub(crate) fn max_body_size(&self) -> usize {
    self.max_body_size
  }

  pub(crate) fn not_found_handler(&self) -> &Arc<NotFoundHandler> {
    &self.not_found_handler
  }

  pub(crate) fn match_directory(&self, path: &str) -> Option<Arc<DirectoryHandler>> {
    let directories = crate::util::unwrap_poison(self.directories.lock()).ok()?;
    directories.values().filter(|mount| path.starts_with(mount.prefix.as_str())).max_by_key(|mount| mount.prefix.len()).map(|mount| mount.handler.clone())
  }

  pub(crate) fn find_websocket_endpoint(&self, path: &str) -> Option<Arc<WsEndpoint>> {
    crate::util::unwrap_poison(self.ws_endpoints.lock()).ok()?.get(path).cloned()
  }

  /// Registers a route handler for `method`/`uri`. The route is active until the returned
  /// token is dropped.
  pub fn add_route(
    self: &Arc<Self>,
    method: Method,
    uri: &str,
    handler: impl Fn(&Request) -> std::result::Result<Response, HandlerError> + Send + Sync + 'static,
  ) -> Result<Token> {
    let handler: Arc<RouteHandler> = Arc::new(handler);
    let (id, base_uri) = crate::util::unwrap_poison(self.routes.lock())?.add(method.clone(), uri, handler)?;
    let server = Arc::downgrade(self);
    Ok(Token::new("route", move || {
      let Some(server) = server.upgrade() else { return };
      if let Ok(mut table) = crate::util::unwrap_poison(server.routes.lock()) {
        table.remove(&method, &base_uri, id);
      }
    }))
  }

  /// Mounts a filesystem subtree rooted at `root` under `uri_prefix`.
  pub fn add_directory(self: &Arc<Self>, uri_prefix: &str, root: impl Into<PathBuf>) -> Token {
    let handler: Arc<DirectoryHandler> = Arc::new(crate::directory::serve_directory(root, uri_prefix));
    let prefix = uri_prefix.strip_suffix('/').unwrap_or(uri_prefix).to_string();
    let id = self.next_directory_id.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut directories) = crate::util::unwrap_poison(self.directories.lock()) {
      directories.insert(id, DirectoryMount { prefix, handler });
    }
    let server = Arc::downgrade(self);
    Token::new("directory", move || {
      let Some(server) = server.upgrade() else { return };
      if let Ok(mut directories) = crate::util::unwrap_poison(server.directories.lock()) {
        directories.remove(&id);
      }
    })
  }

  fn add_websocket(
    self: &Arc<Self>,
    path: &str,
    binary_mode: bool,
    max_connections: usize,
    factory: impl Fn(Sender) -> Box<dyn WebSocketHandler> + Send + Sync + 'static,
  ) -> Token {
    let endpoint = Arc::new(WsEndpoint::new(binary_mode, max_connections, Arc::new(factory) as Arc<WsFactory>));
    if let Ok(mut endpoints) = crate::util::unwrap_poison(self.ws_endpoints.lock()) {
      endpoints.insert(path.to_string(), endpoint.clone());
    }
    let server = Arc::downgrade(self);
    let path = path.to_string();
    Token::new("websocket", move || {
      if let Some(server) = server.upgrade() {
        if let Ok(mut endpoints) = crate::util::unwrap_poison(server.ws_endpoints.lock()) {
          endpoints.remove(&path);
        }
      }
      // disposes every open connection on this endpoint: shuts down its socket, which
      // unblocks the connection's reader thread so it can unwind on its own.
      endpoint.close_all();
    })
  }

  /// Registers a text-mode WebSocket endpoint at the exact path `path`. `max_connections == 0`
  /// means unlimited; otherwise the endpoint answers upgrade requests past that count with
  /// `503 Service Unavailable`.
  pub fn add_text_websocket(
    self: &Arc<Self>,
    path: &str,
    max_connections: usize,
    factory: impl Fn(Sender) -> Box<dyn WebSocketHandler> + Send + Sync + 'static,
  ) -> Token {
    self.add_websocket(path, false, max_connections, factory)
  }

  /// Registers a binary-mode WebSocket endpoint at the exact path `path`.
  pub fn add_binary_websocket(
    self: &Arc<Self>,
    path: &str,
    max_connections: usize,
    factory: impl Fn(Sender) -> Box<dyn WebSocketHandler> + Send + Sync + 'static,
  ) -> Token {
    self.add_websocket(path, true, max_connections, factory)
  }

  /// Loads a certificate/key pair for TLS (`tls` feature). Must be called before [`Self::start`].
  #[cfg(feature = "tls")]
  pub fn add_certificate(&self, cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<()> {
    if crate::util::unwrap_poison(self.port.lock())?.is_some() {
      return Err(Error::from(ConfigError::AlreadyStarted));
    }
    let config = crate::tls::load_server_config(cert_path, key_path)?;
    *crate::util::unwrap_poison(self.tls_config.lock())? = Some(Arc::new(config));
    Ok(())
  }

  /// Binds `addr` (`scheme://host[:port]`, scheme one of `http`/`https`/`ws`/`wss`) and spawns
  /// the accept loop on a background thread.
  pub fn start(self: &Arc<Self>, addr: &str) -> Result<()> {
    let parsed = parse_address(addr)?;

    #[cfg(feature = "tls")]
    if parsed.secure && crate::util::unwrap_poison(self.tls_config.lock())?.is_none() {
      return Err(Error::from(ConfigError::NotSecure));
    }
    #[cfg(not(feature = "tls"))]
    if parsed.secure {
      return Err(Error::from(ConfigError::NotSecure));
    }

    let listener = TcpListener::bind((parsed.host.as_str(), parsed.port))?;
    let bound_port = listener.local_addr()?.port();
    *crate::util::unwrap_poison(self.port.lock())? = Some(bound_port);
    info_log!("listening on {}:{bound_port}", parsed.host);

    let server = self.clone();
    std::thread::spawn(move || server.accept_loop(listener, parsed.secure));
    Ok(())
  }

  /// The port this server is bound to, once [`Self::start`] has been called.
  pub fn port(&self) -> Result<u16> {
    crate::util::unwrap_poison(self.port.lock())?.ok_or_else(|| Error::from(ConfigError::NotStarted))
  }

  /// Signals the accept loop and every connection-serving thread to stop at their next
  /// opportunity. Does not forcibly close connections already in flight.
  pub fn shutdown(&self) {
    self.shutdown.store(true, Ordering::SeqCst);
  }

  fn accept_loop(self: Arc<Self>, listener: TcpListener, secure: bool) {
    for incoming in listener.incoming() {
      if self.shutdown.load(Ordering::SeqCst) {
        break;
      }
      let tcp = match incoming {
        Ok(tcp) => tcp,
        Err(e) => {
          warn_log!("accept failed: {e}");
          continue;
        }
      };
      let server = self.clone();
      std::thread::spawn(move || server.handle_connection(tcp, secure));
    }
  }

  fn handle_connection(&self, tcp: TcpStream, secure: bool) {
    if let Some(timeout) = self.connection_timeout {
      let _ = tcp.set_read_timeout(Some(timeout));
    }
    let peer = tcp.peer_addr().map(|a| a.to_string()).unwrap_or_default();
    trace_log!("accepted connection from {peer}");

    #[cfg(feature = "tls")]
    let transport = if secure {
      let config = crate::util::unwrap_poison(self.tls_config.lock()).ok().and_then(|guard| guard.clone());
      let config = match config {
        Some(config) => config,
        None => return,
      };
      match crate::tls::TlsStream::accept(tcp, config) {
        Ok(tls) => Transport::Tls(tls),
        Err(e) => {
          warn_log!("TLS handshake with {peer} failed: {e}");
          return;
        }
      }
    } else {
      Transport::Plain(PlainStream::new(tcp))
    };
    #[cfg(not(feature = "tls"))]
    let transport = {
      let _ = secure;
      Transport::Plain(PlainStream::new(tcp))
    };

    let _ = transport.set_read_timeout(self.read_timeout);
    let _ = transport.set_write_timeout(self.write_timeout);

    self.handle_keep_alive(&transport);
    trace_log!("connection from {peer} closed");
  }

  fn handle_keep_alive(&self, transport: &Transport) {
    loop {
      let _ = transport.set_read_timeout(self.keep_alive_timeout.or(self.read_timeout));
      let head = match RequestHead::parse(transport, self.max_head_buffer_size) {
        Ok(head) => head,
        Err(Error::Io(e)) if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::TimedOut | ErrorKind::WouldBlock) => break,
        Err(e) => {
          let response = (self.error_handler)(&e);
          let _ = response.write_to(transport, HttpVersion::Http11);
          break;
        }
      };

      let version = head.version();
      let keep_alive = match version {
        HttpVersion::Http11 => !head.headers().get("Connection").map(|v| v.eq_ignore_ascii_case("close")).unwrap_or(false),
        HttpVersion::Http10 => head.headers().get("Connection").map(|v| v.eq_ignore_ascii_case("keep-alive")).unwrap_or(false),
      };

      let _ = transport.set_read_timeout(self.request_body_timeout.or(self.read_timeout));

      match dispatch::dispatch(self, transport, &head) {
        Ok(Outcome::Upgraded) => return,
        Ok(Outcome::Respond(mut response)) => {
          if response.headers_mut().get("Connection").is_some() {
            warn_log!("handler set a Connection header directly; this crate manages it");
          }
          response.headers_mut().set("Connection", if keep_alive { "Keep-Alive" } else { "Close" });
          if response.write_to(transport, version).is_err() || !keep_alive {
            break;
          }
        }
        Err(e) => {
          let response = (self.error_handler)(&e);
          let _ = response.write_to(transport, version);
          break;
        }
      }
    }
  }
}

impl Drop for Server {
  fn drop(&mut self) {
    self.shutdown();

    let routes_empty = crate::util::unwrap_poison(self.routes.lock()).map(|table| table.is_empty()).unwrap_or(true);
    let directories_empty = crate::util::unwrap_poison(self.directories.lock()).map(|d| d.is_empty()).unwrap_or(true);
    let ws_empty = crate::util::unwrap_poison(self.ws_endpoints.lock()).map(|e| e.is_empty()).unwrap_or(true);

    if !routes_empty || !directories_empty || !ws_empty {
      error_log!("server dropped with outstanding routes/directories/websocket endpoints still registered");
      crate::util::unreachable();
    }
  }
}
