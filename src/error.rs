//! Crate-wide error type.
//!
//! One big enum with blanket `From` impls rather than pulling in `thiserror`/`anyhow`: the core
//! of this crate has very few error sources (I/O, malformed
//! request heads, bad route patterns, user-raised domain errors) and a dependency-light error
//! type keeps the crate quick to compile, which matters for something meant to be embedded.

use crate::http::StatusCode;
use std::error::Error as StdError;
use std::fmt::{Debug, Display, Formatter};
use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors encountered while parsing an inbound request head.
#[derive(Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum RequestHeadError {
  /// The request line did not contain exactly `METHOD SP PATH SP VERSION`.
  MalformedRequestLine,
  /// The request line was present but too long to fit the configured head buffer.
  RequestLineTooLong,
  /// A header line was missing the `:` separator.
  MalformedHeaderLine,
  /// A header line exceeded the configured head buffer.
  HeaderLineTooLong,
  /// The HTTP version on the request line was not `HTTP/1.0` or `HTTP/1.1`.
  UnsupportedHttpVersion(String),
  /// `Content-Length` was present but not a valid, non-negative integer.
  InvalidContentLength(String),
  /// `Transfer-Encoding` was present with a value other than `identity`.
  UnsupportedTransferEncoding(String),
  /// The request body exceeded the configured body size cap.
  BodyTooLarge(usize),
  /// A WebSocket upgrade request was missing the `Sec-WebSocket-Key` header.
  MissingSecWebSocketKey,
}

impl Display for RequestHeadError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}
impl StdError for RequestHeadError {}

/// Errors raised while compiling or registering a route/endpoint path.
#[derive(Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum RouteError {
  /// Two `:name` path parameters in the same registered URI shared a name.
  DuplicateParameterName(String, String),
  /// The regex derived from a registered URI failed to compile (should not happen for
  /// well-formed `:name` segments, but a hand-crafted path could still trip `regex`'s size cap).
  PatternTooLarge(String),
}

impl Display for RouteError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}
impl StdError for RouteError {}

/// Errors raised while decoding a WebSocket frame off the wire.
#[derive(Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum FrameError {
  /// The opcode nibble didn't match any of the RFC 6455 opcodes.
  InvalidOpcode(u8),
  /// The frame declared a payload length larger than the connection's configured maximum.
  PayloadTooLarge(u64),
}

impl Display for FrameError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}
impl StdError for FrameError {}

/// Configuration mistakes caught synchronously at the call site (builder misuse, certificate
/// added after start, etc).
#[derive(Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ConfigError {
  /// The bind address did not parse as `scheme://host[:port][/basepath]`.
  InvalidAddress(String),
  /// The scheme was not one of `http`, `https`, `ws`, `wss`.
  UnsupportedScheme(String),
  /// A certificate was added to a server that has no TLS support (plain `http`/`ws` scheme).
  NotSecure,
  /// A certificate was added after `start()` was called.
  AlreadyStarted,
  /// `port()` was called before `start()`.
  NotStarted,
}

impl Display for ConfigError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}
impl StdError for ConfigError {}

/// Errors raised while parsing a server's response on the client side.
#[derive(Debug, Eq, PartialEq, Hash)]
#[non_exhaustive]
pub enum ClientError {
  /// The response had no `Content-Length` header. Chunked transfer-encoding is not supported.
  MissingContentLength,
}

impl Display for ClientError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    Debug::fmt(self, f)
  }
}
impl StdError for ClientError {}

/// A handler-raised domain error: carries the HTTP status the dispatcher should respond with
/// and an optional reason line.
#[derive(Debug)]
pub struct HandlerError {
  status: StatusCode,
  message: Option<String>,
}

impl HandlerError {
  /// Construct a domain error with no custom reason; the transport's default reason string for
  /// `status` is used instead.
  pub fn new(status: StatusCode) -> Self {
    HandlerError { status, message: None }
  }

  /// Construct a domain error with a custom reason line.
  pub fn with_message(status: StatusCode, message: impl Into<String>) -> Self {
    HandlerError { status, message: Some(message.into()) }
  }

  /// The status this error should translate to.
  pub fn status(&self) -> &StatusCode {
    &self.status
  }

  /// The custom reason, if any.
  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }
}

impl Display for HandlerError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match &self.message {
      Some(m) => f.write_str(m),
      None => Display::fmt(&self.status, f),
    }
  }
}
impl StdError for HandlerError {}

/// Crate-wide error enum.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
  /// I/O failure (socket, file).
  Io(io::Error),
  /// Malformed request head.
  RequestHead(RequestHeadError),
  /// Bad route/endpoint registration.
  Route(RouteError),
  /// Malformed WebSocket frame.
  Frame(FrameError),
  /// Misconfiguration caught synchronously.
  Config(ConfigError),
  /// A handler raised a domain error.
  Handler(HandlerError),
  /// A failure parsing a server's response on the client side.
  Client(ClientError),
  /// Anything else (downstream crate errors we don't special-case).
  Other(Box<dyn StdError + Send + Sync>),
}

impl Error {
  /// Build an `Error::Io` from a raw `io::ErrorKind`.
  pub fn from_io_kind(kind: io::ErrorKind) -> Error {
    Error::Io(io::Error::from(kind))
  }

  /// `true` if this error is a handler-raised domain error.
  pub fn as_handler_error(&self) -> Option<&HandlerError> {
    match self {
      Error::Handler(h) => Some(h),
      _ => None,
    }
  }
}

impl Display for Error {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Error::Io(e) => Display::fmt(e, f),
      Error::RequestHead(e) => Display::fmt(e, f),
      Error::Route(e) => Display::fmt(e, f),
      Error::Frame(e) => Display::fmt(e, f),
      Error::Config(e) => Display::fmt(e, f),
      Error::Handler(e) => Display::fmt(e, f),
      Error::Client(e) => Display::fmt(e, f),
      Error::Other(e) => Display::fmt(e, f),
    }
  }
}
impl StdError for Error {}

impl From<io::Error> for Error {
  fn from(value: io::Error) -> Self {
    Error::Io(value)
  }
}
impl From<RequestHeadError> for Error {
  fn from(value: RequestHeadError) -> Self {
    Error::RequestHead(value)
  }
}
impl From<RouteError> for Error {
  fn from(value: RouteError) -> Self {
    Error::Route(value)
  }
}
impl From<FrameError> for Error {
  fn from(value: FrameError) -> Self {
    Error::Frame(value)
  }
}
impl From<ConfigError> for Error {
  fn from(value: ConfigError) -> Self {
    Error::Config(value)
  }
}
impl From<HandlerError> for Error {
  fn from(value: HandlerError) -> Self {
    Error::Handler(value)
  }
}
impl From<ClientError> for Error {
  fn from(value: ClientError) -> Self {
    Error::Client(value)
  }
}
impl From<regex::Error> for Error {
  fn from(value: regex::Error) -> Self {
    Error::Route(RouteError::PatternTooLarge(value.to_string()))
  }
}

impl From<Error> for io::Error {
  fn from(value: Error) -> Self {
    match value {
      Error::Io(io) => io,
      other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
  }
}
