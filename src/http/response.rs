//! The mutable response builder a handler fills in.

use crate::http::headers::Headers;
use crate::http::request::HttpVersion;
use crate::http::status::StatusCode;
use crate::stream::ConnectionStreamWrite;
use std::io;

/// A response under construction. Defaults to `200 OK`, no headers, empty body.
#[derive(Debug)]
pub struct Response {
  status: StatusCode,
  reason: Option<String>,
  headers: Headers,
  body: Vec<u8>,
}

impl Default for Response {
  fn default() -> Self {
    Response { status: StatusCode::OK, reason: None, headers: Headers::new(), body: Vec::new() }
  }
}

impl Response {
  /// A new response with the given status and an empty body.
  pub fn new(status: StatusCode) -> Self {
    Response { status, ..Default::default() }
  }

  /// A `200 OK` response with a UTF-8 body and `Content-Type: text/plain; charset=utf-8`.
  pub fn ok(body: impl Into<String>) -> Self {
    Response::new(StatusCode::OK).with_body(body.into().into_bytes()).with_header("Content-Type", "text/plain; charset=utf-8")
  }

  /// Overrides the status code.
  pub fn with_status(mut self, status: StatusCode) -> Self {
    self.status = status;
    self
  }

  /// Overrides the reason phrase sent on the status line instead of the status's default.
  pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
    self.reason = Some(reason.into());
    self
  }

  /// Appends a header. Multiple calls with the same name append multiple header lines.
  pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
    self.headers.add(name.as_ref(), value.as_ref());
    self
  }

  /// Replaces the body.
  pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
    self.body = body.into();
    self
  }

  /// The status code.
  pub fn status(&self) -> &StatusCode {
    &self.status
  }

  /// The response headers, mutable.
  pub fn headers_mut(&mut self) -> &mut Headers {
    &mut self.headers
  }

  /// The response body, mutable.
  pub fn body_mut(&mut self) -> &mut Vec<u8> {
    &mut self.body
  }

  /// The response body.
  pub fn body(&self) -> &[u8] {
    &self.body
  }

  /// Serializes the status line, headers, and body onto `stream`. `Content-Length` is added
  /// automatically unless the handler already set one.
  pub fn write_to(&self, stream: &dyn ConnectionStreamWrite, version: HttpVersion) -> io::Result<()> {
    let reason = self.reason.as_deref().unwrap_or_else(|| self.status.default_reason());
    let status_line = format!("{} {} {}\r\n", version.as_str(), self.status.code(), reason);
    stream.write_all(status_line.as_bytes())?;

    if self.headers.get("Content-Length").is_none() {
      stream.write_all(format!("Content-Length: {}\r\n", self.body.len()).as_bytes())?;
    }
    for header in self.headers.iter() {
      stream.write_all(format!("{}: {}\r\n", header.name, header.value).as_bytes())?;
    }
    stream.write_all(b"\r\n")?;
    stream.write_all(&self.body)?;
    stream.flush()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_status_is_200() {
    assert_eq!(Response::default().status(), &StatusCode::OK);
  }

  #[test]
  fn builder_methods_compose() {
    let response =
      Response::new(StatusCode::NOT_FOUND).with_header("X-Test", "1").with_body(b"nope".to_vec());
    assert_eq!(response.status(), &StatusCode::NOT_FOUND);
    assert_eq!(response.body(), b"nope");
  }
}
