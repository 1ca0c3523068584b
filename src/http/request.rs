//! Parses an inbound HTTP/1.1 request head and carries the body bytes + path parameters
//! handed to a route handler.

use crate::error::{Error, RequestHeadError, Result};
use crate::http::headers::Headers;
use crate::http::method::Method;
use crate::stream::ConnectionStream;
use crate::trace_log;
use std::collections::HashMap;
use std::io::ErrorKind;

/// The HTTP version on the request line. Only `1.0` and `1.1` are accepted; anything else is a
/// `RequestHeadError::UnsupportedHttpVersion`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpVersion {
  /// `HTTP/1.0`: one request per connection, no chunked transfer-encoding.
  Http10,
  /// `HTTP/1.1`: keep-alive by default.
  Http11,
}

impl HttpVersion {
  /// The wire representation of this version.
  pub fn as_str(&self) -> &'static str {
    match self {
      HttpVersion::Http10 => "HTTP/1.0",
      HttpVersion::Http11 => "HTTP/1.1",
    }
  }

  fn parse(raw: &str) -> Result<Self> {
    match raw {
      "HTTP/1.0" => Ok(HttpVersion::Http10),
      "HTTP/1.1" => Ok(HttpVersion::Http11),
      other => Err(Error::from(RequestHeadError::UnsupportedHttpVersion(other.to_string()))),
    }
  }
}

/// A parsed, but not-yet-bodied, request line + header block.
#[derive(Debug)]
pub struct RequestHead {
  method: Method,
  path: String,
  query: Vec<(String, String)>,
  version: HttpVersion,
  headers: Headers,
  content_length: usize,
}

fn read_line(stream: &dyn ConnectionStream, max_len: usize, too_long: RequestHeadError) -> Result<String> {
  let mut buf = Vec::with_capacity(256);
  let count = stream.read_until(b'\n', max_len, &mut buf)?;
  if count == 0 {
    return Err(Error::from_io_kind(ErrorKind::UnexpectedEof));
  }
  if count == max_len {
    return Err(Error::from(too_long));
  }
  let line = String::from_utf8_lossy(&buf).to_string();
  let line = line.strip_suffix("\r\n").or_else(|| line.strip_suffix('\n')).unwrap_or(&line);
  Ok(line.to_string())
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
  if raw.is_empty() {
    return Vec::new();
  }
  raw
    .split('&')
    .filter(|pair| !pair.is_empty())
    .map(|pair| match pair.split_once('=') {
      Some((k, v)) => (decode(k), decode(v)),
      None => (decode(pair), String::new()),
    })
    .collect()
}

fn decode(raw: &str) -> String {
  urlencoding::decode(raw).map(|cow| cow.into_owned()).unwrap_or_else(|_| raw.to_string())
}

impl RequestHead {
  /// Reads the request line and header block from `stream`. Does not read the body.
  pub fn parse(stream: &dyn ConnectionStream, max_head_size: usize) -> Result<Self> {
    let request_line = read_line(stream, max_head_size, RequestHeadError::RequestLineTooLong)?;
    let mut parts = request_line.split(' ');
    let method_str = parts.next().ok_or(Error::from(RequestHeadError::MalformedRequestLine))?;
    let raw_uri = parts.next().ok_or(Error::from(RequestHeadError::MalformedRequestLine))?;
    let version_str = parts.next().ok_or(Error::from(RequestHeadError::MalformedRequestLine))?;
    if parts.next().is_some() {
      return Err(Error::from(RequestHeadError::MalformedRequestLine));
    }
    let version = HttpVersion::parse(version_str)?;
    let method = Method::from_name(method_str);

    let mut uri_parts = raw_uri.splitn(2, '?');
    let raw_path = uri_parts.next().unwrap_or("");
    let path = decode(raw_path);
    let query = parse_query(uri_parts.next().unwrap_or(""));

    let mut headers = Headers::new();
    loop {
      let line = read_line(stream, max_head_size, RequestHeadError::HeaderLineTooLong)?;
      if line.is_empty() {
        break;
      }
      let (name, value) = line
        .split_once(':')
        .ok_or(Error::from(RequestHeadError::MalformedHeaderLine))?;
      headers.add(name.trim(), value.trim());
    }

    if let Some(te) = headers.get("Transfer-Encoding") {
      if !te.eq_ignore_ascii_case("identity") {
        return Err(Error::from(RequestHeadError::UnsupportedTransferEncoding(te.to_string())));
      }
    }

    let content_length = match headers.get("Content-Length") {
      Some(raw) => raw
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::from(RequestHeadError::InvalidContentLength(raw.to_string())))?,
      None => 0,
    };

    trace_log!("parsed request head: {method} {path} {version:?}");

    Ok(RequestHead { method, path, query, version, headers, content_length })
  }

  /// The request method.
  pub fn method(&self) -> &Method {
    &self.method
  }

  /// The decoded path, without the query string.
  pub fn path(&self) -> &str {
    &self.path
  }

  /// The raw, in-order query pairs as they appeared on the wire.
  pub fn query(&self) -> &[(String, String)] {
    &self.query
  }

  /// The HTTP version on the request line.
  pub fn version(&self) -> HttpVersion {
    self.version
  }

  /// The request headers.
  pub fn headers(&self) -> &Headers {
    &self.headers
  }

  /// `true` if the client asked to upgrade this connection (used for the WebSocket handshake).
  pub fn is_upgrade(&self, to: &str) -> bool {
    self.headers.get("Upgrade").map(|v| v.eq_ignore_ascii_case(to)).unwrap_or(false)
  }

  /// Reads exactly `self.content_length` body bytes off `stream`, rejecting anything beyond
  /// `max_body_size`.
  pub fn read_body(&self, stream: &dyn ConnectionStream, max_body_size: usize) -> Result<Vec<u8>> {
    if self.content_length == 0 {
      return Ok(Vec::new());
    }
    if self.content_length > max_body_size {
      return Err(Error::from(RequestHeadError::BodyTooLarge(self.content_length)));
    }
    let mut body = vec![0u8; self.content_length];
    stream.read_exact(&mut body)?;
    Ok(body)
  }
}

/// The immutable request view handed to a route handler: the matched URI, method, path
/// parameters extracted from `:name` segments, the query map, header lookup, and the body.
/// Built once per request by the dispatch pipeline.
#[derive(Debug)]
pub struct Request {
  uri: String,
  method: Method,
  parameters: Vec<(String, String)>,
  queries: HashMap<String, String>,
  headers: Headers,
  body: Vec<u8>,
}

impl Request {
  /// Assembles the final request view from a parsed head, the path parameters captured by the
  /// matched route pattern (in the order they appear in the registered URI), and the already-read
  /// body.
  pub fn new(
    head: &RequestHead,
    parameters: Vec<(String, String)>,
    body: Vec<u8>,
  ) -> Self {
    let mut queries = HashMap::with_capacity(head.query.len());
    for (k, v) in &head.query {
      queries.insert(k.clone(), v.clone());
    }

    if !parameters.is_empty() {
      trace_log!("request to {} matched with {} path parameter(s)", head.path, parameters.len());
    }

    Request {
      uri: head.path.clone(),
      method: head.method.clone(),
      parameters,
      queries,
      headers: head.headers.clone(),
      body,
    }
  }

  /// The request path (query string removed).
  pub fn uri(&self) -> &str {
    &self.uri
  }

  /// The request method.
  pub fn method(&self) -> &Method {
    &self.method
  }

  /// The value of a named `:name` path parameter, if the matched route captured one by that name.
  pub fn parameter(&self, name: &str) -> Option<&str> {
    self.parameters.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
  }

  /// All path parameters captured by the matched route, in the order they appear in the
  /// registered URI.
  pub fn parameters(&self) -> &[(String, String)] {
    &self.parameters
  }

  /// The value of a query-string key, if present.
  pub fn query(&self, name: &str) -> Option<&str> {
    self.queries.get(name).map(String::as_str)
  }

  /// The full query map.
  pub fn queries(&self) -> &HashMap<String, String> {
    &self.queries
  }

  /// Looks up a header by name (case-insensitive).
  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(name)
  }

  /// All request headers.
  pub fn headers(&self) -> &Headers {
    &self.headers
  }

  /// The request body bytes.
  pub fn body(&self) -> &[u8] {
    &self.body
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn query_parsing_splits_pairs() {
    let pairs = parse_query("a=1&b=2&c");
    assert_eq!(
      pairs,
      vec![
        ("a".to_string(), "1".to_string()),
        ("b".to_string(), "2".to_string()),
        ("c".to_string(), String::new()),
      ]
    );
  }

  #[test]
  fn query_parsing_decodes_percent_escapes() {
    let pairs = parse_query("name=a%20b");
    assert_eq!(pairs, vec![("name".to_string(), "a b".to_string())]);
  }

  #[test]
  fn http_version_rejects_http_09() {
    assert!(HttpVersion::parse("HTTP/0.9").is_err());
    assert!(HttpVersion::parse("HTTP/2").is_err());
    assert_eq!(HttpVersion::parse("HTTP/1.1").unwrap(), HttpVersion::Http11);
  }
}
