//! HTTP status codes.
//!
//! Represented as a thin wrapper around `u16` with named constants for the well-known codes
//! rather than an enum-per-code: the crate needs to round-trip the full IANA 100-599 range
//! (including codes it has no opinion about), and a struct avoids a `CustomStr`/`CustomString`
//! escape hatch for that.

use std::fmt::{Display, Formatter};

/// An HTTP status code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusCode(u16);

macro_rules! well_known {
  ($($konst:ident, $num:expr, $phrase:expr;)+) => {
    impl StatusCode {
      $(
        #[doc = concat!($num, " ", $phrase)]
        pub const $konst: StatusCode = StatusCode($num);
      )+

      /// The default reason phrase for this code, or `"Unknown"` if it isn't well-known.
      pub fn default_reason(&self) -> &'static str {
        match self.0 {
          $( $num => $phrase, )+
          _ => "Unknown",
        }
      }
    }
  }
}

well_known! {
  CONTINUE, 100, "Continue";
  SWITCHING_PROTOCOLS, 101, "Switching Protocols";
  OK, 200, "OK";
  CREATED, 201, "Created";
  ACCEPTED, 202, "Accepted";
  NON_AUTHORITATIVE_INFORMATION, 203, "Non-Authoritative Information";
  NO_CONTENT, 204, "No Content";
  RESET_CONTENT, 205, "Reset Content";
  PARTIAL_CONTENT, 206, "Partial Content";
  MULTIPLE_CHOICES, 300, "Multiple Choices";
  MOVED_PERMANENTLY, 301, "Moved Permanently";
  FOUND, 302, "Found";
  SEE_OTHER, 303, "See Other";
  NOT_MODIFIED, 304, "Not Modified";
  USE_PROXY, 305, "Use Proxy";
  TEMPORARY_REDIRECT, 307, "Temporary Redirect";
  PERMANENT_REDIRECT, 308, "Permanent Redirect";
  BAD_REQUEST, 400, "Bad Request";
  UNAUTHORIZED, 401, "Unauthorized";
  PAYMENT_REQUIRED, 402, "Payment Required";
  FORBIDDEN, 403, "Forbidden";
  NOT_FOUND, 404, "Not Found";
  METHOD_NOT_ALLOWED, 405, "Method Not Allowed";
  NOT_ACCEPTABLE, 406, "Not Acceptable";
  PROXY_AUTHENTICATION_REQUIRED, 407, "Proxy Authentication Required";
  REQUEST_TIMEOUT, 408, "Request Timeout";
  CONFLICT, 409, "Conflict";
  GONE, 410, "Gone";
  LENGTH_REQUIRED, 411, "Length Required";
  PRECONDITION_FAILED, 412, "Precondition Failed";
  CONTENT_TOO_LARGE, 413, "Content Too Large";
  REQUEST_URI_TOO_LONG, 414, "URI Too Long";
  UNSUPPORTED_MEDIA_TYPE, 415, "Unsupported Media Type";
  RANGE_NOT_SATISFIABLE, 416, "Range Not Satisfiable";
  EXPECTATION_FAILED, 417, "Expectation Failed";
  UPGRADE_REQUIRED, 426, "Upgrade Required";
  TOO_MANY_REQUESTS, 429, "Too Many Requests";
  INTERNAL_SERVER_ERROR, 500, "Internal Server Error";
  NOT_IMPLEMENTED, 501, "Not Implemented";
  BAD_GATEWAY, 502, "Bad Gateway";
  SERVICE_UNAVAILABLE, 503, "Service Unavailable";
  GATEWAY_TIMEOUT, 504, "Gateway Timeout";
  VERSION_NOT_SUPPORTED, 505, "HTTP Version Not Supported";
}

impl StatusCode {
  /// Builds a status code from a raw number. Accepts any value in `100..=599`; values outside
  /// that range are clamped to `500` since the wire format requires exactly 3 digits.
  pub fn from_u16(code: u16) -> Self {
    if (100..=599).contains(&code) {
      StatusCode(code)
    } else {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }

  /// The numeric code.
  pub fn code(&self) -> u16 {
    self.0
  }

  /// `true` for `1xx` informational codes.
  pub fn is_informational(&self) -> bool {
    (100..200).contains(&self.0)
  }

  /// `true` for `2xx` success codes.
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.0)
  }

  /// `true` for `3xx` redirection codes.
  pub fn is_redirection(&self) -> bool {
    (300..400).contains(&self.0)
  }

  /// `true` for `4xx` client-error codes.
  pub fn is_client_error(&self) -> bool {
    (400..500).contains(&self.0)
  }

  /// `true` for `5xx` server-error codes.
  pub fn is_server_error(&self) -> bool {
    (500..600).contains(&self.0)
  }
}

impl Display for StatusCode {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.0, self.default_reason())
  }
}

impl From<u16> for StatusCode {
  fn from(value: u16) -> Self {
    StatusCode::from_u16(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn well_known_reason_phrase() {
    assert_eq!(StatusCode::NOT_FOUND.code(), 404);
    assert_eq!(StatusCode::NOT_FOUND.default_reason(), "Not Found");
  }

  #[test]
  fn unknown_code_round_trips_without_reason() {
    let code = StatusCode::from_u16(499);
    assert_eq!(code.code(), 499);
    assert_eq!(code.default_reason(), "Unknown");
  }

  #[test]
  fn out_of_range_clamps_to_500() {
    assert_eq!(StatusCode::from_u16(50), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(StatusCode::from_u16(999), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[test]
  fn class_predicates() {
    assert!(StatusCode::OK.is_success());
    assert!(StatusCode::NOT_FOUND.is_client_error());
    assert!(StatusCode::SERVICE_UNAVAILABLE.is_server_error());
    assert!(StatusCode::FOUND.is_redirection());
    assert!(StatusCode::CONTINUE.is_informational());
  }
}
