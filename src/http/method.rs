//! The HTTP method set this crate routes on: `GET, POST, PUT, PATCH, DELETE, OPTIONS`.

use std::fmt::Display;

/// Represents an HTTP method.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Method {
  /// The `GET` method.
  Get,
  /// The `POST` method.
  Post,
  /// The `PUT` method.
  Put,
  /// The `PATCH` method.
  Patch,
  /// The `DELETE` method.
  Delete,
  /// The `OPTIONS` method.
  Options,
  /// Anything else a client sent; never matched by a registered route.
  Other(String),
}

impl Method {
  /// Parses the verb from a request line into a `Method`.
  pub fn from_name(name: &str) -> Self {
    match name {
      "GET" => Self::Get,
      "POST" => Self::Post,
      "PUT" => Self::Put,
      "PATCH" => Self::Patch,
      "DELETE" => Self::Delete,
      "OPTIONS" => Self::Options,
      _ => Self::Other(name.to_string()),
    }
  }

  /// The wire representation of this method.
  pub fn as_str(&self) -> &str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Patch => "PATCH",
      Method::Delete => "DELETE",
      Method::Options => "OPTIONS",
      Method::Other(name) => name.as_str(),
    }
  }
}

impl Display for Method {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}
