//! Compiles a registered route URI (`/users/:id/posts/:post_id`) into a base prefix used for
//! routing-table bucketing and a regex used for exact matching.

use crate::error::{Error, RouteError, Result};
use regex::Regex;

/// A registered route URI, compiled once at registration time.
#[derive(Debug, Clone)]
pub struct Pattern {
  base_uri: String,
  regex: Regex,
  param_names: Vec<String>,
}

/// The URI prefix obtained by truncating `uri` at the first `:` or `.`, stripping a trailing
/// `/` before the cut. Used to bucket routes in the route table.
pub fn base_uri_of(uri: &str) -> String {
  let cut = uri.find([':', '.']).unwrap_or(uri.len());
  let prefix = &uri[..cut];
  prefix.strip_suffix('/').unwrap_or(prefix).to_string()
}

impl Pattern {
  /// Compiles `uri`, replacing each `:name` path segment with a capture group matching
  /// `[^/]+`. Fails if two segments share a parameter name.
  pub fn compile(uri: &str) -> Result<Self> {
    let base_uri = base_uri_of(uri);
    let mut param_names = Vec::new();
    let mut regex_src = String::with_capacity(uri.len() * 2);
    regex_src.push('^');

    for (index, segment) in uri.split('/').enumerate() {
      if index > 0 {
        regex_src.push('/');
      }
      if let Some(name) = segment.strip_prefix(':') {
        if param_names.iter().any(|existing: &String| existing == name) {
          return Err(Error::from(RouteError::DuplicateParameterName(
            uri.to_string(),
            name.to_string(),
          )));
        }
        param_names.push(name.to_string());
        regex_src.push_str("([^/]+)");
      } else {
        regex_src.push_str(&regex::escape(segment));
      }
    }
    regex_src.push('$');

    let regex = Regex::new(&regex_src)?;
    Ok(Pattern { base_uri, regex, param_names })
  }

  /// The bucketing prefix this route was registered under.
  pub fn base_uri(&self) -> &str {
    &self.base_uri
  }

  /// Matches `path` (query string already removed) against the compiled pattern, returning the
  /// captured `:name` parameters if it matches, in the order they appear in the registered URI.
  pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
    let captures = self.regex.captures(path)?;
    let mut params = Vec::with_capacity(self.param_names.len());
    for (index, name) in self.param_names.iter().enumerate() {
      let value = captures.get(index + 1).map(|m| m.as_str().to_string()).unwrap_or_default();
      params.push((name.clone(), value));
    }
    Some(params)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn base_uri_truncates_at_first_colon() {
    assert_eq!(base_uri_of("/users/:id"), "/users");
    assert_eq!(base_uri_of("/users/:id/posts/:post_id"), "/users");
  }

  #[test]
  fn base_uri_truncates_at_first_dot() {
    assert_eq!(base_uri_of("/files/report.pdf"), "/files");
  }

  #[test]
  fn base_uri_with_no_params_is_whole_uri() {
    assert_eq!(base_uri_of("/healthz"), "/healthz");
  }

  #[test]
  fn matches_extracts_named_parameters_in_order() {
    let pattern = Pattern::compile("/users/:id/posts/:post_id").unwrap();
    let params = pattern.matches("/users/42/posts/7").unwrap();
    assert_eq!(
      params,
      vec![("id".to_string(), "42".to_string()), ("post_id".to_string(), "7".to_string())]
    );
  }

  #[test]
  fn matches_rejects_non_matching_path() {
    let pattern = Pattern::compile("/users/:id").unwrap();
    assert!(pattern.matches("/users/42/extra").is_none());
    assert!(pattern.matches("/other/42").is_none());
  }

  #[test]
  fn duplicate_parameter_names_are_rejected() {
    let err = Pattern::compile("/users/:id/friends/:id").unwrap_err();
    assert!(matches!(err, Error::Route(RouteError::DuplicateParameterName(_, _))));
  }

  #[test]
  fn literal_segments_are_escaped() {
    let pattern = Pattern::compile("/a.b/:id").unwrap();
    assert!(pattern.matches("/a.b/1").is_some());
    assert!(pattern.matches("/aXb/1").is_none());
  }
}
