//! The dynamic route table: `method -> base_uri -> (id -> Route)`, with base-URI buckets
//! iterated lexicographically descending (longer/more-specific prefixes first) at lookup time.

use crate::error::Result;
use crate::http::method::Method;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::route::pattern::Pattern;
use crate::{debug_log, error::HandlerError};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A handler registered against a route: takes the matched request and returns a response, or
/// a domain error to be translated to an HTTP status by the dispatch pipeline.
pub type Handler = dyn Fn(&Request) -> std::result::Result<Response, HandlerError> + Send + Sync;

/// One registered route: the compiled pattern plus its handler. The handler is `Arc`-wrapped,
/// not boxed, so the dispatch pipeline can clone it out from under the route-table lock and
/// invoke it afterwards.
#[derive(Clone)]
pub struct Route {
  pattern: Pattern,
  handler: Arc<Handler>,
}

impl Route {
  /// The pattern this route matches against.
  pub fn pattern(&self) -> &Pattern {
    &self.pattern
  }

  /// A clone of the handler, for invocation after the route-table lock is released.
  pub fn handler(&self) -> Arc<Handler> {
    self.handler.clone()
  }

  /// Invokes the handler directly (used by tests and anywhere the lock isn't held).
  pub fn invoke(&self, request: &Request) -> std::result::Result<Response, HandlerError> {
    (self.handler)(request)
  }
}

/// `method -> base_uri -> (id -> Route)`.
#[derive(Default)]
pub struct RouteTable {
  methods: HashMap<Method, BTreeMap<String, BTreeMap<u64, Route>>>,
}

impl RouteTable {
  /// An empty route table.
  pub fn new() -> Self {
    RouteTable::default()
  }

  /// Registers `uri` under `method` with the given handler, returning the id it was assigned
  /// (unique per base_uri bucket, monotonically increasing) and the computed base_uri.
  pub fn add(
    &mut self,
    method: Method,
    uri: &str,
    handler: Arc<Handler>,
  ) -> Result<(u64, String)> {
    let pattern = Pattern::compile(uri)?;
    let base_uri = pattern.base_uri().to_string();
    let bucket = self.methods.entry(method.clone()).or_default().entry(base_uri.clone()).or_default();
    let id = bucket.keys().next_back().map(|last| last + 1).unwrap_or(0);
    bucket.insert(id, Route { pattern, handler });
    debug_log!("route added: {method} {uri} (base_uri={base_uri}, id={id})");
    Ok((id, base_uri))
  }

  /// Removes the route previously returned by `add`. A no-op if it was already removed.
  pub fn remove(&mut self, method: &Method, base_uri: &str, id: u64) {
    if let Some(buckets) = self.methods.get_mut(method) {
      if let Some(bucket) = buckets.get_mut(base_uri) {
        bucket.remove(&id);
        if bucket.is_empty() {
          buckets.remove(base_uri);
        }
      }
    }
    debug_log!("route removed: {method} base_uri={base_uri} id={id}");
  }

  /// `true` if no routes are registered under any method.
  pub fn is_empty(&self) -> bool {
    self.methods.values().all(|buckets| buckets.is_empty())
  }

  /// Finds the first route (by descending base_uri, then ascending id) whose pattern matches
  /// `path`, returning it together with the extracted path parameters.
  pub fn lookup(&self, method: &Method, path: &str) -> Option<(&Route, Vec<(String, String)>)> {
    let buckets = self.methods.get(method)?;
    for (base_uri, routes) in buckets.iter().rev() {
      if !path.starts_with(base_uri.as_str()) {
        continue;
      }
      for route in routes.values() {
        if let Some(params) = route.pattern().matches(path) {
          return Some((route, params));
        }
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::http::status::StatusCode;

  fn ok_handler() -> Arc<Handler> {
    Arc::new(|_req: &Request| Ok(Response::new(StatusCode::OK)))
  }

  #[test]
  fn lookup_prefers_more_specific_base_uri() {
    let mut table = RouteTable::new();
    table.add(Method::Get, "/users", ok_handler()).unwrap();
    table.add(Method::Get, "/users/:id", ok_handler()).unwrap();

    let (_, params) = table.lookup(&Method::Get, "/users/42").unwrap();
    assert_eq!(params, vec![("id".to_string(), "42".to_string())]);
  }

  #[test]
  fn lookup_returns_none_for_unknown_path() {
    let mut table = RouteTable::new();
    table.add(Method::Get, "/users", ok_handler()).unwrap();
    assert!(table.lookup(&Method::Get, "/other").is_none());
  }

  #[test]
  fn remove_drops_the_route() {
    let mut table = RouteTable::new();
    let (id, base_uri) = table.add(Method::Get, "/ping", ok_handler()).unwrap();
    assert!(table.lookup(&Method::Get, "/ping").is_some());
    table.remove(&Method::Get, &base_uri, id);
    assert!(table.lookup(&Method::Get, "/ping").is_none());
  }

  #[test]
  fn ids_increase_monotonically_per_base_uri() {
    let mut table = RouteTable::new();
    let (id_a, _) = table.add(Method::Get, "/a/:x", ok_handler()).unwrap();
    let (id_b, _) = table.add(Method::Get, "/a/:y", ok_handler()).unwrap();
    assert!(id_b > id_a);
  }
}
