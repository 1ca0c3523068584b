//! Registration tokens: RAII handles whose destruction deregisters the corresponding
//! route, directory mount, or WebSocket endpoint.

use crate::trace_log;
use std::fmt::{Debug, Formatter};

/// An opaque handle whose destruction deregisters a route, directory, or WebSocket endpoint.
/// Dropping it twice is impossible (it's consumed by `Drop`); dropping it after the owning
/// `Server` is gone is a legal no-op.
pub struct Token {
  label: &'static str,
  deregister: Option<Box<dyn FnOnce() + Send>>,
}

impl Token {
  /// Builds a token that runs `deregister` exactly once, when dropped. `label` is used only for
  /// diagnostics (e.g. `"route GET /users/:id"`).
  pub fn new(label: &'static str, deregister: impl FnOnce() + Send + 'static) -> Self {
    Token { label, deregister: Some(Box::new(deregister)) }
  }

  /// Deregisters immediately instead of waiting for drop. Equivalent to `drop(token)`, spelled
  /// out for callers who want the intent explicit at the call site.
  pub fn release(self) {
    drop(self);
  }
}

impl Drop for Token {
  fn drop(&mut self) {
    if let Some(deregister) = self.deregister.take() {
      trace_log!("dropping token: {}", self.label);
      deregister();
    }
  }
}

impl Debug for Token {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Token").field("label", &self.label).finish()
  }
}

/// An ordered collection of tokens, dropped in reverse-insertion order when itself dropped or
/// cleared. Lets a host program tear down a whole group of routes/endpoints with one call.
#[derive(Default)]
pub struct TokenHolder {
  tokens: Vec<Token>,
}

impl TokenHolder {
  /// An empty holder.
  pub fn new() -> Self {
    TokenHolder::default()
  }

  /// Adds a token to the end of the holder.
  pub fn push(&mut self, token: Token) {
    self.tokens.push(token);
  }

  /// The number of tokens currently held.
  pub fn len(&self) -> usize {
    self.tokens.len()
  }

  /// `true` if no tokens are held.
  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  /// Drops every held token in reverse-insertion order, leaving the holder empty.
  pub fn clear(&mut self) {
    while let Some(token) = self.tokens.pop() {
      drop(token);
    }
  }
}

impl Drop for TokenHolder {
  fn drop(&mut self) {
    self.clear();
  }
}

impl Extend<Token> for TokenHolder {
  fn extend<T: IntoIterator<Item = Token>>(&mut self, iter: T) {
    for token in iter {
      self.push(token);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  #[test]
  fn dropping_token_runs_deregister_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let token = Token::new("test", move || {
      c.fetch_add(1, Ordering::SeqCst);
    });
    drop(token);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn holder_drops_in_reverse_insertion_order() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut holder = TokenHolder::new();
    for i in 0..3 {
      let order = order.clone();
      holder.push(Token::new("test", move || order.lock().unwrap().push(i)));
    }
    drop(holder);
    assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
  }

  #[test]
  fn release_deregisters_without_waiting_for_scope_end() {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let token = Token::new("test", move || {
      c.fetch_add(1, Ordering::SeqCst);
    });
    token.release();
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }
}
