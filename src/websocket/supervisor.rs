//! The WebSocket endpoint supervisor: per-path connection factory, capacity gate, and
//! connection bookkeeping.
//!
//! A WebSocket endpoint here does not own a second OS listener bound to the same host/port —
//! Rust's standard socket APIs
//! don't offer a clean way to share one `(host, port)` across independent listener objects. The
//! single HTTP accept loop in `server.rs` already owns the one listener; an endpoint is just a
//! capacity-gated factory consulted when an upgrade request matches its path (see `DESIGN.md`).

use crate::stream::ConnectionStream;
use crate::websocket::connection::{self, Sender, WebSocketHandler};
use crate::{debug_log, trace_log};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Builds the per-connection handler once a connection has been accepted and handshaken.
pub type Factory = dyn Fn(Sender) -> Box<dyn WebSocketHandler> + Send + Sync;

/// A registered WebSocket endpoint: its framing mode, capacity limit, connection factory, and
/// the set of currently-open connections.
pub struct WsEndpoint {
  binary_mode: bool,
  max_connections: usize,
  factory: Arc<Factory>,
  next_id: AtomicU64,
  connections: Mutex<HashMap<u64, Box<dyn ConnectionStream>>>,
}

impl WsEndpoint {
  /// `max_connections == 0` means unlimited.
  pub fn new(binary_mode: bool, max_connections: usize, factory: Arc<Factory>) -> Self {
    WsEndpoint {
      binary_mode,
      max_connections,
      factory,
      next_id: AtomicU64::new(0),
      connections: Mutex::new(HashMap::new()),
    }
  }

  /// `true` if this endpoint frames messages as binary rather than text.
  pub fn binary_mode(&self) -> bool {
    self.binary_mode
  }

  /// Reserves a connection slot if the endpoint is under capacity, registering `stream` under
  /// the returned id. Must be called while holding the server's protecting lock, so the
  /// capacity check and the reservation are atomic with respect to concurrent upgrades.
  pub fn try_reserve(&self, stream: Box<dyn ConnectionStream>) -> Option<u64> {
    let mut connections = crate::util::unwrap_poison(self.connections.lock()).ok()?;
    if self.max_connections != 0 && connections.len() >= self.max_connections {
      trace_log!("websocket endpoint at capacity ({}/{})", connections.len(), self.max_connections);
      return None;
    }
    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    connections.insert(id, stream);
    debug_log!("websocket connection {id} accepted ({}/{})", connections.len(), self.max_connections);
    Some(id)
  }

  /// Unregisters a connection, freeing its capacity slot. A no-op if already removed.
  pub fn release(&self, id: u64) {
    if let Ok(mut connections) = crate::util::unwrap_poison(self.connections.lock()) {
      if connections.remove(&id).is_some() {
        debug_log!("websocket connection {id} released ({}/{})", connections.len(), self.max_connections);
      }
    }
  }

  /// A clone of the connection factory.
  pub fn factory(&self) -> Arc<Factory> {
    self.factory.clone()
  }

  /// Force-closes every open connection. Called when the endpoint's token is dropped; each
  /// connection's reader thread observes the shutdown as a read error and unwinds on its own.
  pub fn close_all(&self) {
    if let Ok(mut connections) = crate::util::unwrap_poison(self.connections.lock()) {
      for (id, stream) in connections.drain() {
        trace_log!("websocket endpoint teardown: closing connection {id}");
        let _ = stream.shutdown();
      }
    }
  }
}

/// Spawns the reader thread for a freshly accepted, handshaken WebSocket connection. `on_exit`
/// is invoked from the reader thread once the read loop ends, to release the endpoint's
/// capacity slot.
pub(crate) fn spawn_connection(
  id: u64,
  stream: Box<dyn ConnectionStream>,
  binary_mode: bool,
  handler: Box<dyn WebSocketHandler>,
  on_exit: impl FnOnce() + Send + 'static,
) {
  std::thread::spawn(move || {
    connection::run_read_loop(id, stream, binary_mode, handler);
    on_exit();
  });
}
