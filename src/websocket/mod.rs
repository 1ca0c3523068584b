//! WebSocket support: frame codec, connection state, message types, and the per-path endpoint
//! supervisor. The handshake itself (computing `Sec-WebSocket-Accept`) lives here since it's
//! shared between the dispatch pipeline (server side) and nothing else.

pub mod connection;
pub mod frame;
pub mod message;
pub mod supervisor;

pub use connection::{Sender, WebSocketHandler};
pub use message::Message;
pub use supervisor::WsEndpoint;

use base64::prelude::{Engine, BASE64_STANDARD};
use sha1::{Digest, Sha1};

/// The GUID RFC 6455 mixes into the handshake key, per §1.3.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes the `Sec-WebSocket-Accept` header value for a given `Sec-WebSocket-Key` request
/// header value.
pub(crate) fn accept_key(request_key: &str) -> String {
  let mut hasher = Sha1::new();
  hasher.update(request_key.as_bytes());
  hasher.update(WEBSOCKET_GUID.as_bytes());
  BASE64_STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn computes_the_rfc6455_example_accept_key() {
    // the example key/accept pair from RFC 6455 §1.3
    assert_eq!(accept_key("dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
  }
}
