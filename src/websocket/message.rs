//! A reassembled WebSocket message, handed to [`super::WebSocketHandler::on_message`].

/// A complete WebSocket message (fragmented frames already reassembled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
  /// A UTF-8 text message.
  Text(String),
  /// A binary message.
  Binary(Vec<u8>),
}

impl Message {
  /// The payload as a string, decoding a binary message as UTF-8 if possible.
  pub fn text(&self) -> Option<&str> {
    match self {
      Message::Text(s) => Some(s.as_str()),
      Message::Binary(b) => std::str::from_utf8(b).ok(),
    }
  }

  /// The payload as raw bytes.
  pub fn bytes(&self) -> &[u8] {
    match self {
      Message::Text(s) => s.as_bytes(),
      Message::Binary(b) => b.as_slice(),
    }
  }
}
