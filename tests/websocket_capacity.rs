#[path = "common/mod.rs"]
mod common;

use plinth::client::WebSocketClient;

#[test]
fn a_full_endpoint_rejects_new_connections_with_503() {
  let (server, port) = common::start_server();
  let _token = server.add_text_websocket("/chat", 1, |_sender| Box::new(|_message| {}));

  let first = WebSocketClient::connect(&format!("ws://127.0.0.1:{port}/chat"), |_message| {}).expect("first connection should succeed");

  let second = WebSocketClient::connect(&format!("ws://127.0.0.1:{port}/chat"), |_message| {});
  assert!(second.is_err(), "endpoint at capacity should refuse a second connection");

  first.close();
}
