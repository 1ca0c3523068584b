#[path = "common/mod.rs"]
mod common;

use plinth::client::WebSocketClient;
use plinth::Message;
use std::sync::mpsc::channel;
use std::time::Duration;

#[test]
fn echoes_text_messages_over_a_real_socket() {
  let (server, port) = common::start_server();
  let _token = server.add_text_websocket("/echo", 0, |sender| {
    Box::new(move |message: Message| {
      if let Some(text) = message.text() {
        let _ = sender.send(text.to_string());
      }
    })
  });

  let (tx, rx) = channel();
  let client = WebSocketClient::connect(&format!("ws://127.0.0.1:{port}/echo"), move |message| {
    tx.send(message).ok();
  })
  .expect("handshake should succeed");

  client.send("hello").unwrap();
  let reply = rx.recv_timeout(Duration::from_secs(5)).expect("should receive an echo");
  assert_eq!(reply, Message::Text("hello".to_string()));

  client.close();
}

#[test]
fn upgrade_on_an_unregistered_path_is_not_found() {
  let (_server, port) = common::start_server();
  let response = common::raw_request(
    port,
    "GET /no-such-endpoint HTTP/1.1\r\nHost: x\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n",
  );
  assert!(response.starts_with("HTTP/1.1 404"), "{response}");
}
