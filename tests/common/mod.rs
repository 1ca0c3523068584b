#![allow(dead_code)]

use plinth::{Server, ServerBuilder};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

pub fn start_server() -> (Arc<Server>, u16) {
  let server = ServerBuilder::new()
    .with_read_timeout(Some(Duration::from_secs(5)))
    .unwrap()
    .with_write_timeout(Some(Duration::from_secs(5)))
    .unwrap()
    .build();
  server.start("http://127.0.0.1:0").expect("server should bind");
  let port = server.port().expect("port should be known after start");
  (server, port)
}

/// Sends a raw request and returns the full response text (status line, headers, body).
pub fn raw_request(port: u16, request: &str) -> String {
  let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("connect");
  stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
  stream.write_all(request.as_bytes()).unwrap();
  stream.shutdown(std::net::Shutdown::Write).ok();
  let mut response = String::new();
  stream.read_to_string(&mut response).ok();
  response
}
