#[path = "common/mod.rs"]
mod common;

use plinth::error::HandlerError;
use plinth::{Method, Response, StatusCode};

#[test]
fn dispatches_a_registered_route() {
  let (server, port) = common::start_server();
  let _token = server
    .add_route(Method::Get, "/dummy", |_req| Ok(Response::ok("Okay!")))
    .unwrap();

  let response = common::raw_request(port, "GET /dummy HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
  assert!(response.ends_with("Okay!"), "{response}");
}

#[test]
fn route_stops_matching_once_its_token_is_dropped() {
  let (server, port) = common::start_server();
  let token = server.add_route(Method::Get, "/temp", |_req| Ok(Response::ok("here"))).unwrap();

  let first = common::raw_request(port, "GET /temp HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(first.starts_with("HTTP/1.1 200"), "{first}");

  drop(token);

  let second = common::raw_request(port, "GET /temp HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(second.starts_with("HTTP/1.1 404"), "{second}");
}

#[test]
fn handler_error_translates_to_its_status() {
  let (server, port) = common::start_server();
  let _token = server
    .add_route(Method::Get, "/boom", |_req| Err(HandlerError::with_message(StatusCode::CONFLICT, "nope")))
    .unwrap();

  let response = common::raw_request(port, "GET /boom HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  let status_line = response.lines().next().unwrap_or("");
  assert_eq!(status_line, "HTTP/1.1 409 nope");
}

#[test]
fn handler_error_with_no_message_uses_the_default_reason() {
  let (server, port) = common::start_server();
  let _token = server
    .add_route(Method::Get, "/boom-quiet", |_req| Err(HandlerError::new(StatusCode::BAD_GATEWAY)))
    .unwrap();

  let response = common::raw_request(port, "GET /boom-quiet HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  let status_line = response.lines().next().unwrap_or("");
  assert_eq!(status_line, "HTTP/1.1 502 Bad Gateway");
}

#[test]
fn unmatched_path_falls_back_to_not_found() {
  let (_server, port) = common::start_server();
  let response = common::raw_request(port, "GET /nowhere HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(response.starts_with("HTTP/1.1 404"), "{response}");
}
