#[path = "common/mod.rs"]
mod common;

use plinth::{Method, Response};

#[test]
fn captures_named_path_parameters() {
  let (server, port) = common::start_server();
  let _token = server
    .add_route(Method::Get, "/users/:id", |req| {
      let id = req.parameter("id").unwrap_or("?").to_string();
      Ok(Response::ok(format!("user={id}")))
    })
    .unwrap();

  let response = common::raw_request(port, "GET /users/42 HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(response.ends_with("user=42"), "{response}");
}

#[test]
fn more_specific_base_uri_wins_over_shorter_one() {
  let (server, port) = common::start_server();
  let _a = server.add_route(Method::Get, "/users", |_req| Ok(Response::ok("list"))).unwrap();
  let _b = server
    .add_route(Method::Get, "/users/:id", |req| Ok(Response::ok(format!("one={}", req.parameter("id").unwrap()))))
    .unwrap();

  let list = common::raw_request(port, "GET /users HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(list.ends_with("list"), "{list}");

  let one = common::raw_request(port, "GET /users/7 HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(one.ends_with("one=7"), "{one}");
}

#[test]
fn query_string_is_parsed_and_decoded() {
  let (server, port) = common::start_server();
  let _token = server
    .add_route(Method::Get, "/search", |req| {
      let q = req.query("q").unwrap_or("").to_string();
      Ok(Response::ok(format!("q={q}")))
    })
    .unwrap();

  let response = common::raw_request(port, "GET /search?q=a%20b HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(response.ends_with("q=a b"), "{response}");
}
