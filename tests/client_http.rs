#[path = "common/mod.rs"]
mod common;

use plinth::{Method, Response, StatusCode};
use std::io::Write;
use std::net::TcpListener;

#[test]
fn get_retrieves_a_registered_route() {
  let (server, port) = common::start_server();
  let _token = server.add_route(Method::Get, "/greeting", |_req| Ok(Response::ok("hello there"))).unwrap();

  let response = plinth::client::get(&format!("http://127.0.0.1:{port}/greeting"), &[], None).unwrap();
  assert_eq!(response.status().code(), 200);
  assert_eq!(response.body(), b"hello there");
}

#[test]
fn post_round_trips_a_body() {
  let (server, port) = common::start_server();
  let _token = server
    .add_route(Method::Post, "/echo", |req| {
      let mut body = req.body().to_vec();
      body.extend_from_slice(b"!");
      Ok(Response::new(StatusCode::OK).with_body(body))
    })
    .unwrap();

  let response = plinth::client::post(&format!("http://127.0.0.1:{port}/echo"), &[], b"abc", None).unwrap();
  assert_eq!(response.status().code(), 200);
  assert_eq!(response.body(), b"abc!");
}

#[test]
fn put_patch_and_delete_reach_their_handlers() {
  let (server, port) = common::start_server();
  let _put = server.add_route(Method::Put, "/item", |_req| Ok(Response::ok("put-ok"))).unwrap();
  let _patch = server.add_route(Method::Patch, "/item", |_req| Ok(Response::ok("patch-ok"))).unwrap();
  let _delete = server.add_route(Method::Delete, "/item", |_req| Ok(Response::ok("delete-ok"))).unwrap();

  let url = format!("http://127.0.0.1:{port}/item");
  assert_eq!(plinth::client::put(&url, &[], b"", None).unwrap().body(), b"put-ok");
  assert_eq!(plinth::client::patch(&url, &[], b"", None).unwrap().body(), b"patch-ok");
  assert_eq!(plinth::client::delete(&url, &[], None).unwrap().body(), b"delete-ok");
}

#[test]
fn custom_request_headers_are_forwarded() {
  let (server, port) = common::start_server();
  let _token = server
    .add_route(Method::Get, "/whoami", |req| {
      let name = req.header("X-Caller").unwrap_or("anonymous").to_string();
      Ok(Response::ok(name))
    })
    .unwrap();

  let response = plinth::client::get(&format!("http://127.0.0.1:{port}/whoami"), &[("X-Caller", "tester")], None).unwrap();
  assert_eq!(response.body(), b"tester");
}

#[test]
fn connecting_to_a_closed_port_fails() {
  let response = plinth::client::get("http://127.0.0.1:1", &[], None);
  assert!(response.is_err());
}

#[test]
fn non_200_status_is_raised_as_an_error() {
  let (server, port) = common::start_server();
  let _token = server
    .add_route(Method::Get, "/missing", |_req| Ok(Response::new(StatusCode::NOT_FOUND)))
    .unwrap();

  let response = plinth::client::get(&format!("http://127.0.0.1:{port}/missing"), &[], None);
  assert!(response.is_err(), "{response:?}");
}

#[test]
fn missing_content_length_is_raised_as_an_error() {
  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  let port = listener.local_addr().unwrap().port();

  std::thread::spawn(move || {
    if let Ok((mut stream, _)) = listener.accept() {
      let _ = stream.write_all(b"HTTP/1.1 200 OK\r\n\r\n");
    }
  });

  let response = plinth::client::get(&format!("http://127.0.0.1:{port}/"), &[], None);
  assert!(response.is_err(), "{response:?}");
}
