#[path = "common/mod.rs"]
mod common;

#[test]
fn serves_a_file_under_the_mount_prefix() {
  let (server, port) = common::start_server();

  let dir = std::env::temp_dir().join(format!("plinth-it-{}", std::process::id()));
  std::fs::create_dir_all(&dir).unwrap();
  std::fs::write(dir.join("hello.txt"), b"hello from disk").unwrap();
  let _token = server.add_directory("/static", dir.clone());

  let response = common::raw_request(port, "GET /static/hello.txt HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(response.starts_with("HTTP/1.1 200"), "{response}");
  assert!(response.ends_with("hello from disk"), "{response}");

  std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn bare_directory_request_redirects_to_trailing_slash() {
  let (server, port) = common::start_server();

  let dir = std::env::temp_dir().join(format!("plinth-it-dir-{}", std::process::id()));
  std::fs::create_dir_all(dir.join("sub")).unwrap();
  std::fs::write(dir.join("sub").join("index.html"), b"<html/>").unwrap();
  let _token = server.add_directory("/static", dir.clone());

  let response = common::raw_request(port, "GET /static/sub HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
  assert!(response.starts_with("HTTP/1.1 301"), "{response}");
  assert!(response.contains("Location: /static/sub/"), "{response}");

  std::fs::remove_dir_all(&dir).ok();
}
