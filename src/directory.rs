//! Directory mount: serves files from a filesystem path under a registered URI prefix.

use crate::http::mime::mime_for_path;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::StatusCode;
use crate::warn_log;
use std::fs;
use std::path::{Path, PathBuf};

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

enum Located {
  Directory,
  File(PathBuf),
}

/// Looks up `request_path` (the portion of the URI after the mount prefix) under `root`,
/// rejecting `..` and `:` outright to avoid escaping the mount root or smuggling a drive-style
/// path. Falls back to `index.html`/`index.htm` for directory-shaped requests.
fn try_find_path(root: &Path, request_path: &str) -> Option<Located> {
  if request_path.contains("..") || request_path.contains(':') {
    return None;
  }

  let request_path = request_path.trim_start_matches('/');

  if request_path.is_empty() || request_path.ends_with('/') {
    for filename in INDEX_FILES {
      let candidate = root.join(request_path).join(filename);
      if let Ok(meta) = fs::metadata(&candidate) {
        if meta.is_file() {
          return Some(Located::File(candidate));
        }
      }
    }
    return None;
  }

  let candidate = root.join(request_path);
  let meta = fs::metadata(&candidate).ok()?;
  if meta.is_file() {
    Some(Located::File(candidate))
  } else if meta.is_dir() {
    Some(Located::Directory)
  } else {
    None
  }
}

/// Serves a filesystem subtree mounted at `uri_prefix`. Request paths resolve to
/// `<root>/<path-after-prefix>`; a request for a directory without a trailing `/` redirects to
/// the slash-suffixed form, and a directory *with* the trailing slash serves `index.html`/
/// `index.htm` if present.
pub fn serve_directory(root: impl Into<PathBuf>, uri_prefix: &str) -> impl Fn(&Request) -> Response {
  let root = root.into();
  let uri_prefix = uri_prefix.strip_suffix('/').unwrap_or(uri_prefix).to_string();

  move |request: &Request| {
    let remainder = request.uri().strip_prefix(uri_prefix.as_str()).unwrap_or(request.uri());

    match try_find_path(&root, remainder) {
      Some(Located::Directory) => {
        Response::new(StatusCode::MOVED_PERMANENTLY).with_header("Location", format!("{}/", request.uri()))
      }
      Some(Located::File(path)) => match fs::read(&path) {
        Ok(body) => {
          let mime = mime_for_path(&path);
          Response::new(StatusCode::OK).with_header("Content-Type", mime).with_body(body)
        }
        Err(e) => {
          warn_log!("directory mount failed to read {}: {e}", path.display());
          Response::new(StatusCode::INTERNAL_SERVER_ERROR)
        }
      },
      None => Response::new(StatusCode::NOT_FOUND),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_parent_directory_traversal() {
    let dir = std::env::temp_dir();
    assert!(try_find_path(&dir, "/../etc/passwd").is_none());
  }

  #[test]
  fn rejects_colon_in_path() {
    let dir = std::env::temp_dir();
    assert!(try_find_path(&dir, "/C:/secrets").is_none());
  }

  #[test]
  fn serves_a_real_file() {
    let dir = tempdir();
    std::fs::write(dir.join("hello.txt"), b"hi").unwrap();
    match try_find_path(&dir, "/hello.txt") {
      Some(Located::File(path)) => assert_eq!(std::fs::read(path).unwrap(), b"hi"),
      _ => panic!("expected a file"),
    }
  }

  #[test]
  fn serves_index_html_for_directory_request() {
    let dir = tempdir();
    std::fs::write(dir.join("index.html"), b"<html/>").unwrap();
    match try_find_path(&dir, "/") {
      Some(Located::File(path)) => assert_eq!(std::fs::read(path).unwrap(), b"<html/>"),
      _ => panic!("expected index.html"),
    }
  }

  fn tempdir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("plinth-test-{}", crate::util::next_id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
  }
}
