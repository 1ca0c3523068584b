//! Minimal file-extension-to-MIME-type mapping used by directory mounts. Content
//! negotiation (`Accept` matching, quality values) is explicitly out of scope.

/// Returns the MIME type to send for a file with the given extension (no leading dot,
/// case-insensitive), or `application/octet-stream` if the extension isn't recognized.
pub fn mime_for_extension(extension: &str) -> &'static str {
  match extension.to_ascii_lowercase().as_str() {
    "html" | "htm" => "text/html; charset=utf-8",
    "css" => "text/css; charset=utf-8",
    "js" | "mjs" => "text/javascript; charset=utf-8",
    "json" => "application/json",
    "txt" => "text/plain; charset=utf-8",
    "xml" => "application/xml",
    "csv" => "text/csv; charset=utf-8",
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "svg" => "image/svg+xml",
    "ico" => "image/x-icon",
    "webp" => "image/webp",
    "pdf" => "application/pdf",
    "zip" => "application/zip",
    "gz" => "application/gzip",
    "wasm" => "application/wasm",
    "woff" => "font/woff",
    "woff2" => "font/woff2",
    "ttf" => "font/ttf",
    "mp4" => "video/mp4",
    "mp3" => "audio/mpeg",
    "wav" => "audio/wav",
    _ => "application/octet-stream",
  }
}

/// Returns the MIME type for a filesystem path, derived from its extension.
pub fn mime_for_path(path: &std::path::Path) -> &'static str {
  path.extension().and_then(|ext| ext.to_str()).map(mime_for_extension).unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn known_extensions_map() {
    assert_eq!(mime_for_extension("HTML"), "text/html; charset=utf-8");
    assert_eq!(mime_for_extension("png"), "image/png");
  }

  #[test]
  fn unknown_extension_falls_back_to_octet_stream() {
    assert_eq!(mime_for_extension("xyz123"), "application/octet-stream");
  }

  #[test]
  fn path_without_extension_falls_back() {
    assert_eq!(mime_for_path(std::path::Path::new("README")), "application/octet-stream");
  }
}
