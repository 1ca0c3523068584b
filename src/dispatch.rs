//! The dispatch pipeline: matches an inbound request against routes, directory mounts, and
//! WebSocket endpoints, and turns the result into a response — or, for a WebSocket upgrade that
//! clears its endpoint's capacity gate, hands the connection off to its own reader thread.
//!
//! Route lookup happens under the route table's lock, but the lock is released before the
//! matched handler runs: [`crate::route::table::Route::handler`] clones the `Arc<Handler>` out
//! while the guard is held, and the guard is dropped before the handler is invoked.

use crate::error::{Error, HandlerError, RequestHeadError, Result};
use crate::http::request::{Request, RequestHead};
use crate::http::response::Response;
use crate::http::status::StatusCode;
use crate::server::Server;
use crate::stream::Transport;
use crate::websocket;
use crate::{debug_log, warn_log};

/// What the dispatch pipeline did with one request.
pub enum Outcome {
  /// A response to write back to the client; the keep-alive loop continues.
  Respond(Response),
  /// The connection was upgraded to a WebSocket; a reader thread now owns the socket and the
  /// keep-alive loop must stop touching it.
  Upgraded,
}

fn handler_error_response(error: &HandlerError) -> Response {
  let mut response = Response::new(*error.status());
  if let Some(message) = error.message() {
    response = response.with_reason(message.to_string());
  }
  response
}

/// Dispatches one parsed request head against `server`'s routes, directory mounts, and
/// WebSocket endpoints.
pub fn dispatch(server: &Server, stream: &Transport, head: &RequestHead) -> Result<Outcome> {
  if head.is_upgrade("websocket") {
    return upgrade_websocket(server, stream, head);
  }

  let body = head.read_body(stream, server.max_body_size())?;

  let matched = {
    let table = crate::util::unwrap_poison(server.routes().lock())?;
    table.lookup(head.method(), head.path()).map(|(route, params)| (route.handler(), params))
  };

  if let Some((handler, params)) = matched {
    let request = Request::new(head, params, body);
    let response = match handler(&request) {
      Ok(response) => response,
      Err(error) => handler_error_response(&error),
    };
    return Ok(Outcome::Respond(response));
  }

  if let Some(handler) = server.match_directory(head.path()) {
    let request = Request::new(head, Vec::new(), body);
    return Ok(Outcome::Respond(handler(&request)));
  }

  debug_log!("no route matched {} {}", head.method(), head.path());
  let request = Request::new(head, Vec::new(), body);
  Ok(Outcome::Respond((server.not_found_handler())(&request)))
}

fn upgrade_websocket(server: &Server, stream: &Transport, head: &RequestHead) -> Result<Outcome> {
  let key = head
    .headers()
    .get("Sec-WebSocket-Key")
    .ok_or_else(|| Error::from(RequestHeadError::MissingSecWebSocketKey))?
    .to_string();

  let endpoint = match server.find_websocket_endpoint(head.path()) {
    Some(endpoint) => endpoint,
    None => return Ok(Outcome::Respond(Response::new(StatusCode::NOT_FOUND))),
  };

  let id = match endpoint.try_reserve(stream.try_clone()) {
    Some(id) => id,
    None => {
      warn_log!("websocket endpoint {} rejected a connection: at capacity", head.path());
      return Ok(Outcome::Respond(Response::new(StatusCode::SERVICE_UNAVAILABLE)));
    }
  };

  let response = Response::new(StatusCode::SWITCHING_PROTOCOLS)
    .with_header("Upgrade", "websocket")
    .with_header("Connection", "Upgrade")
    .with_header("Sec-WebSocket-Accept", websocket::accept_key(&key));
  response.write_to(stream, head.version())?;

  let sender = websocket::Sender::new(stream.try_clone(), endpoint.binary_mode());
  let handler = (endpoint.factory())(sender);

  let endpoint_for_release = endpoint.clone();
  websocket::supervisor::spawn_connection(id, stream.try_clone(), endpoint.binary_mode(), handler, move || {
    endpoint_for_release.release(id);
  });

  debug_log!("websocket connection {id} upgraded at {}", head.path());
  Ok(Outcome::Upgraded)
}
