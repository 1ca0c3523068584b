//! Per-connection WebSocket state: the synchronous send path and the background read loop.

use crate::error::{Error, FrameError, Result};
use crate::stream::ConnectionStream;
use crate::websocket::frame::{Frame, Opcode};
use crate::websocket::message::Message;
use crate::{debug_log, trace_log, warn_log};

/// The maximum size of a single WebSocket frame this crate will read or write.
pub const MAX_FRAME_PAYLOAD: u64 = 8 * 1024 * 1024;

/// Receives messages on a WebSocket connection. Implement this (or pass a closure) in a
/// connection factory passed to `Server::add_text_websocket`/`add_binary_websocket`.
pub trait WebSocketHandler: Send + Sync {
  /// Called once per reassembled message, on the connection's dedicated reader thread.
  fn on_message(&self, message: Message);

  /// Called once when the connection closes (peer close, error, or endpoint teardown).
  fn on_close(&self) {}
}

impl<F: Fn(Message) + Send + Sync> WebSocketHandler for F {
  fn on_message(&self, message: Message) {
    self(message)
  }
}

/// The write half of a WebSocket connection, handed to a connection factory. Cloning shares the
/// same underlying stream (and therefore the same write lock — see `stream::PlainStream`/
/// `tls::TlsStream` — so sends from two clones still serialize one at a time).
pub struct Sender {
  stream: Box<dyn ConnectionStream>,
  binary_mode: bool,
}

impl Clone for Sender {
  fn clone(&self) -> Self {
    Sender { stream: self.stream.try_clone(), binary_mode: self.binary_mode }
  }
}

impl Sender {
  pub(crate) fn new(stream: Box<dyn ConnectionStream>, binary_mode: bool) -> Self {
    Sender { stream, binary_mode }
  }

  /// Sends `message`, blocking until the frame is fully written. Fails the call on I/O error;
  /// does not retry.
  pub fn send(&self, message: impl Into<Vec<u8>>) -> Result<()> {
    let opcode = if self.binary_mode { Opcode::Binary } else { Opcode::Text };
    let frame = Frame::new(opcode, message.into());
    let bytes: Vec<u8> = frame.into();
    self.stream.write_all(&bytes)?;
    Ok(())
  }

  /// The remote peer's address, for diagnostics.
  pub fn peer_addr(&self) -> std::io::Result<String> {
    self.stream.peer_addr()
  }

  fn send_pong(&self) -> Result<()> {
    let bytes: Vec<u8> = Frame::new(Opcode::Pong, Vec::new()).into();
    self.stream.write_all(&bytes)?;
    Ok(())
  }

  fn send_close(&self) {
    let bytes: Vec<u8> = Frame::new(Opcode::Close, Vec::new()).into();
    let _ = self.stream.write_all(&bytes);
  }
}

/// Runs the blocking read loop for one accepted WebSocket connection on the current thread.
/// Reassembles fragmented messages (continuation frames), answers pings with pongs, and
/// delivers complete messages to `handler.on_message`. Returns once the connection is no longer
/// readable; the caller is responsible for unregistering the connection afterwards.
pub(crate) fn run_read_loop(
  id: u64,
  stream: Box<dyn ConnectionStream>,
  binary_mode: bool,
  handler: Box<dyn WebSocketHandler>,
) {
  let sender = Sender::new(stream.try_clone(), binary_mode);
  let mut pending: Vec<Frame> = Vec::new();

  loop {
    let frame = match Frame::read_from(stream.as_ref(), MAX_FRAME_PAYLOAD) {
      Ok(frame) => frame,
      Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
        trace_log!("websocket connection {id} closed by peer");
        break;
      }
      Err(Error::Frame(FrameError::PayloadTooLarge(len))) => {
        warn_log!("websocket connection {id} sent an oversized frame ({len} bytes), closing");
        sender.send_close();
        break;
      }
      Err(e) => {
        warn_log!("websocket connection {id} read error: {e}");
        break;
      }
    };

    match frame.opcode() {
      Opcode::Ping => {
        if sender.send_pong().is_err() {
          break;
        }
        continue;
      }
      Opcode::Pong => continue,
      Opcode::Close => {
        sender.send_close();
        break;
      }
      Opcode::Continuation if pending.is_empty() => {
        warn_log!("websocket connection {id} sent a continuation frame with no prior fragment");
        break;
      }
      _ => {}
    }

    let fin = frame.fin;
    pending.push(frame);

    if !fin {
      continue;
    }

    let frames = std::mem::take(&mut pending);
    let opcode = frames[0].opcode();
    let mut payload = Vec::with_capacity(frames.iter().map(|f| f.payload().len()).sum());
    for frame in frames {
      payload.extend_from_slice(frame.payload());
    }

    let message = match opcode {
      Opcode::Text => match String::from_utf8(payload) {
        Ok(text) => Message::Text(text),
        Err(_) => {
          warn_log!("websocket connection {id} sent non-UTF-8 text frame, closing");
          sender.send_close();
          break;
        }
      },
      Opcode::Binary => Message::Binary(payload),
      _ => {
        warn_log!("websocket connection {id} started a message with opcode {opcode:?}");
        break;
      }
    };

    handler.on_message(message);
  }

  handler.on_close();
  debug_log!("websocket connection {id} reader thread exiting");
}
