//! plinth is an embeddable HTTP/1.1 + WebSocket server library: a dynamic route table that can
//! be changed at runtime, directory mounts, optional TLS, and a companion blocking client.
//! With a dependency-light error type and no async runtime, it stays quick to compile and
//! predictable to reason about when embedded inside a larger application.

#![warn(missing_docs)]

pub mod client;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod route;
pub mod server;
pub mod stream;
pub mod token;
pub mod websocket;

#[cfg(feature = "tls")]
pub mod tls;

mod util;

pub use error::{Error, Result};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerBuilder};
pub use token::{Token, TokenHolder};
pub use websocket::{Message, Sender as WebSocketSender, WebSocketHandler};
