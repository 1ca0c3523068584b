//! HTTP/1.1 request parsing, response building, and the supporting header/status/MIME types.

pub mod headers;
pub mod method;
pub mod mime;
pub mod request;
pub mod response;
pub mod status;

pub use headers::Headers;
pub use method::Method;
pub use request::{Request, RequestHead};
pub use response::Response;
pub use status::StatusCode;
