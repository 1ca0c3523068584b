//! The route table: URI pattern compilation and per-method, per-base-URI lookup.

pub mod pattern;
pub mod table;

pub use pattern::Pattern;
pub use table::{Handler, Route, RouteTable};
