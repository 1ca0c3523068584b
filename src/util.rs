//! Small shared helpers: id allocation, poison recovery, internal-invariant panics.

use std::io;
use std::sync::LockResult;

fn do_abort() -> ! {
  unreachable!(
    "A condition that should be unreachable was reached. This is a bug in plinth itself."
  );
}

/// Panics with a consistent message. Used for states the route table / supervisor guarantee
/// cannot occur (e.g. a captured group count mismatch after a pattern has already matched).
pub fn unreachable() -> ! {
  do_abort()
}

pub fn unwrap_some<T>(some: Option<T>) -> T {
  match some {
    Some(t) => t,
    None => do_abort(),
  }
}

pub fn unwrap_poison<T>(result: LockResult<T>) -> io::Result<T> {
  result.map_err(|_| io::Error::new(io::ErrorKind::Other, "poisoned mutex"))
}

mod counter {
  use std::sync::atomic::AtomicU64;
  use std::sync::atomic::Ordering;
  use std::time::{SystemTime, UNIX_EPOCH};

  static TIME: AtomicU64 = AtomicU64::new(0);
  static COUNTER: AtomicU64 = AtomicU64::new(0);

  pub fn next() -> u64 {
    let mut time = TIME.load(Ordering::Relaxed);
    if time == 0 {
      time =
        SystemTime::now().duration_since(UNIX_EPOCH).map(|a| a.as_secs()).unwrap_or_default();

      if let Err(t) = TIME.compare_exchange(0, time, Ordering::Relaxed, Ordering::Relaxed) {
        time = t;
      }
    }
    let _ = time;
    COUNTER.fetch_add(1, Ordering::SeqCst)
  }
}

/// Monotonically increasing id, unique per process. Used for request ids and connection ids.
pub fn next_id() -> u64 {
  counter::next()
}

#[cfg(feature = "log")]
#[macro_export]
/// Calls log::trace! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! trace_log {
    ($($arg:tt)+) => (log::log!(log::Level::Trace, $($arg)+))
}

#[cfg(not(feature = "log"))]
#[macro_export]
/// Calls log::trace! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! trace_log {
  ($($arg:tt)+) => {
      let _ = &($($arg)+);
  }
}

#[cfg(feature = "log")]
#[macro_export]
/// Calls log::debug! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! debug_log {
    ($($arg:tt)+) => (log::log!(log::Level::Debug, $($arg)+))
}

#[cfg(not(feature = "log"))]
#[macro_export]
/// Calls log::debug! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! debug_log {
  ($($arg:tt)+) => {
      let _ = &($($arg)+);
  }
}

#[cfg(feature = "log")]
#[macro_export]
/// Calls log::info! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! info_log {
    ($($arg:tt)+) => (log::log!(log::Level::Info, $($arg)+))
}

#[cfg(not(feature = "log"))]
#[macro_export]
/// Calls log::info! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! info_log {
  ($($arg:tt)+) => {
      let _ = &($($arg)+);
  }
}

#[cfg(feature = "log")]
#[macro_export]
/// Calls log::warn! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! warn_log {
    ($($arg:tt)+) => (log::log!(log::Level::Warn, $($arg)+))
}

#[cfg(not(feature = "log"))]
#[macro_export]
/// Calls log::warn! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! warn_log {
  ($($arg:tt)+) => {
      let _ = &($($arg)+);
  }
}

#[cfg(feature = "log")]
#[macro_export]
/// Calls log::error! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! error_log {
    ($($arg:tt)+) => (log::log!(log::Level::Error, $($arg)+))
}

#[cfg(not(feature = "log"))]
#[macro_export]
/// Calls log::error! when the `log` feature is enabled, otherwise compiles to nothing.
macro_rules! error_log {
  ($($arg:tt)+) => {
      let _ = &($($arg)+);
  }
}
