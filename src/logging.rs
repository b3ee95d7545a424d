//! Structured logging for arena lifecycle events.
//!
//! Every event is emitted under the `vmarena` target. Region-level events
//! (reserve, grow, release) log at DEBUG, per-allocation events at TRACE, so
//! a default `info` filter keeps the hot path silent.

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt};

use tracing::{debug, trace, warn};

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Installs a compact fmt subscriber filtered by `RUST_LOG`.
///
/// Falls back to `vmarena=info` (or `vmarena=debug` in debug builds). Safe to
/// call more than once; only the first call does anything, and an already
/// installed global subscriber is left in place.
pub fn init() {
  LOGGER_INITIALIZED.get_or_init(|| {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      if cfg!(debug_assertions) {
        EnvFilter::new("vmarena=debug")
      } else {
        EnvFilter::new("vmarena=info")
      }
    });

    fmt()
      .with_env_filter(filter)
      .compact()
      .with_target(true)
      .try_init()
      .ok();
  });
}

pub fn is_initialized() -> bool {
  LOGGER_INITIALIZED.get().is_some()
}

#[inline]
pub(crate) fn log_create(
  region: *const u8,
  commit_size: usize,
  reserve_size: usize,
) {
  debug!(
    target: "vmarena",
    region = ?region,
    commit_size,
    reserve_size,
    "arena created"
  );
}

#[inline]
pub(crate) fn log_push(
  offset: usize,
  size: usize,
  align: usize,
) {
  trace!(target: "vmarena", offset, size, align, "push");
}

#[inline]
pub(crate) fn log_grow(
  from: usize,
  to: usize,
  reserved: usize,
) {
  debug!(
    target: "vmarena",
    from,
    to,
    reserved,
    "committed more arena memory"
  );
}

#[inline]
pub(crate) fn log_pop(
  from: usize,
  to: usize,
) {
  trace!(target: "vmarena", from, to, "pop");
}

#[inline]
pub(crate) fn log_release(
  region: *const u8,
  committed: usize,
  reserved: usize,
) {
  debug!(
    target: "vmarena",
    region = ?region,
    committed,
    reserved,
    "arena released"
  );
}

#[inline]
pub(crate) fn log_os_failure(
  operation: &'static str,
  error: &std::io::Error,
) {
  warn!(target: "vmarena", operation, %error, "virtual memory call failed");
}
