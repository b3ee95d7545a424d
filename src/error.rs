//! Arena error types.
//!
//! The allocator treats every one of these as a broken precondition: the
//! primary API logs the error and panics. The `try_*` entry points hand the
//! same value back instead, for callers that sit at an outer boundary.

use std::error::Error;
use std::fmt;

/// Everything that can stop an arena operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
  /// The OS refused to reserve the address range.
  ReserveFailed {
    /// Bytes of address space requested.
    size: usize,
  },
  /// The OS refused to back a reserved range with memory.
  CommitFailed {
    /// Offset of the range from the region start.
    offset: usize,
    /// Length of the range.
    size: usize,
    /// Raw OS error code, when the OS reported one.
    os_error: Option<i32>,
  },
  /// The arena options cannot describe a valid region.
  InvalidOptions {
    /// Page-rounded commit size.
    commit_size: usize,
    /// Page-rounded reserve size.
    reserve_size: usize,
  },
  /// Growing the commitment would pass the end of the reservation.
  OutOfMemory {
    /// Bytes requested by the push.
    requested: usize,
    /// Bytes committed when the push failed.
    committed: usize,
    /// Bytes reserved for the arena.
    reserved: usize,
  },
  /// A rollback tried to move the cursor forward.
  InvalidRollback {
    /// Requested cursor position.
    target: usize,
    /// Cursor position at the time of the request.
    pos: usize,
  },
  /// A rollback tried to move the cursor into the arena header.
  RollbackBelowBase {
    /// Requested cursor position.
    target: usize,
    /// First allocatable offset.
    base: usize,
  },
  /// `size + alignment padding` does not fit in a `usize`.
  SizeOverflow {
    /// Bytes requested by the push.
    requested: usize,
  },
}

impl fmt::Display for ArenaError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::ReserveFailed { size } => {
        write!(f, "failed to reserve {size} bytes of address space for arena")
      }
      Self::CommitFailed {
        offset,
        size,
        os_error,
      } => {
        write!(f, "failed to commit {size} bytes at arena offset {offset}")?;
        if let Some(code) = os_error {
          write!(f, " (os error {code})")?;
        }
        Ok(())
      }
      Self::InvalidOptions {
        commit_size,
        reserve_size,
      } => {
        write!(
          f,
          "invalid arena options: commit size {commit_size} exceeds reserve size {reserve_size}"
        )
      }
      Self::OutOfMemory {
        requested,
        committed,
        reserved,
      } => {
        write!(
          f,
          "arena out of memory: not enough reserved space for {requested} bytes \
           ({committed} of {reserved} bytes committed)"
        )
      }
      Self::InvalidRollback { target, pos } => {
        write!(
          f,
          "arena pop to position {target} is greater than current position {pos}"
        )
      }
      Self::RollbackBelowBase { target, base } => {
        write!(
          f,
          "arena pop to position {target} is below the arena base {base}"
        )
      }
      Self::SizeOverflow { requested } => {
        write!(f, "arena allocation of {requested} bytes overflows the address space")
      }
    }
  }
}

impl Error for ArenaError {}

/// Logs `err` and panics with its message.
#[cold]
#[track_caller]
pub(crate) fn fatal(err: ArenaError) -> ! {
  tracing::error!(target: "vmarena", error = %err, "fatal arena error");
  panic!("{err}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_out_of_memory_message() {
    let err = ArenaError::OutOfMemory {
      requested: 10,
      committed: 4096,
      reserved: 4096,
    };
    assert!(err.to_string().starts_with("arena out of memory"));
  }

  #[test]
  fn test_commit_failed_message() {
    let err = ArenaError::CommitFailed {
      offset: 4096,
      size: 4096,
      os_error: Some(12),
    };
    assert_eq!(
      err.to_string(),
      "failed to commit 4096 bytes at arena offset 4096 (os error 12)"
    );
  }

  #[test]
  #[should_panic(expected = "greater than current position")]
  fn test_fatal_panics_with_message() {
    fatal(ArenaError::InvalidRollback { target: 10, pos: 5 });
  }
}
