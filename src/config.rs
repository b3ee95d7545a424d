//! Arena creation options.

use crate::{
  align::{checked_align_up, kib, mib},
  error::ArenaError,
};

/// Environment variable overriding [`ArenaOptions::commit_size`].
pub const COMMIT_SIZE_ENV: &str = "VMARENA_COMMIT_SIZE";
/// Environment variable overriding [`ArenaOptions::reserve_size`].
pub const RESERVE_SIZE_ENV: &str = "VMARENA_RESERVE_SIZE";

/// Sizes used when creating an [`Arena`](crate::Arena).
///
/// Both values are rounded up to the page size at creation time, so any byte
/// count is accepted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaOptions {
  /// Growth increment: how many bytes are committed at once.
  ///
  /// Default: 64 KiB.
  pub commit_size: usize,

  /// Total address space reserved up front. Caps the arena's capacity.
  ///
  /// Default: 64 MiB.
  pub reserve_size: usize,
}

impl ArenaOptions {
  pub const DEFAULT_COMMIT_SIZE: usize = kib(64);
  pub const DEFAULT_RESERVE_SIZE: usize = mib(64);

  pub const fn new() -> Self {
    Self {
      commit_size: Self::DEFAULT_COMMIT_SIZE,
      reserve_size: Self::DEFAULT_RESERVE_SIZE,
    }
  }

  pub const fn commit_size(
    mut self,
    commit_size: usize,
  ) -> Self {
    self.commit_size = commit_size;
    self
  }

  pub const fn reserve_size(
    mut self,
    reserve_size: usize,
  ) -> Self {
    self.reserve_size = reserve_size;
    self
  }

  /// Defaults, overridden by `VMARENA_COMMIT_SIZE` / `VMARENA_RESERVE_SIZE`.
  ///
  /// Values are byte counts with an optional `K`, `M` or `G` suffix
  /// (binary multiples). Values that do not parse are ignored.
  pub fn from_env() -> Self {
    let mut options = Self::new();

    if let Some(size) = size_from_env(COMMIT_SIZE_ENV) {
      options.commit_size = size;
    }
    if let Some(size) = size_from_env(RESERVE_SIZE_ENV) {
      options.reserve_size = size;
    }

    options
  }

  /// Rounds both sizes to `page_size`; a zero commit size becomes one page.
  ///
  /// Fails when rounding would pass `usize::MAX`, or when the rounded commit
  /// size does not fit in the rounded reservation.
  pub(crate) fn page_aligned(
    &self,
    page_size: usize,
  ) -> Result<(usize, usize), ArenaError> {
    let commit_size = checked_align_up(self.commit_size.max(1), page_size).ok_or(
      ArenaError::SizeOverflow {
        requested: self.commit_size,
      },
    )?;
    let reserve_size = checked_align_up(self.reserve_size, page_size).ok_or(
      ArenaError::SizeOverflow {
        requested: self.reserve_size,
      },
    )?;

    if commit_size == 0 || commit_size > reserve_size {
      return Err(ArenaError::InvalidOptions {
        commit_size,
        reserve_size,
      });
    }

    Ok((commit_size, reserve_size))
  }
}

impl Default for ArenaOptions {
  fn default() -> Self {
    Self::new()
  }
}

fn size_from_env(var: &str) -> Option<usize> {
  let raw = std::env::var(var).ok()?;
  let parsed = parse_size(&raw);
  if parsed.is_none() {
    tracing::warn!(target: "vmarena", var, value = %raw, "ignoring unparsable arena size");
  }
  parsed
}

/// Parses `"4096"`, `"64K"`, `"64KiB"`, `"1m"`, `"2G"` into a byte count.
pub fn parse_size(raw: &str) -> Option<usize> {
  let raw = raw.trim();
  let split = raw
    .find(|c: char| !c.is_ascii_digit())
    .unwrap_or(raw.len());
  let (digits, suffix) = raw.split_at(split);
  let value: usize = digits.parse().ok()?;

  let multiplier = match suffix.trim().to_ascii_lowercase().as_str() {
    "" | "b" => 1,
    "k" | "kb" | "kib" => 1 << 10,
    "m" | "mb" | "mib" => 1 << 20,
    "g" | "gb" | "gib" => 1 << 30,
    _ => return None,
  };

  value.checked_mul(multiplier)
}
