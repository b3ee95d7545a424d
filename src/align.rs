/// Rounds `value` up to the next multiple of `align`.
///
/// `align` must be a power of two.
///
/// # Examples
///
/// ```rust
/// use vmarena::align_up;
///
/// assert_eq!(align_up!(13, 8), 16);
/// assert_eq!(align_up!(4096, 4096), 4096);
/// assert_eq!(align_up!(4097, 4096), 8192);
/// ```
#[macro_export]
macro_rules! align_up {
  ($value:expr, $align:expr) => {
    $crate::align::align_up($value, $align)
  };
}

/// Function form of [`align_up!`], usable in `const` contexts.
#[inline(always)]
pub const fn align_up(
  value: usize,
  align: usize,
) -> usize {
  debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
  (value.wrapping_add(align).wrapping_sub(1)) & !align.wrapping_sub(1)
}

/// Same as [`align_up`] but returns `None` instead of wrapping past `usize::MAX`.
#[inline]
pub const fn checked_align_up(
  value: usize,
  align: usize,
) -> Option<usize> {
  debug_assert!(align.is_power_of_two(), "alignment must be a power of two");
  match value.checked_add(align - 1) {
    Some(bumped) => Some(bumped & !(align - 1)),
    None => None,
  }
}

#[inline]
pub const fn is_aligned(
  value: usize,
  align: usize,
) -> bool {
  value & (align - 1) == 0
}

/// `n` kibibytes in bytes.
pub const fn kib(n: usize) -> usize {
  n * 1024
}

/// `n` mebibytes in bytes.
pub const fn mib(n: usize) -> usize {
  n * 1024 * 1024
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align_up() {
    let mut cases = Vec::new();

    for align in [1usize, 2, 4, 8, 16, 4096] {
      for i in 0..10 {
        let sizes = (align * i + 1)..=(align * (i + 1));
        cases.push((align, sizes, align * (i + 1)));
      }
    }

    for (align, sizes, expected) in cases {
      for size in sizes {
        assert_eq!(expected, align_up!(size, align));
      }
    }

    assert_eq!(align_up(0, 8), 0);
  }

  #[test]
  fn test_checked_align_up() {
    assert_eq!(checked_align_up(9, 8), Some(16));
    assert_eq!(checked_align_up(usize::MAX, 1), Some(usize::MAX));
    assert_eq!(checked_align_up(usize::MAX - 2, 8), None);
  }

  #[test]
  fn test_is_aligned() {
    assert!(is_aligned(0, 16));
    assert!(is_aligned(64, 16));
    assert!(!is_aligned(65, 16));
  }

  #[test]
  fn test_sizes() {
    assert_eq!(kib(64), 65_536);
    assert_eq!(mib(64), 67_108_864);
  }
}
