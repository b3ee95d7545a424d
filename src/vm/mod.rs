//! Virtual memory primitives.
//!
//! The arena never talks to the OS directly; it goes through [`VirtualMemory`]
//! so the same bump logic runs on every platform (and under test doubles).
//!
//! ```text
//!   reserve ──▶ commit ──▶ (use) ──▶ decommit ──▶ release
//!      │          ▲                      │
//!      │          └──────────────────────┘  (may be re-committed)
//!      └── address space only, no access, no physical pages
//! ```

use std::{io, ptr::NonNull};

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::SystemMemory;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::SystemMemory;

/// Reserve/commit/decommit/release over a contiguous address range.
///
/// Every size and pointer handed to these methods by the arena is a multiple
/// of [`VirtualMemory::page_size`].
pub trait VirtualMemory {
  /// Granularity of every other operation, in bytes. Always a power of two.
  fn page_size(&self) -> usize;

  /// Reserves `size` bytes of address space with no access and no backing.
  ///
  /// Returns `None` when the address space cannot be reserved.
  fn reserve(
    &self,
    size: usize,
  ) -> Option<NonNull<u8>>;

  /// Makes `[ptr, ptr + size)` readable and writable.
  ///
  /// # Safety
  ///
  /// The range must lie inside a region returned by [`VirtualMemory::reserve`]
  /// that has not been released. Committing an already committed range is allowed.
  unsafe fn commit(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()>;

  /// Drops the physical backing of `[ptr, ptr + size)` and revokes access.
  ///
  /// # Safety
  ///
  /// Same range requirements as [`VirtualMemory::commit`]. Nothing may read or
  /// write the range afterwards until it is committed again.
  unsafe fn decommit(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()>;

  /// Returns the whole reservation to the OS.
  ///
  /// # Safety
  ///
  /// `ptr` and `size` must describe exactly one region returned by
  /// [`VirtualMemory::reserve`]. The region is invalid afterwards.
  unsafe fn release(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()>;
}

impl<V: VirtualMemory + ?Sized> VirtualMemory for &V {
  fn page_size(&self) -> usize {
    (**self).page_size()
  }

  fn reserve(
    &self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    (**self).reserve(size)
  }

  unsafe fn commit(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()> {
    unsafe { (**self).commit(ptr, size) }
  }

  unsafe fn decommit(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()> {
    unsafe { (**self).decommit(ptr, size) }
  }

  unsafe fn release(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()> {
    unsafe { (**self).release(ptr, size) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_page_size_is_power_of_two() {
    let page = SystemMemory.page_size();
    assert!(page.is_power_of_two());
    assert!(page >= 4096);
  }

  #[test]
  fn test_reserve_commit_roundtrip() {
    let vm = SystemMemory;
    let page = vm.page_size();
    let size = page * 4;

    let base = vm.reserve(size).expect("reserve");

    unsafe {
      vm.commit(base, page * 2).expect("commit");
      // Committing again is fine.
      vm.commit(base, page).expect("recommit");

      let bytes = base.as_ptr();
      bytes.write(0xAB);
      bytes.add(page * 2 - 1).write(0xCD);
      assert_eq!(bytes.read(), 0xAB);
      assert_eq!(bytes.add(page * 2 - 1).read(), 0xCD);

      vm.decommit(base, page * 2).expect("decommit");
      vm.decommit(base, page * 2).expect("decommit twice");

      // Fresh commit after decommit hands back zeroed pages.
      vm.commit(base, page).expect("commit after decommit");
      assert_eq!(bytes.read(), 0);

      vm.release(base, size).expect("release");
    }
  }
}
