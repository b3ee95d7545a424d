use std::{io, ptr, ptr::NonNull};

use libc::{
  _SC_PAGESIZE, MADV_DONTNEED, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_NONE, PROT_READ,
  PROT_WRITE, c_void, madvise, mmap, mprotect, munmap, sysconf,
};
use once_cell::sync::Lazy;

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
  let size = unsafe { sysconf(_SC_PAGESIZE) };
  // POSIX guarantees the query exists; 4 KiB is the smallest page any unix we run on has.
  if size <= 0 { 4096 } else { size as usize }
});

/// `mmap(2)`-backed primitives.
///
/// Reservations are `PROT_NONE` anonymous private mappings; committing flips
/// protection with `mprotect(2)`, decommitting drops pages with `madvise(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemory;

fn check(rc: libc::c_int) -> io::Result<()> {
  if rc == 0 { Ok(()) } else { Err(io::Error::last_os_error()) }
}

impl super::VirtualMemory for SystemMemory {
  fn page_size(&self) -> usize {
    *PAGE_SIZE
  }

  fn reserve(
    &self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let address = unsafe {
      mmap(
        ptr::null_mut(),
        size,
        PROT_NONE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if address == MAP_FAILED {
      return None;
    }

    NonNull::new(address as *mut u8)
  }

  unsafe fn commit(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()> {
    check(unsafe { mprotect(ptr.as_ptr() as *mut c_void, size, PROT_READ | PROT_WRITE) })
  }

  unsafe fn decommit(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()> {
    let address = ptr.as_ptr() as *mut c_void;
    check(unsafe { madvise(address, size, MADV_DONTNEED) })?;
    check(unsafe { mprotect(address, size, PROT_NONE) })
  }

  unsafe fn release(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()> {
    check(unsafe { munmap(ptr.as_ptr() as *mut c_void, size) })
  }
}
