use std::{io, mem::MaybeUninit, ptr, ptr::NonNull};

use once_cell::sync::Lazy;
use winapi::{
  shared::minwindef::LPVOID,
  um::{
    memoryapi::{VirtualAlloc, VirtualFree},
    sysinfoapi::{GetSystemInfo, SYSTEM_INFO},
    winnt::{MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE},
  },
};

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
  let info = unsafe {
    let mut info = MaybeUninit::<SYSTEM_INFO>::uninit();
    GetSystemInfo(info.as_mut_ptr());
    info.assume_init()
  };
  info.dwPageSize as usize
});

/// `VirtualAlloc`/`VirtualFree`-backed primitives.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemory;

impl super::VirtualMemory for SystemMemory {
  fn page_size(&self) -> usize {
    *PAGE_SIZE
  }

  fn reserve(
    &self,
    size: usize,
  ) -> Option<NonNull<u8>> {
    let address = unsafe { VirtualAlloc(ptr::null_mut(), size, MEM_RESERVE, PAGE_NOACCESS) };
    NonNull::new(address as *mut u8)
  }

  unsafe fn commit(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()> {
    let address = unsafe { VirtualAlloc(ptr.as_ptr() as LPVOID, size, MEM_COMMIT, PAGE_READWRITE) };
    if address.is_null() { Err(io::Error::last_os_error()) } else { Ok(()) }
  }

  unsafe fn decommit(
    &self,
    ptr: NonNull<u8>,
    size: usize,
  ) -> io::Result<()> {
    let ok = unsafe { VirtualFree(ptr.as_ptr() as LPVOID, size, MEM_DECOMMIT) };
    if ok == 0 { Err(io::Error::last_os_error()) } else { Ok(()) }
  }

  unsafe fn release(
    &self,
    ptr: NonNull<u8>,
    _size: usize,
  ) -> io::Result<()> {
    // MEM_RELEASE requires a zero size and frees the whole reservation.
    let ok = unsafe { VirtualFree(ptr.as_ptr() as LPVOID, 0, MEM_RELEASE) };
    if ok == 0 { Err(io::Error::last_os_error()) } else { Ok(()) }
  }
}
