use std::{io, mem, ptr::NonNull};

use crate::{
  align::checked_align_up,
  config::ArenaOptions,
  error::{ArenaError, fatal},
  header::ArenaHeader,
  logging,
  scope::ScopedArena,
  vm::{SystemMemory, VirtualMemory},
};

/// A byte range inside an arena, as offsets from the region start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
  pub offset: usize,
  pub len: usize,
}

impl Span {
  pub const fn new(
    offset: usize,
    len: usize,
  ) -> Self {
    Self { offset, len }
  }

  pub const fn end(&self) -> usize {
    self.offset + self.len
  }
}

/// Linear allocator over one reserved virtual address range.
///
/// The arena's state is an [`ArenaHeader`] written at offset 0 of the region
/// it manages; this struct is only a handle to that header plus the
/// [`VirtualMemory`] backend that owns the mapping.
///
/// Allocation is a cursor bump. Memory is handed back in bulk by moving the
/// cursor backwards ([`Arena::pop_to`], [`Arena::clear`], [`Arena::scope`]);
/// committed pages stay resident until the arena is released.
///
/// Misuse (exhausting the reservation, rolling the cursor forward) panics.
/// The `try_*` methods report the same conditions as [`ArenaError`] instead.
pub struct Arena<M: VirtualMemory = SystemMemory> {
  header: NonNull<ArenaHeader>,
  memory: M,
}

// The region is owned exclusively by the handle, so moving the handle to
// another thread moves the whole arena. No `Sync`: there is no locking.
unsafe impl<M: VirtualMemory + Send> Send for Arena<M> {}

impl Arena<SystemMemory> {
  /// Creates an arena with the default 64 KiB commit / 64 MiB reserve sizes.
  pub fn new() -> Self {
    Self::with_options(ArenaOptions::default())
  }

  pub fn with_options(options: ArenaOptions) -> Self {
    Self::with_memory(SystemMemory, options)
  }

  pub fn try_with_options(options: ArenaOptions) -> Result<Self, ArenaError> {
    Self::try_with_memory(SystemMemory, options)
  }
}

impl Default for Arena<SystemMemory> {
  fn default() -> Self {
    Self::new()
  }
}

impl<M: VirtualMemory> Arena<M> {
  /// Creates an arena on top of a custom [`VirtualMemory`] backend.
  ///
  /// Panics if the reservation or the first commit fails.
  #[track_caller]
  pub fn with_memory(
    memory: M,
    options: ArenaOptions,
  ) -> Self {
    match Self::try_with_memory(memory, options) {
      Ok(arena) => arena,
      Err(err) => fatal(err),
    }
  }

  /// Reserves `reserve_size` bytes, commits the first `commit_size` bytes and
  /// writes the header in place. Both sizes are rounded up to the page size.
  pub fn try_with_memory(
    memory: M,
    options: ArenaOptions,
  ) -> Result<Self, ArenaError> {
    let (commit_size, reserve_size) = options.page_aligned(memory.page_size())?;

    let region = memory
      .reserve(reserve_size)
      .ok_or(ArenaError::ReserveFailed { size: reserve_size })?;

    if let Err(err) = unsafe { memory.commit(region, commit_size) } {
      logging::log_os_failure("commit", &err);
      if let Err(err) = unsafe { memory.release(region, reserve_size) } {
        logging::log_os_failure("release", &err);
      }
      return Err(commit_failed(0, commit_size, &err));
    }

    // The region is page aligned and at least one page is committed, so the
    // header always fits and is properly aligned.
    let header = region.cast::<ArenaHeader>();
    unsafe { header.as_ptr().write(ArenaHeader::new(commit_size, reserve_size)) };

    logging::log_create(region.as_ptr(), commit_size, reserve_size);

    Ok(Self { header, memory })
  }

  #[inline]
  fn header(&self) -> &ArenaHeader {
    unsafe { self.header.as_ref() }
  }

  #[inline]
  fn header_mut(&mut self) -> &mut ArenaHeader {
    unsafe { self.header.as_mut() }
  }

  /// Start of the managed region (the header's address).
  #[inline]
  pub fn as_ptr(&self) -> *const u8 {
    self.header.as_ptr() as *const u8
  }

  #[inline]
  fn region(&self) -> NonNull<u8> {
    self.header.cast::<u8>()
  }

  /// Allocates `size` bytes aligned to `align`, committing more memory if needed.
  ///
  /// `align` must be a power of two and applies to the returned address. The
  /// region is page aligned, so for `align` up to the page size the offset
  /// from the region start is aligned too; larger alignments may pad the
  /// offset to a non-multiple of `align`. The returned memory is not zeroed;
  /// it may hold bytes from allocations that were rolled back.
  ///
  /// # Panics
  ///
  /// When the reservation cannot hold the allocation ("arena out of memory").
  #[track_caller]
  pub fn push(
    &mut self,
    size: usize,
    align: usize,
  ) -> NonNull<u8> {
    match self.try_push(size, align) {
      Ok(ptr) => ptr,
      Err(err) => fatal(err),
    }
  }

  /// Like [`Arena::push`], but reports exhaustion instead of panicking.
  ///
  /// On error the arena is left exactly as it was.
  pub fn try_push(
    &mut self,
    size: usize,
    align: usize,
  ) -> Result<NonNull<u8>, ArenaError> {
    debug_assert!(align.is_power_of_two(), "alignment must be a power of two");

    let header = *self.header();
    let overflow = ArenaError::SizeOverflow { requested: size };
    let region = self.as_ptr() as usize;
    let address = region
      .checked_add(header.pos)
      .and_then(|cursor| checked_align_up(cursor, align))
      .ok_or(overflow.clone())?;
    let offset = address - region;
    let end = offset.checked_add(size).ok_or(overflow)?;

    if end > header.committed {
      self.grow(end, size)?;
    }

    self.header_mut().pos = end;
    logging::log_push(offset, size, align);

    Ok(unsafe { self.region().add(offset) })
  }

  /// Commits whole `commit_size` chunks at the committed boundary until `end` fits.
  fn grow(
    &mut self,
    end: usize,
    requested: usize,
  ) -> Result<(), ArenaError> {
    let header = *self.header();
    let out_of_memory = ArenaError::OutOfMemory {
      requested,
      committed: header.committed,
      reserved: header.reserved,
    };

    if end > header.reserved {
      return Err(out_of_memory);
    }

    let chunks = (end - header.committed).div_ceil(header.commit_size);
    let grow_by = chunks * header.commit_size;
    let target = header.committed + grow_by;

    if target > header.reserved {
      return Err(out_of_memory);
    }

    let boundary = unsafe { self.region().add(header.committed) };
    if let Err(err) = unsafe { self.memory.commit(boundary, grow_by) } {
      logging::log_os_failure("commit", &err);
      return Err(commit_failed(header.committed, grow_by, &err));
    }

    self.header_mut().committed = target;
    logging::log_grow(header.committed, target, header.reserved);

    Ok(())
  }

  /// Allocates one zero-filled `T`.
  #[track_caller]
  pub fn push_zeroed<T>(&mut self) -> NonNull<T> {
    self.push_zeroed_slice::<T>(1).cast::<T>()
  }

  /// Allocates `count` zero-filled `T`s, aligned for `T`.
  ///
  /// Zero bytes are not a valid value for every type; reading the elements
  /// is up to the caller.
  #[track_caller]
  pub fn push_zeroed_slice<T>(
    &mut self,
    count: usize,
  ) -> NonNull<[T]> {
    let size = match mem::size_of::<T>().checked_mul(count) {
      Some(size) => size,
      None => fatal(ArenaError::SizeOverflow {
        requested: usize::MAX,
      }),
    };

    let ptr = self.push(size, mem::align_of::<T>());
    unsafe { ptr.as_ptr().write_bytes(0, size) };

    NonNull::slice_from_raw_parts(ptr.cast::<T>(), count)
  }

  /// Current cursor, as an offset from the region start.
  #[inline]
  pub fn pos(&self) -> usize {
    self.header().pos
  }

  /// Moves the cursor back to `pos` and returns where it was.
  ///
  /// Committed memory stays committed.
  ///
  /// # Panics
  ///
  /// When `pos` is past the current cursor or inside the header.
  #[track_caller]
  pub fn pop_to(
    &mut self,
    pos: usize,
  ) -> usize {
    match self.try_pop_to(pos) {
      Ok(previous) => previous,
      Err(err) => fatal(err),
    }
  }

  pub fn try_pop_to(
    &mut self,
    pos: usize,
  ) -> Result<usize, ArenaError> {
    let header = *self.header();

    if pos > header.pos {
      return Err(ArenaError::InvalidRollback {
        target: pos,
        pos: header.pos,
      });
    }
    if pos < header.base {
      return Err(ArenaError::RollbackBelowBase {
        target: pos,
        base: header.base,
      });
    }

    self.header_mut().pos = pos;
    logging::log_pop(header.pos, pos);

    Ok(header.pos)
  }

  /// Drops every allocation but keeps all committed memory for reuse.
  pub fn clear(&mut self) {
    let base = self.header().base;
    self.pop_to(base);
  }

  /// Opens a scope; everything pushed through it is rolled back when it ends.
  pub fn scope(&mut self) -> ScopedArena<'_, M> {
    ScopedArena::enter(self)
  }

  /// First allocatable offset (the header size).
  #[inline]
  pub fn base(&self) -> usize {
    self.header().base
  }

  #[inline]
  pub fn committed(&self) -> usize {
    self.header().committed
  }

  #[inline]
  pub fn reserved(&self) -> usize {
    self.header().reserved
  }

  #[inline]
  pub fn commit_size(&self) -> usize {
    self.header().commit_size
  }

  #[inline]
  pub fn reserve_size(&self) -> usize {
    self.header().reserve_size
  }

  /// Bytes handed out since the last reset.
  #[inline]
  pub fn used(&self) -> usize {
    self.pos() - self.base()
  }

  /// Snapshot of the in-place header.
  pub fn header_snapshot(&self) -> ArenaHeader {
    *self.header()
  }

  /// Offset of `ptr` from the region start, if it points into committed memory
  /// or one past its end (where a zero-sized push can land).
  pub fn offset_of(
    &self,
    ptr: *const u8,
  ) -> Option<usize> {
    let offset = (ptr as usize).checked_sub(self.as_ptr() as usize)?;
    (offset <= self.committed()).then_some(offset)
  }

  /// Borrows allocated bytes.
  ///
  /// Returns `None` unless `span` lies within `[base, pos)`. Bytes that were
  /// pushed but never written read as whatever the page held: zero for fresh
  /// pages, old contents after a rollback.
  pub fn bytes(
    &self,
    span: Span,
  ) -> Option<&[u8]> {
    let end = span.offset.checked_add(span.len)?;
    if span.offset < self.base() || end > self.pos() {
      return None;
    }

    Some(unsafe { std::slice::from_raw_parts(self.as_ptr().add(span.offset), span.len) })
  }

  /// [`Arena::bytes`], checked as UTF-8.
  pub fn str(
    &self,
    span: Span,
  ) -> Option<&str> {
    std::str::from_utf8(self.bytes(span)?).ok()
  }

  /// Decommits and releases the region. Same as dropping the arena.
  pub fn release(self) {
    drop(self)
  }
}

impl<M: VirtualMemory> Drop for Arena<M> {
  fn drop(&mut self) {
    // Copy the header out: it lives in the memory being decommitted.
    let header = *self.header();
    let region = self.region();

    unsafe {
      if let Err(err) = self.memory.decommit(region, header.committed) {
        logging::log_os_failure("decommit", &err);
      }
      if let Err(err) = self.memory.release(region, header.reserved) {
        logging::log_os_failure("release", &err);
      }
    }

    logging::log_release(region.as_ptr(), header.committed, header.reserved);
  }
}

impl<M: VirtualMemory> std::fmt::Debug for Arena<M> {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    let header = self.header();
    f.debug_struct("Arena")
      .field("region", &self.as_ptr())
      .field("base", &header.base)
      .field("pos", &header.pos)
      .field("committed", &header.committed)
      .field("reserved", &header.reserved)
      .finish()
  }
}

fn commit_failed(
  offset: usize,
  size: usize,
  err: &io::Error,
) -> ArenaError {
  ArenaError::CommitFailed {
    offset,
    size,
    os_error: err.raw_os_error(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    align::{kib, mib},
    header::HEADER_SIZE,
  };

  fn small_arena() -> Arena {
    Arena::with_options(ArenaOptions::new().commit_size(kib(64)).reserve_size(mib(1)))
  }

  #[test]
  fn test_create() {
    let arena = small_arena();

    assert_eq!(arena.base(), HEADER_SIZE);
    assert_eq!(arena.pos(), HEADER_SIZE);
    assert_eq!(arena.committed(), kib(64));
    assert_eq!(arena.reserved(), mib(1));
    assert_eq!(arena.used(), 0);
    assert!(arena.header_snapshot().is_consistent());
  }

  #[test]
  fn test_header_lives_in_region() {
    let arena = small_arena();

    let header = unsafe { &*(arena.as_ptr() as *const ArenaHeader) };
    assert_eq!(header.pos, arena.pos());
    assert_eq!(header.committed, arena.committed());
  }

  #[test]
  fn test_sizes_are_page_rounded() {
    let page = SystemMemory.page_size();
    let arena = Arena::with_options(ArenaOptions::new().commit_size(1).reserve_size(page + 1));

    assert_eq!(arena.commit_size(), page);
    assert_eq!(arena.committed(), page);
    assert_eq!(arena.reserve_size(), page * 2);
    assert_eq!(arena.reserved(), page * 2);
  }

  #[test]
  fn test_invalid_options() {
    let err = Arena::try_with_options(ArenaOptions::new().commit_size(mib(2)).reserve_size(mib(1)))
      .unwrap_err();

    assert!(matches!(err, ArenaError::InvalidOptions { .. }));
  }

  #[test]
  fn test_overflowing_sizes_are_rejected() {
    let err = Arena::try_with_options(ArenaOptions::new().commit_size(usize::MAX)).unwrap_err();
    assert_eq!(
      err,
      ArenaError::SizeOverflow {
        requested: usize::MAX,
      }
    );

    let err = Arena::try_with_options(ArenaOptions::new().reserve_size(usize::MAX)).unwrap_err();
    assert_eq!(
      err,
      ArenaError::SizeOverflow {
        requested: usize::MAX,
      }
    );
  }

  #[test]
  fn test_push_alignment() {
    let mut arena = small_arena();

    for align in [1, 2, 4, 8, 16, 32, 64, 128, 256, 4096] {
      arena.push(3, 1);
      let ptr = arena.push(32, align);
      assert_eq!(ptr.as_ptr() as usize % align, 0, "not aligned to {}", align);
    }
  }

  #[test]
  fn test_push_memory_is_writable() {
    let mut arena = small_arena();

    unsafe {
      let first = arena.push(8, 8).cast::<u64>();
      first.as_ptr().write(3);

      let second = arena.push(6 * 2, 2).cast::<u16>();
      for i in 0..6 {
        second.as_ptr().add(i).write((i + 1) as u16);
      }

      assert_eq!(first.as_ptr().read(), 3);
      for i in 0..6 {
        assert_eq!(second.as_ptr().add(i).read(), (i + 1) as u16);
      }
    }
  }

  #[test]
  fn test_push_zeroed() {
    let mut arena = small_arena();

    // Dirty some memory, roll it back, then ask for zeroed memory over it.
    let start = arena.pos();
    let dirty = arena.push(64, 8);
    unsafe { dirty.as_ptr().write_bytes(0xFF, 64) };
    arena.pop_to(start);

    let values = arena.push_zeroed_slice::<u64>(8);
    assert_eq!(values.len(), 8);
    assert_eq!(values.cast::<u8>(), dirty);
    unsafe {
      assert!(values.as_ref().iter().all(|&v| v == 0));
    }

    let one = arena.push_zeroed::<u32>();
    assert_eq!(one.as_ptr() as usize % mem::align_of::<u32>(), 0);
    assert_eq!(unsafe { one.as_ptr().read() }, 0);
  }

  #[test]
  fn test_push_zero_sized() {
    let mut arena = small_arena();

    let pos = arena.pos();
    arena.push(0, 1);
    assert_eq!(arena.pos(), pos);

    let empty = arena.push_zeroed_slice::<u64>(0);
    assert_eq!(empty.len(), 0);
  }

  #[test]
  fn test_pop_to_returns_previous() {
    let mut arena = small_arena();

    let start = arena.pos();
    arena.push(100, 1);
    let end = arena.pos();

    assert_eq!(arena.pop_to(start), end);
    assert_eq!(arena.pos(), start);
  }

  #[test]
  #[should_panic(expected = "greater than current position")]
  fn test_pop_forward_panics() {
    let mut arena = small_arena();
    let pos = arena.pos();
    arena.pop_to(pos + 1);
  }

  #[test]
  fn test_pop_below_base() {
    let mut arena = small_arena();
    arena.push(16, 1);

    let err = arena.try_pop_to(0).unwrap_err();
    assert_eq!(
      err,
      ArenaError::RollbackBelowBase {
        target: 0,
        base: HEADER_SIZE,
      }
    );
    assert_eq!(arena.pos(), HEADER_SIZE + 16);
  }

  #[test]
  fn test_clear_keeps_commitment() {
    let mut arena = small_arena();

    arena.push(kib(100), 1);
    let committed = arena.committed();
    assert!(committed > kib(64));

    arena.clear();
    assert_eq!(arena.pos(), arena.base());
    assert_eq!(arena.committed(), committed);
  }

  #[test]
  fn test_large_push_commits_several_chunks() {
    let mut arena = small_arena();

    arena.push(kib(200), 1);
    assert_eq!(arena.committed(), kib(256));
    assert!(arena.header_snapshot().is_consistent());
  }

  #[test]
  fn test_try_push_out_of_memory_leaves_state() {
    let mut arena = small_arena();
    arena.push(10, 1);
    let before = arena.header_snapshot();

    let err = arena.try_push(mib(2), 1).unwrap_err();
    assert!(matches!(err, ArenaError::OutOfMemory { .. }));
    assert_eq!(arena.header_snapshot(), before);
  }

  #[test]
  fn test_try_push_overflow() {
    let mut arena = small_arena();

    let err = arena.try_push(usize::MAX, 8).unwrap_err();
    assert_eq!(err, ArenaError::SizeOverflow { requested: usize::MAX });
  }

  #[test]
  fn test_offset_of() {
    let mut arena = small_arena();

    let ptr = arena.push(16, 16);
    let offset = arena.offset_of(ptr.as_ptr()).unwrap();
    assert_eq!(offset % 16, 0);
    assert!(offset >= arena.base());

    assert_eq!(arena.offset_of(std::ptr::null()), None);
  }

  #[test]
  fn test_offset_of_zero_sized_push_at_committed_end() {
    let mut arena = Arena::with_options(ArenaOptions::new().commit_size(1).reserve_size(mib(1)));
    let committed = arena.committed();

    let filler = arena.push(committed - arena.pos(), 1);
    assert_eq!(arena.offset_of(filler.as_ptr()), Some(HEADER_SIZE));

    let empty = arena.push(0, 1);
    assert_eq!(arena.pos(), committed);
    assert_eq!(arena.committed(), committed);
    assert_eq!(arena.offset_of(empty.as_ptr()), Some(committed));
    assert_eq!(arena.offset_of(empty.as_ptr().wrapping_add(1)), None);
  }

  #[test]
  fn test_push_aligns_address_beyond_page_size() {
    let page = SystemMemory.page_size();
    let mut arena = small_arena();

    for align in [page * 2, page * 4] {
      arena.push(3, 1);
      let ptr = arena.push(16, align);
      assert_eq!(ptr.as_ptr() as usize % align, 0, "not aligned to {}", align);
      assert!(arena.header_snapshot().is_consistent());
    }

    #[repr(align(65536))]
    struct Wide {
      _bytes: [u8; 16],
    }

    let wide = arena.push_zeroed::<Wide>();
    assert_eq!(wide.as_ptr() as usize % 65536, 0);
  }

  #[test]
  fn test_bytes() {
    let mut arena = small_arena();

    let ptr = arena.push(5, 1);
    let offset = arena.offset_of(ptr.as_ptr()).unwrap();
    unsafe { ptr.as_ptr().copy_from_nonoverlapping(b"arena".as_ptr(), 5) };

    let span = Span::new(offset, 5);
    assert_eq!(arena.bytes(span), Some(&b"arena"[..]));
    assert_eq!(arena.str(span), Some("arena"));

    assert_eq!(arena.bytes(Span::new(offset, 6)), None);
    assert_eq!(arena.bytes(Span::new(0, 1)), None);
    assert_eq!(arena.bytes(Span::new(usize::MAX, 2)), None);
  }

  #[test]
  fn test_arena_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<Arena>();
  }
}
