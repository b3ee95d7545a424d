use std::mem;

/// Arena bookkeeping, stored in-place at offset 0 of the region it describes.
///
/// The field order is part of the arena's memory layout: anything reading raw
/// arena memory finds these six words, in this order, before `base`.
///
/// ```text
///   0            base          pos          committed        reserved
///   ├────────────┼─────────────┼────────────┼────────────────┤
///   │ ArenaHeader│  allocated  │   free     │  reserved only │
///   └────────────┴─────────────┴────────────┴────────────────┘
///                 ◀── read/write access ───▶ ◀─ PROT_NONE ──▶
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaHeader {
  pub commit_size: usize,
  pub reserve_size: usize,
  pub base: usize,
  pub pos: usize,
  pub committed: usize,
  pub reserved: usize,
}

/// Size of the in-place header, which is also every arena's `base`.
pub const HEADER_SIZE: usize = mem::size_of::<ArenaHeader>();

impl ArenaHeader {
  pub fn new(
    commit_size: usize,
    reserve_size: usize,
  ) -> Self {
    Self {
      commit_size,
      reserve_size,
      base: HEADER_SIZE,
      pos: HEADER_SIZE,
      committed: commit_size,
      reserved: reserve_size,
    }
  }

  /// `base <= pos <= committed <= reserved`.
  pub fn is_consistent(&self) -> bool {
    self.base <= self.pos && self.pos <= self.committed && self.committed <= self.reserved
  }
}
