//! Contiguous byte/string building on top of an arena.
//!
//! The builder holds the arena mutably for its whole life, so nothing else can
//! push in between and every append lands right after the previous one.

use std::fmt;

use crate::{
  arena::{Arena, Span},
  vm::VirtualMemory,
};

/// Appends bytes into one contiguous arena allocation.
///
/// ```rust
/// use std::fmt::Write;
/// use vmarena::{Arena, StrBuilder};
///
/// let mut arena = Arena::new();
/// let mut builder = StrBuilder::new(&mut arena);
/// builder.append_str("answer=");
/// write!(builder, "{}", 42).unwrap();
/// let span = builder.finish();
///
/// assert_eq!(arena.str(span), Some("answer=42"));
/// ```
pub struct StrBuilder<'a, M: VirtualMemory> {
  arena: &'a mut Arena<M>,
  start: usize,
  len: usize,
}

impl<'a, M: VirtualMemory> StrBuilder<'a, M> {
  pub fn new(arena: &'a mut Arena<M>) -> Self {
    let start = arena.pos();
    Self { arena, start, len: 0 }
  }

  /// Bytes appended so far.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn append(
    &mut self,
    bytes: &[u8],
  ) {
    let dst = self.arena.push(bytes.len(), 1);
    unsafe {
      dst
        .as_ptr()
        .copy_from_nonoverlapping(bytes.as_ptr(), bytes.len())
    };
    self.len += bytes.len();
  }

  pub fn append_str(
    &mut self,
    s: &str,
  ) {
    self.append(s.as_bytes());
  }

  /// Span of everything appended.
  pub fn finish(self) -> Span {
    Span::new(self.start, self.len)
  }

  /// Appends a NUL byte that is kept in the arena but not counted in the span.
  pub fn finish_cstr(mut self) -> Span {
    let len = self.len;
    self.append(&[0]);
    Span::new(self.start, len)
  }
}

impl<M: VirtualMemory> fmt::Write for StrBuilder<'_, M> {
  fn write_str(
    &mut self,
    s: &str,
  ) -> fmt::Result {
    self.append_str(s);
    Ok(())
  }
}
