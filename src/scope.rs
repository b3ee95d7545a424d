use std::ops::{Deref, DerefMut};

use crate::{arena::Arena, vm::VirtualMemory};

/// A bookmark into an arena's cursor.
///
/// Created by [`Arena::scope`]. Pushes made through the handle (it derefs to
/// the arena) are rolled back when the handle is dropped or passed to
/// [`ScopedArena::exit`]. The handle mutably borrows the arena, so nested
/// scopes always end in reverse order of entry.
///
/// The rollback targets the region the scope was entered on. If the arena
/// behind the handle is swapped out (e.g. `mem::replace(&mut *scope, ..)`),
/// the scope ends without touching the cursor of the arena now in its place.
///
/// ```rust
/// use vmarena::Arena;
///
/// let mut arena = Arena::new();
/// let before = arena.pos();
/// {
///   let mut scope = arena.scope();
///   scope.push(128, 8);
/// }
/// assert_eq!(arena.pos(), before);
/// ```
pub struct ScopedArena<'a, M: VirtualMemory> {
  arena: &'a mut Arena<M>,
  region: usize,
  pos: usize,
}

impl<'a, M: VirtualMemory> ScopedArena<'a, M> {
  pub(crate) fn enter(arena: &'a mut Arena<M>) -> Self {
    let region = arena.as_ptr() as usize;
    let pos = arena.pos();
    Self { arena, region, pos }
  }

  /// Cursor position captured when the scope was entered.
  pub fn saved_pos(&self) -> usize {
    self.pos
  }

  /// Ends the scope, returning the cursor position before the rollback.
  ///
  /// When the arena behind the handle was swapped for another one, nothing is
  /// rolled back and the current position of that arena is returned.
  ///
  /// # Panics
  ///
  /// When the cursor was moved below the saved position inside the scope
  /// (e.g. by [`Arena::clear`]), since rolling "back" would move it forward.
  #[track_caller]
  pub fn exit(self) -> usize {
    let mut this = std::mem::ManuallyDrop::new(self);
    if !this.is_same_region() {
      return this.arena.pos();
    }
    let pos = this.pos;
    this.arena.pop_to(pos)
  }

  fn is_same_region(&self) -> bool {
    self.arena.as_ptr() as usize == self.region
  }
}

impl<M: VirtualMemory> Deref for ScopedArena<'_, M> {
  type Target = Arena<M>;

  fn deref(&self) -> &Arena<M> {
    &*self.arena
  }
}

impl<M: VirtualMemory> DerefMut for ScopedArena<'_, M> {
  fn deref_mut(&mut self) -> &mut Arena<M> {
    &mut *self.arena
  }
}

impl<M: VirtualMemory> Drop for ScopedArena<'_, M> {
  fn drop(&mut self) {
    // A second panic while unwinding would abort; leave the cursor alone then.
    if std::thread::panicking() || !self.is_same_region() {
      return;
    }
    self.arena.pop_to(self.pos);
  }
}
