//! # vmarena - A Virtual-Memory Arena Allocator
//!
//! This crate provides a **linear (bump) arena** that reserves a large range of
//! address space up front and commits physical memory in fixed-size chunks as
//! allocations need it.
//!
//! ## Overview
//!
//! ```text
//!   Arena Region:
//!
//!   ┌────────┬─────┬─────┬──────┬───────────────┬──────────────────────────┐
//!   │ Header │ A1  │ A2  │  A3  │  committed    │   reserved, no access    │
//!   └────────┴─────┴─────┴──────┴───────────────┴──────────────────────────┘
//!   0       base                ▲               ▲                          ▲
//!                               │               │                          │
//!                              pos          committed                  reserved
//!                           (next alloc)  (grows by commit_size)
//!
//!   push:   pos = align_up(pos, align) + size
//!   pop_to: pos = earlier pos        (memory stays committed)
//!   clear:  pos = base
//! ```
//!
//! Allocation is O(1): round the cursor up, bump it, and only when the request
//! crosses `committed` ask the OS for more pages. There is no per-object free;
//! memory comes back in bulk by moving the cursor backwards, usually through a
//! [`ScopedArena`].
//!
//! ## Crate Structure
//!
//! ```text
//!   vmarena
//!   ├── align      - Alignment helpers (align_up!, kib, mib)
//!   ├── arena      - Arena: push / pop_to / clear / release
//!   ├── config     - ArenaOptions (commit and reserve sizes, env overrides)
//!   ├── error      - ArenaError
//!   ├── header     - In-place ArenaHeader layout
//!   ├── logging    - tracing events and subscriber setup
//!   ├── scope      - ScopedArena rollback handle
//!   ├── string     - StrBuilder over an arena
//!   └── vm         - VirtualMemory trait, mmap / VirtualAlloc backends
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use vmarena::{Arena, ArenaOptions, kib, mib};
//!
//! let mut arena = Arena::with_options(
//!   ArenaOptions::new().commit_size(kib(64)).reserve_size(mib(16)),
//! );
//!
//! let value = arena.push_zeroed::<u64>();
//! unsafe { value.as_ptr().write(42) };
//!
//! {
//!   let mut scope = arena.scope();
//!   let scratch = scope.push(4096, 16);
//!   unsafe { scratch.as_ptr().write_bytes(0xAB, 4096) };
//! } // scratch is rolled back here
//!
//! assert_eq!(unsafe { value.as_ptr().read() }, 42);
//! arena.release();
//! ```
//!
//! ## Failure Model
//!
//! Running out of reserved space, failing to reserve or commit, and rolling the
//! cursor forward are treated as bugs or environment failures: the regular API
//! logs an error and panics. [`Arena::try_push`], [`Arena::try_pop_to`] and
//! [`Arena::try_with_options`] return [`ArenaError`] for callers that want to
//! handle them at an outer boundary.
//!
//! ## Limitations
//!
//! - **Single owner**: an arena is `Send` but not `Sync`; share it by giving
//!   each thread its own arena.
//! - **No individual frees**: only cursor rollback.
//! - **No decommit on rollback**: committed pages stay resident until release.
//!
//! ## Safety
//!
//! Allocation is safe; the returned pointers are raw. Dereferencing them after
//! the cursor has been rolled back past them, or after the arena is released,
//! is undefined behavior.

pub mod align;
mod arena;
pub mod config;
mod error;
pub mod header;
pub mod logging;
mod scope;
mod string;
pub mod vm;

pub use align::{kib, mib};
pub use arena::{Arena, Span};
pub use config::ArenaOptions;
pub use error::ArenaError;
pub use header::ArenaHeader;
pub use scope::ScopedArena;
pub use string::StrBuilder;
pub use vm::{SystemMemory, VirtualMemory};
