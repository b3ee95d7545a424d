use std::{fmt::Write, io::Read};

use vmarena::{Arena, ArenaOptions, StrBuilder, kib, logging, mib};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect the mapping with tools like `pmap`,
/// `/proc/<pid>/smaps` or `gdb` between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_arena(
  label: &str,
  arena: &Arena,
) {
  println!(
    "[{}] PID = {}, region = {:?}, pos = {}, committed = {}, reserved = {}",
    label,
    std::process::id(),
    arena.as_ptr(),
    arena.pos(),
    arena.committed(),
    arena.reserved(),
  );
}

fn main() {
  logging::init();

  // 64 KiB commit steps inside a 16 MiB reservation unless VMARENA_COMMIT_SIZE /
  // VMARENA_RESERVE_SIZE say otherwise. Only the first chunk is resident after
  // creation; the rest is address space with no access.
  let mut options = ArenaOptions::new().commit_size(kib(64)).reserve_size(mib(16));
  let env = ArenaOptions::from_env();
  if env != ArenaOptions::new() {
    options = env;
  }
  let mut arena = Arena::with_options(options);
  print_arena("start", &arena);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Push a zeroed u32 and write to it.
  // --------------------------------------------------------------------
  let first = arena.push_zeroed::<u32>();
  unsafe { first.as_ptr().write(0xDEADBEEF) };
  println!("\n[1] push_zeroed::<u32>() = {:?}", first);
  println!("[1] Value = 0x{:X}", unsafe { first.as_ptr().read() });
  print_arena("1", &arena);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Push 12 bytes with byte alignment, then a u64 to observe padding.
  // --------------------------------------------------------------------
  let odd = arena.push(12, 1);
  unsafe { odd.as_ptr().write_bytes(0xAB, 12) };
  let wide = arena.push_zeroed::<u64>();
  println!("\n[2] push(12, 1) = {:?}, push_zeroed::<u64>() = {:?}", odd, wide);
  println!(
    "[2] u64 offset = {:?}, offset % 8 = {}",
    arena.offset_of(wide.as_ptr() as *const u8),
    wide.as_ptr() as usize % 8
  );
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Open a scope and push past the first commit chunk.
  //    `committed` grows; leaving the scope rolls `pos` back but keeps
  //    the pages resident.
  // --------------------------------------------------------------------
  {
    let mut scope = arena.scope();
    let big = scope.push(kib(200), 16);
    unsafe { big.as_ptr().write_bytes(0xCD, kib(200)) };
    println!("\n[3] Inside scope: pushed 200 KiB at {:?}", big);
    print_arena("3 inside", &scope);
  }
  print_arena("3 after scope", &arena);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Build a string directly in the arena.
  // --------------------------------------------------------------------
  let mut builder = StrBuilder::new(&mut arena);
  builder.append_str("hello from the arena, ");
  let _ = write!(builder, "pid {}", std::process::id());
  let span = builder.finish();
  println!("\n[4] Built string: {:?}", arena.str(span));
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Clear, then release everything back to the OS.
  // --------------------------------------------------------------------
  arena.clear();
  print_arena("5 cleared", &arena);
  arena.release();
  println!("\n[5] Arena released. The whole reservation is unmapped.");
}
