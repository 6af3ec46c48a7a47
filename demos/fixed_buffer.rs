use std::{ptr, slice};

use fixalloc::{FixedAllocator, Handle};
use libc::sbrk;

/// Anonymous private mapping used as the allocator's backing buffer.
struct Mapping {
  addr: *mut u8,
  len: usize,
}

impl Mapping {
  fn new(len: usize) -> std::io::Result<Self> {
    let addr = unsafe {
      libc::mmap(
        ptr::null_mut(),
        len,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };
    if addr == libc::MAP_FAILED {
      return Err(std::io::Error::last_os_error());
    }

    Ok(Self {
      addr: addr as *mut u8,
      len,
    })
  }
}

impl AsRef<[u8]> for Mapping {
  fn as_ref(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.addr, self.len) }
  }
}

impl AsMut<[u8]> for Mapping {
  fn as_mut(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.addr, self.len) }
  }
}

impl Drop for Mapping {
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.addr as *mut libc::c_void, self.len);
    }
  }
}

/// Prints every header in the chain, followed by the cursors.
fn print_chain<B: AsRef<[u8]> + AsMut<[u8]>>(
  label: &str,
  allocator: &FixedAllocator<B>,
) {
  println!("\n[{label}]");
  for block in allocator.blocks() {
    println!("  {block}");
  }
  println!(
    "  high_water = {}, capacity = {}",
    allocator.high_water(),
    allocator.capacity()
  );
}

/// Prints the current program break using `sbrk(0)`.
/// It must not move while the allocator works: the buffer is an mmap region.
unsafe fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace")).init();

  let mut allocator = FixedAllocator::with_buffer(Mapping::new(100)?)?;

  unsafe { print_program_break("start") };

  // --------------------------------------------------------------------
  // 1) Fill the buffer through the bump path.
  // --------------------------------------------------------------------
  let mut handles: Vec<Handle> = Vec::new();
  for size in [10, 11, 15, 12, 10, 10] {
    let handle = allocator.allocate(size)?;
    println!("allocated {size:>2} bytes at offset {}", handle.offset());
    handles.push(handle);
  }
  print_chain("1: bump", &allocator);

  // --------------------------------------------------------------------
  // 2) Virgin space is gone and nothing is free yet.
  // --------------------------------------------------------------------
  match allocator.allocate(10) {
    Ok(handle) => println!("\n[2] unexpected allocation at {}", handle.offset()),
    Err(err) => println!("\n[2] {err}"),
  }

  // --------------------------------------------------------------------
  // 3) Free two neighbours. The sweep merges them into one free block
  //    that also owns the second block's header.
  // --------------------------------------------------------------------
  if let Some(bytes) = allocator.bytes_mut(handles[1]) {
    bytes.fill(0xAB);
  }
  allocator.free(handles[1])?;
  allocator.free(handles[2])?;
  print_chain("3: free + coalesce", &allocator);

  // --------------------------------------------------------------------
  // 4) Reuse the merged block. 30 free bytes, 27 requested: the last 3
  //    cannot host a header and become a fragment.
  // --------------------------------------------------------------------
  let reused = allocator.allocate(27)?;
  println!(
    "\n[4] reused offset {} (was {}), size_of = {}",
    reused.offset(),
    handles[1].offset(),
    allocator.size_of(reused)
  );
  print_chain("4: reuse", &allocator);

  unsafe { print_program_break("end") };

  Ok(())
}
