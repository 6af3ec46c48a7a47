//! Property tests for `FixedAllocator`.
//!
//! - Random allocate/free interleavings never panic or hand out overlapping
//!   live payloads
//! - `size_of` never under-reports a live allocation
//! - Headers always tile `[0, high_water)` and no two free blocks touch
//! - Freeing twice is the same as freeing once

use fixalloc::{FixedAllocator, HEADER_LEN, Handle};
use proptest::prelude::*;

const CAPACITY: usize = 256;

#[derive(Debug, Clone)]
enum Op {
  Allocate(usize),
  Free(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
  prop_oneof![
    3 => (0usize..48).prop_map(Op::Allocate),
    2 => any::<usize>().prop_map(Op::Free),
  ]
}

fn assert_chain(allocator: &FixedAllocator<Vec<u8>>) {
  let mut end = 0;
  let mut previous_free = false;

  for block in allocator.blocks() {
    assert_eq!(block.offset, end, "gap or overlap in header chain");
    assert!(
      !(previous_free && !block.allocated),
      "adjacent free blocks at {}",
      block.offset
    );
    assert!(block.fragment < HEADER_LEN);
    previous_free = !block.allocated;
    end = block.next_offset();
  }

  assert_eq!(end, allocator.high_water());
  assert!(allocator.high_water() <= allocator.capacity());
}

// ---------------------------------------------------------------------------
// Property: random interleavings
// ---------------------------------------------------------------------------

proptest! {
  #[test]
  fn random_interleavings_keep_chain_consistent(ops in prop::collection::vec(arb_op(), 1..200)) {
    let mut allocator = FixedAllocator::with_buffer(vec![0u8; CAPACITY]).unwrap();
    let mut live: Vec<(Handle, usize, u8)> = Vec::new();

    for (step, op) in ops.into_iter().enumerate() {
      match op {
        Op::Allocate(size) => {
          if let Ok(handle) = allocator.allocate(size) {
            let tag = step as u8;
            allocator.bytes_mut(handle).unwrap().fill(tag);
            live.push((handle, size, tag));
          }
        }
        Op::Free(pick) => {
          if !live.is_empty() {
            let (handle, _, _) = live.swap_remove(pick % live.len());
            prop_assert!(allocator.free(handle).is_ok());
          }
        }
      }

      assert_chain(&allocator);

      let mut ranges: Vec<_> = live
        .iter()
        .map(|&(handle, size, tag)| {
          assert!(allocator.size_of(handle) >= size);
          let bytes = allocator.bytes(handle).unwrap();
          assert!(bytes.iter().all(|&b| b == tag), "payload at {} clobbered", handle.offset());
          (handle.offset() - HEADER_LEN, handle.offset() + allocator.size_of(handle))
        })
        .collect();
      ranges.sort_unstable();
      for pair in ranges.windows(2) {
        prop_assert!(pair[0].1 <= pair[1].0, "live blocks overlap: {:?}", pair);
      }

      prop_assert_eq!(
        allocator.blocks().filter(|b| b.allocated).count(),
        live.len()
      );
    }
  }

  #[test]
  fn freed_block_is_reused_in_place(size in 0usize..CAPACITY - HEADER_LEN) {
    let mut allocator = FixedAllocator::with_buffer(vec![0u8; CAPACITY]).unwrap();
    let handle = allocator.allocate(size).unwrap();
    if allocator.remaining() >= HEADER_LEN {
      allocator.allocate(allocator.remaining() - HEADER_LEN).unwrap();
    }

    allocator.free(handle).unwrap();

    prop_assert_eq!(allocator.allocate(size).unwrap(), handle);
    prop_assert_eq!(allocator.size_of(handle), size);
  }

  #[test]
  fn double_free_matches_single_free(
    sizes in prop::collection::vec(0usize..24, 1..8),
    pick in any::<usize>(),
  ) {
    let mut allocator = FixedAllocator::with_buffer(vec![0u8; CAPACITY]).unwrap();
    let handles: Vec<_> = sizes
      .iter()
      .map(|&size| allocator.allocate(size).unwrap())
      .collect();
    let handle = handles[pick % handles.len()];

    allocator.free(handle).unwrap();
    let once = allocator.clone();
    allocator.free(handle).unwrap();

    prop_assert_eq!(allocator.high_water(), once.high_water());
    prop_assert_eq!(allocator.into_inner(), once.into_inner());
  }

  #[test]
  fn bytes_are_conserved(sizes in prop::collection::vec(0usize..40, 1..16)) {
    let mut allocator = FixedAllocator::with_buffer(vec![0u8; CAPACITY]).unwrap();
    let mut bumped = 0;

    for (i, size) in sizes.into_iter().enumerate() {
      if allocator.allocate(size).is_ok() && allocator.high_water() > bumped {
        bumped = allocator.high_water();
      }
      if i % 3 == 2 {
        let victim = allocator.blocks().find(|b| b.allocated).map(|b| b.handle());
        if let Some(victim) = victim {
          allocator.free(victim).unwrap();
        }
      }

      let total: usize = allocator
        .blocks()
        .map(|b| HEADER_LEN + b.size + b.fragment)
        .sum();
      prop_assert_eq!(total, bumped);
      prop_assert!(total <= CAPACITY);
    }
  }
}

#[test]
fn exact_fit_then_one_byte_over() {
  for used in [0, 7, 100] {
    let mut allocator = FixedAllocator::with_buffer(vec![0u8; CAPACITY]).unwrap();
    if used > 0 {
      allocator.allocate(used).unwrap();
    }
    let fit = allocator.remaining() - HEADER_LEN;

    assert!(allocator.allocate(fit + 1).is_err());
    let last = allocator.allocate(fit).unwrap();
    assert_eq!(allocator.size_of(last), fit);
    assert_eq!(allocator.remaining(), 0);
  }
}
