//! # fixalloc - A Fixed-Buffer Memory Allocator Library
//!
//! This crate provides a **header-tracked allocator** that carves allocations
//! out of a single buffer handed to it once, and never touches the global heap
//! afterwards. Freed blocks are reused and adjacent free blocks are merged.
//!
//! ## Overview
//!
//! The allocator combines two strategies:
//!
//! ```text
//!   Fixed Buffer:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          BACKING BUFFER                              │
//!   │                                                                      │
//!   │   ┌────┬─────┬────┬──────────┬────┬─────┬────────────────────────┐   │
//!   │   │ H  │ A1  │ H  │ (freed)  │ H  │ A3  │      Virgin Space      │   │
//!   │   └────┴─────┴────┴──────────┴────┴─────┴────────────────────────┘   │
//!   │   ▲                                     ▲                        ▲   │
//!   │   │                                     │                        │   │
//!   │ offset 0                           high_water                capacity│
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   1. Bump path:  while virgin space remains, write a header at
//!                  high_water and advance it. O(1).
//!   2. Reuse path: once virgin space runs out, scan the header chain for
//!                  the first free block that is large enough. O(n).
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   fixalloc
//!   ├── header     - 4-byte block header encoding
//!   ├── scrub      - Payload zeroing on free
//!   ├── chain      - Header chain iteration (Blocks, BlockInfo)
//!   ├── fixed      - FixedAllocator implementation
//!   └── error      - AllocError
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use fixalloc::FixedAllocator;
//!
//! let mut buffer = [0u8; 100];
//! let mut allocator = FixedAllocator::with_buffer(&mut buffer[..])?;
//!
//! let handle = allocator.allocate(11)?;
//! allocator.bytes_mut(handle).unwrap().copy_from_slice(b"hello world");
//! assert_eq!(allocator.size_of(handle), 11);
//!
//! allocator.free(handle)?;
//! # Ok::<(), fixalloc::AllocError>(())
//! ```
//!
//! ## How It Works
//!
//! Every block starts with a 4-byte little-endian header:
//!
//! ```text
//!   Single Block:
//!   ┌───────────────────┬──────────────────────────────┬──────────────┐
//!   │   Block Header    │          Payload             │   Fragment   │
//!   │ ┌───────────────┐ │                              │  (0-3 bytes) │
//!   │ │ size     : 29 │ │  ┌────────────────────────┐  │              │
//!   │ │ fragment :  2 │ │  │    size bytes usable   │  │  too small   │
//!   │ │ allocated:  1 │ │  └────────────────────────┘  │  for header  │
//!   │ └───────────────┘ │                              │              │
//!   │      4 bytes      │                              │              │
//!   └───────────────────┴──────────────────────────────┴──────────────┘
//!                       ▲
//!                       └── Handle returned to the caller
//! ```
//!
//! The next header always starts at `offset + 4 + size + fragment`, so the
//! chain needs no pointers. When a freed block is reused:
//!
//! ```text
//!   remainder <  4   → whole block handed out, remainder kept as fragment
//!   remainder == 4   → a zero-size free header is written after the payload
//!   remainder >  4   → a free header owning remainder - 4 bytes is split off
//! ```
//!
//! Every `free` zeroes the payload, clears the allocated bit and sweeps the
//! chain, folding each free block into the free block before it (header and
//! fragments included). After `free` returns no two free blocks are adjacent.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: wrap the allocator in a lock to share it
//! - **Byte granularity**: payloads carry no alignment guarantee
//! - **Fixed size**: the buffer never grows
//!
//! ## Logging
//!
//! Decisions are reported through the [`log`] facade: `trace` for bump,
//! reuse, split and merge, `debug` for failed requests and ignored frees.

mod chain;
mod error;
mod fixed;
pub mod header;
pub mod scrub;

pub use chain::{BlockInfo, Blocks};
pub use error::{AllocError, Result};
pub use fixed::{FixedAllocator, Handle};
pub use header::{HEADER_LEN, MAX_BLOCK_SIZE};
