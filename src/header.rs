//! In-place block header.
//!
//! Every block, free or allocated, starts with a single little-endian `u32`:
//!
//! ```text
//!   bit 31                                  3   2   1   0
//!   ┌───────────────────────────────────────┬───────┬───┐
//!   │               size (29)               │ frag  │ A │
//!   └───────────────────────────────────────┴───────┴───┘
//!
//!   word = (size << 3) | (fragment << 1) | allocated
//! ```
//!
//! `size` counts usable payload bytes only. `fragment` counts the 0-3 bytes
//! sitting between the payload and the next header that are too small to
//! carry a header of their own.

/// Bytes occupied by a header. The payload starts right after it.
pub const HEADER_LEN: usize = 4;

/// Largest payload size the header can record.
pub const MAX_BLOCK_SIZE: usize = (1 << 29) - 1;

/// Largest value the fragment field can record.
pub const MAX_FRAGMENT: u8 = 0b11;

const ALLOCATED_BIT: u32 = 0b1;
const FRAGMENT_SHIFT: u32 = 1;
const SIZE_SHIFT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
  pub size: u32,
  pub fragment: u8,
  pub allocated: bool,
}

impl Header {
  pub fn new(
    size: u32,
    fragment: u8,
    allocated: bool,
  ) -> Self {
    debug_assert!(size as usize <= MAX_BLOCK_SIZE);
    debug_assert!(fragment <= MAX_FRAGMENT);
    Self {
      size,
      fragment,
      allocated,
    }
  }

  pub fn allocated(size: u32) -> Self {
    Self::new(size, 0, true)
  }

  pub fn free(size: u32) -> Self {
    Self::new(size, 0, false)
  }

  pub fn encode(self) -> u32 {
    ((self.size & MAX_BLOCK_SIZE as u32) << SIZE_SHIFT)
      | (u32::from(self.fragment & MAX_FRAGMENT) << FRAGMENT_SHIFT)
      | (self.allocated as u32)
  }

  pub fn decode(word: u32) -> Self {
    Self {
      size: word >> SIZE_SHIFT,
      fragment: ((word >> FRAGMENT_SHIFT) as u8) & MAX_FRAGMENT,
      allocated: word & ALLOCATED_BIT != 0,
    }
  }

  /// Bytes from this header to the next one: header, payload and fragment.
  pub fn span(self) -> usize {
    HEADER_LEN + self.size as usize + self.fragment as usize
  }

  /// Reads the header stored at `offset`, or `None` if it would run past `buf`.
  pub fn read(
    buf: &[u8],
    offset: usize,
  ) -> Option<Self> {
    let end = offset.checked_add(HEADER_LEN)?;
    let bytes: [u8; HEADER_LEN] = buf.get(offset..end)?.try_into().ok()?;
    Some(Self::decode(u32::from_le_bytes(bytes)))
  }

  /// Writes the header at `offset`. Returns `false` if it does not fit in `buf`.
  pub fn write(
    self,
    buf: &mut [u8],
    offset: usize,
  ) -> bool {
    let Some(end) = offset.checked_add(HEADER_LEN) else {
      return false;
    };
    match buf.get_mut(offset..end) {
      Some(slot) => {
        slot.copy_from_slice(&self.encode().to_le_bytes());
        true
      }
      None => false,
    }
  }
}
