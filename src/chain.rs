use std::fmt;

use crate::{
  fixed::Handle,
  header::{HEADER_LEN, Header},
};

/// Snapshot of one header in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Offset of the header in the buffer.
  pub offset: usize,
  pub size: usize,
  pub fragment: usize,
  pub allocated: bool,
}

impl BlockInfo {
  fn new(
    offset: usize,
    header: Header,
  ) -> Self {
    Self {
      offset,
      size: header.size as usize,
      fragment: header.fragment as usize,
      allocated: header.allocated,
    }
  }

  /// Handle pointing at this block's payload.
  pub fn handle(&self) -> Handle {
    Handle::from_offset(self.offset + HEADER_LEN)
  }

  /// Offset of the header that follows this one.
  pub fn next_offset(&self) -> usize {
    self.offset + HEADER_LEN + self.size + self.fragment
  }
}

impl fmt::Display for BlockInfo {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "[{:>5}] {} size={} fragment={}",
      self.offset,
      if self.allocated { "USED" } else { "FREE" },
      self.size,
      self.fragment
    )
  }
}

/// Walks the header chain from offset 0 up to the high-water mark.
///
/// Iteration stops early if a header would run past the tracked region,
/// which can only happen if the chain is corrupted.
pub struct Blocks<'a> {
  buf: &'a [u8],
  offset: usize,
  end: usize,
}

impl<'a> Blocks<'a> {
  pub(crate) fn new(
    buf: &'a [u8],
    end: usize,
  ) -> Self {
    Self { buf, offset: 0, end }
  }
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    if self.offset >= self.end {
      return None;
    }

    let header = Header::read(self.buf, self.offset)?;
    let info = BlockInfo::new(self.offset, header);
    self.offset = info.next_offset();
    Some(info)
  }
}
