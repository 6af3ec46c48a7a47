use std::{fmt, ops::Range};

use log::{debug, trace};

use crate::{
  chain::{BlockInfo, Blocks},
  error::{AllocError, Result},
  header::{HEADER_LEN, Header, MAX_BLOCK_SIZE},
  scrub::scrub,
};

/// Offset of a payload inside the allocator's buffer.
///
/// The block header always sits [`HEADER_LEN`] bytes before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(usize);

impl Handle {
  pub const fn from_offset(offset: usize) -> Self {
    Self(offset)
  }

  pub const fn offset(self) -> usize {
    self.0
  }
}

/// Header-tracked allocator over a fixed, caller-supplied buffer.
///
/// Fresh requests are bumped off `high_water`. Once the virgin region is
/// exhausted, requests are served first-fit from blocks released by
/// [`free`](Self::free), splitting them when the remainder can carry a header.
#[derive(Clone)]
pub struct FixedAllocator<B> {
  buffer: B,
  high_water: usize,
  capacity: usize,
}

impl<B> FixedAllocator<B>
where
  B: AsRef<[u8]> + AsMut<[u8]>,
{
  /// Manages the first `capacity` bytes of `buffer`.
  pub fn new(
    buffer: B,
    capacity: usize,
  ) -> Result<Self> {
    let len = buffer.as_ref().len();

    if capacity > MAX_BLOCK_SIZE + HEADER_LEN {
      return Err(AllocError::CapacityTooLarge { capacity });
    }
    if len < capacity {
      return Err(AllocError::BufferTooSmall { capacity, len });
    }

    Ok(Self {
      buffer,
      high_water: 0,
      capacity,
    })
  }

  /// Manages the whole of `buffer`.
  pub fn with_buffer(buffer: B) -> Result<Self> {
    let capacity = buffer.as_ref().len();
    Self::new(buffer, capacity)
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Offset past the last byte ever handed out by the bump path.
  pub fn high_water(&self) -> usize {
    self.high_water
  }

  /// Virgin bytes left for the bump path, headers included.
  pub fn remaining(&self) -> usize {
    self.capacity - self.high_water
  }

  pub fn blocks(&self) -> Blocks<'_> {
    Blocks::new(self.memory(), self.high_water)
  }

  pub fn into_inner(self) -> B {
    self.buffer
  }

  /// Reserves a payload of at least `bytes` usable bytes.
  ///
  /// # Errors
  ///
  /// [`AllocError::InvalidSize`] if `bytes` does not fit a header's size
  /// field, [`AllocError::OutOfMemory`] if no virgin or freed region is large
  /// enough.
  pub fn allocate(
    &mut self,
    bytes: usize,
  ) -> Result<Handle> {
    if bytes > MAX_BLOCK_SIZE {
      debug!("rejecting {bytes} byte request, max is {MAX_BLOCK_SIZE}");
      return Err(AllocError::InvalidSize { requested: bytes });
    }

    if let Some(handle) = self.bump(bytes) {
      return Ok(handle);
    }

    match self.find_free_block(bytes) {
      Some((offset, header)) => Ok(self.split(offset, header, bytes)),
      None => {
        debug!(
          "out of memory: {bytes} bytes requested, {} virgin bytes left",
          self.remaining()
        );
        Err(AllocError::OutOfMemory { requested: bytes })
      }
    }
  }

  /// Releases the block behind `handle` and merges every run of adjacent
  /// free blocks.
  ///
  /// Freeing a block that is already free, or an in-range offset that is
  /// not the payload of any block, does nothing.
  ///
  /// # Errors
  ///
  /// [`AllocError::InvalidHandle`] if `handle` lies outside
  /// `[HEADER_LEN, high_water]`.
  pub fn free(
    &mut self,
    handle: Handle,
  ) -> Result<()> {
    let offset = handle.offset();

    if !self.in_bounds(handle) {
      debug!("free of out-of-range offset {offset}");
      return Err(AllocError::InvalidHandle { offset });
    }

    let Some(block) = self.locate(handle) else {
      debug!("free of offset {offset} that is not a block payload");
      return Ok(());
    };

    if !block.allocated {
      trace!("block at {} already free", block.offset);
      return Ok(());
    }

    scrub(&mut self.memory_mut()[offset..offset + block.size]);
    self.put(
      block.offset,
      Header::new(block.size as u32, block.fragment as u8, false),
    );
    trace!("freed {} bytes at {}", block.size, block.offset);

    self.coalesce();
    debug_assert!(self.chain_is_consistent(), "header chain corrupted after free");

    Ok(())
  }

  /// Payload size recorded for `handle`, or `0` when it is out of range.
  ///
  /// The header is decoded directly without checking that `handle` really
  /// starts a payload or that the block is allocated.
  pub fn size_of(
    &self,
    handle: Handle,
  ) -> usize {
    if !self.in_bounds(handle) {
      return 0;
    }

    Header::read(self.memory(), handle.offset() - HEADER_LEN).map_or(0, |h| h.size as usize)
  }

  /// Payload of a live block.
  pub fn bytes(
    &self,
    handle: Handle,
  ) -> Option<&[u8]> {
    let range = self.payload(handle)?;
    self.memory().get(range)
  }

  /// Mutable payload of a live block.
  pub fn bytes_mut(
    &mut self,
    handle: Handle,
  ) -> Option<&mut [u8]> {
    let range = self.payload(handle)?;
    self.memory_mut().get_mut(range)
  }

  fn memory(&self) -> &[u8] {
    &self.buffer.as_ref()[..self.capacity]
  }

  fn memory_mut(&mut self) -> &mut [u8] {
    let capacity = self.capacity;
    &mut self.buffer.as_mut()[..capacity]
  }

  fn in_bounds(
    &self,
    handle: Handle,
  ) -> bool {
    (HEADER_LEN..=self.high_water).contains(&handle.offset())
  }

  fn header_at(
    &self,
    offset: usize,
  ) -> Option<Header> {
    Header::read(self.memory(), offset)
  }

  fn put(
    &mut self,
    offset: usize,
    header: Header,
  ) {
    let written = header.write(self.memory_mut(), offset);
    debug_assert!(written, "header at {offset} runs past the buffer");
  }

  fn payload(
    &self,
    handle: Handle,
  ) -> Option<Range<usize>> {
    if !self.in_bounds(handle) {
      return None;
    }

    let header = self.header_at(handle.offset() - HEADER_LEN)?;
    if !header.allocated {
      return None;
    }

    let end = handle.offset().checked_add(header.size as usize)?;
    (end <= self.high_water).then_some(handle.offset()..end)
  }

  /// Finds the block whose payload starts at `handle`.
  fn locate(
    &self,
    handle: Handle,
  ) -> Option<BlockInfo> {
    let target = handle.offset() - HEADER_LEN;

    self
      .blocks()
      .find(|block| block.offset >= target)
      .filter(|block| block.offset == target)
  }

  fn bump(
    &mut self,
    bytes: usize,
  ) -> Option<Handle> {
    let end = self.high_water.checked_add(HEADER_LEN)?.checked_add(bytes)?;
    if end > self.capacity {
      return None;
    }

    let offset = self.high_water;
    self.put(offset, Header::allocated(bytes as u32));
    self.high_water = end;
    trace!("bumped {bytes} bytes at {offset}, high water now {end}");

    Some(Handle(offset + HEADER_LEN))
  }

  /// First free block with at least `bytes` of payload, merging free runs
  /// on the way.
  fn find_free_block(
    &mut self,
    bytes: usize,
  ) -> Option<(usize, Header)> {
    let mut offset = 0;

    while offset < self.high_water {
      let mut header = self.header_at(offset)?;

      if !header.allocated {
        header = self.absorb_free_run(offset, header);
        if header.size as usize >= bytes {
          return Some((offset, header));
        }
      }

      offset += header.span();
    }

    None
  }

  /// Marks the free block at `offset` as allocated with `bytes` of payload,
  /// splitting off the remainder when it can hold a header.
  fn split(
    &mut self,
    offset: usize,
    header: Header,
    bytes: usize,
  ) -> Handle {
    let rest = header.size as usize + header.fragment as usize - bytes;

    if rest < HEADER_LEN {
      self.put(offset, Header::new(bytes as u32, rest as u8, true));
      trace!("reused {bytes} bytes at {offset}, {rest} byte fragment");
    } else {
      let tail = offset + HEADER_LEN + bytes;
      self.put(offset, Header::allocated(bytes as u32));
      self.put(tail, Header::free((rest - HEADER_LEN) as u32));
      trace!(
        "reused {bytes} bytes at {offset}, split {} free bytes at {tail}",
        rest - HEADER_LEN
      );
    }

    Handle(offset + HEADER_LEN)
  }

  /// Merges every free block that directly follows the free block at
  /// `offset` into it. Returns the resulting header.
  fn absorb_free_run(
    &mut self,
    offset: usize,
    mut header: Header,
  ) -> Header {
    loop {
      let next = offset + header.span();
      if next >= self.high_water {
        return header;
      }

      match self.header_at(next) {
        Some(following) if !following.allocated => {
          header = self.merge_free_blocks(offset, header, next, following);
        }
        _ => return header,
      }
    }
  }

  /// Folds the free block at `second` into the free block at `first`,
  /// reclaiming its header bytes and both fragments.
  fn merge_free_blocks(
    &mut self,
    first: usize,
    first_header: Header,
    second: usize,
    second_header: Header,
  ) -> Header {
    debug_assert!(!first_header.allocated && !second_header.allocated);
    debug_assert_eq!(first + first_header.span(), second);

    let size = first_header.size as usize
      + first_header.fragment as usize
      + second_header.size as usize
      + second_header.fragment as usize
      + HEADER_LEN;
    let merged = Header::free(size as u32);

    self.put(second, Header::default());
    self.put(first, merged);
    trace!("merged block at {second} into {first}, {size} free bytes");

    merged
  }

  fn coalesce(&mut self) {
    let mut offset = 0;

    while offset < self.high_water {
      let Some(mut header) = self.header_at(offset) else {
        return;
      };

      if !header.allocated {
        header = self.absorb_free_run(offset, header);
      }

      offset += header.span();
    }
  }

  /// Headers tile `[0, high_water)` exactly and no two free ones touch.
  fn chain_is_consistent(&self) -> bool {
    let mut end = 0;
    let mut previous_free = false;

    for block in self.blocks() {
      if block.offset != end || (previous_free && !block.allocated) {
        return false;
      }
      previous_free = !block.allocated;
      end = block.next_offset();
    }

    end == self.high_water
  }
}

impl<B> fmt::Debug for FixedAllocator<B> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("FixedAllocator")
      .field("high_water", &self.high_water)
      .field("capacity", &self.capacity)
      .finish_non_exhaustive()
  }
}
