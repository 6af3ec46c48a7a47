use thiserror::Error;

/// Errors returned by [`FixedAllocator`](crate::FixedAllocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
  /// Neither virgin memory nor any freed block can hold the request.
  #[error("out of memory (requested: {requested} bytes)")]
  OutOfMemory { requested: usize },

  /// The request does not fit the 29-bit size field of a header.
  #[error("invalid size: {requested} bytes cannot be encoded in a block header")]
  InvalidSize { requested: usize },

  /// The handle lies outside the region tracked by the allocator.
  #[error("invalid handle: offset {offset} is outside the tracked region")]
  InvalidHandle { offset: usize },

  #[error("buffer too small: capacity is {capacity} bytes but buffer holds {len}")]
  BufferTooSmall { capacity: usize, len: usize },

  #[error("capacity too large: {capacity} bytes exceeds the addressable block size")]
  CapacityTooLarge { capacity: usize },
}

pub type Result<T> = core::result::Result<T, AllocError>;
