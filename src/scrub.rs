/// Widest stride out of 8, 4, 2 and 1 that divides `len` exactly.
///
/// # Examples
///
/// ```rust
/// use fixalloc::scrub::stride;
///
/// assert_eq!(stride(24), 8);
/// assert_eq!(stride(12), 4);
/// assert_eq!(stride(6), 2);
/// assert_eq!(stride(7), 1);
/// ```
pub fn stride(len: usize) -> usize {
  [8, 4, 2].into_iter().find(|s| len % s == 0).unwrap_or(1)
}

/// Zeroes every byte of `bytes`, `stride(bytes.len())` bytes at a time.
pub fn scrub(bytes: &mut [u8]) {
  const ZEROES: [u8; 8] = [0; 8];

  let width = stride(bytes.len());
  let mut chunks = bytes.chunks_exact_mut(width);
  for chunk in &mut chunks {
    chunk.copy_from_slice(&ZEROES[..width]);
  }
  chunks.into_remainder().fill(0);
}
