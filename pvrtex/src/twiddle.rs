//! Twiddled (Morton order) addressing.
//!
//! The PVR hardware stores most textures with the bits of the x and y coordinates
//! interleaved, so that texels close to each other in 2D are close to each other in memory.
//! Inside a square block, the texel at (x, y) lives at `(twiddle(x) << 1) | twiddle(y)`.

use std::sync::OnceLock;

/// Twiddle maps are cached for every power of two up to this exponent, which covers the
/// largest size a 16-bit header field can describe.
const MAX_SIZE_LOG2: usize = 16;

static TWIDDLE_MAPS: [OnceLock<Box<[u32]>>; MAX_SIZE_LOG2 + 1] =
    [const { OnceLock::new() }; MAX_SIZE_LOG2 + 1];

/// Spreads the bits of `value` out, putting a zero bit between each of them.
pub fn twiddle(value: u32) -> u32 {
    let mut result = 0;
    for bit in 0..16 {
        result |= (value & (1 << bit)) << bit;
    }
    result
}

/// Returns the twiddle map for a block of `size` texels per side, where `map[i] ==
/// twiddle(i)`.
///
/// Maps are built once per size and shared afterwards.
///
/// # Panics
///
/// Panics if `size` is not a power of two, or is larger than 65536.
pub fn twiddle_map(size: u32) -> &'static [u32] {
    assert!(size.is_power_of_two(), "twiddle map size must be a power of two");
    let slot = size.ilog2() as usize;
    assert!(slot <= MAX_SIZE_LOG2, "twiddle map size {size} is too large");

    TWIDDLE_MAPS[slot].get_or_init(|| (0..size).map(twiddle).collect())
}

/// Twiddled offset, in texels, of (x, y) inside a square block.
#[inline]
pub fn twiddled_offset(map: &[u32], x: u32, y: u32) -> usize {
    ((map[x as usize] << 1) | map[y as usize]) as usize
}
