//! The engine's 64-bit string hash.
//!
//! Symbolic names in model files are stored as Bob Jenkins' `lookup8` hash of
//! the name's UTF-8 bytes with a level (seed) of zero. The hash is one-way,
//! so turning a hash back into text needs a dictionary of known names.

const GOLDEN_RATIO: u64 = 0x9e37_79b9_7f4a_7c13;

#[inline(always)]
fn mix(a: &mut u64, b: &mut u64, c: &mut u64) {
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 43);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 9);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 8);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 38);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 23);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 5);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 35);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 49);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 11);
    *a = a.wrapping_sub(*b).wrapping_sub(*c) ^ (*c >> 12);
    *b = b.wrapping_sub(*c).wrapping_sub(*a) ^ (*a << 18);
    *c = c.wrapping_sub(*a).wrapping_sub(*b) ^ (*b >> 22);
}

/// Little-endian load of up to eight bytes, missing high bytes as zero.
#[inline(always)]
fn load(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i)))
}

/// Hash a byte slice with an explicit level.
pub fn hash_bytes_with_seed(data: &[u8], level: u64) -> u64 {
    let mut a = level;
    let mut b = level;
    let mut c = GOLDEN_RATIO;

    let mut blocks = data.chunks_exact(24);
    for block in &mut blocks {
        a = a.wrapping_add(load(&block[0..8]));
        b = b.wrapping_add(load(&block[8..16]));
        c = c.wrapping_add(load(&block[16..24]));
        mix(&mut a, &mut b, &mut c);
    }

    let tail = blocks.remainder();
    c = c.wrapping_add(data.len() as u64);
    // The lowest byte of `c` is reserved for the length, so the third word
    // of the tail is shifted up by one byte.
    if tail.len() > 16 {
        c = c.wrapping_add(load(&tail[16..]) << 8);
    }
    if tail.len() > 8 {
        b = b.wrapping_add(load(&tail[8..tail.len().min(16)]));
    }
    a = a.wrapping_add(load(&tail[..tail.len().min(8)]));
    mix(&mut a, &mut b, &mut c);

    c
}

/// Hash a byte slice with the engine's default level of zero.
#[inline]
pub fn hash_bytes(data: &[u8]) -> u64 {
    hash_bytes_with_seed(data, 0)
}

/// Hash a string's UTF-8 bytes.
#[inline]
pub fn hash_str(s: &str) -> u64 {
    hash_bytes(s.as_bytes())
}
