//! Seeded 32-bit hash primitives used by the CHD construction.
//!
//! Every key is hashed twice: once with seed [`BUCKET_SEED`] to pick its
//! bucket, and once with the bucket's displacement to pick its bin. Both
//! results go through [`reduce`], which masks the raw hash to 28 bits before
//! taking the modulus. Displacement tables exported by one hasher are only
//! meaningful when queried with the same hasher.
//!
//! We provide:
//! - [`Murmur3`]: MurmurHash3 x86_32. The default, and bit-compatible with
//!   displacement tables produced by other MurmurHash3-based CHD builders.
//! - [`Xxh32`]: XXH32. Slightly faster on long keys.
//!
//! Any other hash can be plugged in by implementing [`KeyHasher`].

/// Seed reserved for bucket assignment. Never used as a displacement.
pub const BUCKET_SEED: u32 = 0;

/// Raw hashes are masked to this many bits before reduction.
pub const HASH_MASK: u32 = 0x0FFF_FFFF;

/// Largest modulus that [`reduce`] can fully cover.
pub const MAX_BINS: usize = HASH_MASK as usize + 1;

/// Wrapper trait for seeded 32-bit hash functions over byte strings.
pub trait KeyHasher: Clone + Send + Sync {
    fn hash32(key: &[u8], seed: u32) -> u32;
}

/// MurmurHash3, x86 32-bit variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Murmur3;

impl KeyHasher for Murmur3 {
    #[inline(always)]
    fn hash32(key: &[u8], seed: u32) -> u32 {
        let mut reader = key;
        match murmur3::murmur3_32(&mut reader, seed) {
            Ok(h) => h,
            // Reading from a byte slice cannot fail.
            Err(_) => unreachable!(),
        }
    }
}

/// XXH32.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Xxh32;

impl KeyHasher for Xxh32 {
    #[inline(always)]
    fn hash32(key: &[u8], seed: u32) -> u32 {
        xxhash_rust::xxh32::xxh32(key, seed)
    }
}

/// Reduce a raw hash into `[0, d)`.
///
/// `d` must be non-zero.
#[inline(always)]
pub fn reduce(h: u32, d: u32) -> u32 {
    (h & HASH_MASK) % d
}
