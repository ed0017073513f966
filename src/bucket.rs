//! Bucketing: split the keys into buckets by their seed-0 hash and order the
//! buckets largest first.

use crate::hash::{reduce, KeyHasher, BUCKET_SEED};
use std::cmp::Reverse;

/// Bucket of `key` among `num_buckets` buckets.
#[inline(always)]
pub(crate) fn bucket_index<H: KeyHasher>(key: &[u8], num_buckets: u32) -> u32 {
    reduce(H::hash32(key, BUCKET_SEED), num_buckets)
}

/// A partition of key positions into buckets.
///
/// Stored flat: the keys of bucket `b` are `keys[starts[b]..starts[b + 1]]`,
/// in input order.
#[derive(Debug)]
pub(crate) struct Buckets {
    starts: Vec<u32>,
    keys: Vec<u32>,
    /// Bucket ids, largest bucket first. Equal sizes keep ascending id order.
    order: Vec<u32>,
}

impl Buckets {
    /// Assign every key to its bucket. `keys.len()` must fit in a `u32` and
    /// `num_buckets` must be non-zero.
    pub fn new<H: KeyHasher, K: AsRef<[u8]>>(keys: &[K], num_buckets: u32) -> Self {
        let bucket_of: Vec<u32> = keys
            .iter()
            .map(|key| bucket_index::<H>(key.as_ref(), num_buckets))
            .collect();

        // Counting sort on bucket id.
        let mut starts = vec![0u32; num_buckets as usize + 1];
        for &b in &bucket_of {
            starts[b as usize + 1] += 1;
        }
        for b in 0..num_buckets as usize {
            starts[b + 1] += starts[b];
        }

        let mut next = starts[..num_buckets as usize].to_vec();
        let mut members = vec![0u32; keys.len()];
        for (pos, &b) in bucket_of.iter().enumerate() {
            let slot = &mut next[b as usize];
            members[*slot as usize] = pos as u32;
            *slot += 1;
        }

        let mut order: Vec<u32> = (0..num_buckets).collect();
        // Stable, so ties stay in ascending bucket order.
        order.sort_by_key(|&b| Reverse(starts[b as usize + 1] - starts[b as usize]));

        Self {
            starts,
            keys: members,
            order,
        }
    }

    /// Number of buckets, including empty ones.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Key positions in bucket `b`.
    pub fn get(&self, b: usize) -> &[u32] {
        &self.keys[self.starts[b] as usize..self.starts[b + 1] as usize]
    }

    /// `(bucket id, key positions)` pairs, largest bucket first.
    pub fn by_size_desc(&self) -> impl Iterator<Item = (usize, &[u32])> + '_ {
        self.order.iter().map(|&b| (b as usize, self.get(b as usize)))
    }

    /// Size of the largest bucket.
    pub fn max_len(&self) -> usize {
        self.order.first().map_or(0, |&b| self.get(b as usize).len())
    }

    /// Find two byte-identical keys. Identical keys always share a bucket, so
    /// only keys within one bucket are compared.
    ///
    /// Returns the input positions of the first duplicate pair found, lower
    /// position first.
    pub fn find_duplicate<K: AsRef<[u8]>>(&self, keys: &[K]) -> Option<(usize, usize)> {
        let mut scratch: Vec<u32> = Vec::with_capacity(self.max_len());
        for b in 0..self.len() {
            let bucket = self.get(b);
            if bucket.len() < 2 {
                continue;
            }
            scratch.clear();
            scratch.extend_from_slice(bucket);
            scratch.sort_by(|&x, &y| keys[x as usize].as_ref().cmp(keys[y as usize].as_ref()));
            if let Some(w) = scratch
                .windows(2)
                .find(|w| keys[w[0] as usize].as_ref() == keys[w[1] as usize].as_ref())
            {
                return Some((w[0] as usize, w[1] as usize));
            }
        }
        None
    }
}
