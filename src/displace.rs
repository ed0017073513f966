//! Displacement search: greedily give every bucket the smallest seed that
//! sends its keys to distinct free bins.
//!
//! Buckets are visited largest first and never revisited. If some bucket has
//! no valid displacement below `max_seed`, the whole construction fails.

use crate::bucket::Buckets;
use crate::error::PhfError;
use crate::hash::{reduce, KeyHasher, BUCKET_SEED};
use crate::stats::BucketStats;
use bitvec::{bitvec, slice::BitSlice};
use log::{debug, warn};

/// Find a displacement for every non-empty bucket.
///
/// Returns one displacement per bucket (0 for empty buckets) along with
/// construction statistics. `num_bins` must be at least `keys.len()`.
pub(crate) fn place_buckets<H: KeyHasher, K: AsRef<[u8]>>(
    keys: &[K],
    buckets: &Buckets,
    num_bins: u32,
    max_seed: u32,
) -> Result<(Vec<u32>, BucketStats), PhfError> {
    let mut displacements = vec![0u32; buckets.len()];
    let mut occupied = bitvec![0; num_bins as usize];
    let mut claimed: Vec<u32> = Vec::with_capacity(buckets.max_len());
    let mut stats = BucketStats::new(num_bins as usize);

    for (b, bucket) in buckets.by_size_desc() {
        if bucket.is_empty() {
            stats.add(0, 0);
            continue;
        }
        let Some(d) =
            find_displacement::<H, K>(keys, bucket, &mut occupied, num_bins, max_seed, &mut claimed)
        else {
            warn!(
                "No displacement below {max_seed} for bucket {b} with {} keys",
                bucket.len()
            );
            return Err(PhfError::ConstructionExhausted {
                bucket: b,
                bucket_len: bucket.len(),
                max_seed,
            });
        };
        displacements[b] = d;
        stats.add(bucket.len(), d);
    }

    stats.set_bins_claimed(occupied.count_ones());
    debug!(
        "placed {} keys in {} buckets: mean displacement {:.2}, max {}",
        keys.len(),
        buckets.len(),
        stats.mean_displacement(),
        stats.max_displacement()
    );
    Ok((displacements, stats))
}

/// Try displacements `1, 2, ..` below `max_seed` for one bucket.
///
/// On success the bucket's bins are left marked in `occupied` and the
/// displacement is returned. On failure `occupied` is unchanged.
fn find_displacement<H: KeyHasher, K: AsRef<[u8]>>(
    keys: &[K],
    bucket: &[u32],
    occupied: &mut BitSlice,
    num_bins: u32,
    max_seed: u32,
    claimed: &mut Vec<u32>,
) -> Option<u32> {
    'd: for d in BUCKET_SEED + 1..max_seed {
        claimed.clear();
        for &pos in bucket {
            let bin = reduce(H::hash32(keys[pos as usize].as_ref(), d), num_bins);
            // Taken by an earlier bucket, or by a key of this bucket.
            if occupied[bin as usize] {
                for &c in claimed.iter() {
                    occupied.set(c as usize, false);
                }
                continue 'd;
            }
            occupied.set(bin as usize, true);
            claimed.push(bin);
        }
        return Some(d);
    }
    None
}
