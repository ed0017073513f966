//! The CHD perfect hash function: construction, queries, import and export.

use crate::bucket::{bucket_index, Buckets};
use crate::displace::place_buckets;
use crate::error::PhfError;
use crate::hash::{reduce, KeyHasher, Murmur3, MAX_BINS};
use crate::persistence::ChdState;
use crate::stats::BucketStats;
use crate::util::log_duration;
use log::trace;
use std::marker::PhantomData;
use std::path::Path;
use std::time::Instant;

/// Parameters for CHD construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChdParams {
    /// Average number of keys per bucket. The bucket count is
    /// `num_keys / keys_per_bucket`, at least 1.
    pub keys_per_bucket: usize,
    /// Exclusive upper bound on displacements. Each bucket tries
    /// `1..max_seed` before construction gives up.
    pub max_seed: u32,
    /// Ratio of keys to bins, in `(0, 1]`. `1.0` gives a minimal perfect
    /// hash function.
    pub load_factor: f64,
}

impl Default for ChdParams {
    fn default() -> Self {
        Self {
            keys_per_bucket: 4,
            max_seed: u32::MAX,
            load_factor: 1.0,
        }
    }
}

impl ChdParams {
    pub fn validate(&self) -> Result<(), PhfError> {
        validate_load_factor(self.load_factor)?;
        if self.keys_per_bucket == 0 {
            return Err(PhfError::InvalidConfiguration(
                "keys per bucket must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn validate_load_factor(load_factor: f64) -> Result<(), PhfError> {
    if load_factor > 1.0 {
        return Err(PhfError::InvalidConfiguration(format!(
            "load factor should be <= 1.0, got {load_factor}"
        )));
    }
    if load_factor.is_nan() || load_factor <= 0.0 {
        return Err(PhfError::InvalidConfiguration(format!(
            "load factor should be > 0.0, got {load_factor}"
        )));
    }
    Ok(())
}

/// `floor(num_keys / load_factor)`, checked against the reachable range.
fn bins_for(num_keys: usize, load_factor: f64) -> Result<u32, PhfError> {
    let num_bins = (num_keys as f64 / load_factor) as usize;
    if num_bins > MAX_BINS {
        return Err(PhfError::TooManyBins {
            num_bins,
            max: MAX_BINS,
        });
    }
    Ok(num_bins as u32)
}

/// A perfect hash function over a fixed set of byte-string keys.
///
/// Maps each of the `n` construction keys to a distinct value in
/// `[0, n / load_factor)`. Only one `u32` displacement per bucket is stored;
/// the keys themselves are not kept.
///
/// - `H`: the seeded hash primitive. Queries must use the same hasher that
///   built the displacement table.
///
/// Immutable once built, and safe to query from many threads at once.
#[derive(Clone, Debug)]
pub struct Chd<H: KeyHasher = Murmur3> {
    num_keys: usize,
    load_factor: f64,
    num_bins: u32,
    num_buckets: u32,
    displacements: Vec<u32>,
    _hx: PhantomData<H>,
}

/// Construction.
impl<H: KeyHasher> Chd<H> {
    /// Build a perfect hash function for `keys`.
    ///
    /// Fails with [`PhfError::InvalidConfiguration`] before doing any work if
    /// `params` are invalid, and with [`PhfError::ConstructionExhausted`] if
    /// some bucket cannot be placed below `params.max_seed`. In the latter
    /// case, retry with a smaller `keys_per_bucket`, a smaller `load_factor`,
    /// or a larger `max_seed`.
    ///
    /// Byte-identical keys are rejected with [`PhfError::DuplicateKey`].
    pub fn new<K: AsRef<[u8]>>(keys: &[K], params: ChdParams) -> Result<Self, PhfError> {
        Self::new_with_stats(keys, params).map(|(chd, _)| chd)
    }

    /// Version of [`Chd::new`] that also returns construction statistics.
    pub fn new_with_stats<K: AsRef<[u8]>>(
        keys: &[K],
        params: ChdParams,
    ) -> Result<(Self, BucketStats), PhfError> {
        params.validate()?;
        if keys.is_empty() {
            return Err(PhfError::EmptyKeySet);
        }

        let n = keys.len();
        let num_bins = bins_for(n, params.load_factor)?;
        // Fewer keys than keys_per_bucket still need one bucket.
        let num_buckets = (n / params.keys_per_bucket).max(1) as u32;

        trace!("        keys: {n:>10}");
        trace!("        bins: {num_bins:>10}");
        trace!("     buckets: {num_buckets:>10}");
        trace!("  real alpha: {:>10.4}", n as f64 / num_bins as f64);
        trace!("keys/ bucket: {:>13.2}", n as f64 / num_buckets as f64);

        let overall_start = Instant::now();
        let start = overall_start;
        let buckets = Buckets::new::<H, K>(keys, num_buckets);
        let start = log_duration("bucketing", start);

        if let Some((first, second)) = buckets.find_duplicate(keys) {
            return Err(PhfError::DuplicateKey { first, second });
        }
        let start = log_duration("duplicates", start);

        let (displacements, stats) = place_buckets::<H, K>(keys, &buckets, num_bins, params.max_seed)?;
        log_duration("displace", start);
        log_duration("total build", overall_start);

        let chd = Self {
            num_keys: n,
            load_factor: params.load_factor,
            num_bins,
            num_buckets,
            displacements,
            _hx: PhantomData,
        };
        Ok((chd, stats))
    }

    /// Rebuild a perfect hash function from an exported displacement table.
    ///
    /// `num_keys` and `load_factor` must match the original construction;
    /// the bucket count is taken from `displacements.len()`. No bucketing or
    /// search is redone.
    pub fn from_parts(
        num_keys: usize,
        displacements: Vec<u32>,
        load_factor: f64,
    ) -> Result<Self, PhfError> {
        validate_load_factor(load_factor)?;
        if num_keys == 0 || displacements.is_empty() {
            return Err(PhfError::EmptyKeySet);
        }
        let num_bins = bins_for(num_keys, load_factor)?;
        let num_buckets = u32::try_from(displacements.len()).map_err(|_| {
            PhfError::InvalidConfiguration(format!(
                "{} buckets do not fit in a 32-bit bucket index",
                displacements.len()
            ))
        })?;

        Ok(Self {
            num_keys,
            load_factor,
            num_bins,
            num_buckets,
            displacements,
            _hx: PhantomData,
        })
    }

    /// Rebuild from a [`ChdState`], as returned by [`Chd::state`].
    pub fn from_state(state: ChdState) -> Result<Self, PhfError> {
        let num_keys = usize::try_from(state.num_keys).map_err(|_| {
            PhfError::InvalidConfiguration(format!("{} keys overflow usize", state.num_keys))
        })?;
        Self::from_parts(num_keys, state.displacements, state.load_factor)
    }

    /// Load a perfect hash function saved with [`Chd::save_to_file`].
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - the file cannot be read
    /// - magic number, version, size or checksum do not match
    /// - the stored parameters are invalid
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PhfError> {
        let state = crate::persistence::read_with_validation(path)?;
        Self::from_state(state)
    }
}

/// Queries and export.
impl<H: KeyHasher> Chd<H> {
    /// The bin of `key`, in `[0, num_bins)`.
    ///
    /// Distinct for all construction keys. Any other key still gets a value
    /// in range, which may coincide with a construction key's.
    #[inline(always)]
    pub fn hash(&self, key: &[u8]) -> u32 {
        let b = bucket_index::<H>(key, self.num_buckets);
        let d = self.displacements[b as usize];
        reduce(H::hash32(key, d), self.num_bins)
    }

    /// Same as [`Chd::hash`], as a `usize` index.
    #[inline(always)]
    pub fn index(&self, key: &[u8]) -> usize {
        self.hash(key) as usize
    }

    /// Hash every key of `keys`, in order.
    pub fn index_batch<K: AsRef<[u8]>>(&self, keys: impl IntoIterator<Item = K>) -> Vec<u32> {
        keys.into_iter().map(|k| self.hash(k.as_ref())).collect()
    }

    /// Number of keys the function was built for.
    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    /// Size of the output range. Equal to `num_keys` when the load factor
    /// is `1.0`.
    pub fn num_bins(&self) -> usize {
        self.num_bins as usize
    }

    pub fn num_buckets(&self) -> usize {
        self.num_buckets as usize
    }

    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// One displacement per bucket; `0` marks a bucket that was empty at
    /// construction time.
    pub fn displacements(&self) -> &[u32] {
        &self.displacements
    }

    pub fn into_displacements(self) -> Vec<u32> {
        self.displacements
    }

    /// The persistable state: key count, load factor and displacements.
    pub fn state(&self) -> ChdState {
        ChdState {
            num_keys: self.num_keys as u64,
            load_factor: self.load_factor,
            displacements: self.displacements.clone(),
        }
    }

    /// Save to a file with integrity protection.
    ///
    /// The file holds a versioned header, a CRC32 checksum of the state and
    /// the state itself, and is replaced atomically.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use chd_phf::{Chd, ChdParams};
    /// let keys = ["alpha", "beta", "gamma", "delta"];
    /// let chd = <Chd>::new(&keys, ChdParams::default())?;
    /// chd.save_to_file("keys.chd")?;
    /// # Ok::<(), chd_phf::PhfError>(())
    /// ```
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PhfError> {
        crate::persistence::write_with_integrity(path, &self.state())
    }

    /// Bits of displacement table per key.
    pub fn bits_per_key(&self) -> f64 {
        (self.displacements.len() * 32) as f64 / self.num_keys as f64
    }

    /// Heap and inline size in bytes.
    pub fn memory_usage_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.displacements.capacity() * std::mem::size_of::<u32>()
    }
}

/// Builder collecting keys and parameters for a [`Chd`].
pub struct ChdBuilder<H = Murmur3> {
    keys: Vec<Vec<u8>>,
    params: ChdParams,
    _hx: PhantomData<H>,
}

impl<H: KeyHasher> ChdBuilder<H> {
    pub fn new() -> Self {
        Self {
            keys: Vec::new(),
            params: ChdParams::default(),
            _hx: PhantomData,
        }
    }

    pub fn with_keys<I, K>(iter: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Vec<u8>>,
    {
        Self::new().extend(iter)
    }

    pub fn insert(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.keys.push(key.into());
        self
    }

    pub fn extend<I, K>(mut self, iter: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Vec<u8>>,
    {
        self.keys.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn params(mut self, params: ChdParams) -> Self {
        self.params = params;
        self
    }

    pub fn keys_per_bucket(mut self, keys_per_bucket: usize) -> Self {
        self.params.keys_per_bucket = keys_per_bucket;
        self
    }

    pub fn load_factor(mut self, load_factor: f64) -> Self {
        self.params.load_factor = load_factor;
        self
    }

    pub fn max_seed(mut self, max_seed: u32) -> Self {
        self.params.max_seed = max_seed;
        self
    }

    pub fn build(self) -> Result<Chd<H>, PhfError> {
        Chd::new(&self.keys, self.params)
    }

    pub fn build_with_stats(self) -> Result<(Chd<H>, BucketStats), PhfError> {
        Chd::new_with_stats(&self.keys, self.params)
    }
}

impl<H: KeyHasher> Default for ChdBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}
