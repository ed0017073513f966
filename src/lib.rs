//! # chd-phf
//!
//! **Perfect hash functions** over a fixed set of byte-string keys, built with
//! CHD (Compress, Hash, Displace).
//!
//! ## Features
//!
//! - **Byte-string keys** - anything that is `AsRef<[u8]>`
//! - **Minimal or near-minimal** - `load_factor = 1.0` maps `n` keys onto `0..n`
//! - **Tiny state** - one `u32` displacement per bucket, keys are not stored
//! - **Deterministic** - same keys, order and parameters give the same table
//! - **Serializable** - export the displacement table or save it to disk
//!
//! ## How it works
//!
//! 1. Keys are split into `n / keys_per_bucket` buckets by their seed-0 hash.
//! 2. Buckets are visited largest first. Each gets the smallest seed `d >= 1`
//!    for which its keys hash (with seed `d`) to distinct bins that no earlier
//!    bucket claimed.
//! 3. A query hashes the key with seed 0 to find its bucket, then with that
//!    bucket's displacement to find its bin.
//!
//! The search never backtracks. If a bucket runs out of seeds, construction
//! fails and the caller can retry with different parameters.
//!
//! ## Quick Start
//!
//! ```rust
//! use chd_phf::{Chd, ChdParams};
//!
//! let keys: Vec<[u8; 4]> = (0u32..1000).map(|i| i.to_le_bytes()).collect();
//! let chd = <Chd>::new(&keys, ChdParams::default()).unwrap();
//!
//! // Every key gets its own bin in 0..1000.
//! let mut taken = vec![false; chd.num_bins()];
//! for key in &keys {
//!     let idx = chd.index(key);
//!     assert!(!taken[idx]);
//!     taken[idx] = true;
//! }
//!
//! // Export, then import without redoing the search.
//! let state = chd.state();
//! let imported = <Chd>::from_parts(state.num_keys as usize, state.displacements, state.load_factor).unwrap();
//! assert_eq!(imported.hash(&keys[7]), chd.hash(&keys[7]));
//!
//! // Or go through a file.
//! let path = std::env::temp_dir().join("chd_phf_quick_start.chd");
//! chd.save_to_file(&path).unwrap();
//! let loaded: Chd = Chd::load_from_file(&path).unwrap();
//! assert_eq!(loaded.displacements(), chd.displacements());
//! # std::fs::remove_file(&path).ok();
//! ```

pub mod chd;
pub mod error;
pub mod hash;
pub mod persistence;
pub mod stats;

mod bucket;
mod displace;
mod util;

pub use chd::{Chd, ChdBuilder, ChdParams};
pub use error::PhfError;
pub use hash::{KeyHasher, Murmur3, Xxh32};
pub use persistence::ChdState;
pub use stats::BucketStats;
