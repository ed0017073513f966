use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhfError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cannot construct perfect hash function: bucket {bucket} ({bucket_len} keys) found no displacement below {max_seed}")]
    ConstructionExhausted {
        bucket: usize,
        bucket_len: usize,
        max_seed: u32,
    },

    #[error("Duplicate key at positions {first} and {second}")]
    DuplicateKey { first: usize, second: usize },

    #[error("Bin count {num_bins} exceeds the hashable range of {max}")]
    TooManyBins { num_bins: usize, max: usize },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty key set provided")]
    EmptyKeySet,
}
