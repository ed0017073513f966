//! On-disk format for an exported CHD state.
//!
//! Layout: a bincode-encoded [`FileHeader`] followed by the bincode-encoded
//! [`ChdState`]. The header carries a magic number, a format version, the
//! total file size and a CRC32 of the state section. Writes go to a temporary
//! file that is renamed into place only once fully synced.

use crate::error::PhfError;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Current format version - increment when format changes
const FORMAT_VERSION: u32 = 1;

/// Magic number to identify our file format
const MAGIC: &[u8; 8] = b"CHDPHF01";

/// Everything needed to answer queries: the key count and load factor (which
/// fix the bin count) and one displacement per bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChdState {
    pub num_keys: u64,
    pub load_factor: f64,
    pub displacements: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileHeader {
    magic: [u8; 8],
    version: u32,
    /// Total file size in bytes, header included.
    file_size: u64,
    /// CRC32 of the state section.
    checksum: u32,
    key_count: u64,
    bucket_count: u64,
}

impl FileHeader {
    fn new(checksum: u32, state: &ChdState, data_len: usize) -> Result<Self, PhfError> {
        let mut header = Self {
            magic: *MAGIC,
            version: FORMAT_VERSION,
            file_size: 0,
            checksum,
            key_count: state.num_keys,
            bucket_count: state.displacements.len() as u64,
        };
        // All header fields are fixed width, so the placeholder does not
        // change the encoded size.
        header.file_size = bincode::serialized_size(&header)? + data_len as u64;
        Ok(header)
    }

    fn validate(&self, actual_size: u64) -> Result<(), PhfError> {
        if &self.magic != MAGIC {
            return Err(invalid_data(format!(
                "Invalid file format: expected magic {:?}, got {:?}",
                MAGIC, self.magic
            )));
        }

        if self.version != FORMAT_VERSION {
            return Err(invalid_data(format!(
                "Incompatible format version: expected {}, got {}",
                FORMAT_VERSION, self.version
            )));
        }

        if self.file_size != actual_size {
            return Err(invalid_data(format!(
                "Truncated or padded file: header says {} bytes, found {}",
                self.file_size, actual_size
            )));
        }

        Ok(())
    }
}

fn invalid_data(msg: String) -> PhfError {
    PhfError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, msg))
}

/// Writes to `<path>.tmp` and renames over `path` on commit. Dropping the
/// writer without committing removes the temp file.
pub struct AtomicWriter {
    temp_path: PathBuf,
    final_path: PathBuf,
    writer: BufWriter<File>,
}

impl AtomicWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, PhfError> {
        let final_path = path.as_ref().to_path_buf();
        let mut temp_name = final_path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        Ok(Self {
            temp_path,
            final_path,
            writer: BufWriter::new(file),
        })
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), PhfError> {
        self.writer.write_all(data)?;
        Ok(())
    }

    pub fn commit(mut self) -> Result<(), PhfError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        std::fs::rename(&self.temp_path, &self.final_path)?;
        Ok(())
    }
}

impl Drop for AtomicWriter {
    fn drop(&mut self) {
        // No-op after a successful rename.
        let _ = std::fs::remove_file(&self.temp_path);
    }
}

pub fn calculate_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Write `state` to `path` with header, checksum and atomic replace.
pub fn write_with_integrity<P: AsRef<Path>>(path: P, state: &ChdState) -> Result<(), PhfError> {
    let data_bytes = bincode::serialize(state)?;
    let checksum = calculate_checksum(&data_bytes);
    let header = FileHeader::new(checksum, state, data_bytes.len())?;
    let header_bytes = bincode::serialize(&header)?;

    let mut writer = AtomicWriter::new(path)?;
    writer.write_all(&header_bytes)?;
    writer.write_all(&data_bytes)?;
    writer.commit()?;

    log::debug!(
        "wrote CHD state: {} keys, {} buckets, {} bytes",
        state.num_keys,
        state.displacements.len(),
        header.file_size
    );
    Ok(())
}

/// Read a state written by [`write_with_integrity`], validating header,
/// size, checksum and counts.
pub fn read_with_validation<P: AsRef<Path>>(path: P) -> Result<ChdState, PhfError> {
    let file = File::open(path)?;
    let actual_size = file.metadata()?.len();
    let mut reader = BufReader::new(file);

    let header: FileHeader = bincode::deserialize_from(&mut reader)?;
    header.validate(actual_size)?;

    let mut data_bytes = Vec::new();
    reader.read_to_end(&mut data_bytes)?;

    let actual_checksum = calculate_checksum(&data_bytes);
    if actual_checksum != header.checksum {
        return Err(invalid_data(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, actual_checksum
        )));
    }

    let state: ChdState = bincode::deserialize(&data_bytes)?;

    if state.num_keys != header.key_count
        || state.displacements.len() as u64 != header.bucket_count
    {
        return Err(invalid_data(format!(
            "Count mismatch: header says {} keys / {} buckets, got {} / {}",
            header.key_count,
            header.bucket_count,
            state.num_keys,
            state.displacements.len()
        )));
    }

    Ok(state)
}
