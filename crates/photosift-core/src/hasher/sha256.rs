use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Window digested by the trailing hash: the last 1 MiB of the file, or
/// the whole file when smaller.
pub const TRAILING_HASH_SIZE: u64 = 1024 * 1024;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// SHA-256 of the last `min(size, 1 MiB)` bytes of a file, as lower-case
/// hex.
pub fn compute_trailing_hash(path: &Path, file_size: u64) -> std::io::Result<String> {
    let mut file = File::open(path)?;

    let start_pos = file_size.saturating_sub(TRAILING_HASH_SIZE);
    file.seek(SeekFrom::Start(start_pos))?;

    digest_to_end(BufReader::new(file))
}

/// SHA-256 of the entire file content, as lower-case hex.
pub fn compute_full_hash(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    digest_to_end(BufReader::new(file))
}

fn digest_to_end<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buffer)? {
            0 => break,
            n => hasher.update(&buffer[..n]),
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}
