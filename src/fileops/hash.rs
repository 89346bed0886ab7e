use blake3::Hasher;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::error::{FileOpsError, Result};

const CHUNK_SIZE: usize = 8192;

/// Hash a file's content with BLAKE3, streaming it in fixed-size chunks.
///
/// Returns the lowercase hex digest.
pub fn hash_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| FileOpsError::io(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0; CHUNK_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| FileOpsError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(unix)]
pub(crate) fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    metadata.mode()
}

#[cfg(not(unix))]
pub(crate) fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_hash_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"Hello, world!").unwrap();
        drop(file);

        let hash = hash_file(&file_path).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, blake3::hash(b"Hello, world!").to_hex().to_string());
    }

    #[test]
    fn test_hash_spans_multiple_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("big.bin");
        let content = vec![7u8; CHUNK_SIZE * 3 + 17];
        std::fs::write(&file_path, &content).unwrap();

        let hash = hash_file(&file_path).unwrap();
        assert_eq!(hash, blake3::hash(&content).to_hex().to_string());
    }

    #[test]
    fn test_hash_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = hash_file(&temp_dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, FileOpsError::Io { .. }));
    }
}
