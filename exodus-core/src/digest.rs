//! Content addressing: streaming SHA-256 over local content.
//!
//! Sources are read in [`CHUNK_SIZE`] chunks so memory stays bounded
//! regardless of file size. A read failure always surfaces as an error; a
//! partial digest is never returned.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{io_err, CoreError};
use crate::types::ContentKey;

/// Read size for each hash update.
pub const CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Hash everything `reader` yields.
pub fn digest_reader(mut reader: impl Read) -> std::io::Result<ContentKey> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(ContentKey::from_digest(hex::encode(hasher.finalize())))
}

/// Hash the file at `path`.
pub fn digest_file(path: &Path) -> Result<ContentKey, CoreError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    digest_reader(file).map_err(|e| io_err(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    #[rstest]
    #[case(b"", "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")]
    #[case(b"hello", "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")]
    fn known_digests(#[case] input: &[u8], #[case] expected: &str) {
        let key = digest_reader(Cursor::new(input)).unwrap();
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn same_bytes_same_key() {
        let data = vec![7u8; 3 * 1024 + 17];
        let a = digest_reader(Cursor::new(&data)).unwrap();
        let b = digest_reader(Cursor::new(&data)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_boundaries_do_not_change_the_digest() {
        // One byte over a chunk forces a second read.
        let data = vec![0xabu8; CHUNK_SIZE + 1];
        let whole = {
            let mut h = Sha256::new();
            h.update(&data);
            hex::encode(h.finalize())
        };
        let key = digest_reader(Cursor::new(&data)).unwrap();
        assert_eq!(key.as_str(), whole);
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn read_error_is_surfaced() {
        assert!(digest_reader(Broken).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("nope.bin");
        match digest_file(&missing) {
            Err(CoreError::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
