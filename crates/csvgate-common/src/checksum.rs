//! SHA-256 digests for key fingerprints and uploaded files

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Hex-encoded SHA-256 of a byte slice
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(data.as_ref()))
}

/// Hex-encoded SHA-256 of `parts` joined by `separator`.
///
/// The joined string is fed to the hasher piecewise, so no intermediate
/// allocation is made.
pub fn joined_sha256_hex<'a>(parts: impl IntoIterator<Item = &'a str>, separator: &str) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            hasher.update(separator.as_bytes());
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 of any readable source
pub fn compute_checksum<R: Read>(reader: &mut R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the SHA-256 of a file
pub fn compute_file_checksum(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_checksum(&mut file)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_sha256_hex() {
        assert_eq!(sha256_hex("hello world"), HELLO_WORLD_SHA256);
    }

    #[test]
    fn test_compute_checksum_streams() {
        let mut cursor = Cursor::new(b"hello world".to_vec());
        assert_eq!(compute_checksum(&mut cursor).unwrap(), HELLO_WORLD_SHA256);
    }

    #[test]
    fn test_joined_matches_concatenation() {
        assert_eq!(joined_sha256_hex(["hello", "world"], " "), HELLO_WORLD_SHA256);
        assert_eq!(joined_sha256_hex(std::iter::empty(), " "), sha256_hex(""));
    }

    proptest! {
        #[test]
        fn prop_joined_equals_join(parts in proptest::collection::vec("[a-zA-Z0-9 ;]{0,12}", 0..6)) {
            let expected = sha256_hex(parts.join(" "));
            let actual = joined_sha256_hex(parts.iter().map(String::as_str), " ");
            prop_assert_eq!(actual, expected);
        }
    }
}
