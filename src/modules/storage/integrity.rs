//! Content checksums for stored files
//!
//! SHA-256 over the full byte content, rendered as lowercase hex. Used at
//! upload time and for on-demand verification of the primary copy.

use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read buffer used when hashing from a reader
const HASH_CHUNK_SIZE: usize = 64 * 1024;

pub struct IntegrityVerifier;

impl IntegrityVerifier {
    /// Digest of an in-memory payload
    pub fn compute(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Digest of everything readable from `reader`, in fixed-size chunks
    pub async fn compute_reader<R>(reader: &mut R) -> std::io::Result<String>
    where
        R: AsyncRead + Unpin,
    {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Compare two hex digests ignoring case
    pub fn matches(expected: &str, actual: &str) -> bool {
        expected.eq_ignore_ascii_case(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest_of_empty_input() {
        assert_eq!(
            IntegrityVerifier::compute(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_reader_matches_in_memory_digest() {
        // Larger than one chunk so the loop runs more than once
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut reader = std::io::Cursor::new(data.clone());
        let streamed = IntegrityVerifier::compute_reader(&mut reader).await.unwrap();
        assert_eq!(streamed, IntegrityVerifier::compute(&data));
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        assert!(IntegrityVerifier::matches("ABCDEF", "abcdef"));
        assert!(!IntegrityVerifier::matches("abcdef", "abcdee"));
    }
}
