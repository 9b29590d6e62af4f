//! Digest engine: streaming file hashing and the digest value type
//!
//! Files are read in bounded chunks and fed to an incremental accumulator, so
//! memory use stays flat regardless of file size. Digests are stored as raw
//! bytes; hex parsing is case-insensitive and display is always lowercase.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::errors::{DigestError, DigestResult, ManifestError, ManifestResult};

/// Hash algorithm used for manifest digests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256, 32-byte digests
    #[default]
    Sha256,
    /// MD5, 16-byte digests
    Md5,
}

impl DigestAlgorithm {
    /// Length of a digest in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Md5 => 16,
        }
    }

    /// Identifier used in configuration and log output
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Md5 => "md5",
        }
    }

    fn accumulator(&self) -> Accumulator {
        match self {
            DigestAlgorithm::Sha256 => Accumulator::Sha256(Sha256::new()),
            DigestAlgorithm::Md5 => Accumulator::Md5(md5::Context::new()),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            "md5" => Ok(DigestAlgorithm::Md5),
            other => Err(format!("unsupported hash algorithm: {}", other)),
        }
    }
}

/// Incremental hash state for one file
enum Accumulator {
    Sha256(Sha256),
    Md5(md5::Context),
}

impl Accumulator {
    fn update(&mut self, data: &[u8]) {
        match self {
            Accumulator::Sha256(h) => h.update(data),
            Accumulator::Md5(h) => h.consume(data),
        }
    }

    fn finish(self) -> Digest {
        match self {
            Accumulator::Sha256(h) => Digest(h.finalize().to_vec()),
            Accumulator::Md5(h) => Digest(h.compute().0.to_vec()),
        }
    }
}

/// A computed or expected file digest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(Vec<u8>);

impl Digest {
    /// Parse a hex digest for the given algorithm
    ///
    /// Accepts upper, lower or mixed case. The length must match the
    /// algorithm's digest size.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shard_fetcher::app::{Digest, DigestAlgorithm};
    ///
    /// let lower = Digest::from_hex("d41d8cd98f00b204e9800998ecf8427e", DigestAlgorithm::Md5)?;
    /// let upper = Digest::from_hex("D41D8CD98F00B204E9800998ECF8427E", DigestAlgorithm::Md5)?;
    /// assert_eq!(lower, upper);
    /// # Ok::<(), shard_fetcher::errors::ManifestError>(())
    /// ```
    pub fn from_hex(hex_str: &str, algorithm: DigestAlgorithm) -> ManifestResult<Self> {
        let invalid = || ManifestError::InvalidDigest {
            algorithm: algorithm.name().to_string(),
            digest: hex_str.to_string(),
        };

        if hex_str.len() != algorithm.digest_len() * 2 {
            return Err(invalid());
        }

        hex::decode(hex_str).map(Digest).map_err(|_| invalid())
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Hash an in-memory buffer
pub fn digest_bytes(data: &[u8], algorithm: DigestAlgorithm) -> Digest {
    let mut acc = algorithm.accumulator();
    acc.update(data);
    acc.finish()
}

/// Compute the digest of a file by streaming it through the accumulator
///
/// Reads at most `chunk_size` bytes at a time. A missing file yields
/// `DigestError::NotFound`; any other read failure yields `DigestError::Io`.
/// This function never modifies the file.
pub fn compute_file_digest(
    path: &Path,
    algorithm: DigestAlgorithm,
    chunk_size: usize,
) -> DigestResult<Digest> {
    let io_error = |source: std::io::Error| {
        if source.kind() == ErrorKind::NotFound {
            DigestError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            DigestError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    };

    let mut file = File::open(path).map_err(io_error)?;
    let mut buffer = vec![0u8; chunk_size.max(1)];
    let mut acc = algorithm.accumulator();

    loop {
        match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => acc.update(&buffer[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(e)),
        }
    }

    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HELLO_SHA256: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

    #[test]
    fn test_known_digests() {
        assert_eq!(
            digest_bytes(b"hello", DigestAlgorithm::Sha256).to_hex(),
            HELLO_SHA256
        );
        assert_eq!(digest_bytes(b"hello", DigestAlgorithm::Md5).to_hex(), HELLO_MD5);
    }

    #[test]
    fn test_from_hex_case_insensitive() {
        let lower = Digest::from_hex(HELLO_SHA256, DigestAlgorithm::Sha256).unwrap();
        let upper =
            Digest::from_hex(&HELLO_SHA256.to_uppercase(), DigestAlgorithm::Sha256).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.to_hex(), HELLO_SHA256);
    }

    #[test]
    fn test_from_hex_rejects_wrong_length_and_characters() {
        let invalid_cases = [
            "",
            HELLO_MD5,
            &HELLO_SHA256[..63],
            "zz24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
        ];

        for hex_str in invalid_cases {
            assert!(
                Digest::from_hex(hex_str, DigestAlgorithm::Sha256).is_err(),
                "Should reject: {}",
                hex_str
            );
        }
    }

    #[test]
    fn test_streaming_matches_one_shot_across_chunk_sizes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        let content: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        let expected = digest_bytes(&content, DigestAlgorithm::Sha256);
        for chunk_size in [1, 7, 4096, 1 << 20] {
            let actual = compute_file_digest(&path, DigestAlgorithm::Sha256, chunk_size).unwrap();
            assert_eq!(actual, expected, "chunk size {}", chunk_size);
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = compute_file_digest(
            &temp_dir.path().join("absent"),
            DigestAlgorithm::Sha256,
            1024,
        );
        assert!(matches!(result, Err(DigestError::NotFound { .. })));
    }

    #[test]
    fn test_algorithm_parsing() {
        assert_eq!("SHA256".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha256));
        assert_eq!("md5".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Md5));
        assert!("crc32".parse::<DigestAlgorithm>().is_err());
    }
}
