//! Content checksums for generated and golden artifacts
//!
//! A checksum is only ever compared against another checksum computed with the
//! same algorithm in the same run; nothing is persisted.

use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

/// Read buffer size for streaming files through the hasher
const CHUNK_SIZE: usize = 64 * 1024;

/// Supported checksum algorithms
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Sha256,
    Blake3,
}

impl Algorithm {
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Sha256 => "sha256",
            Algorithm::Blake3 => "blake3",
        }
    }

    fn hasher(self) -> Hasher {
        match self {
            Algorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            Algorithm::Blake3 => Hasher::Blake3(Box::new(blake3::Hasher::new())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

enum Hasher {
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Blake3(h) => {
                h.update(data);
            }
        }
    }

    fn finish(self) -> String {
        match self {
            Hasher::Sha256(h) => format!("{:x}", h.finalize()),
            Hasher::Blake3(h) => h.finalize().to_hex().to_string(),
        }
    }
}

/// A fingerprint of a byte sequence, tagged with the algorithm that made it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Checksum {
    pub algorithm: Algorithm,
    pub hex: String,
}

impl Checksum {
    /// Checksum an in-memory byte slice
    pub fn of_bytes(algorithm: Algorithm, data: &[u8]) -> Self {
        let mut hasher = algorithm.hasher();
        hasher.update(data);
        Self {
            algorithm,
            hex: hasher.finish(),
        }
    }

    /// Checksum a file, streaming it in fixed-size chunks
    pub async fn of_file(algorithm: Algorithm, path: &Path) -> io::Result<Self> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = algorithm.hasher();
        let mut buf = vec![0u8; CHUNK_SIZE];

        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(Self {
            algorithm,
            hex: hasher.finish(),
        })
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let sum = Checksum::of_bytes(Algorithm::Sha256, b"abc");
        assert_eq!(
            sum.hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(sum.to_string().starts_with("sha256:ba7816bf"));
    }

    #[test]
    fn test_single_byte_difference_changes_checksum() {
        let mut image = vec![0x89, b'P', b'N', b'G', 0, 0, 0, 13];
        image.extend(std::iter::repeat(0x7f).take(4096));
        let mut corrupted = image.clone();
        corrupted[2048] ^= 0x01;

        for algorithm in [Algorithm::Sha256, Algorithm::Blake3] {
            assert_ne!(
                Checksum::of_bytes(algorithm, &image),
                Checksum::of_bytes(algorithm, &corrupted)
            );
        }
    }

    #[test]
    fn test_checksum_is_order_sensitive() {
        let a = Checksum::of_bytes(Algorithm::Blake3, b"ab");
        let b = Checksum::of_bytes(Algorithm::Blake3, b"ba");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_file_checksum_matches_bytes_across_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        for algorithm in [Algorithm::Sha256, Algorithm::Blake3] {
            let from_file = Checksum::of_file(algorithm, &path).await.unwrap();
            assert_eq!(from_file, Checksum::of_bytes(algorithm, &data));
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Checksum::of_file(Algorithm::Sha256, &dir.path().join("nope"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
