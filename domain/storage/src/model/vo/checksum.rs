use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::exception::FileRequestException;

/// Digest algorithms a content address may be expressed in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "BLAKE3")]
    Blake3,
}

impl ChecksumAlgorithm {
    /// Length of the hexadecimal digest.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 | Self::Blake3 => 64,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Blake3 => "BLAKE3",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = FileRequestException;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA-1" | "SHA1" => Ok(Self::Sha1),
            "SHA-256" | "SHA256" => Ok(Self::Sha256),
            "BLAKE3" => Ok(Self::Blake3),
            _ => Err(FileRequestException::Validation {
                reason: format!("unsupported checksum algorithm <{s}>"),
            }),
        }
    }
}

/// A checksum is a non empty hexadecimal digest of a supported algorithm.
pub fn check_checksum(checksum: &str, algorithm: &str) -> Result<(), FileRequestException> {
    let algo: ChecksumAlgorithm = algorithm.parse()?;
    if checksum.is_empty()
        || checksum.len() > algo.hex_len()
        || !checksum.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(FileRequestException::MalformedChecksum {
            checksum: checksum.to_owned(),
            algorithm: algo.to_string(),
        });
    }
    Ok(())
}
