use anyhow::bail;
use domain_storage::model::vo::ChecksumAlgorithm;
use sha2::{Digest, Sha256};

/// Hexadecimal digest of `content`, `None` for algorithms computed upstream only.
pub fn digest(algorithm: ChecksumAlgorithm, content: &[u8]) -> Option<String> {
    match algorithm {
        ChecksumAlgorithm::Blake3 => Some(blake3::hash(content).to_hex().to_string()),
        ChecksumAlgorithm::Sha256 => Some(format!("{:x}", Sha256::digest(content))),
        ChecksumAlgorithm::Md5 | ChecksumAlgorithm::Sha1 => None,
    }
}

/// Refuse content whose digest differs from the declared checksum.
pub fn verify(algorithm: &str, checksum: &str, content: &[u8]) -> anyhow::Result<()> {
    let algorithm: ChecksumAlgorithm = algorithm.parse()?;
    match digest(algorithm, content) {
        Some(actual) if !actual.eq_ignore_ascii_case(checksum) => {
            bail!("{algorithm} checksum mismatch: expected {checksum}, got {actual}.")
        }
        Some(_) => Ok(()),
        None => {
            tracing::trace!("{algorithm} checksum {checksum} not verified.");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let sha256 = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert!(verify("SHA-256", sha256, b"hello").is_ok());
        assert!(verify("sha256", &sha256.to_uppercase(), b"hello").is_ok());
        assert!(verify("SHA-256", sha256, b"hello!").is_err());

        let blake3 = blake3::hash(b"hello").to_hex().to_string();
        assert!(verify("BLAKE3", &blake3, b"hello").is_ok());
        assert!(verify("BLAKE3", &blake3, b"other").is_err());

        assert!(verify("MD5", "abc123", b"anything").is_ok());
        assert!(verify("CRC32", "abc123", b"anything").is_err());
    }
}
