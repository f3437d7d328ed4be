//! Size and checksum checks of local files against an [`ArtifactDescriptor`].
//!
//! Both checks are optional: a descriptor without an enforced size or without
//! a checksum always passes that check. Failing to read the file is an error,
//! never a mismatch.
use std::{io::Read, path::Path};

use rattler_digest::{Md5, Sha256, digest::Digest};

use crate::{
    descriptor::ArtifactDescriptor,
    error::{ArtifactError, IntegrityCheck},
};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Digest algorithms understood by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha256,
}

impl ChecksumAlgorithm {
    /// Picks the algorithm an expected hex digest was produced with.
    ///
    /// 64 hex characters are a SHA-256 digest, anything else is treated as MD5.
    pub fn for_expected(expected: &str) -> Self {
        if expected.len() == 64 {
            ChecksumAlgorithm::Sha256
        } else {
            ChecksumAlgorithm::Md5
        }
    }
}

/// Computes the lowercase hex digest of the file at `path`.
pub fn file_checksum(path: &Path, algorithm: ChecksumAlgorithm) -> std::io::Result<String> {
    match algorithm {
        ChecksumAlgorithm::Md5 => hash_file::<Md5>(path),
        ChecksumAlgorithm::Sha256 => hash_file::<Sha256>(path),
    }
}

fn hash_file<D: Digest + Default>(path: &Path) -> std::io::Result<String> {
    let mut reader = fs_err::File::open(path)?;
    let mut hasher = D::default();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn file_size(path: &Path) -> std::io::Result<u64> {
    Ok(fs_err::metadata(path)?.len())
}

fn size_mismatch(
    descriptor: &ArtifactDescriptor,
    path: &Path,
) -> std::io::Result<Option<IntegrityCheck>> {
    let Some(expected) = descriptor.enforced_size() else {
        return Ok(None);
    };
    let actual = file_size(path)?;
    Ok((actual != expected).then_some(IntegrityCheck::Size { expected, actual }))
}

fn checksum_mismatch(
    descriptor: &ArtifactDescriptor,
    path: &Path,
) -> std::io::Result<Option<IntegrityCheck>> {
    let Some(expected) = descriptor.expected_checksum.as_deref() else {
        return Ok(None);
    };
    let actual = file_checksum(path, ChecksumAlgorithm::for_expected(expected))?;
    Ok((actual != expected).then(|| IntegrityCheck::Checksum {
        expected: expected.to_string(),
        actual,
    }))
}

/// Returns the first failing check, size before checksum.
///
/// The checksum is only computed when the size check passes.
pub(crate) fn find_mismatch(
    descriptor: &ArtifactDescriptor,
    path: &Path,
) -> std::io::Result<Option<IntegrityCheck>> {
    if let Some(mismatch) = size_mismatch(descriptor, path)? {
        return Ok(Some(mismatch));
    }
    checksum_mismatch(descriptor, path)
}

/// True if no size is enforced or the file has exactly the expected size.
pub fn size_matches(descriptor: &ArtifactDescriptor, path: &Path) -> Result<bool, ArtifactError> {
    Ok(size_mismatch(descriptor, path)?.is_none())
}

/// True if no checksum is configured or the file digest equals it.
pub fn checksum_matches(
    descriptor: &ArtifactDescriptor,
    path: &Path,
) -> Result<bool, ArtifactError> {
    Ok(checksum_mismatch(descriptor, path)?.is_none())
}

/// Fails with [`ArtifactError::IntegrityMismatch`] if either check fails.
pub fn verify(descriptor: &ArtifactDescriptor, path: &Path) -> Result<(), ArtifactError> {
    match find_mismatch(descriptor, path)? {
        None => Ok(()),
        Some(check) => Err(ArtifactError::IntegrityMismatch {
            path: path.to_path_buf(),
            check,
        }),
    }
}
