use serde::{Deserialize, Serialize};

/// Identifies a remote artifact and the integrity constraints a local copy
/// has to satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDescriptor {
    pub url: String,

    /// Expected size in bytes, values below 1 disable the size check.
    #[serde(default, alias = "filesize")]
    pub expected_size: i64,

    /// Expected hex digest of the content, `None` disables the checksum check.
    #[serde(default, alias = "md5sum", skip_serializing_if = "Option::is_none")]
    pub expected_checksum: Option<String>,
}

impl ArtifactDescriptor {
    /// A descriptor without any integrity constraints.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expected_size: 0,
            expected_checksum: None,
        }
    }

    #[must_use]
    pub fn with_size(mut self, expected_size: i64) -> Self {
        self.expected_size = expected_size;
        self
    }

    #[must_use]
    pub fn with_checksum(mut self, expected_checksum: impl Into<String>) -> Self {
        self.expected_checksum = Some(expected_checksum.into());
        self
    }

    /// The size that is enforced, if any.
    pub fn enforced_size(&self) -> Option<u64> {
        u64::try_from(self.expected_size).ok().filter(|size| *size >= 1)
    }

    /// The file name under which this artifact is cached.
    pub fn filename(&self) -> &str {
        filename_for(&self.url)
    }
}

/// Derives the cache file name of a URL: everything after the last `/` of
/// its path component, or the whole path component if it has no `/`.
///
/// The derivation is purely syntactic. The path is not normalized and percent
/// escapes are kept as they are.
pub fn filename_for(url: &str) -> &str {
    let path = path_component(url);
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// The path component of a URI reference (RFC 3986 section 3.3).
fn path_component(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let reference = &url[..end];

    let hierarchical = match scheme_end(reference) {
        Some(colon) => &reference[colon + 1..],
        None => reference,
    };

    match hierarchical.strip_prefix("//") {
        Some(authority_and_path) => authority_and_path
            .find('/')
            .map_or("", |slash| &authority_and_path[slash..]),
        None => hierarchical,
    }
}

fn scheme_end(reference: &str) -> Option<usize> {
    let colon = reference.find(':')?;
    let mut chars = reference[..colon].chars();
    let is_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    is_scheme.then_some(colon)
}
