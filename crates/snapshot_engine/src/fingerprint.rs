use std::fmt;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of a page's UTF-8 bytes.
///
/// The empty fingerprint stands for "nothing recorded yet" and never equals a real digest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Wraps a previously persisted digest. Surrounding whitespace is ignored.
    pub fn from_recorded(value: &str) -> Self {
        Self(value.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn fingerprint(content: &str) -> ContentFingerprint {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    ContentFingerprint(hex)
}

pub fn has_changed(new: &ContentFingerprint, old: &ContentFingerprint) -> bool {
    new != old
}
