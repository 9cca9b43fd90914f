pub mod credentials;
pub mod util;

use {
    anyhow::{Error, ensure},
    derive_more::{Display, From, Into},
    serde::{Deserialize, Serialize},
    std::str::FromStr,
};

/// Length of the random nonce that starts every envelope.
pub const NONCE_SIZE: usize = 16;

/// Length of the HMAC-SHA-256 tag that ends every envelope.
pub const TAG_SIZE: usize = 32;

/// Number of bytes an envelope adds to the plaintext it protects.
pub const ENVELOPE_OVERHEAD: u64 = 48;

/// Returns the length of the envelope produced for `original_size` bytes of plaintext.
#[must_use]
#[inline]
pub fn sealed_size(original_size: u64) -> Option<u64> {
    original_size.checked_add(ENVELOPE_OVERHEAD)
}

/// Returns the plaintext length carried by an envelope of `sealed_size` bytes,
/// or `None` if an envelope of that length cannot be valid.
#[must_use]
#[inline]
pub fn original_size(sealed_size: u64) -> Option<u64> {
    sealed_size.checked_sub(ENVELOPE_OVERHEAD)
}

/// Identifier of a stored file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, From, Into,
    Display,
)]
pub struct FileId(pub i64);

impl FromStr for FileId {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s.parse()?;
        ensure!(value >= 0, "file id must not be negative, got {value}");
        Ok(Self(value))
    }
}
