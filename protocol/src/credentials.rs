use {
    base64::{Engine, display::Base64Display, prelude::BASE64_STANDARD},
    rand::{TryRngCore, rngs::OsRng},
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::{
        borrow::Cow,
        fmt::{self, Debug, Display},
        str::FromStr,
    },
    thiserror::Error,
    zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing},
};

/// Required length of the stream cipher key (AES-256).
pub const CIPHER_KEY_LENGTH: usize = 32;

/// Minimal length of the authentication key (HMAC-SHA-256).
pub const MIN_MAC_KEY_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("cipher key must be {CIPHER_KEY_LENGTH} bytes, got {0}")]
    CipherKeyLength(usize),
    #[error("MAC key must be at least {MIN_MAC_KEY_LENGTH} bytes, got {0}")]
    MacKeyLength(usize),
    #[error("invalid base64 encoding")]
    Encoding(#[from] base64::DecodeError),
    #[error("failed to draw key bytes from the OS random source")]
    Rng(#[from] rand::rand_core::OsError),
}

/// Secret used to encrypt file content with AES-256-CTR.
///
/// Must be independent from the [`MacKey`] used with it.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey([u8; CIPHER_KEY_LENGTH]);

impl CipherKey {
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != CIPHER_KEY_LENGTH {
            return Err(KeyError::CipherKeyLength(bytes.len()));
        }
        let mut key = Self([0; CIPHER_KEY_LENGTH]);
        key.0.copy_from_slice(bytes);
        Ok(key)
    }

    #[inline]
    pub fn generate() -> Result<Self, KeyError> {
        let mut key = Self([0; CIPHER_KEY_LENGTH]);
        OsRng.try_fill_bytes(&mut key.0)?;
        Ok(key)
    }

    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8; CIPHER_KEY_LENGTH] {
        &self.0
    }

    #[must_use]
    #[inline]
    pub fn display_unmasked(&self) -> impl Display + '_ {
        Base64Display::new(&self.0, &BASE64_STANDARD)
    }
}

/// Secret used to authenticate envelopes with HMAC-SHA-256.
///
/// Any length of at least [`MIN_MAC_KEY_LENGTH`] bytes is accepted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MacKey(Box<[u8]>);

impl MacKey {
    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() < MIN_MAC_KEY_LENGTH {
            return Err(KeyError::MacKeyLength(bytes.len()));
        }
        Ok(Self(Box::from(bytes)))
    }

    #[inline]
    pub fn generate() -> Result<Self, KeyError> {
        let mut key = Self(vec![0; MIN_MAC_KEY_LENGTH].into_boxed_slice());
        OsRng.try_fill_bytes(&mut key.0)?;
        Ok(key)
    }

    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    #[inline]
    pub fn display_unmasked(&self) -> impl Display + '_ {
        Base64Display::new(&self.0, &BASE64_STANDARD)
    }
}

macro_rules! impl_key_encoding {
    ($name:ident) => {
        impl FromStr for $name {
            type Err = KeyError;

            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = Zeroizing::new(BASE64_STANDARD.decode(s.trim())?);
                Self::from_bytes(&bytes)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            #[inline]
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let encoded =
                    Zeroizing::new(Cow::<'_, str>::deserialize(deserializer)?.into_owned());
                encoded.parse().map_err(de::Error::custom)
            }
        }

        impl Serialize for $name {
            #[inline]
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                Zeroizing::new(BASE64_STANDARD.encode(&self.0))
                    .as_str()
                    .serialize(serializer)
            }
        }

        impl Debug for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name)).finish()
            }
        }
    };
}

impl_key_encoding!(CipherKey);
impl_key_encoding!(MacKey);
