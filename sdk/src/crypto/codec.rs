use {
    super::{CodecError, io::DEFAULT_MAX_IN_MEMORY},
    aes::Aes256,
    ctr::cipher::{KeyIvInit, StreamCipher},
    hmac::{
        Hmac, Mac,
        digest::{InvalidLength, KeyInit, MacError},
    },
    rand::{TryRngCore, rngs::OsRng},
    sealstream_protocol::{
        NONCE_SIZE, TAG_SIZE,
        credentials::{CipherKey, KeyError, MacKey},
    },
    sha2::Sha256,
    std::fmt::{self, Debug},
};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub type Nonce = [u8; NONCE_SIZE];
pub type Tag = [u8; TAG_SIZE];

/// Seals and opens envelopes with a fixed pair of keys.
///
/// The codec itself is immutable. Every operation gets its own cipher and MAC state
/// from [`Codec::new_encryptor`] or [`Codec::new_decryptor`], so a single codec
/// can be shared between threads.
pub struct Codec {
    cipher_key: CipherKey,
    // Keyed with the MAC key, cloned for every operation.
    mac: HmacSha256,
    max_in_memory: usize,
}

impl Codec {
    /// Creates a codec from raw key bytes.
    ///
    /// The cipher key must be exactly 32 bytes and the MAC key at least 32 bytes.
    #[inline]
    pub fn new(cipher_key: &[u8], mac_key: &[u8]) -> Result<Self, CodecError> {
        Self::from_keys(
            CipherKey::from_bytes(cipher_key)?,
            &MacKey::from_bytes(mac_key)?,
        )
    }

    /// Creates a codec from validated keys.
    ///
    /// HMAC accepts keys of any length (longer than a block they are hashed first),
    /// so the length error below is unreachable for any [`MacKey`]. It is still mapped
    /// rather than unwrapped to keep construction panic free.
    #[inline]
    pub fn from_keys(cipher_key: CipherKey, mac_key: &MacKey) -> Result<Self, CodecError> {
        let mac = <HmacSha256 as KeyInit>::new_from_slice(mac_key.as_bytes())
            .map_err(|InvalidLength| KeyError::MacKeyLength(mac_key.as_bytes().len()))?;
        Ok(Self {
            cipher_key,
            mac,
            max_in_memory: DEFAULT_MAX_IN_MEMORY,
        })
    }

    /// Sets how much ciphertext [`Codec::open`] keeps in memory before
    /// spooling it to a temporary file.
    #[must_use]
    #[inline]
    pub fn with_max_in_memory(mut self, max_in_memory: usize) -> Self {
        self.max_in_memory = max_in_memory;
        self
    }

    #[must_use]
    #[inline]
    pub fn max_in_memory(&self) -> usize {
        self.max_in_memory
    }

    /// Starts a new envelope with a fresh random nonce.
    #[inline]
    pub fn new_encryptor(&self) -> Result<Encryptor, CodecError> {
        let mut nonce = Nonce::default();
        OsRng.try_fill_bytes(&mut nonce)?;
        Ok(self.encryptor_with_nonce(nonce))
    }

    /// Starts opening an envelope that begins with `nonce`.
    #[must_use]
    #[inline]
    pub fn new_decryptor(&self, nonce: &Nonce) -> Decryptor {
        Decryptor {
            cipher: self.stream_cipher(nonce),
            mac: self.authenticator(nonce),
        }
    }

    pub(crate) fn encryptor_with_nonce(&self, nonce: Nonce) -> Encryptor {
        Encryptor {
            cipher: self.stream_cipher(&nonce),
            mac: self.authenticator(&nonce),
            nonce,
        }
    }

    fn stream_cipher(&self, nonce: &Nonce) -> Aes256Ctr {
        Aes256Ctr::new(self.cipher_key.as_bytes().into(), nonce.into())
    }

    // The nonce is sent in the clear but still covered by the tag.
    fn authenticator(&self, nonce: &Nonce) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(nonce);
        mac
    }
}

impl Debug for Codec {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("max_in_memory", &self.max_in_memory)
            .finish_non_exhaustive()
    }
}

/// Cipher and MAC state of a single envelope being sealed.
pub struct Encryptor {
    nonce: Nonce,
    cipher: Aes256Ctr,
    mac: HmacSha256,
}

impl Encryptor {
    #[must_use]
    #[inline]
    pub fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// Encrypts the next chunk of plaintext in place and adds the resulting ciphertext to the tag.
    #[inline]
    pub fn encrypt_chunk(&mut self, chunk: &mut [u8]) {
        self.cipher.apply_keystream(chunk);
        self.mac.update(chunk);
    }

    #[must_use]
    #[inline]
    pub fn finalize(self) -> Tag {
        self.mac.finalize().into_bytes().into()
    }
}

/// State of a single envelope being opened. It can only authenticate ciphertext;
/// decryption becomes available after [`Decryptor::verify`] succeeds.
pub struct Decryptor {
    cipher: Aes256Ctr,
    mac: HmacSha256,
}

impl Decryptor {
    #[inline]
    pub fn authenticate(&mut self, ciphertext: &[u8]) {
        self.mac.update(ciphertext);
    }

    /// Compares the received tag with the computed one in constant time.
    #[inline]
    pub fn verify(self, tag: &[u8]) -> Result<VerifiedDecryptor, CodecError> {
        self.mac
            .verify_slice(tag)
            .map_err(|MacError| CodecError::Integrity)?;
        Ok(VerifiedDecryptor {
            cipher: self.cipher,
        })
    }
}

pub struct VerifiedDecryptor {
    cipher: Aes256Ctr,
}

impl VerifiedDecryptor {
    /// Decrypts the next chunk of authenticated ciphertext in place.
    #[inline]
    pub fn decrypt_chunk(&mut self, chunk: &mut [u8]) {
        self.cipher.apply_keystream(chunk);
    }
}
