//! File content is protected with AES-256 in counter mode and authenticated with HMAC-SHA-256
//! (encrypt-then-MAC). Two independent keys are used: [`CipherKey`] for the stream cipher
//! and [`MacKey`] for the authentication tag.
//!
//! Every sealed file is a single envelope:
//!
//! - nonce (128 bits) - random value drawn from the OS random source for each envelope,
//!   used as the initial counter block (big endian, wrapping)
//! - ciphertext - same length as the plaintext, no padding
//! - tag (256 bits) - HMAC-SHA-256 of the nonce followed by the ciphertext
//!
//! When opening an envelope, the tag is checked before any plaintext is produced.
//! Ciphertext is authenticated as it arrives and held in a spooled temporary file
//! (in memory up to a limit, on disk beyond it). Only after the whole envelope has been
//! consumed and the tag has been verified is the ciphertext decrypted into the output.
//!
//! The spooled ciphertext is not authenticated a second time when it is read back for
//! decryption. The spool is trusted like process memory: once it outgrows the limit it
//! moves to an anonymous temporary file (unlinked on creation where the OS allows it)
//! that only this process holds a handle to. Anyone able to rewrite that file while an
//! envelope is being opened could change the released plaintext. Where the temp
//! directory is not trusted, raise [`Codec::with_max_in_memory`] so envelopes stay in memory.
//!
//! [`CipherKey`]: sealstream_protocol::credentials::CipherKey
//! [`MacKey`]: sealstream_protocol::credentials::MacKey

mod codec;
mod error;
mod io;

pub use codec::{Codec, Decryptor, Encryptor, Nonce, Tag, VerifiedDecryptor};
pub use error::{CodecError, FramingError};
pub use io::{CHUNK_SIZE, DEFAULT_MAX_IN_MEMORY, OpeningWriter, SealedSize, SealingWriter};
