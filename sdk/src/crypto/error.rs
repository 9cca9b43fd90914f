use {sealstream_protocol::credentials::KeyError, std::io, thiserror::Error};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("key initialization failed")]
    KeyInitialization(#[from] KeyError),
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error("data integrity check failed")]
    Integrity,
    #[error("failed to generate nonce")]
    Rng(#[from] rand::rand_core::OsError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// The envelope is too short to contain its fixed-size parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FramingError {
    #[error("nonce missing")]
    NonceMissing,
    #[error("envelope too short")]
    TooShort,
}
