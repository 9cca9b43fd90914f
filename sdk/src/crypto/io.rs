use {
    super::{Codec, CodecError, Decryptor, Encryptor, FramingError, Nonce, Tag},
    crate::content::SealedContent,
    sealstream_protocol::{NONCE_SIZE, TAG_SIZE, sealed_size},
    std::{
        cmp::min,
        io::{self, Read, Seek, Write},
    },
    tempfile::SpooledTempFile,
    tracing::{Span, debug, instrument, warn},
};

/// Max length of a chunk that is encrypted or decrypted at once.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Max size of ciphertext that will be kept in memory while an envelope is being verified.
/// Larger envelopes are spooled to a temporary file on disk.
pub const DEFAULT_MAX_IN_MEMORY: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealedSize {
    pub original_size: u64,
    pub sealed_size: u64,
}

fn byte_count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Writes an envelope with the encrypted content of everything written to it.
///
/// The nonce is written on creation, the tag is written by [`SealingWriter::finish`].
pub struct SealingWriter<W> {
    encryptor: Encryptor,
    // Ciphertext of the chunk being written.
    buf: Vec<u8>,
    output: W,
    original_size: u64,
}

impl<W: Write> SealingWriter<W> {
    #[inline]
    pub fn new(codec: &Codec, mut output: W) -> Result<Self, CodecError> {
        let encryptor = codec.new_encryptor()?;
        output.write_all(encryptor.nonce())?;
        Ok(Self {
            encryptor,
            buf: Vec::with_capacity(CHUNK_SIZE),
            output,
            original_size: 0,
        })
    }

    #[must_use]
    #[inline]
    pub fn nonce(&self) -> &Nonce {
        self.encryptor.nonce()
    }

    #[inline]
    pub fn finish(self) -> Result<(W, SealedSize), CodecError> {
        let Self {
            encryptor,
            mut output,
            original_size,
            ..
        } = self;
        let sealed_size = sealed_size(original_size)
            .ok_or_else(|| io::Error::other("envelope size overflow"))?;
        output.write_all(&encryptor.finalize())?;
        output.flush()?;
        let size = SealedSize {
            original_size,
            sealed_size,
        };
        Ok((output, size))
    }
}

impl<W: Write> Write for SealingWriter<W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (chunk, _) = buf.split_at(min(buf.len(), CHUNK_SIZE));
        self.buf.clear();
        self.buf.extend_from_slice(chunk);
        self.encryptor.encrypt_chunk(&mut self.buf);
        self.output.write_all(&self.buf)?;
        self.original_size = self.original_size.saturating_add(byte_count(chunk.len()));
        Ok(chunk.len())
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

/// Accepts an envelope and writes its plaintext to the output.
///
/// Nothing is written to the output until [`OpeningWriter::finish`] has verified the tag,
/// so the output stays untouched if the envelope is malformed or has been tampered with.
/// Apart from the spool, only the last [`TAG_SIZE`] received bytes are kept, whatever
/// the size of the writes.
pub struct OpeningWriter<'a, W> {
    codec: &'a Codec,
    nonce: Nonce,
    nonce_len: usize,
    // Created once the whole nonce has been received.
    decryptor: Option<Decryptor>,
    // Most recently received bytes. They may turn out to be the tag, so they are not authenticated yet.
    tail: Tag,
    tail_len: usize,
    // Authenticated ciphertext waiting for the tag check.
    spool: SpooledTempFile,
    ciphertext_size: u64,
    output: W,
}

impl<'a, W: Write> OpeningWriter<'a, W> {
    #[must_use]
    #[inline]
    pub fn new(codec: &'a Codec, output: W) -> Self {
        Self {
            codec,
            nonce: Nonce::default(),
            nonce_len: 0,
            decryptor: None,
            tail: Tag::default(),
            tail_len: 0,
            spool: SpooledTempFile::new(codec.max_in_memory()),
            ciphertext_size: 0,
            output,
        }
    }

    /// Verifies the tag and writes the plaintext to the output.
    ///
    /// Returns the output and the plaintext length.
    #[inline]
    pub fn finish(mut self) -> Result<(W, u64), CodecError> {
        let Some(decryptor) = self.decryptor.take() else {
            return Err(FramingError::NonceMissing.into());
        };
        if self.tail_len < TAG_SIZE {
            return Err(FramingError::TooShort.into());
        }
        let mut decryptor = decryptor.verify(&self.tail).inspect_err(|_| {
            warn!(
                ciphertext_size = self.ciphertext_size,
                "envelope failed integrity check"
            );
        })?;

        self.spool.rewind()?;
        let mut buf = vec![0; CHUNK_SIZE];
        loop {
            let len = self.spool.read(&mut buf)?;
            if len == 0 {
                break;
            }
            let (chunk, _) = buf.split_at_mut(len);
            decryptor.decrypt_chunk(chunk);
            self.output.write_all(chunk)?;
        }
        self.output.flush()?;
        Ok((self.output, self.ciphertext_size))
    }
}

fn spool_ciphertext(
    decryptor: &mut Decryptor,
    spool: &mut SpooledTempFile,
    ciphertext_size: &mut u64,
    ciphertext: &[u8],
) -> io::Result<()> {
    decryptor.authenticate(ciphertext);
    spool.write_all(ciphertext)?;
    *ciphertext_size = ciphertext_size.saturating_add(byte_count(ciphertext.len()));
    Ok(())
}

impl<W: Write> Write for OpeningWriter<'_, W> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut data = buf;
        if self.decryptor.is_none() {
            let missing = NONCE_SIZE.saturating_sub(self.nonce_len);
            let (nonce_part, rest) = data.split_at(min(missing, data.len()));
            let end = self.nonce_len.saturating_add(nonce_part.len());
            if let Some(dest) = self.nonce.get_mut(self.nonce_len..end) {
                dest.copy_from_slice(nonce_part);
            }
            self.nonce_len = end;
            data = rest;
            if self.nonce_len == NONCE_SIZE {
                self.decryptor = Some(self.codec.new_decryptor(&self.nonce));
            }
        }
        let Some(decryptor) = &mut self.decryptor else {
            return Ok(buf.len());
        };

        if data.len() >= TAG_SIZE {
            // The held back bytes and all of `data` except its last TAG_SIZE bytes are ciphertext.
            let (ciphertext, new_tail) = data.split_at(data.len().saturating_sub(TAG_SIZE));
            let (held, _) = self.tail.split_at(self.tail_len);
            for part in [held, ciphertext] {
                spool_ciphertext(
                    decryptor,
                    &mut self.spool,
                    &mut self.ciphertext_size,
                    part,
                )?;
            }
            self.tail.copy_from_slice(new_tail);
            self.tail_len = TAG_SIZE;
        } else {
            // Oldest held back bytes that no longer fit into the window are ciphertext.
            let excess = self
                .tail_len
                .saturating_add(data.len())
                .saturating_sub(TAG_SIZE);
            let (released, _) = self.tail.split_at(excess);
            spool_ciphertext(
                decryptor,
                &mut self.spool,
                &mut self.ciphertext_size,
                released,
            )?;
            self.tail.copy_within(excess..self.tail_len, 0);
            let kept = self.tail_len.saturating_sub(excess);
            let end = kept.saturating_add(data.len());
            if let Some(dest) = self.tail.get_mut(kept..end) {
                dest.copy_from_slice(data);
            }
            self.tail_len = end;
        }
        Ok(buf.len())
    }

    // Plaintext is only released by `finish`.
    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Codec {
    /// Seals `plaintext` and writes the envelope to `output`.
    #[instrument(skip_all, fields(original_size, sealed_size))]
    #[inline]
    pub fn seal_into<W: Write>(
        &self,
        mut plaintext: impl Read,
        output: W,
    ) -> Result<(W, SealedSize), CodecError> {
        let mut writer = SealingWriter::new(self, output)?;
        let nonce = hex::encode(writer.nonce());
        io::copy(&mut plaintext, &mut writer)?;
        let (output, size) = writer.finish()?;
        let span = Span::current();
        span.record("original_size", size.original_size);
        span.record("sealed_size", size.sealed_size);
        debug!(%nonce, "sealed");
        Ok((output, size))
    }

    /// Seals `plaintext` into a spooled temporary file, rewound to the start of the envelope.
    #[inline]
    pub fn seal(&self, plaintext: impl Read) -> Result<SealedContent, CodecError> {
        let output = SpooledTempFile::new(self.max_in_memory());
        let (mut file, size) = self.seal_into(plaintext, output)?;
        file.rewind()?;
        Ok(SealedContent {
            file,
            original_size: size.original_size,
            sealed_size: size.sealed_size,
        })
    }

    /// Reads an envelope from `envelope`, verifies it and writes the plaintext to `output`.
    ///
    /// Returns the plaintext length. On error nothing has been written to `output`,
    /// unless `output` itself failed while the verified plaintext was being written.
    #[instrument(skip_all, fields(original_size))]
    #[inline]
    pub fn open(&self, mut envelope: impl Read, output: impl Write) -> Result<u64, CodecError> {
        let mut writer = OpeningWriter::new(self, output);
        io::copy(&mut envelope, &mut writer)?;
        let (_, original_size) = writer.finish()?;
        Span::current().record("original_size", original_size);
        debug!("opened");
        Ok(original_size)
    }

    #[inline]
    pub fn seal_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let capacity = plaintext.len().saturating_add(NONCE_SIZE + TAG_SIZE);
        let (envelope, _) = self.seal_into(plaintext, Vec::with_capacity(capacity))?;
        Ok(envelope)
    }

    #[inline]
    pub fn open_bytes(&self, envelope: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut plaintext =
            Vec::with_capacity(envelope.len().saturating_sub(NONCE_SIZE + TAG_SIZE));
        self.open(envelope, &mut plaintext)?;
        Ok(plaintext)
    }
}
