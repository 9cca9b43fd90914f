use {
    crate::crypto::{Codec, CodecError, FramingError, SealedSize},
    anyhow::{Context as _, Result, bail, ensure},
    fs_err::{File, create_dir_all, remove_file, rename},
    sealstream_protocol::{FileId, original_size},
    std::{
        io::{BufReader, Read, Write},
        path::{Path, PathBuf},
    },
    tempfile::NamedTempFile,
    tracing::{debug, info},
};

/// Directory of sealed files addressed by [`FileId`].
///
/// Files are written to `<root>/tmp` first and renamed into place only
/// after the whole envelope is on disk, so a reader never sees a partial file.
#[derive(Debug)]
pub struct Storage {
    root: PathBuf,
    tmp: PathBuf,
}

fn storage_paths(root: &Path, id: FileId) -> (PathBuf, PathBuf) {
    let dir = root.join(format!("{:02}", id.0.rem_euclid(100)));
    let file_path = dir.join(id.to_string());
    (dir, file_path)
}

impl Storage {
    #[inline]
    pub fn new(root: PathBuf) -> Result<Self> {
        if !root.try_exists()? {
            bail!("storage root {} doesn't exist", root.display());
        }

        let tmp = root.join("tmp");
        create_dir_all(&tmp)?;

        Ok(Self { root, tmp })
    }

    #[inline]
    pub fn create_file(&self) -> Result<NamedTempFile> {
        Ok(NamedTempFile::new_in(&self.tmp)?)
    }

    /// Moves a finished temporary file to the location of `id`, replacing
    /// any file previously stored under it.
    #[inline]
    pub fn commit_file(&self, mut file: NamedTempFile, id: FileId) -> Result<()> {
        file.flush()?;
        file.as_file().sync_all()?;
        let (dir, new_file_path) = storage_paths(&self.root, id);
        create_dir_all(dir)?;
        let (_, old_path) = file.keep()?;
        if let Err(err) = rename(&old_path, new_file_path) {
            let _ = remove_file(&old_path);
            return Err(err.into());
        }
        Ok(())
    }

    /// Location of the file stored under `id`.
    #[must_use]
    #[inline]
    pub fn file_path(&self, id: FileId) -> PathBuf {
        storage_paths(&self.root, id).1
    }

    #[inline]
    pub fn exists(&self, id: FileId) -> Result<bool> {
        Ok(self.file_path(id).try_exists()?)
    }

    #[inline]
    pub fn open_file(&self, id: FileId) -> Result<File> {
        Ok(File::open(self.file_path(id))?)
    }

    #[inline]
    pub fn remove_file(&self, id: FileId) -> Result<()> {
        remove_file(self.file_path(id))?;
        info!(%id, "removed file");
        Ok(())
    }

    /// Seals `content` and stores the envelope under `id`.
    #[inline]
    pub fn put_file(&self, codec: &Codec, id: FileId, content: impl Read) -> Result<SealedSize> {
        let file = self.create_file()?;
        let (file, size) = codec
            .seal_into(content, file)
            .with_context(|| format!("failed to seal file {id}"))?;
        self.commit_file(file, id)?;
        info!(
            %id,
            original_size = size.original_size,
            sealed_size = size.sealed_size,
            "stored file"
        );
        Ok(size)
    }

    /// Opens the envelope stored under `id` and writes its plaintext to `output`.
    ///
    /// Nothing is written to `output` unless the envelope is authentic.
    #[inline]
    pub fn get_file(&self, codec: &Codec, id: FileId, output: impl Write) -> Result<u64> {
        let file = self.open_file(id)?;
        let sealed_size = file.metadata()?.len();
        let Some(expected_size) = original_size(sealed_size) else {
            return Err(CodecError::from(FramingError::TooShort)).with_context(|| {
                format!("stored file {id} is too short to be an envelope ({sealed_size} bytes)")
            });
        };
        debug!(%id, sealed_size, original_size = expected_size, "opening stored file");
        let size = codec
            .open(BufReader::new(file), output)
            .with_context(|| format!("failed to open file {id}"))?;
        ensure!(
            size == expected_size,
            "stored file {id} changed while it was being read"
        );
        Ok(size)
    }
}
