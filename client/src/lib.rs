pub mod cli;
pub mod config;

use {
    anyhow::{Context as _, Result, anyhow, ensure},
    cli::{Cli, Command},
    config::Config,
    fs_err::{File, create_dir_all},
    sealstream_protocol::{
        FileId,
        credentials::{CipherKey, MacKey},
        util::log_writer,
    },
    sealstream_sdk::{
        crypto::{Codec, SealedSize},
        storage::Storage,
    },
    std::{
        collections::HashSet,
        io::{BufReader, BufWriter, IntoInnerError, Write},
        path::{Path, PathBuf},
        sync::{Arc, Mutex},
    },
    tempfile::NamedTempFile,
    tokio::task::{JoinSet, spawn_blocking},
    tracing::{info, warn},
    zeroize::Zeroizing,
    tracing_subscriber::{
        EnvFilter, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
    },
};

#[derive(Debug)]
pub struct Ctx {
    pub codec: Arc<Codec>,
    pub storage: Option<Arc<Storage>>,
}

impl Ctx {
    pub fn new(config: &Config) -> Result<Self> {
        let max_in_memory = usize::try_from(config.max_in_memory.as_u64())
            .context("`max_in_memory` is too large")?;
        let codec = Codec::from_keys(config.cipher_key.clone(), &config.mac_key)?
            .with_max_in_memory(max_in_memory);
        let storage = config
            .storage_path
            .clone()
            .map(Storage::new)
            .transpose()?
            .map(Arc::new);
        Ok(Self {
            codec: Arc::new(codec),
            storage,
        })
    }

    fn storage(&self) -> Result<Arc<Storage>> {
        self.storage
            .clone()
            .ok_or_else(|| anyhow!("missing `storage_path` in config"))
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let ctx = Ctx::new(&config)?;
    handle_command(cli.command, &ctx).await
}

pub async fn handle_command(command: Command, ctx: &Ctx) -> Result<()> {
    match command {
        Command::Seal { inputs, output_dir } => {
            seal_files(&ctx.codec, inputs, &output_dir).await?;
        }
        Command::Open { input, output } => {
            let codec = Arc::clone(&ctx.codec);
            let size = spawn_blocking(move || open_file(&codec, &input, &output)).await??;
            info!("Opened {size} bytes.");
        }
        Command::Put { id, path } => {
            let codec = Arc::clone(&ctx.codec);
            let storage = ctx.storage()?;
            spawn_blocking(move || {
                let content = BufReader::new(File::open(&path)?);
                storage.put_file(&codec, id, content)
            })
            .await??;
        }
        Command::Get { id, path } => {
            let codec = Arc::clone(&ctx.codec);
            let storage = ctx.storage()?;
            let size = spawn_blocking(move || get_file(&codec, &storage, id, &path)).await??;
            info!("Restored {size} bytes.");
        }
        Command::Remove { id } => {
            ctx.storage()?.remove_file(id)?;
        }
        Command::GenerateKeys => print_keys()?,
    }
    Ok(())
}

/// Seals every input file into `output_dir` in parallel.
///
/// All inputs are attempted even if some of them fail.
pub async fn seal_files(
    codec: &Arc<Codec>,
    inputs: Vec<PathBuf>,
    output_dir: &Path,
) -> Result<()> {
    let mut output_names = HashSet::new();
    let mut jobs = Vec::new();
    for input in inputs {
        let file_name = input
            .file_name()
            .with_context(|| format!("invalid input path: {}", input.display()))?;
        let mut output_name = file_name.to_os_string();
        output_name.push(".sealed");
        ensure!(
            output_names.insert(output_name.clone()),
            "more than one input would be sealed into {}",
            output_dir.join(&output_name).display()
        );
        let output = output_dir.join(output_name);
        jobs.push((input, output));
    }

    create_dir_all(output_dir)?;
    let mut tasks = JoinSet::new();
    for (input, output) in jobs {
        let codec = Arc::clone(codec);
        tasks.spawn_blocking(move || {
            seal_file(&codec, &input, &output)
                .with_context(|| format!("failed to seal {}", input.display()))
        });
    }

    let mut errors = Vec::new();
    while let Some(result) = tasks.join_next().await {
        if let Err(err) = result? {
            warn!("{err:?}");
            errors.push(err);
        }
    }
    ensure!(errors.is_empty(), "failed to seal {} file(s)", errors.len());
    Ok(())
}

pub fn seal_file(codec: &Codec, input: &Path, output: &Path) -> Result<SealedSize> {
    let content = BufReader::new(File::open(input)?);
    let file = NamedTempFile::new_in(parent_dir(output))?;
    let (writer, size) = codec.seal_into(content, BufWriter::new(file))?;
    let file = writer.into_inner().map_err(IntoInnerError::into_error)?;
    file.persist(output).map_err(|err| err.error)?;
    info!(
        "Sealed {} -> {} ({} bytes)",
        input.display(),
        output.display(),
        size.sealed_size
    );
    Ok(size)
}

/// Opens a sealed file into `output`. The output file only appears
/// after the whole envelope has been verified.
pub fn open_file(codec: &Codec, input: &Path, output: &Path) -> Result<u64> {
    let envelope = BufReader::new(File::open(input)?);
    write_atomically(output, |writer| Ok(codec.open(envelope, writer)?))
        .with_context(|| format!("failed to open {}", input.display()))
}

pub fn get_file(codec: &Codec, storage: &Storage, id: FileId, output: &Path) -> Result<u64> {
    write_atomically(output, |writer| storage.get_file(codec, id, writer))
}

fn write_atomically(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<NamedTempFile>) -> Result<u64>,
) -> Result<u64> {
    let mut writer = BufWriter::new(NamedTempFile::new_in(parent_dir(path))?);
    let size = write(&mut writer)?;
    writer.flush()?;
    let file = writer.into_inner().map_err(IntoInnerError::into_error)?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(size)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Returns config lines with a freshly generated pair of keys.
pub fn generate_keys() -> Result<Zeroizing<String>> {
    let cipher_key = CipherKey::generate()?;
    let mac_key = MacKey::generate()?;
    Ok(Zeroizing::new(format!(
        "cipher_key: \"{}\",\nmac_key: \"{}\",\n",
        cipher_key.display_unmasked(),
        mac_key.display_unmasked(),
    )))
}

#[expect(clippy::print_stdout, reason = "keys are the output of the command")]
pub fn print_keys() -> Result<()> {
    print!("{}", generate_keys()?.as_str());
    Ok(())
}

pub fn setup_logger(log_file: Option<&Path>, log_filter: &str) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(log_file.is_none())
        .with_writer(Mutex::new(log_writer(log_file)?));
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(EnvFilter::try_new(log_filter)?)
        .try_init()?;
    Ok(())
}
