mod shuffle;

use {
    anyhow::{Context as _, Result, bail, ensure},
    fs_err::{create_dir_all, read, remove_file, write},
    rand::{Rng, rng},
    sealstream::{
        Ctx,
        cli::Command,
        config::Config,
        generate_keys, handle_command,
    },
    sealstream_protocol::{FileId, util::log_writer},
    sealstream_sdk::crypto::CodecError,
    shuffle::{random_content, tamper},
    std::{collections::HashMap, path::Path, sync::Mutex},
    tempfile::TempDir,
    tracing::{debug, error, info},
    tracing_subscriber::{EnvFilter, util::SubscriberInitExt},
};

const ITERATIONS: usize = 300;
const MAX_ID: i64 = 150;

#[tokio::main]
async fn main() -> Result<()> {
    let dir = TempDir::new()?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_writer(None)?))
        .with_env_filter(EnvFilter::try_new("info,sealstream_sdk=debug")?)
        .finish()
        .init();

    let r = try_main(dir.path()).await;
    if let Err(err) = &r {
        error!("{err:?}");
    }
    r
}

async fn try_main(dir: &Path) -> Result<()> {
    debug!("dir: {}", dir.display());
    let storage_path = dir.join("storage");
    create_dir_all(&storage_path)?;
    let files_dir = dir.join("files");
    create_dir_all(&files_dir)?;

    let config_path = dir.join("sealstream.json5");
    write(
        &config_path,
        format!(
            "{{\n{}storage_path: {:?},\nmax_in_memory: '64 KiB',\n}}\n",
            generate_keys()?.as_str(),
            storage_path.to_str().context("non-utf8 temp dir")?,
        ),
    )?;
    let config = Config::load(&config_path)?;
    let ctx = Ctx::new(&config)?;

    let mut expected = HashMap::<FileId, Vec<u8>>::new();
    for i in 0..ITERATIONS {
        let id = FileId(rng().random_range(0..MAX_ID));
        match rng().random_range(0..10) {
            0..=3 => put(&ctx, &files_dir, id, &mut expected).await?,
            4..=6 => get(&ctx, &files_dir, id, &expected).await?,
            7 => {
                let result = handle_command(Command::Remove { id }, &ctx).await;
                ensure!(
                    result.is_ok() == expected.remove(&id).is_some(),
                    "unexpected remove result for {id}: {result:?}"
                );
            }
            8 => tamper_and_check(&ctx, &files_dir, id, &mut expected).await?,
            _ => seal_and_open(&ctx, &files_dir).await?,
        }
        if i % 50 == 0 {
            info!("iteration {i}, {} files stored", expected.len());
        }
    }

    for (&id, content) in &expected {
        let output = files_dir.join(format!("final_{id}"));
        handle_command(
            Command::Get {
                id,
                path: output.clone(),
            },
            &ctx,
        )
        .await?;
        ensure!(&read(&output)? == content, "content mismatch for {id}");
    }
    info!("ok");
    Ok(())
}

async fn put(
    ctx: &Ctx,
    files_dir: &Path,
    id: FileId,
    expected: &mut HashMap<FileId, Vec<u8>>,
) -> Result<()> {
    let content = random_content();
    let path = files_dir.join(format!("put_{id}"));
    write(&path, &content)?;
    handle_command(Command::Put { id, path }, ctx).await?;
    debug!("put {id} ({} bytes)", content.len());
    expected.insert(id, content);
    Ok(())
}

async fn get(
    ctx: &Ctx,
    files_dir: &Path,
    id: FileId,
    expected: &HashMap<FileId, Vec<u8>>,
) -> Result<()> {
    let path = files_dir.join(format!("get_{id}"));
    if path.exists() {
        remove_file(&path)?;
    }
    let result = handle_command(
        Command::Get {
            id,
            path: path.clone(),
        },
        ctx,
    )
    .await;
    match (result, expected.get(&id)) {
        (Ok(()), Some(content)) => {
            ensure!(&read(&path)? == content, "content mismatch for {id}");
        }
        (Err(_), None) => ensure!(!path.exists(), "output created for missing {id}"),
        (Ok(()), None) => bail!("got removed file {id}"),
        (Err(err), Some(_)) => return Err(err.context(format!("failed to get {id}"))),
    }
    Ok(())
}

async fn tamper_and_check(
    ctx: &Ctx,
    files_dir: &Path,
    id: FileId,
    expected: &mut HashMap<FileId, Vec<u8>>,
) -> Result<()> {
    if expected.remove(&id).is_none() {
        return Ok(());
    }
    let storage_file = ctx
        .storage
        .as_ref()
        .context("storage is not configured")?
        .file_path(id);
    let kind = tamper(&storage_file)?;
    debug!("tampered with {id}: {kind}");

    let path = files_dir.join(format!("tampered_{id}"));
    let Err(err) = handle_command(
        Command::Get {
            id,
            path: path.clone(),
        },
        ctx,
    )
    .await
    else {
        bail!("tampered file {id} was accepted ({kind})");
    };
    ensure!(
        matches!(
            err.downcast_ref::<CodecError>(),
            Some(CodecError::Integrity | CodecError::Framing(_))
        ),
        "unexpected error for tampered file {id}: {err:?}"
    );
    ensure!(!path.exists(), "output created for tampered {id}");
    handle_command(Command::Remove { id }, ctx).await?;
    Ok(())
}

async fn seal_and_open(ctx: &Ctx, files_dir: &Path) -> Result<()> {
    let sources = files_dir.join("sources");
    create_dir_all(&sources)?;
    let mut inputs = Vec::new();
    let mut contents = Vec::new();
    for i in 0..rng().random_range(1..=4) {
        let path = sources.join(format!("{i}.dat"));
        let content = random_content();
        write(&path, &content)?;
        inputs.push(path);
        contents.push(content);
    }

    let sealed_dir = files_dir.join("sealed");
    handle_command(
        Command::Seal {
            inputs,
            output_dir: sealed_dir.clone(),
        },
        ctx,
    )
    .await?;

    for (i, content) in contents.iter().enumerate() {
        let output = files_dir.join(format!("opened_{i}.dat"));
        handle_command(
            Command::Open {
                input: sealed_dir.join(format!("{i}.dat.sealed")),
                output: output.clone(),
            },
            ctx,
        )
        .await?;
        ensure!(&read(&output)? == content, "opened content mismatch");
    }
    Ok(())
}
