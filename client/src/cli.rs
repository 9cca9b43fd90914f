use {
    anyhow::{Result, anyhow},
    clap::{Parser, Subcommand},
    sealstream_protocol::FileId,
    std::path::PathBuf,
};

#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Cli {
    /// Path to the config file.
    #[clap(long)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Seal files into `<output-dir>/<name>.sealed`.
    Seal {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output_dir: PathBuf,
    },
    /// Verify and decrypt a sealed file.
    Open { input: PathBuf, output: PathBuf },
    /// Seal a file into the storage under `id`.
    Put { id: FileId, path: PathBuf },
    /// Restore the file stored under `id`.
    Get { id: FileId, path: PathBuf },
    /// Delete the file stored under `id`.
    Remove { id: FileId },
    /// Print a new pair of keys for the config file.
    GenerateKeys,
}

pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("cannot find config dir"))?;
    Ok(config_dir.join("sealstream.json5"))
}
