use {
    anyhow::{Context as _, Result},
    byte_unit::Byte,
    derivative::Derivative,
    sealstream_protocol::credentials::{CipherKey, MacKey},
    serde::{Deserialize, Serialize},
    std::path::{Path, PathBuf},
    zeroize::Zeroizing,
};

#[derive(Derivative, Clone, Serialize, Deserialize)]
#[derivative(Debug)]
pub struct Config {
    #[derivative(Debug = "ignore")]
    pub cipher_key: CipherKey,
    #[derivative(Debug = "ignore")]
    pub mac_key: MacKey,
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    /// Envelopes larger than this are spooled to disk while being verified.
    #[serde(default = "default_max_in_memory")]
    pub max_in_memory: Byte,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = Zeroizing::new(fs_err::read_to_string(path)?);
        json5::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }
}

fn default_max_in_memory() -> Byte {
    Byte::from_u64(32 * 1024 * 1024)
}

fn default_log_filter() -> String {
    "info".into()
}
