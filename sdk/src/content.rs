use tempfile::SpooledTempFile;

/// An envelope held in a spooled temporary file, rewound to its start.
pub struct SealedContent {
    pub file: SpooledTempFile,
    pub original_size: u64,
    pub sealed_size: u64,
}
