use {
    anyhow::Result,
    fs_err::{OpenOptions, create_dir_all},
    std::{
        io::{self, Write},
        path::Path,
    },
};

/// Returns a writer for log output: the specified file (created if missing and
/// opened for appending) or stderr if no file is specified.
#[inline]
pub fn log_writer(log_file: Option<&Path>) -> Result<Box<dyn Write + Send>> {
    if let Some(log_file) = log_file {
        if let Some(dir) = log_file.parent() {
            create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        Ok(Box::new(file))
    } else {
        Ok(Box::new(io::stderr()))
    }
}
