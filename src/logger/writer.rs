use std::fs::{self, File, OpenOptions};
use std::sync::Mutex;

use super::config::FileConfig;
use super::error::LoggerError;

/// Opens the log file described by `config`, creating parent directories.
///
/// The returned `Mutex<File>` implements `MakeWriter`, so it plugs straight
/// into a `fmt` layer.
pub(crate) fn open_log_file(config: &FileConfig) -> Result<Mutex<File>, LoggerError> {
    if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(config.append)
        .truncate(!config.append)
        .open(&config.path)?;

    Ok(Mutex::new(file))
}
