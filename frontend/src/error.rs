use std::path::PathBuf;

use quartz_core::error::ConfigError;
use quartz_machines::LoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("ZIP archive has no entry named {0:?}")]
    MissingEntry(String),

    #[error("ZIP archive contains no files")]
    EmptyArchive,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid log filter {0:?}")]
    LogFilter(String),
}
