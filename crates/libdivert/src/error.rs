use std::path::PathBuf;

use nix::errno::Errno;

use crate::config::ConfigError;

/// Errors that are fatal to bringing the mount up.
#[derive(thiserror::Error, Debug)]
pub enum MountError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open backing directory {path}: {errno}")]
    Backing { path: PathBuf, errno: Errno },
    #[error("fuse session failed: {0}")]
    Session(#[from] std::io::Error),
}
