//! Long-lived directory handles to the two backings.
//!
//! Both handles are acquired before the filesystem is mounted. Once the
//! mount covers the mount point the base directory has no path-based name
//! left, so these descriptors are the only remaining channel to it.

use std::os::fd::{AsFd, BorrowedFd, FromRawFd, OwnedFd};
use std::path::Path;

use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;

use crate::error::MountError;
use crate::router::Side;

#[derive(Debug)]
pub struct Backings {
    base: OwnedFd,
    alt: OwnedFd,
}

impl Backings {
    /// Opens both backing directories. `base` is the directory about to be
    /// mounted over; `alt` is the redirect target.
    pub fn open(base: &Path, alt: &Path) -> Result<Self, MountError> {
        Ok(Self {
            base: open_dir(base)?,
            alt: open_dir(alt)?,
        })
    }

    pub fn dirfd(&self, side: Side) -> BorrowedFd<'_> {
        match side {
            Side::Base => self.base.as_fd(),
            Side::Alt => self.alt.as_fd(),
        }
    }
}

fn open_dir(path: &Path) -> Result<OwnedFd, MountError> {
    let fd = open(
        path,
        OFlag::O_DIRECTORY | OFlag::O_RDONLY | OFlag::O_CLOEXEC,
        Mode::empty(),
    )
    .map_err(|errno| {
        tracing::error!(?errno, ?path, "failed to open backing directory");
        MountError::Backing {
            path: path.to_path_buf(),
            errno,
        }
    })?;

    // open returns a raw descriptor; nothing else owns it yet.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::TempDir;

    use super::Backings;
    use crate::error::MountError;
    use crate::router::Side;

    #[test]
    fn opens_both_backings() -> Result<()> {
        let base = TempDir::new()?;
        let alt = TempDir::new()?;
        let backings = Backings::open(base.path(), alt.path())?;

        use std::os::fd::AsRawFd;
        assert_ne!(
            backings.dirfd(Side::Base).as_raw_fd(),
            backings.dirfd(Side::Alt).as_raw_fd()
        );
        Ok(())
    }

    #[test]
    fn missing_backing_is_reported_with_its_path() {
        let base = TempDir::new().unwrap();
        let err = Backings::open(base.path(), std::path::Path::new("/no/such/dir")).unwrap_err();
        match err {
            MountError::Backing { path, .. } => {
                assert_eq!(path, std::path::Path::new("/no/such/dir"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_directory_backing_is_rejected() {
        let base = TempDir::new().unwrap();
        let file = base.path().join("plain");
        std::fs::write(&file, b"x").unwrap();
        assert!(Backings::open(base.path(), &file).is_err());
    }
}
