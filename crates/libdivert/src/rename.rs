//! Rename, including the cross-backing fallback.
//!
//! The kernel refuses to rename between the two backings (they are
//! distinct filesystems from its point of view), so a rename whose source
//! and target route to different sides comes back EXDEV. The fallback
//! emulates it as copy-then-unlink.
//!
//! The emulation is deliberately weaker than a real rename: it is not
//! atomic, preserves the file mode but not ownership, timestamps, or
//! extended attributes, and does not handle directories or symlinks
//! specially. A failure inside the fallback surfaces that failure's errno,
//! masking the original EXDEV.

use std::os::fd::{AsFd, BorrowedFd};
use std::path::Path;

use nix::errno::Errno;

use crate::sys;

pub(crate) fn rename_with_fallback(
    old_dir: BorrowedFd<'_>,
    old_path: &Path,
    new_dir: BorrowedFd<'_>,
    new_path: &Path,
) -> Result<(), Errno> {
    match sys::renameat(old_dir, old_path, new_dir, new_path) {
        Ok(()) => Ok(()),
        Err(Errno::EXDEV) => {
            tracing::debug!(?old_path, ?new_path, "rename crosses backings, copying");
            copy_unlink(old_dir, old_path, new_dir, new_path)
        }
        Err(errno) => Err(errno),
    }
}

fn copy_unlink(
    old_dir: BorrowedFd<'_>,
    old_path: &Path,
    new_dir: BorrowedFd<'_>,
    new_path: &Path,
) -> Result<(), Errno> {
    let st = sys::fstatat(old_dir, old_path, libc::AT_SYMLINK_NOFOLLOW)?;

    // replace semantics: a pre-existing target goes away first
    let _ = sys::unlinkat(new_dir, new_path, 0);

    let src = sys::openat(old_dir, old_path, libc::O_RDONLY, None)?;
    let dst = sys::openat(
        new_dir,
        new_path,
        libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
        Some(st.st_mode & 0o7777),
    )?;

    let mut buf = [0u8; sys::COPY_CHUNK];
    let mut offset: libc::off_t = 0;
    loop {
        let read = sys::pread(src.as_fd(), &mut buf, offset)?;
        if read == 0 {
            break;
        }
        let mut written = 0;
        while written < read {
            written += sys::pwrite(dst.as_fd(), &buf[written..read], offset + written as libc::off_t)?;
        }
        offset += read as libc::off_t;
    }

    drop(src);
    drop(dst);

    sys::unlinkat(old_dir, old_path, 0)
}
