//! Thin wrappers over the host syscalls the dispatcher needs.
//!
//! Every operation on a backing goes through the `*at` family, anchored at
//! one of the two long-lived directory descriptors, so the backings stay
//! reachable after the mount shadows the mount point. Each wrapper
//! translates the C return convention into `Result<_, Errno>`; nothing in
//! here routes or interprets paths.

use std::ffi::{CString, OsStr, OsString};
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::Path;

use nix::errno::Errno;

pub type Result<T> = std::result::Result<T, Errno>;

/// Chunk size for the cross-backing copy fallback.
pub const COPY_CHUNK: usize = 8192;

fn to_cstring(path: &Path) -> Result<CString> {
    let bytes = path.as_os_str().as_bytes();
    // The mount root arrives as the empty relative path; "." names the
    // backing directory itself for every *at call.
    let bytes = if bytes.is_empty() { b"." } else { bytes };
    CString::new(bytes).map_err(|_| Errno::EINVAL)
}

fn name_cstring(name: &OsStr) -> Result<CString> {
    CString::new(name.as_bytes()).map_err(|_| Errno::EINVAL)
}

/// Names `path` under `dir` through the procfs descriptor link. Used for
/// the xattr family, which has no `*at` variant with symlink-not-following
/// semantics.
fn proc_path(dir: BorrowedFd<'_>, path: &Path) -> Result<CString> {
    let rel = path.as_os_str().as_bytes();
    let rel: &[u8] = if rel.is_empty() { b"." } else { rel };
    let mut buf = format!("/proc/self/fd/{}/", dir.as_raw_fd()).into_bytes();
    buf.extend_from_slice(rel);
    CString::new(buf).map_err(|_| Errno::EINVAL)
}

pub fn openat(
    dir: BorrowedFd<'_>,
    path: &Path,
    flags: libc::c_int,
    mode: Option<libc::mode_t>,
) -> Result<OwnedFd> {
    let path = to_cstring(path)?;
    let fd = Errno::result(unsafe {
        libc::openat(
            dir.as_raw_fd(),
            path.as_ptr(),
            flags | libc::O_CLOEXEC,
            libc::c_uint::from(mode.unwrap_or(0)),
        )
    })?;
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

pub fn fstatat(dir: BorrowedFd<'_>, path: &Path, flags: libc::c_int) -> Result<libc::stat> {
    let path = to_cstring(path)?;
    let mut st = unsafe { std::mem::zeroed::<libc::stat>() };
    Errno::result(unsafe { libc::fstatat(dir.as_raw_fd(), path.as_ptr(), &mut st, flags) })?;
    Ok(st)
}

pub fn fstat(fd: BorrowedFd<'_>) -> Result<libc::stat> {
    let mut st = unsafe { std::mem::zeroed::<libc::stat>() };
    Errno::result(unsafe { libc::fstat(fd.as_raw_fd(), &mut st) })?;
    Ok(st)
}

pub fn mkdirat(dir: BorrowedFd<'_>, path: &Path, mode: libc::mode_t) -> Result<()> {
    let path = to_cstring(path)?;
    Errno::result(unsafe { libc::mkdirat(dir.as_raw_fd(), path.as_ptr(), mode) })?;
    Ok(())
}

pub fn mknodat(
    dir: BorrowedFd<'_>,
    path: &Path,
    mode: libc::mode_t,
    rdev: libc::dev_t,
) -> Result<()> {
    let path = to_cstring(path)?;
    Errno::result(unsafe { libc::mknodat(dir.as_raw_fd(), path.as_ptr(), mode, rdev) })?;
    Ok(())
}

pub fn unlinkat(dir: BorrowedFd<'_>, path: &Path, flags: libc::c_int) -> Result<()> {
    let path = to_cstring(path)?;
    Errno::result(unsafe { libc::unlinkat(dir.as_raw_fd(), path.as_ptr(), flags) })?;
    Ok(())
}

pub fn renameat(
    old_dir: BorrowedFd<'_>,
    old_path: &Path,
    new_dir: BorrowedFd<'_>,
    new_path: &Path,
) -> Result<()> {
    let old_path = to_cstring(old_path)?;
    let new_path = to_cstring(new_path)?;
    Errno::result(unsafe {
        libc::renameat(
            old_dir.as_raw_fd(),
            old_path.as_ptr(),
            new_dir.as_raw_fd(),
            new_path.as_ptr(),
        )
    })?;
    Ok(())
}

pub fn linkat(
    old_dir: BorrowedFd<'_>,
    old_path: &Path,
    new_dir: BorrowedFd<'_>,
    new_path: &Path,
) -> Result<()> {
    let old_path = to_cstring(old_path)?;
    let new_path = to_cstring(new_path)?;
    Errno::result(unsafe {
        libc::linkat(
            old_dir.as_raw_fd(),
            old_path.as_ptr(),
            new_dir.as_raw_fd(),
            new_path.as_ptr(),
            0,
        )
    })?;
    Ok(())
}

pub fn symlinkat(target: &Path, dir: BorrowedFd<'_>, path: &Path) -> Result<()> {
    let target = CString::new(target.as_os_str().as_bytes()).map_err(|_| Errno::EINVAL)?;
    let path = to_cstring(path)?;
    Errno::result(unsafe { libc::symlinkat(target.as_ptr(), dir.as_raw_fd(), path.as_ptr()) })?;
    Ok(())
}

pub fn readlinkat(dir: BorrowedFd<'_>, path: &Path) -> Result<OsString> {
    let path = to_cstring(path)?;
    let mut buf = vec![0u8; libc::PATH_MAX as usize];
    let n = Errno::result(unsafe {
        libc::readlinkat(
            dir.as_raw_fd(),
            path.as_ptr(),
            buf.as_mut_ptr().cast(),
            buf.len(),
        )
    })?;
    buf.truncate(n as usize);
    Ok(OsString::from_vec(buf))
}

pub fn faccessat(dir: BorrowedFd<'_>, path: &Path, mode: libc::c_int) -> Result<()> {
    let path = to_cstring(path)?;
    // AT_EACCESS checks against the effective ids, which carry the caller's
    // identity at this point.
    Errno::result(unsafe {
        libc::faccessat(dir.as_raw_fd(), path.as_ptr(), mode, libc::AT_EACCESS)
    })?;
    Ok(())
}

pub fn fchownat(
    dir: BorrowedFd<'_>,
    path: &Path,
    uid: Option<libc::uid_t>,
    gid: Option<libc::gid_t>,
) -> Result<()> {
    let path = to_cstring(path)?;
    Errno::result(unsafe {
        libc::fchownat(
            dir.as_raw_fd(),
            path.as_ptr(),
            uid.unwrap_or(libc::uid_t::MAX),
            gid.unwrap_or(libc::gid_t::MAX),
            libc::AT_SYMLINK_NOFOLLOW,
        )
    })?;
    Ok(())
}

pub fn fchmodat(dir: BorrowedFd<'_>, path: &Path, mode: libc::mode_t) -> Result<()> {
    let path = to_cstring(path)?;
    Errno::result(unsafe { libc::fchmodat(dir.as_raw_fd(), path.as_ptr(), mode, 0) })?;
    Ok(())
}

pub fn fchmod(fd: BorrowedFd<'_>, mode: libc::mode_t) -> Result<()> {
    Errno::result(unsafe { libc::fchmod(fd.as_raw_fd(), mode) })?;
    Ok(())
}

pub fn utimensat(
    dir: BorrowedFd<'_>,
    path: &Path,
    times: &[libc::timespec; 2],
) -> Result<()> {
    let path = to_cstring(path)?;
    Errno::result(unsafe {
        libc::utimensat(
            dir.as_raw_fd(),
            path.as_ptr(),
            times.as_ptr(),
            libc::AT_SYMLINK_NOFOLLOW,
        )
    })?;
    Ok(())
}

pub fn ftruncate(fd: BorrowedFd<'_>, size: libc::off_t) -> Result<()> {
    Errno::result(unsafe { libc::ftruncate(fd.as_raw_fd(), size) })?;
    Ok(())
}

pub fn pread(fd: BorrowedFd<'_>, buf: &mut [u8], offset: libc::off_t) -> Result<usize> {
    let n = Errno::result(unsafe {
        libc::pread(fd.as_raw_fd(), buf.as_mut_ptr().cast(), buf.len(), offset)
    })?;
    Ok(n as usize)
}

pub fn pwrite(fd: BorrowedFd<'_>, buf: &[u8], offset: libc::off_t) -> Result<usize> {
    let n = Errno::result(unsafe {
        libc::pwrite(fd.as_raw_fd(), buf.as_ptr().cast(), buf.len(), offset)
    })?;
    Ok(n as usize)
}

pub fn fsync(fd: BorrowedFd<'_>, datasync: bool) -> Result<()> {
    let ret = if datasync {
        unsafe { libc::fdatasync(fd.as_raw_fd()) }
    } else {
        unsafe { libc::fsync(fd.as_raw_fd()) }
    };
    Errno::result(ret)?;
    Ok(())
}

pub fn fstatvfs(fd: BorrowedFd<'_>) -> Result<libc::statvfs> {
    let mut st = unsafe { std::mem::zeroed::<libc::statvfs>() };
    Errno::result(unsafe { libc::fstatvfs(fd.as_raw_fd(), &mut st) })?;
    Ok(st)
}

pub fn lsetxattr(
    dir: BorrowedFd<'_>,
    path: &Path,
    name: &OsStr,
    value: &[u8],
    flags: libc::c_int,
) -> Result<()> {
    let path = proc_path(dir, path)?;
    let name = name_cstring(name)?;
    Errno::result(unsafe {
        libc::lsetxattr(
            path.as_ptr(),
            name.as_ptr(),
            value.as_ptr().cast(),
            value.len(),
            flags,
        )
    })?;
    Ok(())
}

/// Reads an xattr value. An empty `buf` probes the value length without
/// copying it out, matching the size-query form of the syscall.
pub fn lgetxattr(
    dir: BorrowedFd<'_>,
    path: &Path,
    name: &OsStr,
    buf: &mut [u8],
) -> Result<usize> {
    let path = proc_path(dir, path)?;
    let name = name_cstring(name)?;
    let (ptr, len) = if buf.is_empty() {
        (std::ptr::null_mut(), 0)
    } else {
        (buf.as_mut_ptr().cast(), buf.len())
    };
    let n = Errno::result(unsafe { libc::lgetxattr(path.as_ptr(), name.as_ptr(), ptr, len) })?;
    Ok(n as usize)
}

pub fn llistxattr(dir: BorrowedFd<'_>, path: &Path, buf: &mut [u8]) -> Result<usize> {
    let path = proc_path(dir, path)?;
    let (ptr, len) = if buf.is_empty() {
        (std::ptr::null_mut(), 0)
    } else {
        (buf.as_mut_ptr().cast(), buf.len())
    };
    let n = Errno::result(unsafe { libc::llistxattr(path.as_ptr(), ptr, len) })?;
    Ok(n as usize)
}

pub fn lremovexattr(dir: BorrowedFd<'_>, path: &Path, name: &OsStr) -> Result<()> {
    let path = proc_path(dir, path)?;
    let name = name_cstring(name)?;
    Errno::result(unsafe { libc::lremovexattr(path.as_ptr(), name.as_ptr()) })?;
    Ok(())
}

/// Lists a directory under `dir`, skipping `.` and `..`. Returns each
/// entry's name and raw `d_type` byte; `DT_UNKNOWN` is left for the caller
/// to resolve, since only the caller knows which backing should answer.
pub fn read_dir_at(dir: BorrowedFd<'_>, path: &Path) -> Result<Vec<(OsString, u8)>> {
    let fd = openat(dir, path, libc::O_RDONLY | libc::O_DIRECTORY, None)?;
    let dirp = unsafe { libc::fdopendir(fd.as_raw_fd()) };
    if dirp.is_null() {
        return Err(Errno::last());
    }
    // fdopendir took ownership of the descriptor; closedir releases it.
    std::mem::forget(fd);

    let mut entries = Vec::new();
    let result = loop {
        Errno::clear();
        let ent = unsafe { libc::readdir64(dirp) };
        if ent.is_null() {
            break match Errno::last() {
                Errno::UnknownErrno => Ok(()),
                errno => Err(errno),
            };
        }
        let name = unsafe { std::ffi::CStr::from_ptr((*ent).d_name.as_ptr()) };
        let name = name.to_bytes();
        if name == b"." || name == b".." {
            continue;
        }
        let d_type = unsafe { (*ent).d_type };
        entries.push((OsString::from_vec(name.to_vec()), d_type));
    };

    unsafe { libc::closedir(dirp) };
    result.map(|()| entries)
}

#[cfg(test)]
mod tests {
    use std::os::fd::{AsFd, FromRawFd, OwnedFd};
    use std::path::Path;

    use anyhow::Result;
    use tempfile::TempDir;

    use super::*;

    fn open_dir(path: &Path) -> Result<OwnedFd> {
        let fd = nix::fcntl::open(
            path,
            nix::fcntl::OFlag::O_DIRECTORY | nix::fcntl::OFlag::O_RDONLY | nix::fcntl::OFlag::O_CLOEXEC,
            nix::sys::stat::Mode::empty(),
        )?;
        Ok(unsafe { OwnedFd::from_raw_fd(fd) })
    }

    #[test]
    fn stat_of_empty_path_names_the_directory_itself() -> Result<()> {
        let dir = TempDir::new()?;
        let fd = open_dir(dir.path())?;
        let st = fstatat(fd.as_fd(), Path::new(""), libc::AT_SYMLINK_NOFOLLOW)?;
        assert_eq!(st.st_mode & libc::S_IFMT, libc::S_IFDIR);
        Ok(())
    }

    #[test]
    fn mkdir_stat_unlink_roundtrip() -> Result<()> {
        let dir = TempDir::new()?;
        let fd = open_dir(dir.path())?;

        mkdirat(fd.as_fd(), Path::new("sub"), 0o755)?;
        let st = fstatat(fd.as_fd(), Path::new("sub"), libc::AT_SYMLINK_NOFOLLOW)?;
        assert_eq!(st.st_mode & libc::S_IFMT, libc::S_IFDIR);

        unlinkat(fd.as_fd(), Path::new("sub"), libc::AT_REMOVEDIR)?;
        let err = fstatat(fd.as_fd(), Path::new("sub"), libc::AT_SYMLINK_NOFOLLOW).unwrap_err();
        assert_eq!(err, Errno::ENOENT);
        Ok(())
    }

    #[test]
    fn pwrite_then_pread_returns_written_bytes() -> Result<()> {
        let dir = TempDir::new()?;
        let fd = open_dir(dir.path())?;
        let file = openat(
            fd.as_fd(),
            Path::new("data"),
            libc::O_RDWR | libc::O_CREAT,
            Some(0o644),
        )?;

        let written = pwrite(file.as_fd(), b"hello", 3)?;
        assert_eq!(written, 5);

        let mut buf = [0u8; 5];
        let read = pread(file.as_fd(), &mut buf, 3)?;
        assert_eq!(read, 5);
        assert_eq!(&buf, b"hello");
        Ok(())
    }

    #[test]
    fn symlink_then_readlink_reports_target() -> Result<()> {
        let dir = TempDir::new()?;
        let fd = open_dir(dir.path())?;

        symlinkat(Path::new("the/target"), fd.as_fd(), Path::new("ln"))?;
        let target = readlinkat(fd.as_fd(), Path::new("ln"))?;
        assert_eq!(target, OsString::from("the/target"));

        // the stat of the link itself must not follow it
        let st = fstatat(fd.as_fd(), Path::new("ln"), libc::AT_SYMLINK_NOFOLLOW)?;
        assert_eq!(st.st_mode & libc::S_IFMT, libc::S_IFLNK);
        Ok(())
    }

    #[test]
    fn read_dir_at_skips_dot_entries() -> Result<()> {
        let dir = TempDir::new()?;
        let fd = open_dir(dir.path())?;
        std::fs::write(dir.path().join("a"), b"")?;
        std::fs::create_dir(dir.path().join("b"))?;

        let mut names: Vec<_> = read_dir_at(fd.as_fd(), Path::new(""))?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        assert_eq!(names, vec![OsString::from("a"), OsString::from("b")]);
        Ok(())
    }

    #[test]
    fn read_dir_at_missing_directory_is_enoent() -> Result<()> {
        let dir = TempDir::new()?;
        let fd = open_dir(dir.path())?;
        let err = read_dir_at(fd.as_fd(), Path::new("absent")).unwrap_err();
        assert_eq!(err, Errno::ENOENT);
        Ok(())
    }

    #[test]
    fn xattr_set_then_get_roundtrip() -> Result<()> {
        let dir = TempDir::new()?;
        let fd = open_dir(dir.path())?;
        std::fs::write(dir.path().join("f"), b"")?;

        let name = OsString::from("user.divert.test");
        match lsetxattr(fd.as_fd(), Path::new("f"), &name, b"value", 0) {
            Ok(()) => {}
            // tmpfs without user xattr support
            Err(Errno::EOPNOTSUPP) => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        let len = lgetxattr(fd.as_fd(), Path::new("f"), &name, &mut [])?;
        assert_eq!(len, 5);
        let mut buf = vec![0u8; len];
        let n = lgetxattr(fd.as_fd(), Path::new("f"), &name, &mut buf)?;
        assert_eq!(&buf[..n], b"value");

        lremovexattr(fd.as_fd(), Path::new("f"), &name)?;
        let err = lgetxattr(fd.as_fd(), Path::new("f"), &name, &mut []).unwrap_err();
        assert_eq!(err, Errno::ENODATA);
        Ok(())
    }
}
