//! The operation dispatcher.
//!
//! One handler per filesystem operation, each following the same contract:
//! adopt the caller's effective identity, recover the mount-relative path,
//! route it to a backing, invoke the host primitive through that backing's
//! directory handle, and translate the result into the runtime's reply.
//! Descriptor-addressed operations (read, write, fsync, ...) skip routing
//! and use the descriptor stored at open time.

use std::ffi::OsStr;
use std::os::fd::AsFd;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, Filesystem, KernelConfig, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use nix::errno::Errno;

use crate::attr::stat_to_attr;
use crate::backing::Backings;
use crate::creds;
use crate::handle::{Handle, Handles};
use crate::inode::InodeTable;
use crate::readdir::merged_entries;
use crate::rename::rename_with_fallback;
use crate::router::Router;
use crate::sys;

/// Attribute validity handed to the kernel. Kept short: both backings can
/// change underneath us through the other one's subtree.
const TTL: Duration = Duration::from_secs(1);

enum XattrReply {
    Size(u32),
    Data(Vec<u8>),
}

pub struct DivertFs {
    backings: Backings,
    router: Router,
    inodes: InodeTable,
    handles: Handles,
}

impl DivertFs {
    pub fn new(backings: Backings, router: Router) -> Self {
        Self {
            backings,
            router,
            inodes: InodeTable::new(),
            handles: Handles::new(),
        }
    }

    fn rel_path(&self, ino: u64) -> Result<PathBuf, Errno> {
        self.inodes
            .path_of(ino)
            .map(Path::to_path_buf)
            .ok_or(Errno::ENOENT)
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<PathBuf, Errno> {
        let parent = self.inodes.path_of(parent).ok_or(Errno::ENOENT)?;
        Ok(parent.join(name))
    }

    /// Symlink-not-following stat through the routed backing, assigning the
    /// path an inode on the way out.
    fn stat_path(&mut self, rel: &Path) -> Result<FileAttr, Errno> {
        let fd = self.backings.dirfd(self.router.route(rel));
        let st = sys::fstatat(fd, rel, libc::AT_SYMLINK_NOFOLLOW)?;
        Ok(stat_to_attr(&st, self.inodes.assign(rel)))
    }

    fn do_lookup(&mut self, parent: u64, name: &OsStr) -> Result<FileAttr, Errno> {
        let rel = self.child_path(parent, name)?;
        self.stat_path(&rel)
    }

    fn do_getattr(&mut self, ino: u64, fh: Option<u64>) -> Result<FileAttr, Errno> {
        if let Some(fh) = fh {
            if let Ok(fd) = self.handles.file(fh) {
                let st = sys::fstat(fd)?;
                return Ok(stat_to_attr(&st, ino));
            }
        }
        let rel = self.rel_path(ino)?;
        self.stat_path(&rel)
    }

    #[allow(clippy::too_many_arguments)]
    fn do_setattr(
        &mut self,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        fh: Option<u64>,
    ) -> Result<FileAttr, Errno> {
        let rel = self.rel_path(ino)?;
        // keep the fh only if it still names an open file; descriptors are
        // fetched per use so the table stays free for the path fallbacks
        let stored = fh.filter(|&fh| self.handles.file(fh).is_ok());

        if let Some(mode) = mode {
            match stored {
                Some(fh) => sys::fchmod(self.handles.file(fh)?, mode as libc::mode_t)?,
                None => sys::fchmodat(
                    self.backings.dirfd(self.router.route(&rel)),
                    &rel,
                    mode as libc::mode_t,
                )?,
            }
        }

        if uid.is_some() || gid.is_some() {
            sys::fchownat(
                self.backings.dirfd(self.router.route(&rel)),
                &rel,
                uid,
                gid,
            )?;
        }

        if let Some(size) = size {
            match stored {
                Some(fh) => sys::ftruncate(self.handles.file(fh)?, size as libc::off_t)?,
                None => {
                    let fd = sys::openat(
                        self.backings.dirfd(self.router.route(&rel)),
                        &rel,
                        libc::O_WRONLY,
                        None,
                    )?;
                    sys::ftruncate(fd.as_fd(), size as libc::off_t)?;
                }
            }
        }

        if atime.is_some() || mtime.is_some() {
            let times = [to_timespec(atime), to_timespec(mtime)];
            sys::utimensat(self.backings.dirfd(self.router.route(&rel)), &rel, &times)?;
        }

        match stored {
            Some(fh) => Ok(stat_to_attr(&sys::fstat(self.handles.file(fh)?)?, ino)),
            None => self.stat_path(&rel),
        }
    }

    fn do_readlink(&mut self, ino: u64) -> Result<Vec<u8>, Errno> {
        let rel = self.rel_path(ino)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        let target = sys::readlinkat(fd, &rel)?;
        Ok(target.into_vec())
    }

    fn do_mknod(
        &mut self,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
    ) -> Result<FileAttr, Errno> {
        let rel = self.child_path(parent, name)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        sys::mknodat(fd, &rel, (mode & !umask) as libc::mode_t, libc::dev_t::from(rdev))?;
        self.stat_path(&rel)
    }

    fn do_mkdir(
        &mut self,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
    ) -> Result<FileAttr, Errno> {
        let rel = self.child_path(parent, name)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        sys::mkdirat(fd, &rel, (mode & !umask) as libc::mode_t)?;
        self.stat_path(&rel)
    }

    fn do_unlink(&mut self, parent: u64, name: &OsStr) -> Result<(), Errno> {
        let rel = self.child_path(parent, name)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        sys::unlinkat(fd, &rel, 0)?;
        self.inodes.remove(&rel);
        Ok(())
    }

    fn do_rmdir(&mut self, parent: u64, name: &OsStr) -> Result<(), Errno> {
        let rel = self.child_path(parent, name)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        sys::unlinkat(fd, &rel, libc::AT_REMOVEDIR)?;
        self.inodes.remove(&rel);
        Ok(())
    }

    fn do_symlink(
        &mut self,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
    ) -> Result<FileAttr, Errno> {
        let rel = self.child_path(parent, link_name)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        sys::symlinkat(target, fd, &rel)?;
        self.stat_path(&rel)
    }

    fn do_rename(
        &mut self,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
    ) -> Result<(), Errno> {
        // exchange/noreplace variants are not part of this filesystem
        if flags != 0 {
            return Err(Errno::EINVAL);
        }
        let old_rel = self.child_path(parent, name)?;
        let new_rel = self.child_path(newparent, newname)?;
        // each end routes independently; differing sides surface EXDEV
        // from the kernel, which the fallback turns into copy-then-unlink
        let old_fd = self.backings.dirfd(self.router.route(&old_rel));
        let new_fd = self.backings.dirfd(self.router.route(&new_rel));
        rename_with_fallback(old_fd, &old_rel, new_fd, &new_rel)?;
        self.inodes.rename(&old_rel, &new_rel);
        Ok(())
    }

    fn do_link(&mut self, ino: u64, newparent: u64, newname: &OsStr) -> Result<FileAttr, Errno> {
        let old_rel = self.rel_path(ino)?;
        let new_rel = self.child_path(newparent, newname)?;
        let old_fd = self.backings.dirfd(self.router.route(&old_rel));
        let new_fd = self.backings.dirfd(self.router.route(&new_rel));
        sys::linkat(old_fd, &old_rel, new_fd, &new_rel)?;
        self.stat_path(&new_rel)
    }

    fn do_open(&mut self, ino: u64, flags: i32) -> Result<u64, Errno> {
        let rel = self.rel_path(ino)?;
        let fd = sys::openat(
            self.backings.dirfd(self.router.route(&rel)),
            &rel,
            flags,
            None,
        )?;
        Ok(self.handles.insert(Handle::File(fd)))
    }

    fn do_create(
        &mut self,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
    ) -> Result<(FileAttr, u64), Errno> {
        let rel = self.child_path(parent, name)?;
        let fd = sys::openat(
            self.backings.dirfd(self.router.route(&rel)),
            &rel,
            flags | libc::O_CREAT,
            Some((mode & !umask) as libc::mode_t),
        )?;
        let st = sys::fstat(fd.as_fd())?;
        let attr = stat_to_attr(&st, self.inodes.assign(&rel));
        Ok((attr, self.handles.insert(Handle::File(fd))))
    }

    fn do_read(&mut self, fh: u64, offset: i64, size: u32) -> Result<Vec<u8>, Errno> {
        let fd = self.handles.file(fh)?;
        let mut buf = vec![0u8; size as usize];
        let n = sys::pread(fd, &mut buf, offset)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn do_write(&mut self, fh: u64, offset: i64, data: &[u8]) -> Result<u32, Errno> {
        let fd = self.handles.file(fh)?;
        let mut written = 0;
        while written < data.len() {
            let n = sys::pwrite(fd, &data[written..], offset + written as libc::off_t)?;
            if n == 0 {
                return Err(Errno::EIO);
            }
            written += n;
        }
        Ok(written as u32)
    }

    fn do_fsync(&mut self, fh: u64, datasync: bool) -> Result<(), Errno> {
        sys::fsync(self.handles.file(fh)?, datasync)
    }

    fn do_opendir(&mut self, ino: u64) -> Result<u64, Errno> {
        let rel = self.rel_path(ino)?;
        let fd = sys::openat(
            self.backings.dirfd(self.router.route(&rel)),
            &rel,
            libc::O_RDONLY | libc::O_DIRECTORY,
            None,
        )?;
        Ok(self.handles.insert(Handle::Dir {
            fd,
            entries: None,
        }))
    }

    fn do_fsyncdir(&mut self, fh: u64, datasync: bool) -> Result<(), Errno> {
        sys::fsync(self.handles.dir_fd(fh)?, datasync)
    }

    fn do_statfs(&mut self, ino: u64) -> Result<libc::statvfs, Errno> {
        let rel = self.rel_path(ino)?;
        sys::fstatvfs(self.backings.dirfd(self.router.route(&rel)))
    }

    fn do_access(&mut self, ino: u64, mask: i32) -> Result<(), Errno> {
        let rel = self.rel_path(ino)?;
        sys::faccessat(self.backings.dirfd(self.router.route(&rel)), &rel, mask)
    }

    fn do_setxattr(
        &mut self,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        flags: i32,
    ) -> Result<(), Errno> {
        let rel = self.rel_path(ino)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        sys::lsetxattr(fd, &rel, name, value, flags)
    }

    fn do_getxattr(&mut self, ino: u64, name: &OsStr, size: u32) -> Result<XattrReply, Errno> {
        let rel = self.rel_path(ino)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        if size == 0 {
            let len = sys::lgetxattr(fd, &rel, name, &mut [])?;
            return Ok(XattrReply::Size(len as u32));
        }
        let mut buf = vec![0u8; size as usize];
        let n = sys::lgetxattr(fd, &rel, name, &mut buf)?;
        buf.truncate(n);
        Ok(XattrReply::Data(buf))
    }

    fn do_listxattr(&mut self, ino: u64, size: u32) -> Result<XattrReply, Errno> {
        let rel = self.rel_path(ino)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        if size == 0 {
            let len = sys::llistxattr(fd, &rel, &mut [])?;
            return Ok(XattrReply::Size(len as u32));
        }
        let mut buf = vec![0u8; size as usize];
        let n = sys::llistxattr(fd, &rel, &mut buf)?;
        buf.truncate(n);
        Ok(XattrReply::Data(buf))
    }

    fn do_removexattr(&mut self, ino: u64, name: &OsStr) -> Result<(), Errno> {
        let rel = self.rel_path(ino)?;
        let fd = self.backings.dirfd(self.router.route(&rel));
        sys::lremovexattr(fd, &rel, name)
    }
}

fn to_timespec(time: Option<TimeOrNow>) -> libc::timespec {
    match time {
        None => libc::timespec {
            tv_sec: 0,
            tv_nsec: libc::UTIME_OMIT,
        },
        Some(TimeOrNow::Now) => libc::timespec {
            tv_sec: 0,
            tv_nsec: libc::UTIME_NOW,
        },
        Some(TimeOrNow::SpecificTime(time)) => {
            let since_epoch = time
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO);
            libc::timespec {
                tv_sec: since_epoch.as_secs() as libc::time_t,
                tv_nsec: libc::c_long::from(since_epoch.subsec_nanos()),
            }
        }
    }
}

fn caller(req: &Request<'_>) -> Result<(), Errno> {
    creds::assume_caller(req.uid(), req.gid())
}

impl Filesystem for DivertFs {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        tracing::info!("filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("filesystem shut down");
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match caller(req).and_then(|()| self.do_lookup(parent, name)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, fh: Option<u64>, reply: ReplyAttr) {
        match caller(req).and_then(|()| self.do_getattr(ino, fh)) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(errno) => reply.error(errno as i32),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        match caller(req)
            .and_then(|()| self.do_setattr(ino, mode, uid, gid, size, atime, mtime, fh))
        {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn readlink(&mut self, req: &Request<'_>, ino: u64, reply: ReplyData) {
        match caller(req).and_then(|()| self.do_readlink(ino)) {
            Ok(target) => reply.data(&target),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        rdev: u32,
        reply: ReplyEntry,
    ) {
        match caller(req).and_then(|()| self.do_mknod(parent, name, mode, umask, rdev)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        match caller(req).and_then(|()| self.do_mkdir(parent, name, mode, umask)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn unlink(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match caller(req).and_then(|()| self.do_unlink(parent, name)) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn rmdir(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match caller(req).and_then(|()| self.do_rmdir(parent, name)) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn symlink(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        match caller(req).and_then(|()| self.do_symlink(parent, link_name, target)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn rename(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        match caller(req).and_then(|()| self.do_rename(parent, name, newparent, newname, flags)) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn link(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        match caller(req).and_then(|()| self.do_link(ino, newparent, newname)) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn open(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        match caller(req).and_then(|()| self.do_open(ino, flags)) {
            Ok(fh) => reply.opened(fh, 0),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        match caller(req).and_then(|()| self.do_create(parent, name, mode, umask, flags)) {
            Ok((attr, fh)) => reply.created(&TTL, &attr, 0, fh, 0),
            Err(errno) => reply.error(errno as i32),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn read(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match caller(req).and_then(|()| self.do_read(fh, offset, size)) {
            Ok(data) => reply.data(&data),
            Err(errno) => reply.error(errno as i32),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match caller(req).and_then(|()| self.do_write(fh, offset, data)) {
            Ok(written) => reply.written(written),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        // nothing buffered on our side; the backing sees every write as it
        // happens
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        // dropping the handle closes the backing descriptor
        self.handles.remove(fh);
        reply.ok();
    }

    fn fsync(&mut self, req: &Request<'_>, _ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        match caller(req).and_then(|()| self.do_fsync(fh, datasync)) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn opendir(&mut self, req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match caller(req).and_then(|()| self.do_opendir(ino)) {
            Ok(fh) => reply.opened(fh, 0),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn readdir(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        if let Err(errno) = caller(req) {
            reply.error(errno as i32);
            return;
        }

        // the merge is materialized once per handle and served by offset,
        // so paged reads see one consistent listing
        if offset == 0 {
            let entries = self
                .rel_path(ino)
                .and_then(|rel| {
                    merged_entries(&self.backings, &self.router, &mut self.inodes, &rel, ino)
                });
            let entries = match entries {
                Ok(entries) => entries,
                Err(errno) => {
                    reply.error(errno as i32);
                    return;
                }
            };
            match self.handles.dir_mut(fh) {
                Ok(slot) => *slot = Some(entries),
                Err(errno) => {
                    reply.error(errno as i32);
                    return;
                }
            }
        }

        let slot = match self.handles.dir_mut(fh) {
            Ok(slot) => slot,
            Err(errno) => {
                reply.error(errno as i32);
                return;
            }
        };
        match slot {
            Some(entries) => {
                for (index, entry) in entries.iter().enumerate().skip(offset as usize) {
                    if reply.add(entry.ino, (index + 1) as i64, entry.kind, &entry.name) {
                        break;
                    }
                }
                reply.ok();
            }
            None => reply.error(libc::EINVAL),
        }
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        self.handles.remove(fh);
        reply.ok();
    }

    fn fsyncdir(
        &mut self,
        req: &Request<'_>,
        _ino: u64,
        fh: u64,
        datasync: bool,
        reply: ReplyEmpty,
    ) {
        match caller(req).and_then(|()| self.do_fsyncdir(fh, datasync)) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn statfs(&mut self, req: &Request<'_>, ino: u64, reply: ReplyStatfs) {
        match caller(req).and_then(|()| self.do_statfs(ino)) {
            Ok(st) => reply.statfs(
                st.f_blocks,
                st.f_bfree,
                st.f_bavail,
                st.f_files,
                st.f_ffree,
                st.f_bsize as u32,
                st.f_namemax as u32,
                st.f_frsize as u32,
            ),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn setxattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        match caller(req).and_then(|()| self.do_setxattr(ino, name, value, flags)) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn getxattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        size: u32,
        reply: ReplyXattr,
    ) {
        match caller(req).and_then(|()| self.do_getxattr(ino, name, size)) {
            Ok(XattrReply::Size(len)) => reply.size(len),
            Ok(XattrReply::Data(data)) => reply.data(&data),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn listxattr(&mut self, req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        match caller(req).and_then(|()| self.do_listxattr(ino, size)) {
            Ok(XattrReply::Size(len)) => reply.size(len),
            Ok(XattrReply::Data(data)) => reply.data(&data),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn removexattr(&mut self, req: &Request<'_>, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        match caller(req).and_then(|()| self.do_removexattr(ino, name)) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno as i32),
        }
    }

    fn access(&mut self, req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        match caller(req).and_then(|()| self.do_access(ino, mask)) {
            Ok(()) => reply.ok(),
            Err(errno) => reply.error(errno as i32),
        }
    }
}
