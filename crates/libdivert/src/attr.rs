//! Translation from host `stat` results to the attribute types the
//! filesystem runtime replies with.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{FileAttr, FileType};

/// Splits a raw `st_mode` into the runtime's file-type enum.
pub(crate) fn kind_of_mode(mode: libc::mode_t) -> FileType {
    match mode & libc::S_IFMT {
        libc::S_IFDIR => FileType::Directory,
        libc::S_IFLNK => FileType::Symlink,
        libc::S_IFIFO => FileType::NamedPipe,
        libc::S_IFSOCK => FileType::Socket,
        libc::S_IFCHR => FileType::CharDevice,
        libc::S_IFBLK => FileType::BlockDevice,
        _ => FileType::RegularFile,
    }
}

pub(crate) fn kind_of_dirent(d_type: u8) -> Option<FileType> {
    match d_type {
        libc::DT_REG => Some(FileType::RegularFile),
        libc::DT_DIR => Some(FileType::Directory),
        libc::DT_LNK => Some(FileType::Symlink),
        libc::DT_FIFO => Some(FileType::NamedPipe),
        libc::DT_SOCK => Some(FileType::Socket),
        libc::DT_CHR => Some(FileType::CharDevice),
        libc::DT_BLK => Some(FileType::BlockDevice),
        _ => None,
    }
}

fn timestamp(secs: i64, nanos: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nanos as u32)
    } else {
        UNIX_EPOCH - Duration::new((-secs) as u64, 0) + Duration::new(0, nanos as u32)
    }
}

/// Builds the reply attribute from a host stat, substituting the inode
/// number this mount has handed to the kernel for this path.
pub(crate) fn stat_to_attr(st: &libc::stat, ino: u64) -> FileAttr {
    let ctime = timestamp(st.st_ctime, st.st_ctime_nsec);
    FileAttr {
        ino,
        size: st.st_size as u64,
        blocks: st.st_blocks as u64,
        atime: timestamp(st.st_atime, st.st_atime_nsec),
        mtime: timestamp(st.st_mtime, st.st_mtime_nsec),
        ctime,
        crtime: ctime,
        kind: kind_of_mode(st.st_mode),
        perm: (st.st_mode & 0o7777) as u16,
        nlink: st.st_nlink as u32,
        uid: st.st_uid,
        gid: st.st_gid,
        rdev: st.st_rdev as u32,
        blksize: st.st_blksize as u32,
        flags: 0,
    }
}

#[cfg(test)]
mod tests {
    use fuser::FileType;

    use super::*;

    #[test]
    fn mode_kinds_are_split_from_permissions() {
        assert_eq!(kind_of_mode(libc::S_IFDIR | 0o755), FileType::Directory);
        assert_eq!(kind_of_mode(libc::S_IFLNK | 0o777), FileType::Symlink);
        assert_eq!(kind_of_mode(libc::S_IFREG | 0o644), FileType::RegularFile);
    }

    #[test]
    fn attr_reports_the_table_inode_not_the_backing_one() {
        let mut st = unsafe { std::mem::zeroed::<libc::stat>() };
        st.st_ino = 42;
        st.st_mode = libc::S_IFREG | 0o640;
        st.st_size = 17;
        let attr = stat_to_attr(&st, 7);
        assert_eq!(attr.ino, 7);
        assert_eq!(attr.size, 17);
        assert_eq!(attr.perm, 0o640);
        assert_eq!(attr.kind, FileType::RegularFile);
    }

    #[test]
    fn dirent_unknown_type_is_left_unresolved() {
        assert_eq!(kind_of_dirent(libc::DT_UNKNOWN), None);
        assert_eq!(kind_of_dirent(libc::DT_DIR), Some(FileType::Directory));
    }
}
