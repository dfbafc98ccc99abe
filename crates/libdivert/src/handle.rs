//! Open-handle bookkeeping.
//!
//! Descriptors returned by `open`/`opendir` are stored here and the table
//! key is what the runtime carries as the file handle. Read, write, and
//! sync operations address the descriptor directly and never re-route by
//! path; `release`/`releasedir` drop the entry, which closes it.

use std::collections::HashMap;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use nix::errno::Errno;

use crate::readdir::MergedEntry;

#[derive(Debug)]
pub(crate) enum Handle {
    File(OwnedFd),
    Dir {
        fd: OwnedFd,
        // merged listing, materialized on the first readdir
        entries: Option<Vec<MergedEntry>>,
    },
}

#[derive(Debug)]
pub(crate) struct Handles {
    open: HashMap<u64, Handle>,
    next: u64,
}

impl Handles {
    pub fn new() -> Self {
        Self {
            open: HashMap::new(),
            next: 1,
        }
    }

    pub fn insert(&mut self, handle: Handle) -> u64 {
        let fh = self.next;
        self.next += 1;
        self.open.insert(fh, handle);
        fh
    }

    pub fn file(&self, fh: u64) -> Result<BorrowedFd<'_>, Errno> {
        match self.open.get(&fh) {
            Some(Handle::File(fd)) => Ok(fd.as_fd()),
            _ => Err(Errno::EBADF),
        }
    }

    pub fn dir_fd(&self, fh: u64) -> Result<BorrowedFd<'_>, Errno> {
        match self.open.get(&fh) {
            Some(Handle::Dir { fd, .. }) => Ok(fd.as_fd()),
            _ => Err(Errno::EBADF),
        }
    }

    pub fn dir_mut(&mut self, fh: u64) -> Result<&mut Option<Vec<MergedEntry>>, Errno> {
        match self.open.get_mut(&fh) {
            Some(Handle::Dir { entries, .. }) => Ok(entries),
            _ => Err(Errno::EBADF),
        }
    }

    /// Dropping the returned handle closes the descriptor.
    pub fn remove(&mut self, fh: u64) -> Option<Handle> {
        self.open.remove(&fh)
    }
}

#[cfg(test)]
mod tests {
    use std::os::fd::{AsRawFd, OwnedFd};

    use nix::errno::Errno;

    use super::{Handle, Handles};

    fn dev_null() -> OwnedFd {
        std::fs::File::open("/dev/null").unwrap().into()
    }

    #[test]
    fn handles_are_distinct_and_typed() {
        let mut handles = Handles::new();
        let file = handles.insert(Handle::File(dev_null()));
        let dir = handles.insert(Handle::Dir {
            fd: dev_null(),
            entries: None,
        });
        assert_ne!(file, dir);

        assert!(handles.file(file).is_ok());
        assert_eq!(handles.file(dir).unwrap_err(), Errno::EBADF);
        assert!(handles.dir_mut(dir).is_ok());
        assert_eq!(handles.dir_mut(file).unwrap_err(), Errno::EBADF);
    }

    #[test]
    fn remove_closes_exactly_once() {
        let mut handles = Handles::new();
        let fd = dev_null();
        let raw = fd.as_raw_fd();
        let fh = handles.insert(Handle::File(fd));

        let handle = handles.remove(fh).unwrap();
        drop(handle);

        // the descriptor is gone and the table no longer knows the handle
        assert_eq!(
            nix::fcntl::fcntl(raw, nix::fcntl::F_GETFD).unwrap_err(),
            Errno::EBADF
        );
        assert!(handles.remove(fh).is_none());
        assert_eq!(handles.file(fh).unwrap_err(), Errno::EBADF);
    }
}
