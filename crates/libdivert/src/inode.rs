//! Inode-number bookkeeping.
//!
//! The FUSE wire protocol addresses files by inode number while routing is
//! purely path driven, so the dispatcher keeps a bidirectional map between
//! the numbers it has handed to the kernel and mount-relative paths. The
//! root inode is fixed by the protocol; everything else is assigned on
//! first lookup and retired when the name disappears.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use fuser::FUSE_ROOT_ID;

#[derive(Debug)]
pub struct InodeTable {
    by_path: HashMap<PathBuf, u64>,
    by_ino: HashMap<u64, PathBuf>,
    next: u64,
}

impl InodeTable {
    pub fn new() -> Self {
        let mut by_path = HashMap::new();
        let mut by_ino = HashMap::new();
        by_path.insert(PathBuf::new(), FUSE_ROOT_ID);
        by_ino.insert(FUSE_ROOT_ID, PathBuf::new());
        Self {
            by_path,
            by_ino,
            next: FUSE_ROOT_ID + 1,
        }
    }

    /// The mount-relative path behind an inode number, if it is still live.
    pub fn path_of(&self, ino: u64) -> Option<&Path> {
        self.by_ino.get(&ino).map(PathBuf::as_path)
    }

    /// Returns the inode for a path, assigning a fresh number on first use.
    pub fn assign(&mut self, path: &Path) -> u64 {
        if let Some(&ino) = self.by_path.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.by_path.insert(path.to_path_buf(), ino);
        self.by_ino.insert(ino, path.to_path_buf());
        ino
    }

    /// Retires a name after unlink/rmdir. A later file at the same path
    /// gets a fresh inode, so the kernel cannot conflate the two.
    pub fn remove(&mut self, path: &Path) {
        if let Some(ino) = self.by_path.remove(path) {
            self.by_ino.remove(&ino);
        }
    }

    /// Moves a name (and, for directories, every name beneath it) to a new
    /// path. Whatever was previously known at the destination is retired
    /// first, mirroring rename's replace semantics.
    pub fn rename(&mut self, old: &Path, new: &Path) {
        self.remove(new);

        let moved: Vec<(PathBuf, PathBuf)> = self
            .by_path
            .keys()
            .filter_map(|path| {
                let suffix = path.strip_prefix(old).ok()?;
                Some((path.clone(), new.join(suffix)))
            })
            .collect();

        for (from, to) in moved {
            if let Some(ino) = self.by_path.remove(&from) {
                self.by_path.insert(to.clone(), ino);
                self.by_ino.insert(ino, to);
            }
        }
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}
