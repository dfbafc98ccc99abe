//! The two-sided directory merge.
//!
//! A directory listing is the union of the alt and base copies overlaid,
//! with each name contributed by whichever side actually serves it: alt
//! offers only entries the router sends to alt, base only entries the
//! router sends to base. The filter is per entry, not per directory,
//! because a redirect prefix can select individual children of a shared
//! parent. It is also what keeps a name from showing up twice.

use std::ffi::OsString;
use std::path::Path;

use fuser::{FUSE_ROOT_ID, FileType};
use nix::errno::Errno;

use crate::attr::{kind_of_dirent, kind_of_mode};
use crate::backing::Backings;
use crate::inode::InodeTable;
use crate::router::{Router, Side};
use crate::sys;

#[derive(Debug, Clone)]
pub(crate) struct MergedEntry {
    pub ino: u64,
    pub kind: FileType,
    pub name: OsString,
}

/// Builds the merged listing for `rel`. Fails with ENOENT only when the
/// directory cannot be opened on either side; a single-sided directory
/// yields that side's (filtered) entries.
pub(crate) fn merged_entries(
    backings: &Backings,
    router: &Router,
    inodes: &mut InodeTable,
    rel: &Path,
    dir_ino: u64,
) -> Result<Vec<MergedEntry>, Errno> {
    let parent_ino = match rel.parent() {
        Some(parent) => inodes.assign(parent),
        None => FUSE_ROOT_ID,
    };

    let mut entries = vec![
        MergedEntry {
            ino: dir_ino,
            kind: FileType::Directory,
            name: OsString::from("."),
        },
        MergedEntry {
            ino: parent_ino,
            kind: FileType::Directory,
            name: OsString::from(".."),
        },
    ];

    let mut opened_either = false;
    // one child-path buffer reused across entries
    let mut child = rel.to_path_buf();
    // alt first, matching the overlay precedence
    for side in [Side::Alt, Side::Base] {
        let listed = match sys::read_dir_at(backings.dirfd(side), rel) {
            Ok(listed) => listed,
            // this side simply has no such directory (or refuses us);
            // the other one may still serve it
            Err(_) => continue,
        };
        opened_either = true;

        for (name, d_type) in listed {
            child.push(&name);
            if router.route(&child) != side {
                child.pop();
                continue;
            }
            let kind = match kind_of_dirent(d_type) {
                Some(kind) => kind,
                // backing filesystem without d_type support; ask the side
                // that serves the entry
                None => {
                    match sys::fstatat(backings.dirfd(side), &child, libc::AT_SYMLINK_NOFOLLOW) {
                        Ok(st) => kind_of_mode(st.st_mode),
                        // vanished between listing and stat
                        Err(_) => {
                            child.pop();
                            continue;
                        }
                    }
                }
            };
            entries.push(MergedEntry {
                ino: inodes.assign(&child),
                kind,
                name,
            });
            child.pop();
        }
    }

    if !opened_either {
        return Err(Errno::ENOENT);
    }
    Ok(entries)
}
