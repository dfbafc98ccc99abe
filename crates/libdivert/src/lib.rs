//! A selective-redirect union filesystem.
//!
//! The mount exposes a base directory while transparently diverting a
//! configured list of path prefixes to an alt directory. Every operation
//! is dispatched to one of the two backings by a pure prefix router;
//! authorization is delegated to the kernel by adopting the caller's
//! effective credentials before each backing syscall, which is why the
//! session runs strictly single-threaded.
//!
//! Both backing directories are opened before the filesystem is mounted.
//! The mount shadows its own mount point, so those descriptors are the
//! only remaining way to reach the base.

mod attr;
mod backing;
mod config;
mod creds;
mod error;
mod fs;
mod handle;
mod inode;
mod readdir;
mod rename;
mod router;
mod sys;

pub use backing::Backings;
pub use config::{ConfigError, MountSpec};
pub use error::MountError;
pub use fs::DivertFs;
pub use router::{Router, Side};

use fuser::MountOption;

/// Opens the backings, builds the filesystem, and runs the mount in the
/// foreground until it is unmounted or the process is signalled.
///
/// The session is single-threaded by construction: requests are served one
/// at a time, which per-request credential switching depends on.
pub fn mount(spec: &MountSpec) -> Result<(), MountError> {
    let backings = Backings::open(&spec.mountpoint, &spec.alt)?;
    let router = Router::new(spec.redirects.iter().map(String::as_str));
    let fs = DivertFs::new(backings, router);

    let options = [
        MountOption::FSName("divertfs".to_string()),
        MountOption::AllowOther,
    ];
    tracing::info!(
        mountpoint = ?spec.mountpoint,
        alt = ?spec.alt,
        redirects = spec.redirects.len(),
        "mounting"
    );
    fuser::mount2(fs, &spec.mountpoint, &options)?;
    Ok(())
}
