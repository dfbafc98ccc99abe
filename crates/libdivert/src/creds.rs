//! Per-request adoption of the caller's effective identity.
//!
//! Authorization is delegated to the kernel: every handler switches the
//! process-wide effective uid/gid to the caller before touching a backing,
//! and the kernel then enforces permissions on the backing inodes. The
//! identity is never reset afterwards; the next request overwrites it.
//! This is only sound because the session loop dispatches one request at a
//! time.

use nix::errno::Errno;
use nix::unistd::{Gid, Uid, setegid, seteuid};

/// Switches the effective ids to the caller's. The hop back to root comes
/// first: changing the effective uid away from root drops the effective
/// capability set, so `setegid` would fail without it.
pub(crate) fn assume_caller(uid: u32, gid: u32) -> Result<(), Errno> {
    seteuid(Uid::from_raw(0)).map_err(|errno| {
        tracing::error!(?errno, "failed to regain root before credential switch");
        errno
    })?;
    setegid(Gid::from_raw(gid)).map_err(|errno| {
        tracing::error!(?errno, gid, "failed to set effective gid");
        errno
    })?;
    seteuid(Uid::from_raw(uid)).map_err(|errno| {
        tracing::error!(?errno, uid, "failed to set effective uid");
        errno
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use nix::unistd::{Uid, getegid, geteuid};
    use serial_test::serial;

    use super::assume_caller;

    #[test]
    #[serial]
    fn switches_and_switches_back() -> Result<()> {
        if !Uid::effective().is_root() {
            eprintln!("skipping: requires root");
            return Ok(());
        }
        let _restore = scopeguard::guard((), |()| {
            let _ = assume_caller(0, 0);
        });

        assume_caller(1000, 1000)?;
        assert_eq!(geteuid().as_raw(), 1000);
        assert_eq!(getegid().as_raw(), 1000);

        // a second caller can still be adopted because the saved uid
        // remains root
        assume_caller(0, 0)?;
        assert!(geteuid().is_root());
        Ok(())
    }
}
