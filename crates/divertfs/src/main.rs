use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use libdivert::MountSpec;
use tracing_subscriber::EnvFilter;

/// A selective-redirect union filesystem.
///
/// Mounts over MOUNTPOINT, serving it from the directory it covered while
/// diverting every path under one of the redirect prefixes to ALT.
#[derive(Parser, Debug)]
#[command(version)]
struct Opts {
    /// Directory to mount over; also the base backing.
    mountpoint: PathBuf,

    /// Directory serving the redirected prefixes.
    alt: PathBuf,

    /// Mount-relative path prefixes to divert to ALT. Matched as whole
    /// path components; no leading or trailing slash.
    #[arg(value_name = "REDIRECT-PREFIX")]
    redirects: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::try_parse().unwrap_or_else(|err| {
        let _ = err.print();
        std::process::exit(if err.use_stderr() { 1 } else { 0 });
    });

    if !nix::unistd::geteuid().is_root() {
        bail!("divertfs must run as root: per-request credential switching needs euid 0");
    }

    let spec = MountSpec::new(opts.mountpoint, opts.alt, opts.redirects)
        .context("invalid mount configuration")?;

    libdivert::mount(&spec).context("mount failed")?;
    tracing::info!("unmounted, exiting");
    Ok(())
}
