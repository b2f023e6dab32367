//! `mount.blockfs` — mounts an image via FUSE.

use std::fs::OpenOptions;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use blockfs::bridge::BlockFuse;
use blockfs::fs::FsContext;
use blockfs::fs::Ops;
use blockfs::image::Image;
use clap::Parser;
use fuser::MountOption;

/// Mount a blockfs image at a directory.
#[derive(Parser, Debug)]
#[command(name = "mount.blockfs")]
struct Args {
    /// Path to a formatted image file.
    #[arg(long)]
    image: String,

    /// Directory to mount the file system at.
    mountpoint: String,

    /// Extra mount options, forwarded to the kernel driver as-is.
    #[arg(short = 'o', value_name = "OPTION")]
    options: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&args.image)
        .with_context(|| format!("cannot open {}", args.image))?;

    let image = Image::open_mapped(&file).with_context(|| format!("cannot map {}", args.image))?;
    if image.is_empty() {
        bail!("{} is zero-sized", args.image);
    }

    let ctx = FsContext::mount(image).context("mount failed")?;
    let fuse = BlockFuse::new(Ops::new(ctx));

    let mut mount_options = vec![MountOption::FSName("blockfs".to_string())];
    for opt in &args.options {
        mount_options.push(MountOption::CUSTOM(opt.clone()));
    }

    // Single-threaded mount: every callback runs to completion before the
    // next is dispatched, upholding the no-concurrent-operations model.
    fuser::mount2(fuse, &args.mountpoint, &mount_options).context("mount2 failed")?;

    Ok(())
}
