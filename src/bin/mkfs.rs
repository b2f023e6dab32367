//! `mkfs.blockfs` — formats an image file in place.

use std::fs::OpenOptions;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use blockfs::fs::format::format_image;
use blockfs::image::Image;
use clap::Parser;

/// Format a blockfs image.
#[derive(Parser, Debug)]
#[command(name = "mkfs.blockfs")]
struct Args {
    /// Number of inodes to allocate.
    #[arg(short = 'i', value_name = "COUNT")]
    inodes: u32,

    /// Overwrite an image that already carries the magic.
    #[arg(short = 'f')]
    force: bool,

    /// Zero the image's data region before writing metadata.
    #[arg(short = 'z')]
    zero: bool,

    /// Path to the image file.
    image: String,
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
    if args.inodes == 0 {
        bail!("-i must be positive");
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&args.image)
        .with_context(|| format!("cannot open {}", args.image))?;

    let probe = Image::open_mapped(&file).with_context(|| format!("cannot map {}", args.image))?;
    let already_formatted = probe.len() >= 8
        && u64::from_le_bytes(probe[..8].try_into().unwrap()) == blockfs::layout::MAGIC;
    drop(probe);

    if already_formatted && !args.force {
        bail!("{} is already formatted; pass -f to overwrite", args.image);
    }

    let mut image =
        Image::open_mapped(&file).with_context(|| format!("cannot map {}", args.image))?;
    format_image(image.as_mut(), args.inodes, args.zero).context("format failed")?;
    image.flush().context("flush failed")?;

    Ok(())
}
