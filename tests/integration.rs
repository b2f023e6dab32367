//! End-to-end coverage of the six named scenarios, driven directly against
//! [`Ops`] over a `Vec<u8>`-backed image so no real FUSE mount is needed.

use blockfs::fs::format::format_image;
use blockfs::{FsContext, FsError, Image, Ops, TimeArg};

const BLOCK_SIZE: usize = blockfs::layout::BLOCK_SIZE;

fn mount(total_blocks: usize, inodes: u32) -> Ops {
    let mut buf = vec![0u8; total_blocks * BLOCK_SIZE];
    format_image(&mut buf, inodes, false).unwrap();
    let ctx = FsContext::mount(Image::from_vec(buf)).unwrap();
    Ops::new(ctx)
}

#[test]
fn format_and_mount_reports_expected_counts() {
    // 1 MiB image, 64 inodes.
    let ops = mount(1024 * 1024 / BLOCK_SIZE, 64);
    let stat = ops.statfs();
    assert_eq!(stat.blocks, 256);
    assert_eq!(stat.files, 64);
    assert_eq!(stat.ffree, 63);
}

#[test]
fn make_and_list() {
    let mut ops = mount(256, 64);
    ops.mkdir("/a", 0o755, (0, 0)).unwrap();
    ops.mkdir("/b", 0o755, (0, 0)).unwrap();
    ops.mkdir("/a/c", 0o755, (0, 0)).unwrap();

    let mut root = Vec::new();
    ops.readdir("/", |n| {
        root.push(n.to_string());
        true
    })
    .unwrap();
    assert_eq!(root, vec![".", "..", "a", "b"]);

    let mut a = Vec::new();
    ops.readdir("/a", |n| {
        a.push(n.to_string());
        true
    })
    .unwrap();
    assert_eq!(a, vec![".", "..", "c"]);
}

#[test]
fn write_then_read() {
    let mut ops = mount(256, 64);
    ops.create("/f", 0o644, (0, 0)).unwrap();
    let n = ops.write("/f", b"hello", 0).unwrap();
    assert_eq!(n, 5);

    let mut out = [0u8; 5];
    assert_eq!(ops.read("/f", &mut out, 0).unwrap(), 5);
    assert_eq!(&out, b"hello");
    assert_eq!(ops.getattr("/f").unwrap().size, 5);
}

#[test]
fn hole_zero_fills() {
    let mut ops = mount(256, 64);
    ops.create("/g", 0o644, (0, 0)).unwrap();
    ops.write("/g", b"Z", 8192).unwrap();
    assert_eq!(ops.getattr("/g").unwrap().size, 8193);

    let mut out = [0xFFu8; 1];
    assert_eq!(ops.read("/g", &mut out, 0).unwrap(), 1);
    assert_eq!(out[0], 0);
}

#[test]
fn shrink_releases_blocks() {
    let mut ops = mount(256, 64);
    ops.create("/h", 0o644, (0, 0)).unwrap();
    ops.truncate("/h", 3 * BLOCK_SIZE as u64).unwrap();
    let free_before_shrink = ops.ctx.sb.free_data_blocks_count;

    ops.truncate("/h", 0).unwrap();
    // three data blocks plus the extent-pointer block come back.
    assert_eq!(ops.ctx.sb.free_data_blocks_count, free_before_shrink + 4);
}

#[test]
fn rmdir_non_empty() {
    let mut ops = mount(256, 64);
    ops.mkdir("/a", 0o755, (0, 0)).unwrap();
    ops.mkdir("/b", 0o755, (0, 0)).unwrap();
    ops.mkdir("/a/c", 0o755, (0, 0)).unwrap();

    assert_eq!(ops.rmdir("/a"), Err(FsError::NotEmpty));
    assert!(ops.getattr("/a/c").is_ok());
}

#[test]
fn create_rmdir_and_utimens_round_trip() {
    let mut ops = mount(256, 64);
    ops.create("/f", 0o644, (0, 0)).unwrap();
    let attr = ops.getattr("/f").unwrap();
    assert_eq!(attr.size, 0);
    assert_eq!(attr.links, 1);

    ops.utimens("/f", TimeArg::Set(42, 7), (0, 0)).unwrap();
    assert_eq!(ops.getattr("/f").unwrap().mtime_sec, 42);

    ops.unlink("/f").unwrap();
    assert_eq!(ops.getattr("/f"), Err(FsError::NotFound));
}
