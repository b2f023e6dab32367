//! Path resolver: walks an absolute path component by component through the
//! directory tree, starting at the root inode.

use crate::error::{FsError, FsResult};
use crate::fs::context::FsContext;
use crate::layout::{NAME_MAX, PATH_MAX, ROOT_INO};

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

impl FsContext {
    /// Resolves `path` to the inode number of its final component.
    pub fn resolve_final(&self, path: &str) -> FsResult<u32> {
        check_path_len(path)?;
        let mut current = ROOT_INO;
        for name in components(path) {
            let parent = self.read_inode(current);
            current = self.lookup_dentry(&parent, name)?;
        }
        Ok(current)
    }

    /// Resolves `path` to the inode number of the parent of its final
    /// component. For single-component (or root) paths this is the root.
    pub fn resolve_parent(&self, path: &str) -> FsResult<u32> {
        check_path_len(path)?;
        let mut current = ROOT_INO;
        let comps: Vec<&str> = components(path).collect();
        for name in comps.iter().take(comps.len().saturating_sub(1)) {
            let parent = self.read_inode(current);
            current = self.lookup_dentry(&parent, name)?;
        }
        Ok(current)
    }
}

/// The leaf name of `path`, i.e. its final component.
pub fn split_last_component(path: &str) -> FsResult<String> {
    check_path_len(path)?;
    let name = components(path).last().unwrap_or("").to_string();
    if name.len() >= NAME_MAX {
        return Err(FsError::NameTooLong);
    }
    Ok(name)
}

fn check_path_len(path: &str) -> FsResult<()> {
    if path.len() >= PATH_MAX {
        return Err(FsError::NameTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::context::test_support::mounted_context;

    #[test]
    fn resolves_nested_paths() {
        let mut ctx = mounted_context(64, 16);
        let mut root = ctx.read_inode(0);
        ctx.append_dentry(&mut root, 1, "a").unwrap();

        assert_eq!(ctx.resolve_final("/a").unwrap(), 1);
        assert_eq!(ctx.resolve_final("/").unwrap(), 0);
        assert_eq!(ctx.resolve_parent("/a").unwrap(), 0);
        assert_eq!(ctx.resolve_final("/missing"), Err(FsError::NotFound));
    }

    #[test]
    fn splits_last_component() {
        assert_eq!(split_last_component("/a/b/c").unwrap(), "c");
        assert_eq!(split_last_component("/a").unwrap(), "a");
    }
}
