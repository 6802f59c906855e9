//! Bundled resource trees laid out like the service's `bin/` directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::fixtures::{jpeg_bytes, png_bytes};

/// A temporary `<root>/<target>/...` tree, removed on drop.
#[derive(Debug)]
pub struct ResourceTree {
    dir: TempDir,
}

impl ResourceTree {
    /// Tree with runtime, default icon, and asset archive for every target.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary tree cannot be written.
    pub fn complete() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("resources-")
            .tempdir()
            .context("failed to create resource tree")?;
        let tree = Self { dir };

        tree.write("ctr/lovepotion.elf", b"\x7fELF ctr runtime")?;
        tree.write("ctr/icon.png", &png_bytes(48, 48))?;
        tree.write("ctr/files.romfs", b"ctr romfs")?;

        tree.write("hac/lovepotion.elf", b"\x7fELF hac runtime")?;
        tree.write("hac/icon.jpg", &jpeg_bytes(256, 256))?;
        tree.write("hac/files.romfs", b"hac romfs")?;

        tree.write("cafe/lovepotion.elf", b"\x7fELF cafe runtime")?;
        tree.write("cafe/icon.png", &png_bytes(128, 128))?;
        tree.write("cafe/content/shaders/default.gsh", b"cafe shader")?;

        Ok(tree)
    }

    /// Root directory of the tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `bytes` at `relative`, creating parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, relative: &str, bytes: &[u8]) -> Result<()> {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Delete the file or directory at `relative`.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing exists there or removal fails.
    pub fn remove(&self, relative: &str) -> Result<()> {
        let path = self.root().join(relative);
        if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        }
        .with_context(|| format!("failed to remove {}", path.display()))
    }
}
