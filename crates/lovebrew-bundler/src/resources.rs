//! Read-only bundled resources shipped with the service.
//!
//! # Design
//! - Layout is `<root>/<target>/lovepotion.elf`, `icon.<ext>`, and the target's asset archive.
//! - Paths are checked before a build starts so a missing file is reported as such rather
//!   than as an opaque tool failure.

use std::path::{Path, PathBuf};

use crate::console::{Console, Target};
use crate::error::{BuildError, BuildResult};

/// File name of the stock runtime binary.
pub const RUNTIME_ELF: &str = "lovepotion.elf";

/// Bundled inputs for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResources {
    /// Stock runtime binary.
    pub elf: PathBuf,
    /// Default icon.
    pub icon: PathBuf,
    /// Asset archive (romfs image or content directory).
    pub archive: PathBuf,
}

/// Root of the bundled resources tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceStore {
    root: PathBuf,
}

impl ResourceStore {
    /// Store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Expected resource paths for `console`, without checking they exist.
    #[must_use]
    pub fn paths(&self, console: &dyn Console) -> TargetResources {
        let dir = self.root.join(console.target().as_str());
        TargetResources {
            elf: dir.join(RUNTIME_ELF),
            icon: dir.join(format!("icon.{}", console.icon_extension())),
            archive: dir.join(console.asset_archive()),
        }
    }

    /// Resource paths for `console`, each verified to exist.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingResource`] naming the first missing path.
    pub async fn resolve(&self, console: &dyn Console) -> BuildResult<TargetResources> {
        let resources = self.paths(console);
        for path in [&resources.elf, &resources.icon, &resources.archive] {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(BuildError::MissingResource { path: path.clone() });
            }
        }
        Ok(resources)
    }

    /// Every expected resource path that is missing, across all targets.
    pub async fn missing(&self) -> Vec<PathBuf> {
        let mut missing = Vec::new();
        for target in Target::ALL {
            let resources = self.paths(target.console());
            for path in [resources.elf, resources.icon, resources.archive] {
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    missing.push(path);
                }
            }
        }
        missing
    }
}
