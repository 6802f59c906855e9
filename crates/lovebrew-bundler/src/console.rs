//! The supported targets and the per-target pipeline interface.
//!
//! # Design
//! - `Target` is a closed enum; parsing an unknown id is the only way to get an
//!   "invalid target" and it happens before any work starts.
//! - Each target's pipeline implements [`Console`]; dispatch is an exhaustive match.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::asset::{IconSpec, MediaType};
use crate::command::CommandRunner;
use crate::consoles::{CAFE, CTR, HAC};
use crate::error::{BuildResult, MetadataError};
use crate::metadata::BuildMetadata;
use crate::request_log::RequestLog;
use crate::resources::TargetResources;

/// A platform the service can build for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Nintendo 3DS.
    Ctr,
    /// Nintendo Switch.
    Hac,
    /// Nintendo Wii U.
    Cafe,
}

impl Target {
    /// Every supported target.
    pub const ALL: [Self; 3] = [Self::Ctr, Self::Hac, Self::Cafe];

    /// Identifier used in requests, responses, and the resources tree.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ctr => "ctr",
            Self::Hac => "hac",
            Self::Cafe => "cafe",
        }
    }

    /// Build pipeline for this target.
    #[must_use]
    pub fn console(self) -> &'static dyn Console {
        match self {
            Self::Ctr => &CTR,
            Self::Hac => &HAC,
            Self::Cafe => &CAFE,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ctr" => Ok(Self::Ctr),
            "hac" => Ok(Self::Hac),
            "cafe" => Ok(Self::Cafe),
            _ => Err(MetadataError::InvalidTarget {
                value: s.to_string(),
            }),
        }
    }
}

/// Magic bytes identifying a target's container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerMagic {
    /// Byte offset of the magic inside the file.
    pub offset: usize,
    /// Expected bytes.
    pub bytes: &'static [u8; 4],
}

impl ContainerMagic {
    /// Whether `data` carries this magic.
    #[must_use]
    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..self.offset + self.bytes.len()) == Some(self.bytes.as_slice())
    }
}

/// Everything a pipeline needs for one (request, target) build.
pub struct BuildJob<'a> {
    /// Exclusive scratch directory.
    pub dir: &'a Path,
    /// Output path without extension; tools append their own.
    pub out: PathBuf,
    /// Validated request metadata.
    pub metadata: &'a BuildMetadata,
    /// Icon to embed, custom or bundled.
    pub icon: &'a Path,
    /// Bundled runtime, icon, and asset archive.
    pub resources: &'a TargetResources,
    /// Tool runner.
    pub runner: &'a CommandRunner,
    /// Request log.
    pub log: &'a RequestLog,
}

impl BuildJob<'_> {
    /// Path of the final binary for `console`.
    #[must_use]
    pub fn binary_path(&self, console: &dyn Console) -> PathBuf {
        with_suffix(&self.out, console.binary_extension())
    }
}

/// Append `.ext` to a path without replacing an existing extension.
pub(crate) fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut path = base.as_os_str().to_owned();
    path.push(".");
    path.push(ext);
    PathBuf::from(path)
}

/// Per-target build pipeline.
#[async_trait]
pub trait Console: Send + Sync {
    /// Target this pipeline builds.
    fn target(&self) -> Target;

    /// Extension of the icon file the tools expect.
    fn icon_extension(&self) -> &'static str;

    /// Exact icon size in pixels.
    fn icon_size(&self) -> (u32, u32);

    /// Required icon encoding.
    fn icon_format(&self) -> MediaType;

    /// Extension of the final binary.
    fn binary_extension(&self) -> &'static str;

    /// Magic identifying the final binary.
    fn container_magic(&self) -> ContainerMagic;

    /// Name of the bundled asset archive under the target's resource directory.
    fn asset_archive(&self) -> &'static str;

    /// Combined icon requirements.
    fn icon_spec(&self) -> IconSpec {
        IconSpec {
            size: self.icon_size(),
            format: self.icon_format(),
        }
    }

    /// Metadata checks that must pass before any tool runs.
    ///
    /// # Errors
    ///
    /// Returns the first metadata limit violated.
    fn preflight(&self, _metadata: &BuildMetadata) -> BuildResult<()> {
        Ok(())
    }

    /// Run the pipeline; each failing step short-circuits the rest.
    async fn build(&self, job: &BuildJob<'_>) -> BuildResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_round_trip_through_their_ids() {
        for target in Target::ALL {
            assert_eq!(target.as_str().parse::<Target>().ok(), Some(target));
            assert_eq!(target.console().target(), target);
        }
        assert_eq!(" CTR ".parse::<Target>().ok(), Some(Target::Ctr));
    }

    #[test]
    fn unknown_targets_are_named_in_the_error() {
        match "bogus".parse::<Target>() {
            Err(MetadataError::InvalidTarget { value }) => assert_eq!(value, "bogus"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn target_descriptors_are_fixed() {
        let table: Vec<_> = Target::ALL
            .iter()
            .map(|target| {
                let console = target.console();
                (
                    console.icon_extension(),
                    console.icon_size(),
                    console.binary_extension(),
                    console.asset_archive(),
                )
            })
            .collect();
        assert_eq!(
            table,
            vec![
                ("png", (48, 48), "3dsx", "files.romfs"),
                ("jpg", (256, 256), "nro", "files.romfs"),
                ("png", (128, 128), "wuhb", "content"),
            ]
        );
    }

    #[test]
    fn container_magic_checks_offset() {
        let nro = Target::Hac.console().container_magic();
        let mut data = vec![0_u8; 0x10];
        data.extend_from_slice(b"NRO0");
        assert!(nro.matches(&data));
        assert!(!nro.matches(b"NRO0"));
        assert!(Target::Cafe.console().container_magic().matches(b"WUHB...."));
    }

    #[test]
    fn suffixes_are_appended() {
        let out = Path::new("/tmp/build/My.Game");
        assert_eq!(with_suffix(out, "3dsx"), PathBuf::from("/tmp/build/My.Game.3dsx"));
    }

    #[test]
    fn targets_serialise_lowercase() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&Target::Cafe)?, "\"cafe\"");
        Ok(())
    }
}
