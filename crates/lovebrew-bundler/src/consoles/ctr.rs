use async_trait::async_trait;

use crate::asset::MediaType;
use crate::command::{CommandArgs, CommandTemplate};
use crate::console::{BuildJob, Console, ContainerMagic, Target};
use crate::error::{BuildError, BuildResult};
use crate::metadata::BuildMetadata;

/// Packs title, description, author, and icon into an SMDH blob.
pub const SMDH_TOOL: CommandTemplate = CommandTemplate::new(
    r#"smdhtool --create "{name}" "{desc}" "{author}" "{icon}" "{out}.smdh""#,
);
/// Links the runtime, SMDH, and romfs into a 3DSX executable.
pub const BINARY_TOOL: CommandTemplate = CommandTemplate::new(
    r#"3dsxtool "{elf}" "{out}.3dsx" --smdh="{out}.smdh" --romfs="{romfs}""#,
);

/// Limit on description and version combined, in bytes.
pub const MAX_DESCRIPTION_BYTES: usize = 256;
/// SMDH short title capacity in UTF-16 code units.
const MAX_TITLE_UNITS: usize = 0x40;
/// SMDH publisher capacity in UTF-16 code units.
const MAX_AUTHOR_UNITS: usize = 0x40;

/// Nintendo 3DS pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ctr;

#[async_trait]
impl Console for Ctr {
    fn target(&self) -> Target {
        Target::Ctr
    }

    fn icon_extension(&self) -> &'static str {
        "png"
    }

    fn icon_size(&self) -> (u32, u32) {
        (48, 48)
    }

    fn icon_format(&self) -> MediaType {
        MediaType::Png
    }

    fn binary_extension(&self) -> &'static str {
        "3dsx"
    }

    fn container_magic(&self) -> ContainerMagic {
        ContainerMagic {
            offset: 0,
            bytes: b"3DSX",
        }
    }

    fn asset_archive(&self) -> &'static str {
        "files.romfs"
    }

    fn preflight(&self, metadata: &BuildMetadata) -> BuildResult<()> {
        let title = metadata.title().encode_utf16().count();
        if title > MAX_TITLE_UNITS {
            return Err(BuildError::TitleTooLong {
                len: title,
                max: MAX_TITLE_UNITS,
            });
        }
        let author = metadata.author().encode_utf16().count();
        if author > MAX_AUTHOR_UNITS {
            return Err(BuildError::AuthorTooLong {
                len: author,
                max: MAX_AUTHOR_UNITS,
            });
        }
        let combined = metadata.description().len() + metadata.version().len();
        if combined > MAX_DESCRIPTION_BYTES {
            return Err(BuildError::DescriptionTooLong {
                len: combined,
                max: MAX_DESCRIPTION_BYTES,
            });
        }
        Ok(())
    }

    async fn build(&self, job: &BuildJob<'_>) -> BuildResult<()> {
        let metadata = job.metadata;
        let description = format!("{} • {}", metadata.description(), metadata.version());

        job.log.info("ctr: creating SMDH metadata");
        let args = CommandArgs::new()
            .with("name", metadata.title())
            .with("desc", description)
            .with("author", metadata.author())
            .with_path("icon", job.icon)
            .with_path("out", &job.out);
        job.runner.execute(&SMDH_TOOL, &args).await?;

        job.log.info("ctr: linking 3DSX");
        let args = CommandArgs::new()
            .with_path("elf", &job.resources.elf)
            .with_path("out", &job.out)
            .with_path("romfs", &job.resources.archive);
        job.runner.execute(&BINARY_TOOL, &args).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataFields;

    fn metadata(fields: MetadataFields) -> BuildMetadata {
        let fields = MetadataFields {
            targets: Some("ctr".to_string()),
            ..fields
        };
        BuildMetadata::from_parts(fields, Vec::new(), None).expect("metadata")
    }

    #[test]
    fn description_and_version_share_one_limit() {
        let ok = metadata(MetadataFields {
            description: Some("d".repeat(250)),
            version: Some("1.0.0".to_string()),
            ..MetadataFields::default()
        });
        assert!(Ctr.preflight(&ok).is_ok());

        let long = metadata(MetadataFields {
            description: Some("d".repeat(250)),
            version: Some("1.0.0-beta".to_string()),
            ..MetadataFields::default()
        });
        let err = Ctr.preflight(&long).unwrap_err();
        assert!(matches!(
            err,
            BuildError::DescriptionTooLong { len: 260, max: 256 }
        ));
        assert_eq!(err.code(), "DESCRIPTION_TOO_LONG");
    }

    #[test]
    fn title_limit_counts_utf16_units() {
        let fits = metadata(MetadataFields {
            title: Some("é".repeat(0x40)),
            ..MetadataFields::default()
        });
        assert!(Ctr.preflight(&fits).is_ok());

        let long = metadata(MetadataFields {
            title: Some("🎮".repeat(0x21)),
            ..MetadataFields::default()
        });
        assert!(matches!(
            Ctr.preflight(&long),
            Err(BuildError::TitleTooLong { len: 0x42, .. })
        ));
    }

    #[test]
    fn templates_only_use_supplied_arguments() {
        assert_eq!(
            SMDH_TOOL.placeholders(),
            vec!["name", "desc", "author", "icon", "out"]
        );
        assert_eq!(BINARY_TOOL.placeholders(), vec!["elf", "out", "romfs"]);
    }
}
