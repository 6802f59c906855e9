use async_trait::async_trait;

use crate::asset::MediaType;
use crate::command::{CommandArgs, CommandTemplate};
use crate::console::{BuildJob, Console, ContainerMagic, Target};
use crate::error::{BuildError, BuildResult};
use crate::metadata::BuildMetadata;

/// Packs title, author, and version into a NACP blob.
pub const NACP_TOOL: CommandTemplate =
    CommandTemplate::new(r#"nacptool --create "{name}" "{author}" "{version}" "{out}.nacp""#);
/// Links the runtime, NACP, icon, and romfs into an NRO executable.
pub const BINARY_TOOL: CommandTemplate = CommandTemplate::new(
    r#"elf2nro "{elf}" "{out}.nro" --nacp="{out}.nacp" --icon="{icon}" --romfs="{romfs}""#,
);

const MAX_TITLE_BYTES: usize = 0x200;
const MAX_AUTHOR_BYTES: usize = 0x100;
const MAX_VERSION_BYTES: usize = 0x10;

/// Nintendo Switch pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hac;

#[async_trait]
impl Console for Hac {
    fn target(&self) -> Target {
        Target::Hac
    }

    fn icon_extension(&self) -> &'static str {
        "jpg"
    }

    fn icon_size(&self) -> (u32, u32) {
        (256, 256)
    }

    fn icon_format(&self) -> MediaType {
        MediaType::Jpeg
    }

    fn binary_extension(&self) -> &'static str {
        "nro"
    }

    fn container_magic(&self) -> ContainerMagic {
        ContainerMagic {
            offset: 0x10,
            bytes: b"NRO0",
        }
    }

    fn asset_archive(&self) -> &'static str {
        "files.romfs"
    }

    fn preflight(&self, metadata: &BuildMetadata) -> BuildResult<()> {
        let title = metadata.title().len();
        if title > MAX_TITLE_BYTES {
            return Err(BuildError::TitleTooLong {
                len: title,
                max: MAX_TITLE_BYTES,
            });
        }
        let author = metadata.author().len();
        if author > MAX_AUTHOR_BYTES {
            return Err(BuildError::AuthorTooLong {
                len: author,
                max: MAX_AUTHOR_BYTES,
            });
        }
        let version = metadata.version().len();
        if version > MAX_VERSION_BYTES {
            return Err(BuildError::VersionTooLong {
                len: version,
                max: MAX_VERSION_BYTES,
            });
        }
        Ok(())
    }

    async fn build(&self, job: &BuildJob<'_>) -> BuildResult<()> {
        let metadata = job.metadata;

        job.log.info("hac: creating NACP metadata");
        let args = CommandArgs::new()
            .with("name", metadata.title())
            .with("author", metadata.author())
            .with("version", metadata.version())
            .with_path("out", &job.out);
        job.runner.execute(&NACP_TOOL, &args).await?;

        job.log.info("hac: linking NRO");
        let args = CommandArgs::new()
            .with_path("elf", &job.resources.elf)
            .with_path("out", &job.out)
            .with_path("icon", job.icon)
            .with_path("romfs", &job.resources.archive);
        job.runner.execute(&BINARY_TOOL, &args).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataFields;

    #[test]
    fn version_field_is_bounded() {
        let fields = MetadataFields {
            version: Some("1.0.0-release-candidate".to_string()),
            targets: Some("hac".to_string()),
            ..MetadataFields::default()
        };
        let metadata = BuildMetadata::from_parts(fields, Vec::new(), None).expect("metadata");
        assert!(matches!(
            Hac.preflight(&metadata),
            Err(BuildError::VersionTooLong { max: 0x10, .. })
        ));
    }

    #[test]
    fn defaults_fit_every_limit() {
        let fields = MetadataFields {
            targets: Some("hac".to_string()),
            ..MetadataFields::default()
        };
        let metadata = BuildMetadata::from_parts(fields, Vec::new(), None).expect("metadata");
        assert!(Hac.preflight(&metadata).is_ok());
    }

    #[test]
    fn templates_only_use_supplied_arguments() {
        assert_eq!(
            NACP_TOOL.placeholders(),
            vec!["name", "author", "version", "out"]
        );
        assert_eq!(
            BINARY_TOOL.placeholders(),
            vec!["elf", "out", "icon", "romfs"]
        );
    }
}
