use async_trait::async_trait;

use crate::asset::MediaType;
use crate::command::{CommandArgs, CommandTemplate};
use crate::console::{BuildJob, Console, ContainerMagic, Target, with_suffix};
use crate::error::BuildResult;

/// Converts the runtime ELF into an RPX.
pub const ELF_TO_RPL: CommandTemplate = CommandTemplate::new(r#"elf2rpl "{elf}" "{out}.rpx""#);
/// Packages the RPX, icon, and content directory into a WUHB bundle.
pub const WUHB_TOOL: CommandTemplate = CommandTemplate::new(concat!(
    r#"wuhbtool "{rpx}" "{out}.wuhb" --content="{content}" "#,
    r#"--name="{name}" --short-name="{short_name}" --author="{author}" --icon="{icon}""#,
));

/// Nintendo Wii U pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cafe;

#[async_trait]
impl Console for Cafe {
    fn target(&self) -> Target {
        Target::Cafe
    }

    fn icon_extension(&self) -> &'static str {
        "png"
    }

    fn icon_size(&self) -> (u32, u32) {
        (128, 128)
    }

    fn icon_format(&self) -> MediaType {
        MediaType::Png
    }

    fn binary_extension(&self) -> &'static str {
        "wuhb"
    }

    fn container_magic(&self) -> ContainerMagic {
        ContainerMagic {
            offset: 0,
            bytes: b"WUHB",
        }
    }

    fn asset_archive(&self) -> &'static str {
        "content"
    }

    async fn build(&self, job: &BuildJob<'_>) -> BuildResult<()> {
        let metadata = job.metadata;

        job.log.info("cafe: converting ELF to RPX");
        let args = CommandArgs::new()
            .with_path("elf", &job.resources.elf)
            .with_path("out", &job.out);
        job.runner.execute(&ELF_TO_RPL, &args).await?;

        job.log.info("cafe: packaging WUHB bundle");
        let args = CommandArgs::new()
            .with_path("rpx", with_suffix(&job.out, "rpx"))
            .with_path("out", &job.out)
            .with_path("content", &job.resources.archive)
            .with("name", metadata.title())
            .with("short_name", metadata.title())
            .with("author", metadata.author())
            .with_path("icon", job.icon);
        job.runner.execute(&WUHB_TOOL, &args).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packaging_step_names_app_icon_and_content() {
        assert_eq!(ELF_TO_RPL.placeholders(), vec!["elf", "out"]);
        assert_eq!(
            WUHB_TOOL.placeholders(),
            vec!["rpx", "out", "content", "name", "short_name", "author", "icon"]
        );
        assert_eq!(WUHB_TOOL.program(), "wuhbtool");
    }
}
