//! Multi-target build orchestration.
//!
//! # Design
//! - Each requested target builds in its own freshly created temporary directory that is
//!   removed when the build ends, whatever the outcome.
//! - Targets build concurrently and never influence each other; a failing target is
//!   recorded and the rest carry on.
//! - Results come back in request order together with an aggregate status.
//! - Build outputs are named after the target id; the title only ever travels as a
//!   tool argument, so its length cannot break a file name.

use std::path::Path;

use futures_util::future::join_all;
use lovebrew_telemetry::Metrics;
use tempfile::TempDir;
use tracing::{Instrument, info_span};

use crate::command::CommandRunner;
use crate::console::{BuildJob, Target};
use crate::error::{BuildError, BuildResult};
use crate::metadata::BuildMetadata;
use crate::request_log::RequestLog;
use crate::resources::ResourceStore;

/// Aggregate result of a compile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStatus {
    /// Every target produced a binary.
    AllSuccess,
    /// Some targets produced a binary, some failed.
    PartialSuccess,
    /// No target produced a binary.
    Failure,
}

impl CompileStatus {
    /// HTTP status the outcome maps to.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::AllSuccess => 200,
            Self::PartialSuccess => 207,
            Self::Failure => 422,
        }
    }

    /// Upper-case label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllSuccess => "ALL_SUCCESS",
            Self::PartialSuccess => "PARTIAL_SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

/// Outcome of one target's build.
#[derive(Debug)]
pub struct TargetOutcome {
    /// Target that was built.
    pub target: Target,
    /// Final binary bytes or the error that stopped the pipeline.
    pub result: BuildResult<Vec<u8>>,
}

/// Outcomes of every requested target, in request order.
#[derive(Debug)]
pub struct CompileOutcome {
    outcomes: Vec<TargetOutcome>,
}

impl CompileOutcome {
    /// Per-target outcomes in request order.
    #[must_use]
    pub fn outcomes(&self) -> &[TargetOutcome] {
        &self.outcomes
    }

    /// Consume into per-target outcomes.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<TargetOutcome> {
        self.outcomes
    }

    /// Aggregate status.
    #[must_use]
    pub fn status(&self) -> CompileStatus {
        let succeeded = self
            .outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .count();
        match succeeded {
            0 => CompileStatus::Failure,
            n if n == self.outcomes.len() => CompileStatus::AllSuccess,
            _ => CompileStatus::PartialSuccess,
        }
    }

    /// Binary produced for `target`, if it succeeded.
    #[must_use]
    pub fn binary(&self, target: Target) -> Option<&[u8]> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.target == target)
            .and_then(|outcome| outcome.result.as_ref().ok())
            .map(Vec::as_slice)
    }

    /// Error recorded for `target`, if it failed.
    #[must_use]
    pub fn error(&self, target: Target) -> Option<&BuildError> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.target == target)
            .and_then(|outcome| outcome.result.as_ref().err())
    }
}

/// Drives every requested target's pipeline for a compile request.
#[derive(Clone)]
pub struct BuildOrchestrator {
    resources: ResourceStore,
    runner: CommandRunner,
    metrics: Option<Metrics>,
}

impl BuildOrchestrator {
    /// Orchestrator using `resources` for bundled inputs and `runner` for tools.
    #[must_use]
    pub const fn new(resources: ResourceStore, runner: CommandRunner) -> Self {
        Self {
            resources,
            runner,
            metrics: None,
        }
    }

    /// Record build counters in the shared metrics registry.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Bundled resources in use.
    #[must_use]
    pub const fn resources(&self) -> &ResourceStore {
        &self.resources
    }

    /// Build every target requested by `metadata`.
    pub async fn compile(&self, metadata: &BuildMetadata, log: &RequestLog) -> CompileOutcome {
        log.info(format!(
            "compiling '{}' for {}",
            metadata.title(),
            metadata
                .targets()
                .iter()
                .map(|target| target.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        let builds = metadata.targets().iter().map(|&target| {
            let span = info_span!("build", request_id = %log.request_id(), target = %target);
            async move {
                TargetOutcome {
                    target,
                    result: self.build_target(target, metadata, log).await,
                }
            }
            .instrument(span)
        });
        let outcome = CompileOutcome {
            outcomes: join_all(builds).await,
        };

        log.info(format!("compile finished: {}", outcome.status().as_str()));
        outcome
    }

    async fn build_target(
        &self,
        target: Target,
        metadata: &BuildMetadata,
        log: &RequestLog,
    ) -> BuildResult<Vec<u8>> {
        if let Some(metrics) = &self.metrics {
            metrics.build_started();
        }
        let result = self.run_pipeline(target, metadata, log).await;
        if let Some(metrics) = &self.metrics {
            metrics.build_finished();
            metrics.inc_build(target.as_str(), result.is_ok());
        }

        match &result {
            Ok(binary) => log.info(format!("{target}: built {} bytes", binary.len())),
            Err(err) => log.error(format!("{target}: {}: {}", err.code(), err.detail())),
        }
        result
    }

    async fn run_pipeline(
        &self,
        target: Target,
        metadata: &BuildMetadata,
        log: &RequestLog,
    ) -> BuildResult<Vec<u8>> {
        let console = target.console();
        console.preflight(metadata)?;
        let resources = self.resources.resolve(console).await?;

        let workspace = create_build_dir(target)?;
        let dir = workspace.path();

        let icon = match metadata.icon(target) {
            Some(bytes) => {
                let path = dir.join(format!("icon.{}", console.icon_extension()));
                write_file(&path, bytes).await?;
                log.info(format!("{target}: using uploaded icon"));
                path
            }
            None => resources.icon.clone(),
        };

        let job = BuildJob {
            dir,
            out: dir.join(target.as_str()),
            metadata,
            icon: &icon,
            resources: &resources,
            runner: &self.runner,
            log,
        };
        console.build(&job).await?;

        let binary_path = job.binary_path(console);
        let mut binary = match tokio::fs::read(&binary_path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(BuildError::MissingOutput { path: binary_path });
            }
            Err(source) => return Err(BuildError::io("read binary", binary_path, source)),
        };
        if let Some(game) = metadata.game() {
            binary.extend_from_slice(game);
        }
        Ok(binary)
    }
}

fn create_build_dir(target: Target) -> BuildResult<TempDir> {
    tempfile::Builder::new()
        .prefix(&format!("lovebrew-{target}-"))
        .tempdir()
        .map_err(|source| BuildError::io("create build directory", std::env::temp_dir(), source))
}

async fn write_file(path: &Path, bytes: &[u8]) -> BuildResult<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| BuildError::io("write file", path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::fake::FakeToolchain;
    use crate::metadata::MetadataFields;
    use lovebrew_test_support::fixtures::png_bytes;
    use lovebrew_test_support::resources::ResourceTree;

    fn orchestrator(tree: &ResourceTree, toolchain: FakeToolchain) -> BuildOrchestrator {
        BuildOrchestrator::new(
            ResourceStore::new(tree.root()),
            CommandRunner::with_runner(Arc::new(toolchain)),
        )
    }

    fn metadata(targets: &str) -> BuildMetadata {
        BuildMetadata::from_parts(
            MetadataFields {
                targets: Some(targets.to_string()),
                ..MetadataFields::default()
            },
            Vec::new(),
            None,
        )
        .expect("metadata")
    }

    #[tokio::test]
    async fn every_target_produces_its_container_format() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let orchestrator = orchestrator(&tree, FakeToolchain::new());
        let log = RequestLog::new("req");

        let outcome = orchestrator.compile(&metadata("ctr,hac,cafe"), &log).await;
        assert_eq!(outcome.status(), CompileStatus::AllSuccess);
        let order: Vec<Target> = outcome.outcomes().iter().map(|o| o.target).collect();
        assert_eq!(order, vec![Target::Ctr, Target::Hac, Target::Cafe]);
        for target in Target::ALL {
            let binary = outcome.binary(target).expect("binary");
            assert!(target.console().container_magic().matches(binary));
        }
        assert!(log.contents().contains("[INFO] ctr: built"));
        Ok(())
    }

    #[tokio::test]
    async fn defaults_are_embedded_in_the_binary() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let outcome = orchestrator(&tree, FakeToolchain::new())
            .compile(&metadata("ctr"), &RequestLog::new("req"))
            .await;
        let binary = embedded_text(&outcome, Target::Ctr);
        assert!(binary.contains("Untitled"));
        assert!(binary.contains("Unknown"));
        assert!(binary.contains("No description • 0.0.0"));
        Ok(())
    }

    fn embedded_text(outcome: &CompileOutcome, target: Target) -> String {
        String::from_utf8_lossy(outcome.binary(target).expect("binary")).into_owned()
    }

    #[tokio::test]
    async fn supplied_fields_are_embedded_verbatim() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let metadata = BuildMetadata::from_parts(
            MetadataFields {
                title: Some("Star Hopper".to_string()),
                author: Some("Ada L.".to_string()),
                description: Some("Jump between stars".to_string()),
                version: Some("1.4.2".to_string()),
                targets: Some("ctr,hac,cafe".to_string()),
            },
            Vec::new(),
            None,
        )?;
        let outcome = orchestrator(&tree, FakeToolchain::new())
            .compile(&metadata, &RequestLog::new("req"))
            .await;
        assert_eq!(outcome.status(), CompileStatus::AllSuccess);

        let ctr = embedded_text(&outcome, Target::Ctr);
        assert!(ctr.contains("Star Hopper"));
        assert!(ctr.contains("Ada L."));
        assert!(ctr.contains("Jump between stars • 1.4.2"));
        assert!(!ctr.contains("Untitled"));

        let hac = embedded_text(&outcome, Target::Hac);
        assert!(hac.contains("Star Hopper\0Ada L.\01.4.2"));

        let cafe = embedded_text(&outcome, Target::Cafe);
        assert!(cafe.contains("Star Hopper\0Star Hopper\0Ada L."));
        Ok(())
    }

    #[tokio::test]
    async fn longest_accepted_title_still_builds() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let title = "T".repeat(0x200);
        let metadata = BuildMetadata::from_parts(
            MetadataFields {
                title: Some(title.clone()),
                targets: Some("hac,cafe".to_string()),
                ..MetadataFields::default()
            },
            Vec::new(),
            None,
        )?;
        let outcome = orchestrator(&tree, FakeToolchain::new())
            .compile(&metadata, &RequestLog::new("req"))
            .await;

        assert_eq!(outcome.status(), CompileStatus::AllSuccess);
        assert!(embedded_text(&outcome, Target::Hac).contains(&title));
        assert!(embedded_text(&outcome, Target::Cafe).contains(&title));
        Ok(())
    }

    #[tokio::test]
    async fn one_failing_target_does_not_affect_the_others() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let toolchain = FakeToolchain::new().failing("elf2nro");
        let log = RequestLog::new("req");
        let outcome = orchestrator(&tree, toolchain)
            .compile(&metadata("ctr,hac,cafe"), &log)
            .await;

        assert_eq!(outcome.status(), CompileStatus::PartialSuccess);
        assert_eq!(outcome.status().http_status(), 207);
        assert!(outcome.binary(Target::Ctr).is_some());
        assert!(outcome.binary(Target::Cafe).is_some());
        let err = outcome.error(Target::Hac).expect("hac error");
        assert_eq!(err.code(), "COMMAND_FAILED");
        assert!(err.detail().contains("elf2nro"));
        assert!(log.contents().contains("[ERROR] hac: COMMAND_FAILED"));
        Ok(())
    }

    #[tokio::test]
    async fn all_failures_aggregate_to_failure() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let toolchain = FakeToolchain::new().missing("smdhtool");
        let outcome = orchestrator(&tree, toolchain)
            .compile(&metadata("ctr"), &RequestLog::new("req"))
            .await;
        assert_eq!(outcome.status(), CompileStatus::Failure);
        assert_eq!(
            outcome.error(Target::Ctr).map(BuildError::code),
            Some("COMMAND_EXE_NOT_FOUND")
        );
        Ok(())
    }

    #[tokio::test]
    async fn preflight_failures_skip_every_tool() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let toolchain = FakeToolchain::new();
        let calls = toolchain.clone();
        let metadata = BuildMetadata::from_parts(
            MetadataFields {
                description: Some("x".repeat(300)),
                targets: Some("ctr".to_string()),
                ..MetadataFields::default()
            },
            Vec::new(),
            None,
        )?;
        let outcome = orchestrator(&tree, toolchain)
            .compile(&metadata, &RequestLog::new("req"))
            .await;
        assert_eq!(
            outcome.error(Target::Ctr).map(BuildError::code),
            Some("DESCRIPTION_TOO_LONG")
        );
        assert!(calls.invocations().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn uploaded_icons_replace_the_bundled_default() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let toolchain = FakeToolchain::new();
        let calls = toolchain.clone();
        let metadata = BuildMetadata::from_parts(
            MetadataFields {
                targets: Some("ctr,cafe".to_string()),
                ..MetadataFields::default()
            },
            vec![(Target::Ctr, png_bytes(48, 48))],
            None,
        )?;
        let outcome = orchestrator(&tree, toolchain)
            .compile(&metadata, &RequestLog::new("req"))
            .await;
        assert_eq!(outcome.status(), CompileStatus::AllSuccess);

        let invocations = calls.invocations();
        let smdh = invocations
            .iter()
            .find(|inv| inv.program == "smdhtool")
            .expect("smdhtool call");
        assert!(!smdh.args[4].starts_with(&*tree.root().to_string_lossy()));
        assert!(smdh.args[4].ends_with("icon.png"));
        let wuhb = invocations
            .iter()
            .find(|inv| inv.program == "wuhbtool")
            .expect("wuhbtool call");
        assert_eq!(
            wuhb.flag("--icon"),
            Some(&*tree.root().join("cafe/icon.png").to_string_lossy())
        );
        Ok(())
    }

    #[tokio::test]
    async fn build_directories_are_removed_after_every_build() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let toolchain = FakeToolchain::new().failing("3dsxtool");
        let calls = toolchain.clone();
        let outcome = orchestrator(&tree, toolchain)
            .compile(&metadata("ctr,hac"), &RequestLog::new("req"))
            .await;
        assert_eq!(outcome.status(), CompileStatus::PartialSuccess);

        for invocation in calls.invocations() {
            let out = invocation
                .args
                .iter()
                .find(|arg| arg.contains("lovebrew-"))
                .expect("build path");
            let dir = Path::new(out).parent().expect("build dir");
            assert!(!dir.exists(), "{} was not removed", dir.display());
        }
        Ok(())
    }

    #[tokio::test]
    async fn identical_requests_produce_identical_binaries() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let orchestrator = orchestrator(&tree, FakeToolchain::new());
        let metadata = metadata("hac");
        let first = orchestrator.compile(&metadata, &RequestLog::new("a")).await;
        let second = orchestrator.compile(&metadata, &RequestLog::new("b")).await;
        assert_eq!(first.binary(Target::Hac), second.binary(Target::Hac));
        Ok(())
    }

    #[tokio::test]
    async fn game_archive_is_appended() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        let metadata = BuildMetadata::from_parts(
            MetadataFields {
                targets: Some("cafe".to_string()),
                ..MetadataFields::default()
            },
            Vec::new(),
            Some(b"PK\x03\x04game".to_vec()),
        )?;
        let outcome = orchestrator(&tree, FakeToolchain::new())
            .compile(&metadata, &RequestLog::new("req"))
            .await;
        let binary = outcome.binary(Target::Cafe).expect("binary");
        assert!(binary.starts_with(b"WUHB"));
        assert!(binary.ends_with(b"PK\x03\x04game"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_resources_fail_only_their_target() -> anyhow::Result<()> {
        let tree = ResourceTree::complete()?;
        tree.remove("cafe/content")?;
        let metrics = Metrics::new()?;
        let outcome = orchestrator(&tree, FakeToolchain::new())
            .with_metrics(metrics.clone())
            .compile(&metadata("cafe,ctr"), &RequestLog::new("req"))
            .await;
        assert_eq!(
            outcome.error(Target::Cafe).map(BuildError::code),
            Some("RESOURCE_NOT_FOUND")
        );
        assert!(outcome.binary(Target::Ctr).is_some());
        assert_eq!(metrics.build_count("cafe", false), 1);
        assert_eq!(metrics.snapshot().builds_in_flight, 0);
        Ok(())
    }
}
