//! Shared application state handed to every handler.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lovebrew_bundler::{BuildOrchestrator, CommandRunner, Converter, ResourceStore, ToolReport};
use lovebrew_config::ServerConfig;
use lovebrew_telemetry::Metrics;

/// Dependencies and start-up facts shared by the HTTP handlers.
pub struct ApiState {
    pub(crate) config: ServerConfig,
    pub(crate) orchestrator: BuildOrchestrator,
    pub(crate) converter: Converter,
    pub(crate) telemetry: Metrics,
    pub(crate) tools: ToolReport,
    pub(crate) deployed_at: DateTime<Utc>,
    started: Instant,
}

impl ApiState {
    /// Wire the build pipeline from `config`, running every tool through `runner`.
    ///
    /// `tools` is the toolchain report taken at start-up and surfaced on `/health`.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        runner: CommandRunner,
        telemetry: Metrics,
        tools: ToolReport,
    ) -> Self {
        let runner = runner
            .with_timeout(config.tool_timeout)
            .with_metrics(telemetry.clone());
        let orchestrator =
            BuildOrchestrator::new(ResourceStore::new(config.resources_dir.clone()), runner.clone())
                .with_metrics(telemetry.clone());
        let converter = Converter::new(runner).with_metrics(telemetry.clone());
        Self {
            config,
            orchestrator,
            converter,
            telemetry,
            tools,
            deployed_at: Utc::now(),
            started: Instant::now(),
        }
    }

    /// Time elapsed since the state was created.
    pub(crate) fn uptime(&self) -> Duration {
        self.started.elapsed()
    }
}
