use std::future::Future;

use lovebrew_api::{ApiServer, ApiState};
use lovebrew_bundler::tools::log_report;
use lovebrew_bundler::{CommandRunner, ToolReport, check_environment};
use lovebrew_config::{LogFormatChoice, ServerConfig};
use lovebrew_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tracing::{info, warn};

use crate::error::{AppError, AppResult};

/// Build identifier stamped in at compile time, `dev` for local builds.
const BUILD_SHA: &str = match option_env!("LOVEBREW_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Dependencies required to bootstrap the service.
pub(crate) struct BootstrapDependencies {
    config: ServerConfig,
    telemetry: Metrics,
    runner: CommandRunner,
    toolchain: fn() -> ToolReport,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ServerConfig::from_lookup(lookup)
            .map_err(|err| AppError::config("server_config.from_env", err))?;
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        Ok(Self {
            config,
            telemetry,
            runner: CommandRunner::process(),
            toolchain: check_environment,
        })
    }
}

/// Entry point for the boot sequence; serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error if configuration is invalid, logging cannot be installed, or the
/// listener fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    run_app_with(dependencies, shutdown_signal()).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<F>(
    dependencies: BootstrapDependencies,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let BootstrapDependencies {
        config,
        telemetry,
        runner,
        toolchain,
    } = dependencies;

    let logging = LoggingConfig {
        level: &config.log_level,
        format: log_format(config.log_format),
        build_sha: BUILD_SHA,
    };
    lovebrew_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new(config.mode.as_str());

    info!(
        mode = config.mode.as_str(),
        resources = %config.resources_dir.display(),
        "LoveBrew bootstrap starting"
    );

    let tools = toolchain();
    log_report(&tools);
    if !tools.is_complete() {
        warn!("requests needing a missing SDK tool will fail until it is installed");
    }

    let addr = config.socket_addr();
    let api = ApiServer::new(ApiState::new(config, runner, telemetry, tools));
    info!(addr = %addr, "Launching API listener");
    api.serve_with_shutdown(addr, shutdown)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

const fn log_format(choice: LogFormatChoice) -> LogFormat {
    match choice {
        LogFormatChoice::Json => LogFormat::Json,
        LogFormatChoice::Pretty => LogFormat::Pretty,
        LogFormatChoice::Auto => LogFormat::infer(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl-C handler; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
