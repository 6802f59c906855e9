//! Templated invocation of external SDK tools.
//!
//! # Design
//! - Templates are static strings with `{name}` placeholders; every placeholder must be
//!   supplied before anything is spawned.
//! - Templates are tokenised with shell quoting rules first and substituted per token, so
//!   argument values are never re-parsed and no shell is involved.
//! - Process execution sits behind [`ToolRunner`] so pipelines can run against a fake toolchain.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lovebrew_telemetry::Metrics;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{CommandError, CommandResult};

static PLACEHOLDER: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}"));

fn placeholder_pattern() -> Option<&'static Regex> {
    PLACEHOLDER.as_ref().ok()
}

/// A command line with named `{placeholder}` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTemplate {
    template: &'static str,
}

impl CommandTemplate {
    /// Wrap a static template string.
    #[must_use]
    pub const fn new(template: &'static str) -> Self {
        Self { template }
    }

    /// Raw template text.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.template
    }

    /// Executable named by the template (its first word).
    #[must_use]
    pub fn program(&self) -> &'static str {
        self.template.split_whitespace().next().unwrap_or_default()
    }

    /// Placeholder names in order of first appearance.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        let captures = placeholder_pattern()
            .into_iter()
            .flat_map(|pattern| pattern.captures_iter(self.template));
        for caps in captures {
            if let Some(name) = caps.get(1).map(|m| m.as_str()) {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Resolve the template into a concrete invocation.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::ArgumentMissing`] for the first placeholder without an
    /// argument, or [`CommandError::MalformedTemplate`] if the template cannot be tokenised.
    pub fn resolve(&self, args: &CommandArgs) -> CommandResult<Invocation> {
        if let Some(missing) = self
            .placeholders()
            .into_iter()
            .find(|name| !args.contains(name))
        {
            return Err(CommandError::ArgumentMissing {
                tool: self.program().to_string(),
                name: missing.to_string(),
            });
        }

        let malformed = || CommandError::MalformedTemplate {
            template: self.template,
        };
        let pattern = placeholder_pattern().ok_or_else(malformed)?;
        let tokens = shlex::split(self.template).ok_or_else(malformed)?;
        let mut argv = tokens.into_iter().map(|token| {
            pattern
                .replace_all(&token, |caps: &Captures<'_>| {
                    args.get(&caps[1]).unwrap_or_default().to_string()
                })
                .into_owned()
        });
        let program = argv.next().ok_or_else(malformed)?;
        Ok(Invocation {
            program,
            args: argv.collect(),
        })
    }
}

/// Named argument values for a [`CommandTemplate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    values: BTreeMap<&'static str, String>,
}

impl CommandArgs {
    /// Empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string argument.
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    /// Add a filesystem path argument.
    #[must_use]
    pub fn with_path(self, name: &'static str, path: impl AsRef<Path>) -> Self {
        let value = path.as_ref().to_string_lossy().into_owned();
        self.with(name, value)
    }

    /// Value bound to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// A fully resolved program and argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable to run.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl Invocation {
    /// Value following `--flag=` style arguments, if present.
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn flag(&self, flag: &str) -> Option<&str> {
        self.args.iter().find_map(|arg| {
            arg.strip_prefix(flag)
                .and_then(|rest| rest.strip_prefix('='))
        })
    }
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Per-invocation execution policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Kill the tool when it runs longer than this.
    pub timeout: Option<Duration>,
}

/// Executes resolved invocations.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run `invocation` to completion.
    async fn run(
        &self,
        invocation: &Invocation,
        context: ExecutionContext,
    ) -> CommandResult<ToolOutput>;
}

/// Runs tools as child processes, never through a shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        context: ExecutionContext,
    ) -> CommandResult<ToolOutput> {
        let program = invocation.program.clone();
        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| spawn_error(&program, source))?;

        let waited = child.wait_with_output();
        let output = match context.timeout {
            Some(timeout) => tokio::time::timeout(timeout, waited)
                .await
                .map_err(|_| CommandError::TimedOut {
                    program: program.clone(),
                    timeout,
                })?,
            None => waited.await,
        }
        .map_err(|source| spawn_error(&program, source))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if output.status.success() {
            Ok(ToolOutput { stdout, stderr })
        } else {
            Err(CommandError::CommandFailed {
                program,
                exit_code: output.status.code().unwrap_or(-1),
                stderr,
            })
        }
    }
}

fn spawn_error(program: &str, source: io::Error) -> CommandError {
    if source.kind() == io::ErrorKind::NotFound {
        CommandError::ExecutableNotFound {
            program: program.to_string(),
        }
    } else {
        CommandError::Spawn {
            program: program.to_string(),
            source,
        }
    }
}

/// Resolves templates and runs them through a [`ToolRunner`].
#[derive(Clone)]
pub struct CommandRunner {
    runner: Arc<dyn ToolRunner>,
    context: ExecutionContext,
    metrics: Option<Metrics>,
}

impl CommandRunner {
    /// Runner backed by real child processes.
    #[must_use]
    pub fn process() -> Self {
        Self::with_runner(Arc::new(ProcessRunner))
    }

    /// Runner backed by an arbitrary [`ToolRunner`].
    #[must_use]
    pub fn with_runner(runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            runner,
            context: ExecutionContext::default(),
            metrics: None,
        }
    }

    /// Apply a per-invocation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.context.timeout = timeout;
        self
    }

    /// Count invocations in the shared metrics registry.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Execution policy applied to every invocation.
    #[must_use]
    pub const fn context(&self) -> ExecutionContext {
        self.context
    }

    /// Substitute `args` into `template` and run it.
    ///
    /// # Errors
    ///
    /// Returns the resolution error without spawning anything, or the runner's failure.
    pub async fn execute(
        &self,
        template: &CommandTemplate,
        args: &CommandArgs,
    ) -> CommandResult<ToolOutput> {
        let invocation = template.resolve(args)?;
        debug!(program = %invocation.program, args = ?invocation.args, "running tool");

        let result = self.runner.run(&invocation, self.context).await;
        if let Some(metrics) = &self.metrics {
            let status = result.as_ref().map_or_else(CommandError::code, |_| "success");
            metrics.inc_tool_invocation(&invocation.program, status);
        }
        if let Err(err) = &result {
            warn!(
                program = %invocation.program,
                code = err.code(),
                detail = %err.detail(),
                "tool failed"
            );
        }
        result
    }
}
