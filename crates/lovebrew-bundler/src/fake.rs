//! Deterministic stand-in for the SDK toolchain.
//!
//! Each emulated tool reads the files the real one would read and writes an output
//! carrying the real container magic plus the metadata strings it was given, so pipeline
//! ordering and metadata embedding can be checked without the SDKs installed.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::command::{ExecutionContext, Invocation, ToolOutput, ToolRunner};
use crate::error::{CommandError, CommandResult};

/// Fake toolchain; clones share configuration and the invocation record.
#[derive(Debug, Clone, Default)]
pub struct FakeToolchain {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    failing: HashSet<String>,
    missing: HashSet<String>,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeToolchain {
    /// Toolchain where every tool succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `tool` exit with status 1.
    #[must_use]
    pub fn failing(self, tool: &str) -> Self {
        self.configure(|inner| {
            inner.failing.insert(tool.to_string());
        })
    }

    /// Make `tool` unresolvable.
    #[must_use]
    pub fn missing(self, tool: &str) -> Self {
        self.configure(|inner| {
            inner.missing.insert(tool.to_string());
        })
    }

    /// Every invocation seen so far, in call order.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.inner
            .invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn configure(self, apply: impl FnOnce(&mut Inner)) -> Self {
        let mut inner = Inner {
            failing: self.inner.failing.clone(),
            missing: self.inner.missing.clone(),
            invocations: Mutex::new(self.invocations()),
        };
        apply(&mut inner);
        Self {
            inner: Arc::new(inner),
        }
    }
}

#[async_trait]
impl ToolRunner for FakeToolchain {
    async fn run(
        &self,
        invocation: &Invocation,
        _context: ExecutionContext,
    ) -> CommandResult<ToolOutput> {
        self.inner
            .invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation.clone());

        let program = invocation.program.as_str();
        if self.inner.missing.contains(program) {
            return Err(CommandError::ExecutableNotFound {
                program: program.to_string(),
            });
        }
        if self.inner.failing.contains(program) {
            return Err(failed(program, "simulated failure"));
        }

        let args = &invocation.args;
        let arg = |index: usize| args.get(index).map_or("", String::as_str);
        match program {
            "smdhtool" => {
                read(program, arg(4)).await?;
                let strings = fields(&[arg(1), arg(2), arg(3)]);
                let body = [b"SMDH".as_slice(), strings.as_slice()].concat();
                write(program, arg(5), &body).await
            }
            "3dsxtool" => {
                read(program, arg(0)).await?;
                read(program, invocation.flag("--romfs").unwrap_or_default()).await?;
                let smdh = read(program, invocation.flag("--smdh").unwrap_or_default()).await?;
                write(program, arg(1), &[b"3DSX".as_slice(), smdh.as_slice()].concat()).await
            }
            "nacptool" => {
                let strings = fields(&[arg(1), arg(2), arg(3)]);
                let body = [b"NACP".as_slice(), strings.as_slice()].concat();
                write(program, arg(4), &body).await
            }
            "elf2nro" => {
                read(program, arg(0)).await?;
                read(program, invocation.flag("--icon").unwrap_or_default()).await?;
                read(program, invocation.flag("--romfs").unwrap_or_default()).await?;
                let nacp = read(program, invocation.flag("--nacp").unwrap_or_default()).await?;
                let body = [[0_u8; 0x10].as_slice(), b"NRO0".as_slice(), nacp.as_slice()].concat();
                write(program, arg(1), &body).await
            }
            "elf2rpl" => {
                read(program, arg(0)).await?;
                write(program, arg(1), b"RPX\0").await
            }
            "wuhbtool" => {
                read(program, arg(0)).await?;
                read(program, invocation.flag("--icon").unwrap_or_default()).await?;
                read(program, invocation.flag("--content").unwrap_or_default()).await?;
                let strings = fields(&[
                    invocation.flag("--name").unwrap_or_default(),
                    invocation.flag("--short-name").unwrap_or_default(),
                    invocation.flag("--author").unwrap_or_default(),
                ]);
                write(program, arg(1), &[b"WUHB".as_slice(), strings.as_slice()].concat()).await
            }
            "tex3ds" => {
                let input = read(program, arg(4)).await?;
                let body = [b"T3X\0".as_slice(), input.len().to_le_bytes().as_slice()].concat();
                write(program, arg(6), &body).await
            }
            "mkbcfnt" => {
                let input = read(program, arg(0)).await?;
                let body = [b"CFNT".as_slice(), input.len().to_le_bytes().as_slice()].concat();
                write(program, arg(2), &body).await
            }
            other => Err(CommandError::ExecutableNotFound {
                program: other.to_string(),
            }),
        }
    }
}

fn fields(values: &[&str]) -> Vec<u8> {
    values.join("\0").into_bytes()
}

fn failed(program: &str, stderr: &str) -> CommandError {
    CommandError::CommandFailed {
        program: program.to_string(),
        exit_code: 1,
        stderr: format!("{program}: {stderr}"),
    }
}

/// Read an input; directories read as empty.
async fn read(program: &str, path: &str) -> CommandResult<Vec<u8>> {
    let path = Path::new(path);
    if tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        return Ok(Vec::new());
    }
    tokio::fs::read(path)
        .await
        .map_err(|err| failed(program, &format!("cannot read {}: {err}", path.display())))
}

async fn write(program: &str, path: &str, body: &[u8]) -> CommandResult<ToolOutput> {
    tokio::fs::write(path, body)
        .await
        .map_err(|err| failed(program, &format!("cannot write {path}: {err}")))?;
    Ok(ToolOutput::default())
}
