//! Start-up check for the external SDK tools.

use serde::Serialize;
use tracing::{info, warn};

/// A toolkit and the executables it provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolGroup {
    /// Toolkit name as packaged by the SDK.
    pub name: &'static str,
    /// Executables expected on `PATH`.
    pub tools: &'static [&'static str],
}

/// Every toolkit the pipelines and converters invoke.
pub const TOOL_GROUPS: [ToolGroup; 4] = [
    ToolGroup {
        name: "tex3ds",
        tools: &["tex3ds", "mkbcfnt"],
    },
    ToolGroup {
        name: "3dstools",
        tools: &["3dsxtool", "smdhtool"],
    },
    ToolGroup {
        name: "switch-tools",
        tools: &["nacptool", "elf2nro"],
    },
    ToolGroup {
        name: "wut-tools",
        tools: &["elf2rpl", "wuhbtool"],
    },
];

/// Tools found and missing on this host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ToolReport {
    /// Executables that resolved.
    pub found: Vec<&'static str>,
    /// Executables that did not resolve, prefixed with their toolkit.
    pub missing: Vec<String>,
}

impl ToolReport {
    /// Whether every tool resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Look up every SDK tool on `PATH`.
#[must_use]
pub fn check_environment() -> ToolReport {
    check_with(|tool| which::which(tool).is_ok())
}

/// Look up every SDK tool with a custom resolver.
pub fn check_with<F>(resolves: F) -> ToolReport
where
    F: Fn(&str) -> bool,
{
    let mut report = ToolReport::default();
    for group in TOOL_GROUPS {
        for &tool in group.tools {
            if resolves(tool) {
                report.found.push(tool);
            } else {
                report.missing.push(format!("{}/{tool}", group.name));
            }
        }
    }
    report
}

/// Log the outcome of a tool check.
pub fn log_report(report: &ToolReport) {
    if report.is_complete() {
        info!(tools = report.found.len(), "all SDK tools found");
    } else {
        for tool in &report.missing {
            warn!(tool = %tool, "SDK tool not found on PATH");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pipeline_tool_is_checked() {
        use crate::consoles::{
            CTR_BINARY_TOOL, ELF_TO_RPL, HAC_BINARY_TOOL, NACP_TOOL, SMDH_TOOL, WUHB_TOOL,
        };
        use crate::conversion::{FONT_TOOL, TEXTURE_TOOL};

        let all = check_with(|_| true);
        for template in [
            SMDH_TOOL,
            CTR_BINARY_TOOL,
            NACP_TOOL,
            HAC_BINARY_TOOL,
            ELF_TO_RPL,
            WUHB_TOOL,
            TEXTURE_TOOL,
            FONT_TOOL,
        ] {
            assert!(all.found.contains(&template.program()), "{}", template.program());
        }
        assert!(all.is_complete());
    }

    #[test]
    fn missing_tools_name_their_toolkit() {
        let report = check_with(|tool| tool != "wuhbtool");
        assert!(!report.is_complete());
        assert_eq!(report.missing, vec!["wut-tools/wuhbtool".to_string()]);
        assert_eq!(report.found.len(), 7);
        log_report(&report);
    }
}
