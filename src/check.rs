use std::path::Path;

use anyhow::Result;
use console::Style;

use crate::config::Config;
use crate::exec::run_cmd_unchecked;
use crate::progress::{finish_spinner, stage_spinner};
use crate::types::CheckResult;

struct ToolSpec<'a> {
    name: &'static str,
    binary: &'a str,
    version_args: &'static [&'static str],
    fix_hint: &'static str,
}

/// Verify the tools remediation depends on are present on this host.
pub fn run_check(config: &Config) -> Result<bool> {
    let tools = [
        ToolSpec {
            name: "modprobe",
            binary: &config.actions.modprobe,
            version_args: &["--version"],
            fix_hint: "Install kmod (e.g. dnf install kmod / apt-get install kmod)",
        },
        ToolSpec {
            name: "sysctl",
            binary: &config.actions.sysctl,
            version_args: &["--version"],
            fix_hint: "Install procps (e.g. dnf install procps-ng / apt-get install procps)",
        },
    ];

    let mut results: Vec<CheckResult> = Vec::new();

    for tool in &tools {
        let pb = stage_spinner(&format!("Checking {}...", tool.name));
        let result = check_tool(tool);
        finish_spinner(&pb, result.passed);
        results.push(result);
    }

    {
        let pb = stage_spinner("Checking /proc/sys...");
        let result = if Path::new("/proc/sys").is_dir() {
            CheckResult {
                name: "procfs".to_string(),
                passed: true,
                detail: "/proc/sys is mounted".to_string(),
                fix_hint: None,
            }
        } else {
            CheckResult {
                name: "procfs".to_string(),
                passed: false,
                detail: "/proc/sys not found".to_string(),
                fix_hint: Some("Kernel parameters can only be set on a Linux host with procfs mounted".to_string()),
            }
        };
        finish_spinner(&pb, result.passed);
        results.push(result);
    }

    if config.persist.enabled {
        for file in [&config.persist.modules_file, &config.persist.sysctl_file] {
            let dir = file.parent().unwrap_or(Path::new("/"));
            let passed = dir.is_dir();
            results.push(CheckResult {
                name: format!("persist dir {}", dir.display()),
                passed,
                detail: if passed { "present".to_string() } else { "missing".to_string() },
                fix_hint: (!passed).then(|| format!("Create it with: mkdir -p {}", dir.display())),
            });
        }
    }

    print_results(&results);
    Ok(results.iter().all(|r| r.passed))
}

fn check_tool(tool: &ToolSpec<'_>) -> CheckResult {
    if which::which(tool.binary).is_err() {
        return CheckResult {
            name: tool.name.to_string(),
            passed: false,
            detail: format!("{} not found on PATH", tool.binary),
            fix_hint: Some(tool.fix_hint.to_string()),
        };
    }
    match run_cmd_unchecked(tool.binary, tool.version_args) {
        Ok(exec) if exec.exit_code == 0 => {
            let detail = exec.stdout.lines().next().unwrap_or("").trim().to_string();
            CheckResult {
                name: tool.name.to_string(),
                passed: true,
                detail,
                fix_hint: None,
            }
        }
        _ => CheckResult {
            name: tool.name.to_string(),
            passed: false,
            detail: "Found on PATH but failed to get version".to_string(),
            fix_hint: Some(tool.fix_hint.to_string()),
        },
    }
}

fn print_results(results: &[CheckResult]) {
    println!();
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();

    for r in results {
        if r.passed {
            println!("  {} {}: {}", green.apply_to("PASS"), r.name, r.detail);
        } else {
            println!("  {} {}: {}", red.apply_to("FAIL"), r.name, r.detail);
            if let Some(hint) = &r.fix_hint {
                println!("       hint: {hint}");
            }
        }
    }
    println!();
}
