use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use console::Style;
use serde::Serialize;

use crate::autofix::FixOutcome;
use crate::checker::{self, Remediation};
use crate::error::{FailureStage, RemediationError};
use crate::types::Probe;

/// Why a probe ended up unfixed, as captured by the failure hook.
#[derive(Debug, Clone)]
pub struct ProbeFailure {
    pub reason: String,
    pub stage: FailureStage,
}

impl From<&RemediationError> for ProbeFailure {
    fn from(err: &RemediationError) -> Self {
        Self {
            reason: err.chain_message(),
            stage: err.stage(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnfixedProbe {
    #[serde(flatten)]
    pub probe: Probe,
    pub reason: String,
    pub stage: String,
}

/// Machine-readable result of a remediation pass.
#[derive(Debug, Serialize)]
pub struct FixReport {
    pub generated_at: DateTime<Utc>,
    pub fixed: Vec<Probe>,
    pub unfixed: Vec<UnfixedProbe>,
    /// Failed probes with no automatic remediation, excluded before the pass.
    pub unfixable: Vec<Probe>,
}

impl FixReport {
    /// `failures` must be in the order the failure hook saw them, which is
    /// the order of `outcome.unfixed`.
    pub fn new(outcome: FixOutcome, failures: Vec<ProbeFailure>, unfixable: Vec<Probe>) -> Self {
        let mut failures = failures.into_iter();
        let unfixed = outcome
            .unfixed
            .into_iter()
            .map(|probe| {
                let (reason, stage) = match failures.next() {
                    Some(f) => (f.reason, f.stage.to_string()),
                    None => ("unknown".to_string(), "unknown".to_string()),
                };
                UnfixedProbe { probe, reason, stage }
            })
            .collect();
        Self {
            generated_at: Utc::now(),
            fixed: outcome.fixed,
            unfixed,
            unfixable,
        }
    }

    pub fn all_fixed(&self) -> bool {
        self.unfixed.is_empty() && self.unfixable.is_empty()
    }
}

/// Classifier output, for `--json`.
#[derive(Debug, Serialize)]
pub struct Classification<'a> {
    pub fixable: &'a [Probe],
    pub unfixable: &'a [Probe],
}

/// Short human description of what a probe asks for.
pub fn describe(probe: &Probe) -> String {
    match checker::decode(probe) {
        Ok(Remediation::KernelModule(data)) => format!("module {}", data.module.name),
        Ok(Remediation::Sysctl(data)) => {
            format!("{}={}", data.parameter_name, data.parameter_value)
        }
        Err(_) if !probe.detail.is_empty() => probe.detail.clone(),
        Err(_) => probe.error.clone(),
    }
}

/// Print the classifier's view of a batch.
pub fn print_classification(unfixable: &[Probe], fixable: &[Probe]) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();

    println!();
    for probe in fixable {
        println!("  {} {}: {}", green.apply_to("FIXABLE"), probe.checker, describe(probe));
    }
    for probe in unfixable {
        println!("  {} {}: {}", red.apply_to("MANUAL "), probe.checker, describe(probe));
    }
    println!();
    println!(
        "{} fixable, {} require manual intervention",
        fixable.len(),
        unfixable.len()
    );
}

/// Print a human-readable summary of a remediation pass.
pub fn print_summary(report: &FixReport) {
    let green = Style::new().green().bold();
    let red = Style::new().red().bold();

    println!();
    for probe in &report.fixed {
        println!("  {} {}: {}", green.apply_to("FIXED"), probe.checker, describe(probe));
    }
    for entry in &report.unfixed {
        println!(
            "  {} {}: {}",
            red.apply_to("FAIL "),
            entry.probe.checker,
            describe(&entry.probe)
        );
        println!("       reason: {}", entry.reason);
    }
    for probe in &report.unfixable {
        println!("  {} {}: {}", red.apply_to("FAIL "), probe.checker, describe(probe));
        println!("       hint: no automatic fix, requires manual intervention");
    }
    println!();
    println!(
        "Fixed {}, unfixed {}, manual {}",
        report.fixed.len(),
        report.unfixed.len(),
        report.unfixable.len()
    );
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing JSON: {e}"),
    }
}

/// Write the report as JSON to `path`.
pub fn write_report(report: &FixReport, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("Failed to serialize fix report")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write fix report: {}", path.display()))?;
    Ok(())
}
