mod actions;
mod autofix;
mod check;
mod checker;
mod classify;
mod cli;
mod config;
mod error;
mod exec;
mod logging;
mod order;
mod probes;
mod progress;
mod report;
mod types;

use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use cli::{Cli, Commands};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::actions::HostActions;
use crate::autofix::FixContext;
use crate::error::RemediationError;
use crate::progress::{ConsoleProgress, NullProgress, Progress, SpinnerProgress};
use crate::report::{FixReport, ProbeFailure};
use crate::types::Probe;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut cfg = match config::resolve_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e:#}");
            std::process::exit(2);
        }
    };

    match cli.command {
        Commands::Check => match check::run_check(&cfg) {
            Ok(true) => std::process::exit(0),
            Ok(false) => std::process::exit(1),
            Err(e) => {
                eprintln!("Error: {e:#}");
                std::process::exit(2);
            }
        },
        Commands::Classify { probes, json } => {
            std::process::exit(run_classify(&probes, json));
        }
        Commands::Fix {
            probes,
            json,
            report,
            all,
            timeout_secs,
            persist,
        } => {
            if let Some(secs) = timeout_secs {
                cfg.actions.timeout_secs = secs;
            }
            if persist {
                cfg.persist.enabled = true;
            }
            let opts = FixOptions {
                json,
                all,
                quiet: cli.quiet,
                report: report.as_deref(),
            };
            std::process::exit(run_fix(&probes, cfg, opts).await);
        }
    }
}

/// Print the classification of a probe batch. Returns exit code: 0=ok, 2=error.
fn run_classify(path: &Path, json: bool) -> i32 {
    let batch = match probes::load_probes(path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return 2;
        }
    };
    let (unfixable, fixable) = classify::get_fixable(&batch);
    if json {
        report::print_json(&report::Classification {
            fixable: &fixable,
            unfixable: &unfixable,
        });
    } else {
        report::print_classification(&unfixable, &fixable);
    }
    0
}

struct FixOptions<'a> {
    json: bool,
    all: bool,
    quiet: bool,
    report: Option<&'a Path>,
}

/// Remediate a probe batch on this host.
/// Returns exit code: 0=everything fixed, 1=something left unfixed, 2=error.
async fn run_fix(path: &Path, cfg: config::Config, opts: FixOptions<'_>) -> i32 {
    let batch = match probes::load_probes(path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return 2;
        }
    };

    // Without --all the classifier runs first and only fixable probes are attempted.
    let (unfixable, to_fix) = if opts.all {
        (Vec::new(), batch)
    } else {
        classify::get_fixable(&batch)
    };

    let failed = to_fix.iter().filter(|p| p.is_failed()).count();
    info!(probes = to_fix.len(), failed, "starting remediation pass");

    let actions = HostActions::new(cfg.actions, cfg.persist);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cancelling remaining remediations...");
            signal_token.cancel();
        }
    });

    // Spinners are hidden on non-terminals, which would swallow status lines.
    let interactive = console::Term::stderr().is_term();
    let spinner = (interactive && !opts.quiet && !opts.json && failed > 0).then(|| {
        SpinnerProgress::new(progress::stage_spinner(&format!(
            "Remediating {failed} failed probe(s)"
        )))
    });
    let sink: &dyn Progress = match &spinner {
        Some(s) => s,
        None if opts.quiet => &NullProgress,
        None => &ConsoleProgress,
    };

    let failures: Mutex<Vec<ProbeFailure>> = Mutex::new(Vec::new());
    let record_failure = |_probe: &Probe, err: &RemediationError| {
        if let Ok(mut f) = failures.lock() {
            f.push(ProbeFailure::from(err));
        }
    };

    let outcome = {
        let ctx = FixContext::new(&actions, sink)
            .with_cancel(cancel)
            .with_failure_hook(&record_failure);
        autofix::fix(to_fix, &ctx).await
    };

    if let Some(s) = &spinner {
        progress::finish_spinner(s.bar(), outcome.unfixed.is_empty());
    }

    let failures = failures.into_inner().unwrap_or_else(|e| e.into_inner());
    let fix_report = FixReport::new(outcome, failures, unfixable);

    if let Some(report_path) = opts.report {
        if let Err(e) = report::write_report(&fix_report, report_path) {
            eprintln!("Error: {e:#}");
            return 2;
        }
    }

    if opts.json {
        report::print_json(&fix_report);
    } else {
        report::print_summary(&fix_report);
    }

    if fix_report.all_fixed() { 0 } else { 1 }
}
