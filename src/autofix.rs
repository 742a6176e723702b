//! Dispatch of individual probe remediations and the batch driver around it.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::actions::RemediationActions;
use crate::checker::{self, Remediation};
use crate::error::RemediationError;
use crate::order::order_for_remediation;
use crate::progress::Progress;
use crate::types::Probe;

/// Callback invoked with every probe that could not be fixed.
pub type FailureHook<'a> = &'a (dyn Fn(&Probe, &RemediationError) + Send + Sync);

/// Collaborators shared by every probe in a batch.
pub struct FixContext<'a> {
    pub actions: &'a dyn RemediationActions,
    pub progress: &'a dyn Progress,
    pub cancel: CancellationToken,
    pub on_failure: Option<FailureHook<'a>>,
}

impl<'a> FixContext<'a> {
    pub fn new(actions: &'a dyn RemediationActions, progress: &'a dyn Progress) -> Self {
        Self {
            actions,
            progress,
            cancel: CancellationToken::new(),
            on_failure: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_failure_hook(mut self, hook: FailureHook<'a>) -> Self {
        self.on_failure = Some(hook);
        self
    }
}

/// Probes partitioned by whether their remediation succeeded.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub fixed: Vec<Probe>,
    pub unfixed: Vec<Probe>,
}

/// Attempt to fix every failed probe in `probes`.
///
/// Kernel-module probes go first. Probes that are not failed are skipped and
/// appear in neither list. A failure only affects its own probe.
pub async fn fix(probes: Vec<Probe>, ctx: &FixContext<'_>) -> FixOutcome {
    let mut outcome = FixOutcome::default();
    for probe in order_for_remediation(probes) {
        if !probe.is_failed() {
            debug!(checker = %probe.checker, status = ?probe.status, "skipping probe that did not fail");
            continue;
        }
        match fix_probe(&probe, ctx).await {
            Ok(()) => outcome.fixed.push(probe),
            Err(err) => {
                debug!(
                    checker = %probe.checker,
                    stage = %err.stage(),
                    error = %err.chain_message(),
                    probe = ?probe,
                    "failed to auto-fix probe"
                );
                if let Some(hook) = ctx.on_failure {
                    hook(&probe, &err);
                }
                outcome.unfixed.push(probe);
            }
        }
    }
    outcome
}

/// Attempt to fix a single failed probe.
pub async fn fix_probe(probe: &Probe, ctx: &FixContext<'_>) -> Result<(), RemediationError> {
    if ctx.cancel.is_cancelled() {
        return Err(RemediationError::Cancelled {
            checker: probe.checker.clone(),
        });
    }

    let result = match checker::decode(probe)? {
        Remediation::KernelModule(data) => {
            ctx.actions
                .enable_kernel_module(&data.module.name, &data.module.names, ctx.progress, &ctx.cancel)
                .await
        }
        Remediation::Sysctl(data) => {
            ctx.actions
                .set_sysctl_parameter(&data.parameter_name, &data.parameter_value, ctx.progress, &ctx.cancel)
                .await
        }
    };
    result.map_err(|source| RemediationError::ActionFailed {
        checker: probe.checker.clone(),
        source,
    })
}
