use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, bail};
use async_trait::async_trait;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{RemediationActions, persist};
use crate::config::{ActionsConfig, PersistConfig};
use crate::exec;
use crate::progress::Progress;

static MODULE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex"));
static SYSCTL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_./-]*$").expect("Invalid regex"));

/// Remediates by running `modprobe` and `sysctl` on the local host.
#[derive(Debug, Clone, Default)]
pub struct HostActions {
    actions: ActionsConfig,
    persist: PersistConfig,
}

impl HostActions {
    pub fn new(actions: ActionsConfig, persist: PersistConfig) -> Self {
        Self { actions, persist }
    }
}

#[async_trait]
impl RemediationActions for HostActions {
    async fn enable_kernel_module(
        &self,
        name: &str,
        alternates: &[String],
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let candidates: Vec<&str> = std::iter::once(name)
            .chain(alternates.iter().map(String::as_str))
            .collect();
        for candidate in &candidates {
            validate_module_name(candidate)?;
        }

        progress.print_info(&format!("Loading kernel module {name}"));
        let mut failures = Vec::new();
        for candidate in candidates {
            if cancel.is_cancelled() {
                bail!("cancelled while loading kernel module {name}");
            }
            let modprobe = &self.actions.modprobe;
            let attempt = exec::run_cmd(modprobe, &[candidate], self.actions.timeout(), cancel).await;
            match attempt {
                Ok(_) => {
                    info!(module = candidate, "kernel module loaded");
                    if candidate != name {
                        progress.print_warn(&format!("Loaded {candidate} in place of {name}"));
                    }
                    if self.persist.enabled {
                        let path = &self.persist.modules_file;
                        let recorded = persist::record_module(path, candidate);
                        report_persisted(recorded, candidate, path, progress);
                    }
                    return Ok(());
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    debug!(module = candidate, %error, "modprobe attempt failed");
                    failures.push(format!("{candidate}: {e:#}"));
                }
            }
        }
        bail!(
            "failed to load kernel module {name}: {}",
            failures.join("; ")
        )
    }

    async fn set_sysctl_parameter(
        &self,
        name: &str,
        value: &str,
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        validate_sysctl_name(name)?;
        if value.contains('\n') {
            bail!("invalid value for sysctl parameter {name}: {value:?}");
        }

        progress.print_info(&format!("Setting kernel parameter {name}={value}"));
        let assignment = format!("{name}={value}");
        exec::run_cmd(&self.actions.sysctl, &["-w", &assignment], self.actions.timeout(), cancel)
            .await
            .with_context(|| format!("failed to set kernel parameter {name}"))?;
        info!(parameter = name, value, "kernel parameter set");

        if self.persist.enabled {
            let path = &self.persist.sysctl_file;
            let recorded = persist::record_sysctl(path, name, value);
            report_persisted(recorded, name, path, progress);
        }
        Ok(())
    }
}

/// A drop-in that cannot be written leaves the live change in place, so it
/// only warns.
fn report_persisted(
    result: anyhow::Result<bool>,
    what: &str,
    path: &Path,
    progress: &dyn Progress,
) {
    match result {
        Ok(true) => progress.print_info(&format!("Persisted {what} in {}", path.display())),
        Ok(false) => {}
        Err(e) => {
            let error = format!("{e:#}");
            warn!(setting = what, path = %path.display(), %error, "failed to persist setting");
            progress.print_warn(&format!("Applied {what} but could not persist it: {e:#}"));
        }
    }
}

fn validate_module_name(name: &str) -> anyhow::Result<()> {
    if !MODULE_NAME.is_match(name) {
        bail!("invalid kernel module name {name:?}");
    }
    Ok(())
}

fn validate_sysctl_name(name: &str) -> anyhow::Result<()> {
    if !SYSCTL_NAME.is_match(name) || name.contains("..") {
        bail!("invalid sysctl parameter name {name:?}");
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::progress::testing::RecordingProgress;

    /// Writes a shell script standing in for modprobe/sysctl. It appends its
    /// arguments to `log` and fails for any argument listed in `failing`.
    fn fake_tool(dir: &Path, name: &str, log: &Path, failing: &[&str]) -> String {
        use std::os::unix::fs::PermissionsExt;

        let mut script = format!("#!/bin/sh\necho \"$@\" >> {}\n", log.display());
        for arg in failing {
            script.push_str(&format!(
                "[ \"$1\" = \"{arg}\" ] && {{ echo \"no such module\" >&2; exit 1; }}\n"
            ));
        }
        script.push_str("exit 0\n");
        let path = dir.join(name);
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn actions(modprobe: String, sysctl: String, persist: PersistConfig) -> HostActions {
        HostActions::new(
            ActionsConfig {
                modprobe,
                sysctl,
                timeout_secs: 5,
            },
            persist,
        )
    }

    #[tokio::test]
    async fn test_enable_kernel_module_falls_back_to_alternate() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let modprobe = fake_tool(dir.path(), "modprobe", &log, &["nf_conntrack_ipv4"]);
        let host = actions(modprobe, "sysctl".into(), PersistConfig::default());
        let progress = RecordingProgress::default();

        host.enable_kernel_module(
            "nf_conntrack_ipv4",
            &["nf_conntrack".to_string()],
            &progress,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls, "nf_conntrack_ipv4\nnf_conntrack\n");
        assert!(progress.lines().iter().any(|l| l.contains("in place of nf_conntrack_ipv4")));
    }

    #[tokio::test]
    async fn test_enable_kernel_module_reports_all_failures() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let modprobe = fake_tool(dir.path(), "modprobe", &log, &["a", "b"]);
        let host = actions(modprobe, "sysctl".into(), PersistConfig::default());

        let progress = RecordingProgress::default();
        let err = host
            .enable_kernel_module("a", &["b".to_string()], &progress, &CancellationToken::new())
            .await
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("failed to load kernel module a"), "{msg}");
        assert!(msg.contains("b: "), "{msg}");
    }

    #[tokio::test]
    async fn test_invalid_module_name_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let modprobe = fake_tool(dir.path(), "modprobe", &log, &[]);
        let host = actions(modprobe, "sysctl".into(), PersistConfig::default());

        let progress = RecordingProgress::default();
        let alternates = ["../evil".to_string()];
        let result = host
            .enable_kernel_module("br_netfilter", &alternates, &progress, &CancellationToken::new())
            .await;
        assert!(result.is_err());
        assert!(!log.exists());
    }

    #[tokio::test]
    async fn test_set_sysctl_parameter_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let sysctl = fake_tool(dir.path(), "sysctl", &log, &[]);
        let persist = PersistConfig {
            enabled: true,
            modules_file: dir.path().join("modules.conf"),
            sysctl_file: dir.path().join("sysctl.conf"),
        };
        let host = actions("modprobe".into(), sysctl, persist);
        let progress = RecordingProgress::default();
        let cancel = CancellationToken::new();

        host.set_sysctl_parameter("net.ipv4.ip_forward", "1", &progress, &cancel).await.unwrap();
        host.set_sysctl_parameter("net.ipv4.ip_forward", "1", &progress, &cancel).await.unwrap();

        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls, "-w net.ipv4.ip_forward=1\n-w net.ipv4.ip_forward=1\n");
        let persisted = std::fs::read_to_string(dir.path().join("sysctl.conf")).unwrap();
        assert_eq!(persisted.matches("net.ipv4.ip_forward = 1").count(), 1);
        let persisted_lines = progress
            .lines()
            .iter()
            .filter(|l| l.starts_with("Persisted"))
            .count();
        assert_eq!(persisted_lines, 1);
    }

    #[tokio::test]
    async fn test_set_sysctl_parameter_failure_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let sysctl = fake_tool(dir.path(), "sysctl", &log, &["-w"]);
        let host = actions("modprobe".into(), sysctl, PersistConfig::default());

        let name = "net.bridge.bridge-nf-call-iptables";
        let progress = RecordingProgress::default();
        let err = host
            .set_sysctl_parameter(name, "1", &progress, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains(&format!("failed to set kernel parameter {name}")));
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_loaded_module() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let modprobe = fake_tool(dir.path(), "modprobe", &log, &[]);
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let persist = PersistConfig {
            enabled: true,
            modules_file: blocker.join("modules.conf"),
            sysctl_file: blocker.join("sysctl.conf"),
        };
        let host = actions(modprobe, "sysctl".into(), persist);
        let progress = RecordingProgress::default();

        host.enable_kernel_module("overlay", &[], &progress, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&log).unwrap(), "overlay\n");
        assert!(progress.lines().iter().any(|l| l.contains("could not persist")));
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_sysctl_value() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let sysctl = fake_tool(dir.path(), "sysctl", &log, &[]);
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let persist = PersistConfig {
            enabled: true,
            modules_file: blocker.join("modules.conf"),
            sysctl_file: blocker.join("sysctl.conf"),
        };
        let host = actions("modprobe".into(), sysctl, persist);
        let progress = RecordingProgress::default();

        host.set_sysctl_parameter("net.ipv4.ip_forward", "1", &progress, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&log).unwrap(), "-w net.ipv4.ip_forward=1\n");
        assert!(progress.lines().iter().any(|l| l.contains("could not persist")));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_every_module_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let modprobe = fake_tool(dir.path(), "modprobe", &log, &[]);
        let host = actions(modprobe, "sysctl".into(), PersistConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let alternates = ["nf_conntrack".to_string()];
        let progress = RecordingProgress::default();
        let err = host
            .enable_kernel_module("nf_conntrack_ipv4", &alternates, &progress, &cancel)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("cancelled"));
        assert!(!log.exists());
    }

    #[test]
    fn test_validate_names() {
        assert!(validate_module_name("br_netfilter").is_ok());
        assert!(validate_module_name("ip6_tables").is_ok());
        assert!(validate_module_name("").is_err());
        assert!(validate_module_name("foo bar").is_err());

        assert!(validate_sysctl_name("net.ipv4.ip_forward").is_ok());
        assert!(validate_sysctl_name("net/ipv4/conf/eth0.100/forwarding").is_ok());
        assert!(validate_sysctl_name("net.ipv4..ip_forward").is_err());
        assert!(validate_sysctl_name("/etc/passwd").is_err());
        assert!(validate_sysctl_name("a=b").is_err());
    }
}
