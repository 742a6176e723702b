//! Decoding of per-checker payloads into typed remediation parameters.

use serde::{Deserialize, Serialize};

use crate::error::RemediationError;
use crate::types::{
    IP_FORWARD_CHECKER_ID, KERNEL_MODULE_CHECKER_ID, MOUNTS_CHECKER_ID, NETFILTER_CHECKER_ID,
    Probe,
};

/// Kernel module named by a failed kernel-module probe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRequirement {
    /// Primary module to load.
    #[serde(default)]
    pub name: String,
    /// Acceptable alternatives, tried in order when the primary does not load.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

/// Payload of the kernel-module checker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelModuleData {
    #[serde(default)]
    pub module: ModuleRequirement,
}

/// Payload shared by the ip-forward, netfilter and mounts checkers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysctlData {
    #[serde(default)]
    pub parameter_name: String,
    #[serde(default)]
    pub parameter_value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason_code: String,
}

/// A decoded, validated remediation for one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remediation {
    KernelModule(KernelModuleData),
    Sysctl(SysctlData),
}

/// Which payload schema a checker uses, if it is remediable at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerKind {
    KernelModule,
    Sysctl,
}

impl CheckerKind {
    pub fn from_checker(checker: &str) -> Option<Self> {
        match checker {
            KERNEL_MODULE_CHECKER_ID => Some(CheckerKind::KernelModule),
            IP_FORWARD_CHECKER_ID | NETFILTER_CHECKER_ID | MOUNTS_CHECKER_ID => {
                Some(CheckerKind::Sysctl)
            }
            _ => None,
        }
    }
}

/// Decode and validate the payload of `probe` according to its checker.
pub fn decode(probe: &Probe) -> Result<Remediation, RemediationError> {
    let kind = CheckerKind::from_checker(&probe.checker).ok_or_else(|| {
        RemediationError::NotImplemented {
            checker: probe.checker.clone(),
        }
    })?;
    let malformed = |source: serde_json::Error| RemediationError::MalformedInput {
        checker: probe.checker.clone(),
        source,
    };

    match kind {
        CheckerKind::KernelModule => {
            let data: KernelModuleData =
                serde_json::from_slice(probe.checker_data.as_bytes()).map_err(malformed)?;
            if data.module.name.is_empty() {
                return Err(RemediationError::BadParameter(format!(
                    "empty probe data: {data:?}"
                )));
            }
            Ok(Remediation::KernelModule(data))
        }
        CheckerKind::Sysctl => {
            let data: SysctlData =
                serde_json::from_slice(probe.checker_data.as_bytes()).map_err(malformed)?;
            if data.parameter_name.is_empty() || data.parameter_value.is_empty() {
                return Err(RemediationError::BadParameter(format!(
                    "empty probe data: {data:?}"
                )));
            }
            Ok(Remediation::Sysctl(data))
        }
    }
}
