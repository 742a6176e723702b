use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Checker that verifies a required kernel module is loaded.
pub const KERNEL_MODULE_CHECKER_ID: &str = "kernel-module";
/// Checker that verifies IPv4 forwarding is enabled.
pub const IP_FORWARD_CHECKER_ID: &str = "ip-forward";
/// Checker that verifies bridge netfilter parameters.
pub const NETFILTER_CHECKER_ID: &str = "netfilter";
/// Checker that verifies mount-related sysctl parameters.
pub const MOUNTS_CHECKER_ID: &str = "mounts";

/// Checkers whose failures have a known automatic remediation.
pub const FIXABLE_CHECKERS: &[&str] = &[
    KERNEL_MODULE_CHECKER_ID,
    IP_FORWARD_CHECKER_ID,
    NETFILTER_CHECKER_ID,
    MOUNTS_CHECKER_ID,
];

/// Result state reported by the monitoring agent for a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Running,
    Failed,
    Terminated,
}

/// Opaque per-checker payload. The schema depends on the probe's checker.
///
/// On the wire the payload is accepted either as a string holding the encoded
/// document or as an inline JSON value; both end up as the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckerData(Vec<u8>);

impl CheckerData {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for CheckerData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Only documents are inlined; scalars would read back as different bytes.
        match serde_json::from_slice::<serde_json::Value>(&self.0) {
            Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
                value.serialize(serializer)
            }
            _ => String::from_utf8_lossy(&self.0).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CheckerData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::String(raw) => Ok(Self(raw.into_bytes())),
            other => serde_json::to_vec(&other).map(Self).map_err(D::Error::custom),
        }
    }
}

/// A single health-check result produced by the monitoring agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    pub checker: String,
    pub status: ProbeStatus,
    #[serde(default, skip_serializing_if = "CheckerData::is_empty")]
    pub checker_data: CheckerData,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl Probe {
    /// Build a failed probe for `checker` carrying the given encoded payload.
    pub fn failed(checker: &str, checker_data: impl Into<Vec<u8>>) -> Self {
        Self {
            checker: checker.to_string(),
            status: ProbeStatus::Failed,
            checker_data: CheckerData::new(checker_data),
            detail: String::new(),
            error: String::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == ProbeStatus::Failed
    }

    pub fn is_kernel_module(&self) -> bool {
        self.checker == KERNEL_MODULE_CHECKER_ID
    }
}

/// Outcome of a single preflight tool check.
#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
    pub fix_hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_accepts_inline_checker_data() {
        let json = r#"{"checker":"kernel-module","status":"failed","checker_data":{"module":{"name":"br_netfilter"}}}"#;
        let probe: Probe = serde_json::from_str(json).unwrap();
        assert!(probe.is_failed());
        assert!(probe.is_kernel_module());
        let data: serde_json::Value = serde_json::from_slice(probe.checker_data.as_bytes()).unwrap();
        assert_eq!(data["module"]["name"], "br_netfilter");
    }

    #[test]
    fn test_probe_accepts_encoded_checker_data() {
        let json = r#"{"checker":"ip-forward","status":"failed","checker_data":"{\"parameter_name\":\"net.ipv4.ip_forward\"}"}"#;
        let probe: Probe = serde_json::from_str(json).unwrap();
        assert_eq!(
            probe.checker_data.as_bytes(),
            br#"{"parameter_name":"net.ipv4.ip_forward"}"#
        );
    }

    #[test]
    fn test_probe_without_checker_data() {
        let probe: Probe = serde_json::from_str(r#"{"checker":"disk-space","status":"running"}"#).unwrap();
        assert_eq!(probe.status, ProbeStatus::Running);
        assert!(probe.checker_data.is_empty());
        assert!(!probe.is_failed());
    }

    #[test]
    fn test_scalar_payload_survives_reload() {
        for raw in [r#""abc""#, "42", "not json"] {
            let probe = Probe::failed("disk-space", raw);
            let json = serde_json::to_string(&probe).unwrap();
            let reloaded: Probe = serde_json::from_str(&json).unwrap();
            assert_eq!(reloaded.checker_data.as_bytes(), raw.as_bytes(), "{json}");
        }
    }

    #[test]
    fn test_probe_serializes_payload_inline() {
        let probe = Probe::failed(MOUNTS_CHECKER_ID, r#"{"parameter_name":"fs.may_detach_mounts","parameter_value":"1"}"#);
        let value = serde_json::to_value(&probe).unwrap();
        assert_eq!(value["checker_data"]["parameter_value"], "1");
        assert!(value.get("detail").is_none());
    }

    #[test]
    fn test_unknown_status_rejected() {
        let result = serde_json::from_str::<Probe>(r#"{"checker":"mounts","status":"exploded"}"#);
        assert!(result.is_err());
    }
}
