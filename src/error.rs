use std::fmt;

use thiserror::Error;

/// Why a single probe could not be remediated.
#[derive(Debug, Error)]
pub enum RemediationError {
    /// The checker payload could not be decoded for the probe's checker.
    #[error("malformed checker data for {checker}")]
    MalformedInput {
        checker: String,
        #[source]
        source: serde_json::Error,
    },

    /// The payload decoded but a required field is empty.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// The checker has no automatic remediation.
    #[error("probe {checker} can't be auto-fixed")]
    NotImplemented { checker: String },

    /// The remediation action itself failed.
    #[error("failed to remediate {checker}")]
    ActionFailed {
        checker: String,
        #[source]
        source: anyhow::Error,
    },

    /// Remediation was cancelled before the action started.
    #[error("remediation of {checker} cancelled")]
    Cancelled { checker: String },
}

/// Where in the pipeline a probe's remediation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The probe could not be turned into a remediation at all.
    Classify,
    /// The remediation was attempted and the action failed.
    Action,
    Cancelled,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureStage::Classify => "classify",
            FailureStage::Action => "action",
            FailureStage::Cancelled => "cancelled",
        })
    }
}

impl RemediationError {
    pub fn stage(&self) -> FailureStage {
        match self {
            RemediationError::MalformedInput { .. }
            | RemediationError::BadParameter(_)
            | RemediationError::NotImplemented { .. } => FailureStage::Classify,
            RemediationError::ActionFailed { .. } => FailureStage::Action,
            RemediationError::Cancelled { .. } => FailureStage::Cancelled,
        }
    }

    /// Full error chain on one line, e.g. for report output.
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}
