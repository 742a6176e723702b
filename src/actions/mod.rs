//! Host mutations used to remediate failed probes.

mod host;
mod persist;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::progress::Progress;

pub use host::HostActions;

/// The two corrective primitives the dispatcher can invoke.
///
/// Both may block on external processes and should abort when `cancel` fires.
/// Implementations are expected to be safe to repeat.
#[async_trait]
pub trait RemediationActions: Send + Sync {
    /// Load `name`, falling back to each of `alternates` in order.
    async fn enable_kernel_module(
        &self,
        name: &str,
        alternates: &[String],
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;

    /// Set the sysctl parameter `name` to `value`.
    async fn set_sysctl_parameter(
        &self,
        name: &str,
        value: &str,
        progress: &dyn Progress,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()>;
}
