use crate::types::Probe;

/// Reorder probes so kernel-module probes are remediated first.
///
/// Some sysctl parameters only exist once their module is loaded. Relative
/// order within each group follows the input.
pub fn order_for_remediation(probes: Vec<Probe>) -> Vec<Probe> {
    let (mut ordered, rest): (Vec<Probe>, Vec<Probe>) =
        probes.into_iter().partition(Probe::is_kernel_module);
    ordered.extend(rest);
    ordered
}
