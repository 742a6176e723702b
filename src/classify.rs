use crate::types::{FIXABLE_CHECKERS, Probe};

/// Split probes into failed probes with no automatic remediation and failed
/// probes that can be auto-fixed. Probes that did not fail are dropped.
pub fn get_fixable(probes: &[Probe]) -> (Vec<Probe>, Vec<Probe>) {
    let mut unfixable = Vec::new();
    let mut fixable = Vec::new();
    for probe in probes.iter().filter(|p| p.is_failed()) {
        if is_fixable_checker(&probe.checker) {
            fixable.push(probe.clone());
        } else {
            unfixable.push(probe.clone());
        }
    }
    (unfixable, fixable)
}

/// Whether `checker` belongs to the catalog of remediable checkers.
pub fn is_fixable_checker(checker: &str) -> bool {
    FIXABLE_CHECKERS.contains(&checker)
}
