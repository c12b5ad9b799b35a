//! Enumerating which regimen drug components a patient's orders satisfy.

use formentry_host::DrugOrder;

/// Which of the given drug references (regimen component drug ids, as
/// written in regimen definitions) are currently in use by the orders.
///
/// "In use" depends on the version's order model: the pre-rewrite platform
/// keys activity off the raw start/discontinued fields, the rewrite off
/// activation and scheduling. The contract is the same either way: a drug
/// reference is returned when a non-voided, non-discontinued order matches
/// it by id or UUID.
pub trait RegimenDependencyCompat: Send + Sync {
    fn drugs_in_use(&self, orders: &[DrugOrder], drug_refs: &[String]) -> Vec<String>;
}

pub(crate) fn reference_matches(order: &DrugOrder, drug_ref: &str) -> bool {
    order.drug_id.to_string() == drug_ref || order.drug_uuid.to_string() == drug_ref
}
