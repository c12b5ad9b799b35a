//! Drug-order field semantics across the order-entry rewrite.

use crate::CompatError;
use chrono::NaiveDate;
use formentry_host::{DrugOrder, HostServices};

/// How to populate the version-dependent fields of a [`DrugOrder`].
///
/// The pre-rewrite platform stores free-text frequency/units and a raw start
/// date; the rewrite models them as coded entities and derives the start
/// date from the encounter. Core code calls these methods and never touches
/// the underlying fields directly.
pub trait DrugOrderCompat: Send + Sync {
    /// Sets the order's start date.
    ///
    /// `encounter_date` is the date of the encounter the order belongs to;
    /// whether it is required, and whether `start` is validated against it,
    /// is version-specific.
    fn set_start_date(
        &self,
        order: &mut DrugOrder,
        encounter_date: Option<NaiveDate>,
        start: NaiveDate,
    ) -> Result<(), CompatError>;

    /// Reads back the order's effective start date.
    fn start_date(&self, order: &DrugOrder) -> Option<NaiveDate>;

    /// Records the dosing frequency from its form-attribute spelling.
    fn set_frequency(&self, order: &mut DrugOrder, frequency: &str, services: &HostServices);

    /// Records the dose units from their form-attribute spelling.
    fn set_dose_units(&self, order: &mut DrugOrder, units: &str, services: &HostServices);

    /// Applies the version's default route, where the version has one.
    fn set_route(&self, order: &mut DrugOrder, services: &HostServices);

    /// Discontinues the order as of the given date.
    fn discontinue(
        &self,
        order: &mut DrugOrder,
        date: NaiveDate,
        reason: Option<&str>,
        services: &HostServices,
    ) -> Result<(), CompatError>;
}
