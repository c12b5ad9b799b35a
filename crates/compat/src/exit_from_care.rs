//! Exiting a patient from care.

use crate::CompatError;
use chrono::NaiveDate;
use formentry_host::HostServices;

/// Marks a patient as exited from care as of the given date.
///
/// Whether an exit reason is mandatory is version-specific: the newer
/// platform rejects an exit without a coded reason, the older one records
/// the date alone.
pub trait ExitFromCareCompat: Send + Sync {
    fn exit_from_care(
        &self,
        services: &HostServices,
        patient_id: i64,
        date: NaiveDate,
        reason_concept_id: Option<i64>,
    ) -> Result<(), CompatError>;
}
