//! The host-platform compatibility layer.
//!
//! The plugin supports several incompatible revisions of the host platform's
//! domain API. Each point of divergence is expressed as a narrow capability
//! trait with exactly one active implementation, selected once at startup by
//! matching the running [`PlatformVersion`] against each adapter's declared
//! [`VersionRange`]. Selection is static for the process lifetime.
//!
//! Adapters are intentionally NOT behaviourally unified where the host
//! versions themselves diverge: the pre-rewrite drug-order adapter stores a
//! raw start date, while the order-entry-rewrite adapter validates it
//! against the encounter date. Core code must treat the trait contract as
//! the interface and accept the per-version behaviour behind it.

pub mod drug_order;
pub mod encounter_search;
pub mod exit_from_care;
pub mod name_layout;
pub mod regimen_deps;
pub mod v1_10;
pub mod v1_9;
pub mod v2_0;

pub use drug_order::DrugOrderCompat;
pub use encounter_search::{EncounterCriteria, EncounterSearchCompat};
pub use exit_from_care::ExitFromCareCompat;
pub use name_layout::NameLayoutCompat;
pub use regimen_deps::RegimenDependencyCompat;

use chrono::NaiveDate;
use formentry_host::HostError;
use formentry_types::{PlatformVersion, VersionError, VersionRange};
use std::sync::Arc;

/// Errors raised by adapter selection or by adapter calls.
#[derive(Debug, thiserror::Error)]
pub enum CompatError {
    #[error("no {capability} adapter matches host platform version {version}")]
    NoMatchingAdapter {
        capability: &'static str,
        version: PlatformVersion,
    },
    #[error("invalid version range declared for {capability}")]
    InvalidRange {
        capability: &'static str,
        #[source]
        source: VersionError,
    },
    #[error("drug order must be attached to an encounter before its start date is set")]
    EncounterRequired,
    #[error("drug order start date {start} precedes the encounter date {encounter}")]
    StartDatePrecedesEncounter {
        start: NaiveDate,
        encounter: NaiveDate,
    },
    #[error("an exit reason is required on this platform version")]
    ExitReasonRequired,
    #[error("{0} is not supported on this platform version")]
    Unsupported(&'static str),
    #[error("patient {0} does not exist")]
    UnknownPatient(i64),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// One profile entry: a declared range and a constructor for the adapter.
struct Profile<T: ?Sized> {
    range: &'static str,
    build: fn() -> Arc<T>,
}

fn select<T: ?Sized>(
    capability: &'static str,
    version: PlatformVersion,
    profiles: &[Profile<T>],
) -> Result<Arc<T>, CompatError> {
    for profile in profiles {
        let range = VersionRange::parse(profile.range)
            .map_err(|source| CompatError::InvalidRange { capability, source })?;
        if range.matches(version) {
            tracing::info!(
                capability,
                range = profile.range,
                %version,
                "selected compatibility adapter"
            );
            return Ok((profile.build)());
        }
    }
    Err(CompatError::NoMatchingAdapter {
        capability,
        version,
    })
}

/// The resolved adapter for every capability, one per process.
#[derive(Clone)]
pub struct Capabilities {
    pub drug_order: Arc<dyn DrugOrderCompat>,
    pub encounter_search: Arc<dyn EncounterSearchCompat>,
    pub exit_from_care: Arc<dyn ExitFromCareCompat>,
    pub name_layout: Arc<dyn NameLayoutCompat>,
    pub regimen_deps: Arc<dyn RegimenDependencyCompat>,
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

impl Capabilities {
    /// Resolves every capability against the running host version.
    ///
    /// Fails fast: a single unmatched capability makes the whole module
    /// unusable, so this is called once at module startup and the error is
    /// fatal.
    pub fn resolve(version: PlatformVersion) -> Result<Self, CompatError> {
        let drug_order = select::<dyn DrugOrderCompat>(
            "drug-order",
            version,
            &[
                Profile {
                    range: "1.9.9 - 1.9.*",
                    build: || Arc::new(v1_9::DrugOrderAdapter),
                },
                Profile {
                    range: "1.10.0 - 2.*",
                    build: || Arc::new(v1_10::DrugOrderAdapter),
                },
            ],
        )?;
        let encounter_search = select::<dyn EncounterSearchCompat>(
            "encounter-search",
            version,
            &[
                Profile {
                    range: "1.9.9 - 1.12.*",
                    build: || Arc::new(v1_9::EncounterSearchAdapter),
                },
                Profile {
                    range: "2.*",
                    build: || Arc::new(v2_0::EncounterSearchAdapter),
                },
            ],
        )?;
        let exit_from_care = select::<dyn ExitFromCareCompat>(
            "exit-from-care",
            version,
            &[
                Profile {
                    range: "1.9.9 - 1.12.*",
                    build: || Arc::new(v1_9::ExitFromCareAdapter),
                },
                Profile {
                    range: "2.*",
                    build: || Arc::new(v2_0::ExitFromCareAdapter),
                },
            ],
        )?;
        let name_layout = select::<dyn NameLayoutCompat>(
            "name-layout",
            version,
            &[
                Profile {
                    range: "1.9.9 - 1.12.*",
                    build: || Arc::new(v1_9::NameLayoutAdapter),
                },
                Profile {
                    range: "2.*",
                    build: || Arc::new(v2_0::NameLayoutAdapter),
                },
            ],
        )?;
        let regimen_deps = select::<dyn RegimenDependencyCompat>(
            "regimen-dependencies",
            version,
            &[
                Profile {
                    range: "1.9.9 - 1.9.*",
                    build: || Arc::new(v1_9::RegimenDependencyAdapter),
                },
                Profile {
                    range: "1.10.0 - 2.*",
                    build: || Arc::new(v1_10::RegimenDependencyAdapter),
                },
            ],
        )?;
        Ok(Self {
            drug_order,
            encounter_search,
            exit_from_care,
            name_layout,
            regimen_deps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(s: &str) -> PlatformVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_resolution_succeeds_for_supported_versions() {
        assert!(Capabilities::resolve(version("1.9.9")).is_ok());
        assert!(Capabilities::resolve(version("1.10.2")).is_ok());
        assert!(Capabilities::resolve(version("1.12.5")).is_ok());
        assert!(Capabilities::resolve(version("2.3.0")).is_ok());
    }

    #[test]
    fn test_resolution_fails_below_minimum_version() {
        let err = Capabilities::resolve(version("1.9.8")).unwrap_err();
        assert!(matches!(err, CompatError::NoMatchingAdapter { .. }));
    }

    #[test]
    fn test_resolution_fails_above_supported_versions() {
        let err = Capabilities::resolve(version("3.0.0")).unwrap_err();
        assert!(matches!(err, CompatError::NoMatchingAdapter { .. }));
    }

    #[test]
    fn test_declaration_order_decides_overlapping_profiles() {
        // 1.12.5 is inside "1.9.9 - 1.12.*" for encounter search but inside
        // "1.10.0 - 2.*" for drug orders: each capability resolves its own
        // profile table independently.
        let caps = Capabilities::resolve(version("1.12.5")).unwrap();
        assert_eq!(caps.name_layout.layout_template(), "{given} {family}");
    }
}
