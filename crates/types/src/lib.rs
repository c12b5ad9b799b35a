//! Shared value types for the formentry workspace.
//!
//! These are small validated types used across the crate boundary: the form
//! entry mode, template-assigned control ids, references to host entities,
//! and the platform version/range machinery the compatibility layer matches
//! against. Domain meaning lives in `formentry-host` and `formentry-core`;
//! this crate holds only the vocabulary they share.

pub mod control_id;
pub mod entity_ref;
pub mod mode;
pub mod version;

pub use control_id::{ControlId, ControlIdError};
pub use entity_ref::{EntityRef, EntityRefError};
pub use mode::Mode;
pub use version::{PlatformVersion, VersionError, VersionRange};
