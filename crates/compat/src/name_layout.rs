//! Patient name layout lookup.

use formentry_host::Patient;

/// How patient names are laid out in rendered markup.
///
/// The older platform has a fixed short layout; the newer one exposes a
/// configurable name template. Either way the core only needs a formatted
/// display name.
pub trait NameLayoutCompat: Send + Sync {
    /// The layout template in `{given}`/`{family}` placeholder form.
    fn layout_template(&self) -> &'static str;

    /// Formats a patient's name per the active layout.
    fn format_name(&self, patient: &Patient) -> String {
        self.layout_template()
            .replace("{given}", &patient.given_name)
            .replace("{family}", &patient.family_name)
    }
}
