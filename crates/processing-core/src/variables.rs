//! Variable merging and title placeholder substitution.
//!
//! Precedence, lowest to highest:
//! 1. Shared variables from the document root
//! 2. The video's own variables
//! 3. Derived variables (output file, fingerprint expressions)
//!
//! Values are opaque text. Derived variables always come last, in their own
//! order, since they reference each other (`output_file=$video_title.mp4`).
//! After merging, every occurrence of the title placeholder inside a value
//! is replaced with the video's title.

use vidgen_project_model::TextMap;

/// Merge variable layers, later layers overriding earlier ones.
pub fn merge_variables(shared: &TextMap, local: &TextMap, derived: &TextMap) -> TextMap {
    let mut merged = shared.clone();
    merged.extend_from(local);
    merged.retain(|name| !derived.contains_key(name));
    merged.extend_from(derived);
    merged
}

/// Replace `placeholder` with `title` in every value.
pub fn substitute_placeholder(variables: &mut TextMap, placeholder: &str, title: &str) {
    if placeholder.is_empty() {
        return;
    }
    variables.map_values(|value| value.replace(placeholder, title));
}
