pub mod generate;
pub mod status;
pub mod validate;

use std::path::Path;

use anyhow::Context;
use vidgen_common::error::VidgenError;
use vidgen_project_model::VideoDocument;

/// Load and validate a document, keeping the error's exit status.
pub fn load_document(path: &Path) -> anyhow::Result<VideoDocument> {
    VideoDocument::load(path)
        .map_err(VidgenError::from)
        .with_context(|| format!("Failed to load document {}", path.display()))
}
