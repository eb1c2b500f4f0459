//! Validate a video document without writing anything.

use std::path::Path;

use vidgen_project_model::validation::execution_order;
use vidgen_project_model::VideoKind;

pub fn run(document: &Path) -> anyhow::Result<()> {
    println!("Validating document: {}", document.display());

    let doc = super::load_document(document)?;

    println!("  Shared variables: {}", doc.shared_variables.len());
    println!("  Shared options: {}", doc.shared_options.len());
    println!("  Option templates: {}", doc.option_templates.len());
    println!("  Videos: {}", doc.videos.len());
    for video in &doc.videos {
        match &video.kind {
            VideoKind::Leaf { options } => {
                println!("    {} ({} options)", video.title, options.len());
            }
            VideoKind::Composite { parts, .. } => {
                println!("    {} = {}", video.title, parts.join(" + "));
            }
        }
    }

    let order: Vec<_> = execution_order(&doc)
        .map_err(vidgen_common::error::VidgenError::from)?
        .into_iter()
        .map(|v| v.title.as_str())
        .collect();
    println!("  Execution order: {}", order.join(", "));
    println!("\nDocument is valid.");

    Ok(())
}
