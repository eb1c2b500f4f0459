//! Report the cache state of every video without rendering anything.

use std::path::Path;

use vidgen_common::config::AppConfig;
use vidgen_processing_core::{ConfigurationBuilder, FingerprintPolicy};
use vidgen_render_engine::{inspect, ExifTool, ScriptEmitter};

pub fn run(document: &Path, export_dir: &Path, config: &AppConfig) -> anyhow::Result<()> {
    let doc = super::load_document(document)?;
    let builder = ConfigurationBuilder::new(&doc, &config.scripts, &config.tools)?;
    let videos = builder.resolve_all()?;

    let statuses = inspect(
        &doc,
        &videos,
        &ScriptEmitter::new(config.tools.clone(), false),
        &FingerprintPolicy::default(),
        &ExifTool::new(config.tools.metadata.clone()),
        export_dir,
    )?;

    let width = statuses.iter().map(|s| s.title.len()).max().unwrap_or(0);
    for status in &statuses {
        println!("{:<width$}  {:<8}  {}", status.title, status.state, status.fingerprint);
    }

    let pending = statuses.iter().filter(|s| s.state != "current").count();
    tracing::info!(videos = statuses.len(), pending, "Inspected export directory");
    Ok(())
}
