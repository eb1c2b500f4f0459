//! Generate scripts for a document and run them.

use std::path::PathBuf;

use dialoguer::Confirm;
use vidgen_common::config::AppConfig;
use vidgen_common::error::VidgenError;
use vidgen_render_engine::ExportJob;

pub struct GenerateOptions {
    pub document: PathBuf,
    pub export_dir: PathBuf,
    pub force: bool,
    pub assume_yes: bool,
    /// Run the orchestration script after writing it.
    pub execute: bool,
    pub config: AppConfig,
}

pub async fn run(opts: GenerateOptions) -> anyhow::Result<()> {
    let doc = super::load_document(&opts.document)?;

    let job = ExportJob {
        export_dir: opts.export_dir,
        tools: opts.config.tools,
        scripts: opts.config.scripts,
        force: opts.force,
    };
    // Validation happens here, before anything touches the export directory.
    let scripts = job.render_scripts(&doc)?;

    let existing = job.existing_outputs(&doc).len();
    if needs_confirmation(opts.force, opts.assume_yes, existing) && !confirm_overwrite() {
        eprintln!("Nothing written.");
        return Err(VidgenError::Declined.into());
    }

    if !opts.execute {
        let written = job.write_scripts(&scripts)?;
        for path in &written {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let report = job.execute(&doc, &scripts).await?;
    for video in &report.videos {
        match video.seconds {
            Some(seconds) => println!("{} {seconds}", video.title),
            None => println!("{} ?", video.title),
        }
    }
    println!("total {}", report.total_secs);

    Ok(())
}

/// Force mode asks before overwriting, but only when there is something to overwrite.
fn needs_confirmation(force: bool, assume_yes: bool, existing_outputs: usize) -> bool {
    force && !assume_yes && existing_outputs > 0
}

fn confirm_overwrite() -> bool {
    eprintln!("Going to overwrite all existing files.");
    match Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact()
    {
        Ok(proceed) => proceed,
        Err(err) => {
            tracing::warn!(error = %err, "Cannot ask for confirmation, use --yes to skip it");
            false
        }
    }
}
