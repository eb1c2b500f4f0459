//! Cache inspection without running any script.
//!
//! Reads the fingerprint stored in each existing output and compares it
//! with the fingerprint the freshly emitted scripts would compute.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Serialize;
use vidgen_common::error::{VidgenError, VidgenResult};
use vidgen_processing_core::{CacheDecision, FingerprintPolicy, OutputState, ResolvedVideo};
use vidgen_project_model::VideoDocument;

use crate::script::ScriptEmitter;

/// Reads the fingerprint stored in a rendered output.
pub trait MetadataReader {
    fn read(&self, output: &Path) -> VidgenResult<OutputState>;
}

/// Reads the Artist tag with exiftool (or a compatible binary).
///
/// Blocking: `--status` inspects outputs one by one outside any render, so
/// there is nothing to overlap with.
#[derive(Debug, Clone)]
pub struct ExifTool {
    binary: String,
}

impl ExifTool {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl MetadataReader for ExifTool {
    fn read(&self, output: &Path) -> VidgenResult<OutputState> {
        if !output.is_file() {
            return Ok(OutputState::Missing);
        }

        let result = Command::new(&self.binary)
            .args(["-s3", "-Artist"])
            .arg(output)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| {
                tracing::debug!(tool = %self.binary, error = %e, "Failed to start metadata tool");
                VidgenError::external_tool(&self.binary, None)
            })?;

        if !result.status.success() {
            return Err(VidgenError::external_tool(&self.binary, result.status.code()));
        }

        let stored = String::from_utf8_lossy(&result.stdout).trim().to_string();
        Ok(if stored.is_empty() {
            OutputState::Untagged
        } else {
            OutputState::Tagged(stored)
        })
    }
}

/// Cache state of one video.
#[derive(Debug, Clone, Serialize)]
pub struct VideoStatus {
    pub title: String,
    pub fingerprint: String,
    pub state: &'static str,
    #[serde(skip)]
    pub decision: CacheDecision,
}

/// Decide skip/regenerate for every video in `document` order.
///
/// `videos` are the resolved videos of `document`; outputs are looked up in
/// `export_dir`.
pub fn inspect(
    document: &VideoDocument,
    videos: &[ResolvedVideo],
    emitter: &ScriptEmitter,
    policy: &FingerprintPolicy,
    reader: &dyn MetadataReader,
    export_dir: &Path,
) -> VidgenResult<Vec<VideoStatus>> {
    let scripts: HashMap<String, String> = videos
        .iter()
        .map(|v| (v.title.clone(), emitter.video_script(v)))
        .collect();

    let mut statuses = Vec::with_capacity(document.videos.len());
    for video in &document.videos {
        let fingerprint = policy
            .fingerprint(document, &video.title, &scripts)
            .ok_or_else(|| {
                VidgenError::config(format!("No script emitted for video '{}'", video.title))
            })?;
        let output = reader.read(&export_dir.join(video.output_file_name()))?;
        let decision = policy.decide(&fingerprint, &output);
        tracing::debug!(video = %video.title, state = decision.label(), "Inspected output");

        statuses.push(VideoStatus {
            title: video.title.clone(),
            fingerprint: fingerprint.to_string(),
            state: decision.label(),
            decision,
        });
    }
    Ok(statuses)
}
