//! Fingerprint policy: when can a rendered video be reused?
//!
//! A leaf's fingerprint is the md5 of its generation script. A composite's
//! fingerprint is the md5 of the concatenated script md5s of its recipe
//! (itself followed by every part, depth-first) plus a trailing newline.
//! Changing any script in the recipe therefore invalidates the composite.
//!
//! The generated scripts compute the same values with `md5sum`, store them
//! in the output's Artist tag, and compare on the next run. The functions
//! here mirror that computation so the cache state can be inspected without
//! running anything.

use std::collections::HashMap;
use std::fmt;

use vidgen_project_model::{VideoDefinition, VideoDocument};

/// Bash expression for the md5 of the running script.
pub const SCRIPT_FINGERPRINT_EXPR: &str = r#"$(md5sum "$script_path" | cut -d" " -f1)"#;

/// Bash expression resolving the running script's absolute path.
pub const SCRIPT_PATH_EXPR: &str = r#"$(readlink --canonicalize-existing "$0")"#;

/// Bash expression reading the fingerprint stored in `$output_file`.
///
/// Evaluates to empty text when the file or its Artist tag is missing.
pub fn stored_fingerprint_expr(metadata_tool: &str) -> String {
    format!(r#"$({metadata_tool} -s3 -Artist "$output_file" 2>/dev/null || true)"#)
}

/// Lowercase hex md5 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of a script's text.
    pub fn of_script(script: &str) -> Self {
        Self(format!("{:x}", md5::compute(script.as_bytes())))
    }

    /// Hash of concatenated fingerprints, as `echo $joined | md5sum` computes it.
    pub fn combine<'a>(parts: impl IntoIterator<Item = &'a Fingerprint>) -> Self {
        let mut joined: String = parts.into_iter().map(|f| f.0.as_str()).collect();
        joined.push('\n');
        Self(format!("{:x}", md5::compute(joined.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What is currently on disk for a video's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputState {
    /// No output file.
    Missing,
    /// Output exists without a stored fingerprint (e.g. made by another tool).
    Untagged,
    /// Output exists with this stored fingerprint.
    Tagged(String),
}

/// Why a video has to be rendered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateReason {
    Forced,
    OutputMissing,
    Untagged,
    Stale,
}

/// Outcome of the cache check for one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Output is current; report its duration without re-encoding.
    Skip,
    Regenerate(RegenerateReason),
}

impl CacheDecision {
    pub fn label(&self) -> &'static str {
        match self {
            CacheDecision::Skip => "current",
            CacheDecision::Regenerate(RegenerateReason::Forced) => "forced",
            CacheDecision::Regenerate(RegenerateReason::OutputMissing) => "missing",
            CacheDecision::Regenerate(RegenerateReason::Untagged) => "untagged",
            CacheDecision::Regenerate(RegenerateReason::Stale) => "stale",
        }
    }
}

/// Skip/regenerate policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintPolicy {
    /// Always regenerate, ignoring stored fingerprints.
    pub force: bool,
}

impl FingerprintPolicy {
    pub fn new(force: bool) -> Self {
        Self { force }
    }

    pub fn decide(&self, current: &Fingerprint, output: &OutputState) -> CacheDecision {
        if self.force {
            return CacheDecision::Regenerate(RegenerateReason::Forced);
        }
        match output {
            OutputState::Missing => CacheDecision::Regenerate(RegenerateReason::OutputMissing),
            OutputState::Untagged => CacheDecision::Regenerate(RegenerateReason::Untagged),
            OutputState::Tagged(stored) if stored.trim() == current.as_str() => {
                CacheDecision::Skip
            }
            OutputState::Tagged(_) => CacheDecision::Regenerate(RegenerateReason::Stale),
        }
    }

    /// Fingerprint of `title` given the generated script text of every video.
    ///
    /// Returns `None` if the video or one of its recipe scripts is unknown.
    /// The document must be validated (acyclic).
    pub fn fingerprint(
        &self,
        document: &VideoDocument,
        title: &str,
        scripts: &HashMap<String, String>,
    ) -> Option<Fingerprint> {
        let video = document.video(title)?;
        if !video.is_composite() {
            return scripts.get(title).map(|s| Fingerprint::of_script(s));
        }

        let parts = recipe(document, video)
            .into_iter()
            .map(|v| scripts.get(&v.title).map(|s| Fingerprint::of_script(s)))
            .collect::<Option<Vec<_>>>()?;
        Some(Fingerprint::combine(&parts))
    }
}

/// Every video whose script contributes to `video`'s fingerprint: the video
/// itself, then each part's recipe in combine order.
pub fn recipe<'a>(document: &'a VideoDocument, video: &'a VideoDefinition) -> Vec<&'a VideoDefinition> {
    let mut out = vec![video];
    for part in video.parts() {
        if let Some(part) = document.video(part) {
            out.extend(recipe(document, part));
        }
    }
    out
}
