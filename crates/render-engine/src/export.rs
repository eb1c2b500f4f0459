//! Export job: write the scripts, run them, collect durations.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use vidgen_common::config::{ScriptsConfig, ToolsConfig};
use vidgen_common::error::{VidgenError, VidgenResult};
use vidgen_processing_core::ConfigurationBuilder;
use vidgen_project_model::VideoDocument;

use crate::script::{failed_script, ScriptEmitter};

/// File the duration report is written to inside the export directory.
pub const REPORT_FILE_NAME: &str = "vidgen-report.json";

/// Everything needed to export one document.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Directory receiving scripts and rendered videos.
    pub export_dir: PathBuf,

    pub tools: ToolsConfig,

    pub scripts: ScriptsConfig,

    /// Regenerate every video regardless of stored fingerprints.
    pub force: bool,
}

/// One generated script, named relative to the export directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    pub name: String,
    pub text: String,
}

/// All scripts of one document; the orchestration script comes last.
#[derive(Debug, Clone)]
pub struct ScriptSet {
    pub videos: Vec<ScriptFile>,
    pub main: ScriptFile,
}

impl ScriptSet {
    pub fn iter(&self) -> impl Iterator<Item = &ScriptFile> {
        self.videos.iter().chain(std::iter::once(&self.main))
    }
}

/// Duration of one rendered video, if the prober reported one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoDuration {
    pub title: String,
    pub seconds: Option<u64>,
}

/// Durations in declared order and their sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    pub videos: Vec<VideoDuration>,
    pub total_secs: u64,
}

impl ExportJob {
    pub fn emitter(&self) -> ScriptEmitter {
        ScriptEmitter::new(self.tools.clone(), self.force)
    }

    pub fn main_script_name(&self) -> String {
        format!("export_{}.bash", self.scripts.main_script)
    }

    /// Render every script text for `document` without touching the disk.
    pub fn render_scripts(&self, document: &VideoDocument) -> VidgenResult<ScriptSet> {
        let builder = ConfigurationBuilder::new(document, &self.scripts, &self.tools)?;
        let resolved = builder.resolve_all()?;
        let emitter = self.emitter();

        if resolved.iter().any(|v| v.script_name() == self.main_script_name()) {
            return Err(VidgenError::config(format!(
                "Video title '{}' collides with the main script name",
                self.scripts.main_script
            )));
        }

        let videos = resolved
            .iter()
            .map(|v| ScriptFile {
                name: v.script_name(),
                text: emitter.video_script(v),
            })
            .collect();
        let declared: Vec<String> = document.videos.iter().map(|v| v.title.clone()).collect();
        let main = ScriptFile {
            name: self.main_script_name(),
            text: emitter.main_script(&document.shared_variables, &resolved, &declared),
        };

        Ok(ScriptSet { videos, main })
    }

    /// Write `scripts` into the export directory, creating it if needed.
    pub fn write_scripts(&self, scripts: &ScriptSet) -> VidgenResult<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.export_dir)?;

        let mut written = Vec::new();
        for script in scripts.iter() {
            let path = self.export_dir.join(&script.name);
            std::fs::write(&path, &script.text)?;
            make_executable(&path)?;
            tracing::debug!(path = %path.display(), "Wrote script");
            written.push(path);
        }

        tracing::info!(
            dir = %self.export_dir.display(),
            scripts = written.len(),
            "Generated scripts"
        );
        Ok(written)
    }

    /// Run the orchestration script and return its stdout.
    ///
    /// Progress messages of the scripts are relayed to our stderr. When a
    /// video script fails, the error names that script.
    pub async fn run_main_script(&self) -> VidgenResult<String> {
        let main = self.main_script_name();
        tracing::info!(script = %main, "Running export");
        let started = std::time::Instant::now();

        let mut child = Command::new("bash")
            .arg(&main)
            .current_dir(&self.export_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to start bash");
                VidgenError::external_tool("bash", None)
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| VidgenError::external_tool("bash", None))?;
        // stderr is drained while stdout is collected.
        let relay = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut failed = None;
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(script) = failed_script(&line) {
                    failed = Some(script.to_string());
                }
                eprintln!("{line}");
            }
            failed
        });

        let output = child.wait_with_output().await?;
        let failed = relay.await.ok().flatten();

        if !output.status.success() {
            let tool = failed.unwrap_or(main);
            tracing::error!(script = %tool, status = ?output.status.code(), "Export script failed");
            return Err(VidgenError::external_tool(tool, output.status.code()));
        }

        tracing::info!(
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Export finished"
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Outputs of `document` already present in the export directory.
    pub fn existing_outputs(&self, document: &VideoDocument) -> Vec<PathBuf> {
        document
            .videos
            .iter()
            .map(|v| self.export_dir.join(v.output_file_name()))
            .filter(|path| path.is_file())
            .collect()
    }

    /// Write, run, and report on every video of `document`.
    pub async fn run(&self, document: &VideoDocument) -> VidgenResult<RenderReport> {
        let scripts = self.render_scripts(document)?;
        self.execute(document, &scripts).await
    }

    /// Write already rendered `scripts` of `document`, run them, and report.
    pub async fn execute(
        &self,
        document: &VideoDocument,
        scripts: &ScriptSet,
    ) -> VidgenResult<RenderReport> {
        self.write_scripts(scripts)?;

        let stdout = self.run_main_script().await?;
        let declared: Vec<&str> = document.videos.iter().map(|v| v.title.as_str()).collect();
        let report = parse_durations(&stdout, &declared);

        for video in &report.videos {
            match video.seconds {
                Some(seconds) => tracing::info!(video = %video.title, seconds, "Video ready"),
                None => tracing::warn!(video = %video.title, "No duration reported"),
            }
        }
        tracing::info!(total_secs = report.total_secs, "All videos ready");

        let report_path = self.export_dir.join(REPORT_FILE_NAME);
        std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
        tracing::debug!(path = %report_path.display(), "Wrote duration report");

        Ok(report)
    }
}

/// Parse `<title> <seconds>` lines into a report in `titles` order.
///
/// Titles without a line, or whose value is not a whole number, get no
/// duration and do not count towards the total.
pub fn parse_durations(stdout: &str, titles: &[&str]) -> RenderReport {
    let reported: Vec<(&str, &str)> = stdout
        .lines()
        .map(|line| {
            let line = line.trim();
            line.split_once(' ').unwrap_or((line, ""))
        })
        .collect();

    let videos: Vec<VideoDuration> = titles
        .iter()
        .map(|title| VideoDuration {
            title: title.to_string(),
            seconds: reported
                .iter()
                .rev()
                .find(|(name, _)| name == title)
                .and_then(|(_, value)| value.trim().parse().ok()),
        })
        .collect();
    let total_secs = videos.iter().filter_map(|v| v.seconds).sum();

    RenderReport { videos, total_secs }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> VidgenResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> VidgenResult<()> {
    Ok(())
}
