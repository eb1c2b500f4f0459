//! Bash script emission.
//!
//! Every resolved video becomes one fail-fast bash script that renders (or
//! concatenates) its output, stores its fingerprint in the output's Artist
//! tag, and prints the output duration in whole seconds on stdout. An
//! orchestration script runs the video scripts in order and prints one
//! `<title> <seconds>` line per video.
//!
//! Emission is deterministic: the same resolved videos always produce the
//! same text, which is what makes script fingerprints usable as cache keys.

use std::fmt::Write;

use vidgen_common::config::ToolsConfig;
use vidgen_processing_core::{ResolvedKind, ResolvedVideo};
use vidgen_project_model::TextMap;

/// Exit status of a video script whose output was already current.
pub const SKIP_EXIT_CODE: i32 = 100;

/// Exit status a video script reports when one of its tools itself failed
/// with [`SKIP_EXIT_CODE`].
pub const TOOL_SKIP_CLASH_EXIT_CODE: i32 = 101;

/// Prefix of the stderr line naming the video script that stopped the chain.
pub const FAILURE_MARKER: &str = "run_video:";

const SCRIPT_BEGINNING: &str = "#!/bin/bash\nset -e -u\n";

/// Renders bash scripts for resolved videos.
#[derive(Debug, Clone)]
pub struct ScriptEmitter {
    tools: ToolsConfig,
    force: bool,
}

impl ScriptEmitter {
    /// `force` omits the fingerprint check so every video is re-rendered.
    pub fn new(tools: ToolsConfig, force: bool) -> Self {
        Self { tools, force }
    }

    /// Script text for one video.
    pub fn video_script(&self, video: &ResolvedVideo) -> String {
        let mut fragments = vec![
            SCRIPT_BEGINNING.to_string(),
            SKIP_CLASH_TRAP.to_string(),
            variable_block(&video.variables),
            video_list(video),
        ];

        if let ResolvedKind::Composite {
            fingerprint_scripts,
            ..
        } = &video.kind
        {
            fragments.push(composite_fingerprint(fingerprint_scripts));
        }

        if !self.force {
            fragments.push(self.skip_if_current());
        }
        fragments.push(GENERATING_NOTICE.to_string());

        fragments.push(match &video.kind {
            ResolvedKind::Leaf => self.generate_command(&video.options),
            ResolvedKind::Composite { .. } => self.concat_command(&video.options),
        });

        fragments.push(self.metadata_writer());
        fragments.push(self.duration_output());

        fragments.join("\n")
    }

    /// Orchestration script running every video script in `videos` order.
    ///
    /// `report_order` lists titles in the order their durations are printed.
    pub fn main_script(
        &self,
        shared_variables: &TextMap,
        videos: &[ResolvedVideo],
        report_order: &[String],
    ) -> String {
        let mut calls = String::new();
        for video in videos {
            let _ = writeln!(
                calls,
                "{title}_length=$(run_video {script})\nexport {title}_length",
                title = video.title,
                script = video.script_name(),
            );
        }

        let mut report = String::new();
        for title in report_order {
            let _ = writeln!(report, "echo \"{title} ${{{title}_length}}\"");
        }

        [
            SCRIPT_BEGINNING.to_string(),
            variable_block(shared_variables),
            RUN_VIDEO_FUNCTION.to_string(),
            calls,
            report,
        ]
        .join("\n")
    }

    fn skip_if_current(&self) -> String {
        format!(
            "# if the md5 stored in the video file matches this script's md5, there is no\n\
             # need to regenerate the video as it is up to date.\n\
             if [ -f \"$output_file\" ] && [ \"$script_md5\" = \"$video_md5\" ]; then\n\
             \x20   >&2 echo \"$output_file already up to date, skipping it!\"\n\
             \x20   {probe}\n\
             \x20   exit {SKIP_EXIT_CODE}\n\
             fi\n",
            probe = self.duration_command(),
        )
    }

    fn generate_command(&self, options: &[String]) -> String {
        let mut lines = vec![self.tools.encoder.clone()];
        lines.extend(options.iter().map(|o| format!("\t{o}")));
        lines.push("\t\"$output_file\" 1>/dev/null".to_string());
        format!("{}\n", lines.join(" \\\n"))
    }

    fn concat_command(&self, options: &[String]) -> String {
        let mut lines = vec![
            self.tools.encoder.clone(),
            "\t-y".to_string(),
            "\t\"${inputs[@]}\"".to_string(),
            "\t-filter_complex \"${filter_complex}concat=n=${#videos[@]}:v=1:a=1[v][a]\"".to_string(),
            "\t-map \"[v]\"".to_string(),
            "\t-map \"[a]\"".to_string(),
        ];
        lines.extend(options.iter().map(|o| format!("\t{o}")));
        lines.push("\t\"$output_file\" 1>/dev/null".to_string());
        format!("{CONCAT_PREAMBLE}\n{}\n", lines.join(" \\\n"))
    }

    fn metadata_writer(&self) -> String {
        format!(
            "# save generation script md5 in the generated video's \"artist\" metadata field\n\
             {tool} \"$output_file\" -artist=\"$script_md5\" 1>/dev/null\n\
             # remove the backup file created by the metadata tool\n\
             rm -f \"${{output_file}}_original\"\n",
            tool = self.tools.metadata,
        )
    }

    fn duration_command(&self) -> String {
        format!(
            "{probe} -v error -show_entries format=duration -of default=noprint_wrappers=1:nokey=1 \"$output_file\" | cut -d. -f1",
            probe = self.tools.probe,
        )
    }

    fn duration_output(&self) -> String {
        format!("{}\n", self.duration_command())
    }
}

const GENERATING_NOTICE: &str = ">&2 echo \"Generating $output_file...\"\n";

const CONCAT_PREAMBLE: &str = r#"# concatenate all parts: [0:v][0:a][1:v][1:a]... feeds a single concat filter
filter_complex=""
inputs=()
for i in "${!videos[@]}"; do
    filter_complex="${filter_complex}[$i:v][$i:a]"
    inputs+=( -i "${videos[$i]}" )
done
"#;

const SKIP_CLASH_TRAP: &str = r#"# a failing tool must never look like a skipped video
trap 'status=$?; if [ "$status" -eq 100 ]; then exit 101; fi' ERR
"#;

const RUN_VIDEO_FUNCTION: &str = r#"# run a video script; status 100 means its output was already up to date
run_video() {
    local status=0
    bash "$1" || status=$?
    if [ "$status" -ne 0 ] && [ "$status" -ne 100 ]; then
        >&2 echo "run_video: $1 failed with status $status"
        return "$status"
    fi
}
"#;

/// Video script named by a failure line of the orchestration script.
pub fn failed_script(stderr_line: &str) -> Option<&str> {
    let rest = stderr_line.trim().strip_prefix(FAILURE_MARKER)?;
    let (script, _) = rest.trim_start().split_once(" failed with status ")?;
    Some(script)
}

fn variable_block(variables: &TextMap) -> String {
    variables
        .iter()
        .map(|(name, value)| format!("{name}={value}\n"))
        .collect()
}

fn video_list(video: &ResolvedVideo) -> String {
    format!("videos=( {} )\n", video.part_files().join(" "))
}

fn composite_fingerprint(fingerprint_scripts: &[String]) -> String {
    format!(
        "# for concatenated videos, the fingerprint combines this script's md5 with the\n\
         # md5 of every script the parts are generated by\n\
         fingerprint_scripts=( {} )\n\
         script_dir=$(dirname \"$script_path\")\n\
         for part_script in \"${{fingerprint_scripts[@]}}\"; do\n\
         \x20   script_md5=${{script_md5}}$(md5sum \"$script_dir/$part_script\" | cut -d\" \" -f1)\n\
         done\n\
         script_md5=$(echo \"$script_md5\" | md5sum | cut -d\" \" -f1)\n",
        fingerprint_scripts.join(" ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidgen_common::config::ScriptsConfig;
    use vidgen_processing_core::ConfigurationBuilder;
    use vidgen_project_model::VideoDocument;

    fn resolved() -> (VideoDocument, Vec<ResolvedVideo>) {
        let doc = VideoDocument::from_yaml_str(
            r#"
shared_options:
  - -y
shared_variables:
  fps: 24
videos:
  a:
    variables:
      duration: 2
    options:
      - -f lavfi
      - -i color=duration=$duration:rate=$fps
      - -t $duration
  b:
    options:
      - -t 3
  result:
    combine:
      - a
      - b
"#,
        )
        .unwrap();
        let builder =
            ConfigurationBuilder::new(&doc, &ScriptsConfig::default(), &ToolsConfig::default())
                .unwrap();
        let videos = builder.resolve_all().unwrap();
        (doc, videos)
    }

    #[test]
    fn test_leaf_script_layout() {
        let (_, videos) = resolved();
        let script = ScriptEmitter::new(ToolsConfig::default(), false).video_script(&videos[0]);

        assert!(script.starts_with("#!/bin/bash\nset -e -u\n"));
        assert!(script.contains("fps=24\nduration=2\nvideo_title=a\noutput_file=$video_title.mp4\n"));
        assert!(script.contains("videos=( a.mp4 )\n"));
        assert!(script.contains(
            "ffmpeg \\\n\t-y \\\n\t-f lavfi \\\n\t-i color=duration=$duration:rate=$fps \\\n\t-t $duration \\\n\t\"$output_file\" 1>/dev/null\n"
        ));
        assert!(script.contains("exit 100"));
        assert!(script.contains("exiftool \"$output_file\" -artist=\"$script_md5\""));
        assert!(script.contains("rm -f \"${output_file}_original\""));
        assert!(!script.contains("fingerprint_scripts"));

        // The duration report is the last thing the script does.
        assert!(script.trim_end().ends_with("\"$output_file\" | cut -d. -f1"));
    }

    #[test]
    fn test_composite_script_concatenates_parts() {
        let (_, videos) = resolved();
        let composite = videos.iter().find(|v| v.title == "result").unwrap();
        let script = ScriptEmitter::new(ToolsConfig::default(), false).video_script(composite);

        assert!(script.contains("videos=( a.mp4 b.mp4 )\n"));
        assert!(script.contains("fingerprint_scripts=( export_a.bash export_b.bash )\n"));
        assert!(script.contains("concat=n=${#videos[@]}:v=1:a=1[v][a]"));
        assert!(script.contains("\t-map \"[v]\" \\\n\t-map \"[a]\" \\\n\t-y \\\n\t\"$output_file\""));

        // The fingerprint must be final before the skip check reads it.
        let fold = script.find("script_md5=$(echo").unwrap();
        let check = script.find("if [ -f \"$output_file\" ]").unwrap();
        assert!(fold < check);
    }

    #[test]
    fn test_force_omits_skip_check() {
        let (_, videos) = resolved();
        let script = ScriptEmitter::new(ToolsConfig::default(), true).video_script(&videos[0]);
        assert!(!script.contains("exit 100"));
        assert!(script.contains("Generating $output_file"));
        assert!(script.contains("-artist=\"$script_md5\""));
    }

    #[test]
    fn test_custom_tools_are_used() {
        let (_, videos) = resolved();
        let tools = ToolsConfig {
            encoder: "/opt/ffmpeg".into(),
            probe: "/opt/ffprobe".into(),
            metadata: "/opt/exiftool".into(),
        };
        let script = ScriptEmitter::new(tools, false).video_script(&videos[0]);
        assert!(script.contains("/opt/ffmpeg \\\n"));
        assert!(script.contains("/opt/ffprobe -v error"));
        assert!(script.contains("/opt/exiftool \"$output_file\""));
    }

    #[test]
    fn test_main_script_runs_in_order_and_reports_durations() {
        let (doc, videos) = resolved();
        let order: Vec<String> = doc.videos.iter().map(|v| v.title.clone()).collect();
        let script = ScriptEmitter::new(ToolsConfig::default(), false).main_script(
            &doc.shared_variables,
            &videos,
            &order,
        );

        let a = script.find("a_length=$(run_video export_a.bash)").unwrap();
        let b = script.find("b_length=$(run_video export_b.bash)").unwrap();
        let result = script.find("result_length=$(run_video export_result.bash)").unwrap();
        assert!(a < b && b < result);
        assert!(script.contains("fps=24\n"));
        assert!(script.contains("[ \"$status\" -ne 100 ]"));
        assert!(script.contains("echo \"a ${a_length}\"\necho \"b ${b_length}\"\necho \"result ${result_length}\"\n"));
    }

    #[test]
    fn test_tool_status_clashing_with_skip_is_remapped() {
        let (_, videos) = resolved();
        let script = ScriptEmitter::new(ToolsConfig::default(), false).video_script(&videos[0]);
        let trap = script.find("trap 'status=$?; if [ \"$status\" -eq 100 ]; then exit 101; fi' ERR").unwrap();
        let encoder = script.find("ffmpeg \\\n").unwrap();
        assert!(trap < encoder);
    }

    #[test]
    fn test_run_video_names_the_failed_script() {
        let (doc, videos) = resolved();
        let script = ScriptEmitter::new(ToolsConfig::default(), false).main_script(
            &doc.shared_variables,
            &videos,
            &[],
        );
        assert!(script.contains(">&2 echo \"run_video: $1 failed with status $status\""));
    }

    #[test]
    fn test_failed_script_parsing() {
        assert_eq!(
            failed_script("run_video: export_a.bash failed with status 69"),
            Some("export_a.bash")
        );
        assert_eq!(failed_script("Generating a.mp4..."), None);
        assert_eq!(failed_script("export_a.bash failed with status 1"), None);
    }

    #[test]
    fn test_emission_is_deterministic() {
        let (_, first) = resolved();
        let (_, second) = resolved();
        let emitter = ScriptEmitter::new(ToolsConfig::default(), false);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(emitter.video_script(a), emitter.video_script(b));
        }
    }
}
