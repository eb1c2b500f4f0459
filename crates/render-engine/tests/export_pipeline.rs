//! Runs generated scripts end to end against stub media tools.
//!
//! The stubs stand in for the encoder, prober, and metadata tool: a
//! "video" is a text file holding its duration, and the Artist tag lives in
//! a `<file>.artist` sidecar.
#![cfg(target_os = "linux")]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use vidgen_common::config::{ScriptsConfig, ToolsConfig};
use vidgen_common::error::VidgenError;
use vidgen_processing_core::{ConfigurationBuilder, FingerprintPolicy};
use vidgen_project_model::VideoDocument;
use vidgen_render_engine::{inspect, ExifTool, ExportJob, VideoDuration, REPORT_FILE_NAME};

const ENCODER: &str = r#"#!/bin/bash
echo "$*" >> "$(dirname "$0")/encoder.log"
out="${@: -1}"
duration=0
prev=""
for arg in "$@"; do
    case "$prev" in
        -t) duration=$((duration + arg)) ;;
        -i) if [ -f "$arg" ]; then duration=$((duration + $(cat "$arg"))); fi ;;
    esac
    prev="$arg"
done
echo "$duration" > "$out"
"#;

const PROBE: &str = r#"#!/bin/bash
cat "${@: -1}"
"#;

const METADATA: &str = r#"#!/bin/bash
if [ "$1" = "-s3" ]; then
    cat "$3.artist" 2>/dev/null
    exit 0
fi
echo "${2#-artist=}" > "$1.artist"
touch "$1_original"
"#;

struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("vidgen-e2e-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(root.join("bin")).unwrap();
        for (file, body) in [("encoder", ENCODER), ("probe", PROBE), ("metadata", METADATA)] {
            let path = root.join("bin").join(file);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        Self { root }
    }

    fn tools(&self) -> ToolsConfig {
        let bin = |name: &str| self.root.join("bin").join(name).display().to_string();
        ToolsConfig {
            encoder: bin("encoder"),
            probe: bin("probe"),
            metadata: bin("metadata"),
        }
    }

    fn export_dir(&self) -> PathBuf {
        self.root.join("out")
    }

    fn job(&self, force: bool) -> ExportJob {
        ExportJob {
            export_dir: self.export_dir(),
            tools: self.tools(),
            scripts: ScriptsConfig::default(),
            force,
        }
    }

    fn encoder_runs(&self) -> usize {
        std::fs::read_to_string(self.root.join("bin").join("encoder.log"))
            .map(|log| log.lines().count())
            .unwrap_or(0)
    }

    fn statuses(&self, doc: &VideoDocument) -> Vec<(String, &'static str)> {
        let tools = self.tools();
        let builder = ConfigurationBuilder::new(doc, &ScriptsConfig::default(), &tools).unwrap();
        let videos = builder.resolve_all().unwrap();
        let emitter = self.job(false).emitter();
        inspect(
            doc,
            &videos,
            &emitter,
            &FingerprintPolicy::default(),
            &ExifTool::new(tools.metadata.clone()),
            &self.export_dir(),
        )
        .unwrap()
        .into_iter()
        .map(|s| (s.title, s.state))
        .collect()
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

fn durations(report: &vidgen_render_engine::RenderReport) -> Vec<(&str, Option<u64>)> {
    report
        .videos
        .iter()
        .map(|VideoDuration { title, seconds }| (title.as_str(), *seconds))
        .collect()
}

fn combined_document(a_duration: u32) -> VideoDocument {
    VideoDocument::from_yaml_str(&format!(
        r#"
shared_options:
  - -y
videos:
  a:
    variables:
      duration: {a_duration}
    options:
      - -f lavfi
      - -i color=duration=$duration
      - -t $duration
  b:
    options:
      - -t 3
  result:
    combine:
      - a
      - b
"#
    ))
    .unwrap()
}

fn exists(dir: &Path, name: &str) -> bool {
    dir.join(name).exists()
}

#[tokio::test]
async fn single_leaf_reports_its_duration() {
    let sandbox = Sandbox::new("leaf");
    let doc = VideoDocument::from_yaml_str(
        r#"
option_templates:
  encode: |-
    -c:v h264
    -r 24
videos:
  darkness_5_sec:
    options:
      - -f lavfi
      - -i color=size=1920x1080:duration=5:color=black
      - encode
      - -t 5
"#,
    )
    .unwrap();

    let report = sandbox.job(false).run(&doc).await.unwrap();
    assert_eq!(durations(&report), [("darkness_5_sec", Some(5))]);
    assert_eq!(report.total_secs, 5);

    let out = sandbox.export_dir();
    assert!(exists(&out, "export_darkness_5_sec.bash"));
    assert!(exists(&out, "export_generate.bash"));
    assert!(exists(&out, "darkness_5_sec.mp4"));
    assert!(exists(&out, REPORT_FILE_NAME));
    assert!(!exists(&out, "darkness_5_sec.mp4_original"));
}

#[tokio::test]
async fn composite_concatenates_parts() {
    let sandbox = Sandbox::new("composite");
    let doc = combined_document(2);

    let report = sandbox.job(false).run(&doc).await.unwrap();
    assert_eq!(
        durations(&report),
        [("a", Some(2)), ("b", Some(3)), ("result", Some(5))]
    );
    assert_eq!(report.total_secs, 10);
}

#[tokio::test]
async fn second_run_skips_every_video() {
    let sandbox = Sandbox::new("idempotent");
    let doc = combined_document(2);

    let first = sandbox.job(false).run(&doc).await.unwrap();
    let runs = sandbox.encoder_runs();
    assert_eq!(runs, 3);
    assert!(sandbox.statuses(&doc).iter().all(|(_, state)| *state == "current"));

    let second = sandbox.job(false).run(&doc).await.unwrap();
    assert_eq!(sandbox.encoder_runs(), runs);
    assert_eq!(first, second);
}

#[tokio::test]
async fn editing_a_leaf_regenerates_it_and_its_composite_only() {
    let sandbox = Sandbox::new("edit");
    sandbox.job(false).run(&combined_document(2)).await.unwrap();
    let runs = sandbox.encoder_runs();

    let edited = combined_document(4);
    sandbox.job(false).write_scripts(&sandbox.job(false).render_scripts(&edited).unwrap()).unwrap();
    assert_eq!(
        sandbox.statuses(&edited),
        [
            ("a".to_string(), "stale"),
            ("b".to_string(), "current"),
            ("result".to_string(), "stale"),
        ]
    );

    let report = sandbox.job(false).run(&edited).await.unwrap();
    assert_eq!(sandbox.encoder_runs(), runs + 2);
    assert_eq!(
        durations(&report),
        [("a", Some(4)), ("b", Some(3)), ("result", Some(7))]
    );
}

#[tokio::test]
async fn force_regenerates_everything() {
    let sandbox = Sandbox::new("force");
    let doc = combined_document(2);
    sandbox.job(false).run(&doc).await.unwrap();
    let runs = sandbox.encoder_runs();

    let report = sandbox.job(true).run(&doc).await.unwrap();
    assert_eq!(sandbox.encoder_runs(), runs + 3);
    assert_eq!(report.total_secs, 10);
}

#[tokio::test]
async fn unknown_reference_writes_nothing() {
    let sandbox = Sandbox::new("ghost");
    let parse_err = VideoDocument::from_yaml_str(
        r#"
videos:
  a:
    options: [-t 1]
  result:
    combine: [a, ghost]
"#,
    )
    .unwrap_err();
    assert!(parse_err.to_string().contains("ghost"));

    let unvalidated = VideoDocument {
        videos: vec![vidgen_project_model::VideoDefinition::composite(
            "result",
            vec!["ghost".into()],
        )],
        ..VideoDocument::default()
    };
    let err = sandbox.job(false).run(&unvalidated).await.unwrap_err();
    assert!(matches!(err, VidgenError::Config { .. }));
    assert_eq!(err.exit_code(), 3);
    assert!(!sandbox.export_dir().exists());
}

#[tokio::test]
async fn failing_encoder_stops_the_chain() {
    let sandbox = Sandbox::new("failure");
    let failing = sandbox.root.join("bin").join("encoder");
    std::fs::write(&failing, "#!/bin/bash\nexit 69\n").unwrap();

    let err = sandbox.job(false).run(&combined_document(2)).await.unwrap_err();
    assert!(matches!(
        err,
        VidgenError::ExternalTool { ref tool, status: Some(69) } if tool == "export_a.bash"
    ));
    assert!(err.to_string().contains("export_a.bash"));
    assert_eq!(err.exit_code(), 69);
    assert!(!sandbox.export_dir().join("b.mp4").exists());
}

#[tokio::test]
async fn encoder_exiting_with_skip_status_still_fails() {
    let sandbox = Sandbox::new("skip-clash");
    let failing = sandbox.root.join("bin").join("encoder");
    std::fs::write(&failing, "#!/bin/bash\nexit 100\n").unwrap();

    let err = sandbox.job(false).run(&combined_document(2)).await.unwrap_err();
    assert!(matches!(
        err,
        VidgenError::ExternalTool { ref tool, status: Some(101) } if tool == "export_a.bash"
    ));
    assert_eq!(err.exit_code(), vidgen_render_engine::TOOL_SKIP_CLASH_EXIT_CODE as u8);
    assert!(!exists(&sandbox.export_dir(), "b.mp4"));
    assert!(!exists(&sandbox.export_dir(), "result.mp4"));
}

#[tokio::test]
async fn document_variables_named_like_derived_ones_still_render() {
    let sandbox = Sandbox::new("reserved");
    let doc = VideoDocument::from_yaml_str(
        r#"
shared_variables:
  output_file: ignored.mp4
videos:
  a:
    variables:
      video_md5: nope
    options:
      - -t 2
"#,
    )
    .unwrap();

    let report = sandbox.job(false).run(&doc).await.unwrap();
    assert_eq!(durations(&report), [("a", Some(2))]);
    assert!(exists(&sandbox.export_dir(), "a.mp4"));
    assert!(!exists(&sandbox.export_dir(), "ignored.mp4"));
    assert_eq!(sandbox.job(true).existing_outputs(&doc).len(), 1);
}
