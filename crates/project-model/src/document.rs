//! Video document types.
//!
//! A document is the top-level YAML file that ties together shared
//! variables, shared options, option templates, and the videos to render.
//!
//! ```yaml
//! shared_options:
//!   - -y
//! shared_variables:
//!   fps: 24
//! option_templates:
//!   encode: |-
//!     -c:v h264
//!     -r $fps
//! videos:
//!   intro:
//!     variables:
//!       duration: 5
//!     options:
//!       - -f lavfi
//!       - -i color=size=1920x1080:duration=$duration:rate=$fps:color=black
//!       - encode
//!   full:
//!     combine:
//!       - intro
//!       - outro
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use vidgen_common::error::VidgenError;

use crate::text_map::{scalar_text, TextMap};
use crate::validation;

/// Top-level document (`videos.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VideoDocument {
    /// Variables applied to every video unless overridden.
    #[serde(alias = "global_vars")]
    pub shared_variables: TextMap,

    /// Options applied to every video before its own options.
    #[serde(alias = "global_options", deserialize_with = "deserialize_options")]
    pub shared_options: Vec<String>,

    /// Named multi-line option blocks, one option per line.
    #[serde(alias = "preset_options")]
    pub option_templates: TextMap,

    /// Videos in declaration order.
    #[serde(deserialize_with = "deserialize_videos")]
    pub videos: Vec<VideoDefinition>,
}

/// One renderable video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDefinition {
    /// Identity; equal to the video's key under `videos`.
    pub title: String,

    /// Video-local variables overriding shared ones.
    pub variables: TextMap,

    /// Whether the video is rendered directly or concatenated from parts.
    pub kind: VideoKind,
}

/// Leaf or composite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoKind {
    /// Rendered directly by the encoder from its own options.
    Leaf { options: Vec<String> },

    /// Concatenation of other videos. `extra_options` are passed to the
    /// concatenating encoder invocation only.
    Composite {
        parts: Vec<String>,
        extra_options: Vec<String>,
    },
}

impl VideoDefinition {
    /// A leaf video with the given options.
    pub fn leaf(title: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            title: title.into(),
            variables: TextMap::new(),
            kind: VideoKind::Leaf { options },
        }
    }

    /// A composite video concatenating `parts`.
    pub fn composite(title: impl Into<String>, parts: Vec<String>) -> Self {
        Self {
            title: title.into(),
            variables: TextMap::new(),
            kind: VideoKind::Composite {
                parts,
                extra_options: vec![],
            },
        }
    }

    pub fn with_variables(mut self, variables: TextMap) -> Self {
        self.variables = variables;
        self
    }

    /// The video's own option tokens (leaf options or composite extras).
    pub fn options(&self) -> &[String] {
        match &self.kind {
            VideoKind::Leaf { options } => options,
            VideoKind::Composite { extra_options, .. } => extra_options,
        }
    }

    /// Titles this video concatenates; empty for leaves.
    pub fn parts(&self) -> &[String] {
        match &self.kind {
            VideoKind::Leaf { .. } => &[],
            VideoKind::Composite { parts, .. } => parts,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, VideoKind::Composite { .. })
    }

    /// Rendered file name (`<title>.mp4`).
    pub fn output_file_name(&self) -> String {
        format!("{}.mp4", self.title)
    }

    /// Generated script name (`export_<title>.bash`).
    pub fn script_name(&self) -> String {
        format!("export_{}.bash", self.title)
    }
}

impl VideoDocument {
    /// Parse and validate a document from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DocumentError> {
        let document = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| DocumentError::ParseError {
                origin: "<inline>".to_string(),
                source: e,
            })?
        };
        validation::validate(&document)?;
        Ok(document)
    }

    /// Load and validate a document from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocumentError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let yaml = std::fs::read_to_string(path).map_err(|e| DocumentError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let document = Self::from_yaml_str(&yaml).map_err(|e| match e {
            DocumentError::ParseError { source, .. } => DocumentError::ParseError {
                origin: path.display().to_string(),
                source,
            },
            other => other,
        })?;

        tracing::debug!(
            path = %path.display(),
            videos = document.videos.len(),
            templates = document.option_templates.len(),
            "Loaded video document"
        );
        Ok(document)
    }

    /// Look up a video by title.
    pub fn video(&self, title: &str) -> Option<&VideoDefinition> {
        self.videos.iter().find(|v| v.title == title)
    }
}

/// Errors that can occur when loading a document.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Document not found: {path}")]
    NotFound { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {origin}: {source}")]
    ParseError {
        origin: String,
        source: serde_yaml::Error,
    },

    #[error("Video `{video}` combines unknown video `{missing}`")]
    UnknownReference { video: String, missing: String },

    #[error("Cyclic combine: {}", .cycle.join(" -> "))]
    CyclicCombine { cycle: Vec<String> },

    #[error("Invalid video title `{title}`: titles must be shell identifiers ([A-Za-z_][A-Za-z0-9_]*)")]
    InvalidTitle { title: String },
}

impl From<DocumentError> for VidgenError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound { path } => VidgenError::DocumentNotFound { path },
            DocumentError::IoError { source, .. } => VidgenError::Io(source),
            other => VidgenError::config(other.to_string()),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawVideo {
    #[serde(alias = "vars")]
    variables: TextMap,
    #[serde(deserialize_with = "deserialize_options")]
    options: Vec<String>,
    #[serde(deserialize_with = "deserialize_titles")]
    combine: Vec<String>,
}

impl RawVideo {
    fn into_definition(self, title: String) -> VideoDefinition {
        let kind = if self.combine.is_empty() {
            VideoKind::Leaf {
                options: self.options,
            }
        } else {
            VideoKind::Composite {
                parts: self.combine,
                extra_options: self.options,
            }
        };
        VideoDefinition {
            title,
            variables: self.variables,
            kind,
        }
    }
}

/// Resolve one option entry to its literal text.
///
/// An entry is a scalar, or a single-entry mapping `{ label: "-t 5" }`
/// whose label is ignored.
fn option_text(value: serde_yaml::Value) -> Result<String, String> {
    match value {
        serde_yaml::Value::Mapping(mapping) => {
            let mut entries = mapping.into_iter();
            match (entries.next(), entries.next()) {
                (Some((_, inner)), None) => scalar_text(inner),
                _ => Err("labelled options must have exactly one entry".to_string()),
            }
        }
        other => scalar_text(other),
    }
}

fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<serde_yaml::Value>> = Option::deserialize(deserializer)?;
    values
        .unwrap_or_default()
        .into_iter()
        .map(|value| option_text(value).map_err(de::Error::custom))
        .collect()
}

fn deserialize_titles<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let titles: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(titles.unwrap_or_default())
}

fn deserialize_videos<'de, D>(deserializer: D) -> Result<Vec<VideoDefinition>, D::Error>
where
    D: Deserializer<'de>,
{
    struct VideosVisitor;

    impl<'de> Visitor<'de> for VideosVisitor {
        type Value = Vec<VideoDefinition>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of video titles to video definitions")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(vec![])
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(vec![])
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut videos: Vec<VideoDefinition> = vec![];
            while let Some(title) = access.next_key::<String>()? {
                let raw: Option<RawVideo> = access.next_value()?;
                if videos.iter().any(|v| v.title == title) {
                    return Err(de::Error::custom(format!("duplicate video `{title}`")));
                }
                videos.push(raw.unwrap_or_default().into_definition(title));
            }
            Ok(videos)
        }
    }

    deserializer.deserialize_any(VideosVisitor)
}
