//! Configuration builder.
//!
//! Resolves one video definition against its document by running a fixed
//! sequence of pure stages over a draft:
//!
//! ```text
//! definition ─► shared variables ─► derived variables ─► shared options
//!                                                              │
//!          resolved ◄─ title placeholder ◄─ template expansion ◄┘
//! ```
//!
//! Each stage is a plain function `(Draft, &BuildContext) -> Draft`; there
//! is no shared mutable state between videos.

use vidgen_common::config::{ScriptsConfig, ToolsConfig};
use vidgen_common::error::{VidgenError, VidgenResult};
use vidgen_project_model::{validation, TextMap, VideoDefinition, VideoDocument, VideoKind};

use crate::fingerprint::{self, SCRIPT_FINGERPRINT_EXPR, SCRIPT_PATH_EXPR};
use crate::templates::expand_templates;
use crate::variables::{merge_variables, substitute_placeholder};

/// A video with all settings resolved, ready for script emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVideo {
    pub title: String,

    /// `<title>.mp4`.
    pub output_file_name: String,

    /// Merged variables in emission order.
    pub variables: TextMap,

    /// Literal encoder options. For composites these apply to the
    /// concatenation step only.
    pub options: Vec<String>,

    pub kind: ResolvedKind,
}

/// Leaf or composite, with what the script emitter needs for each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKind {
    Leaf,
    Composite {
        /// Titles concatenated, in order.
        parts: Vec<String>,
        /// Scripts whose md5s are folded into this video's fingerprint after
        /// its own (depth-first over all parts).
        fingerprint_scripts: Vec<String>,
    },
}

impl ResolvedVideo {
    /// Files concatenated into this video; just its own output for leaves.
    pub fn part_files(&self) -> Vec<String> {
        match &self.kind {
            ResolvedKind::Leaf => vec![self.output_file_name.clone()],
            ResolvedKind::Composite { parts, .. } => {
                parts.iter().map(|p| format!("{p}.mp4")).collect()
            }
        }
    }

    pub fn script_name(&self) -> String {
        format!("export_{}.bash", self.title)
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, ResolvedKind::Composite { .. })
    }
}

/// Shared, read-only inputs to every stage.
pub struct BuildContext<'a> {
    pub document: &'a VideoDocument,
    pub placeholder: &'a str,
    pub metadata_tool: &'a str,
}

/// Working state threaded through the stages.
#[derive(Debug, Clone)]
pub struct Draft {
    pub title: String,
    pub variables: TextMap,
    pub options: Vec<String>,
}

type Stage = fn(Draft, &BuildContext<'_>) -> Draft;

const STAGES: [(&str, Stage); 5] = [
    ("shared_variables", prepend_shared_variables),
    ("derived_variables", append_derived_variables),
    ("shared_options", prepend_shared_options),
    ("option_templates", expand_option_templates),
    ("title_placeholder", substitute_title_placeholder),
];

fn prepend_shared_variables(draft: Draft, ctx: &BuildContext<'_>) -> Draft {
    Draft {
        variables: merge_variables(&ctx.document.shared_variables, &draft.variables, &TextMap::new()),
        ..draft
    }
}

fn append_derived_variables(draft: Draft, ctx: &BuildContext<'_>) -> Draft {
    let derived = derived_variables(ctx.placeholder, ctx.metadata_tool);
    Draft {
        variables: merge_variables(&TextMap::new(), &draft.variables, &derived),
        ..draft
    }
}

fn prepend_shared_options(draft: Draft, ctx: &BuildContext<'_>) -> Draft {
    let mut options = ctx.document.shared_options.clone();
    options.extend(draft.options);
    Draft { options, ..draft }
}

fn expand_option_templates(draft: Draft, ctx: &BuildContext<'_>) -> Draft {
    Draft {
        options: expand_templates(&draft.options, &ctx.document.option_templates),
        ..draft
    }
}

fn substitute_title_placeholder(mut draft: Draft, ctx: &BuildContext<'_>) -> Draft {
    substitute_placeholder(&mut draft.variables, ctx.placeholder, &draft.title);
    if !ctx.placeholder.is_empty() {
        for option in &mut draft.options {
            *option = option.replace(ctx.placeholder, &draft.title);
        }
    }
    draft
}

/// Variables every video gets, overriding document values.
///
/// Fingerprint values are shell expressions evaluated when the script runs.
pub fn derived_variables(placeholder: &str, metadata_tool: &str) -> TextMap {
    [
        ("video_title", placeholder.to_string()),
        ("output_file", "$video_title.mp4".to_string()),
        ("script_path", SCRIPT_PATH_EXPR.to_string()),
        ("script_md5", SCRIPT_FINGERPRINT_EXPR.to_string()),
        ("video_md5", fingerprint::stored_fingerprint_expr(metadata_tool)),
    ]
    .into_iter()
    .collect()
}

/// Resolves videos of one validated document.
pub struct ConfigurationBuilder<'a> {
    document: &'a VideoDocument,
    placeholder: String,
    metadata_tool: String,
}

impl<'a> ConfigurationBuilder<'a> {
    /// Validate `document` and prepare to resolve its videos.
    ///
    /// Fails with a configuration error on unknown combine references,
    /// combine cycles, or titles that are not shell identifiers.
    pub fn new(
        document: &'a VideoDocument,
        scripts: &ScriptsConfig,
        tools: &ToolsConfig,
    ) -> VidgenResult<Self> {
        validation::validate(document).map_err(VidgenError::from)?;
        Ok(Self {
            document,
            placeholder: scripts.title_placeholder.clone(),
            metadata_tool: tools.metadata.clone(),
        })
    }

    pub fn document(&self) -> &'a VideoDocument {
        self.document
    }

    /// Resolve a single video.
    pub fn resolve(&self, video: &VideoDefinition) -> ResolvedVideo {
        let ctx = BuildContext {
            document: self.document,
            placeholder: &self.placeholder,
            metadata_tool: &self.metadata_tool,
        };

        let mut draft = Draft {
            title: video.title.clone(),
            variables: video.variables.clone(),
            options: video.options().to_vec(),
        };
        for (name, stage) in STAGES {
            draft = stage(draft, &ctx);
            tracing::trace!(video = %video.title, stage = name, "Applied resolution stage");
        }

        let kind = match &video.kind {
            VideoKind::Leaf { .. } => ResolvedKind::Leaf,
            VideoKind::Composite { parts, .. } => ResolvedKind::Composite {
                parts: parts.clone(),
                fingerprint_scripts: fingerprint::recipe(self.document, video)
                    .into_iter()
                    .skip(1)
                    .map(VideoDefinition::script_name)
                    .collect(),
            },
        };

        ResolvedVideo {
            output_file_name: video.output_file_name(),
            title: draft.title,
            variables: draft.variables,
            options: draft.options,
            kind,
        }
    }

    /// Resolve every video in execution order (parts before composites).
    pub fn resolve_all(&self) -> VidgenResult<Vec<ResolvedVideo>> {
        let order = validation::execution_order(self.document).map_err(VidgenError::from)?;
        let resolved: Vec<_> = order.into_iter().map(|v| self.resolve(v)).collect();
        tracing::debug!(videos = resolved.len(), "Resolved video configurations");
        Ok(resolved)
    }
}
