//! Structural validation and ordering of the combine graph.
//!
//! A valid document has shell-safe titles, only references existing videos
//! from `combine`, and has no combine cycles. Validation runs before any
//! script is written.

use std::collections::HashMap;

use crate::document::{DocumentError, VideoDefinition, VideoDocument};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Validate titles, combine references, and acyclicity.
pub fn validate(document: &VideoDocument) -> Result<(), DocumentError> {
    for video in &document.videos {
        if !is_shell_identifier(&video.title) {
            return Err(DocumentError::InvalidTitle {
                title: video.title.clone(),
            });
        }
    }

    for video in &document.videos {
        for part in video.parts() {
            if document.video(part).is_none() {
                return Err(DocumentError::UnknownReference {
                    video: video.title.clone(),
                    missing: part.clone(),
                });
            }
        }
    }

    execution_order(document).map(|_| ())
}

/// Order in which videos must be rendered.
///
/// Declaration order is kept, except that every composite comes after all
/// of its parts. Fails on unknown references and combine cycles.
pub fn execution_order(document: &VideoDocument) -> Result<Vec<&VideoDefinition>, DocumentError> {
    let index: HashMap<&str, usize> = document
        .videos
        .iter()
        .enumerate()
        .map(|(i, v)| (v.title.as_str(), i))
        .collect();

    let mut marks = vec![Mark::Unvisited; document.videos.len()];
    let mut order = Vec::with_capacity(document.videos.len());
    let mut path = vec![];

    for i in 0..document.videos.len() {
        visit(document, &index, i, &mut marks, &mut path, &mut order)?;
    }

    Ok(order.into_iter().map(|i| &document.videos[i]).collect())
}

fn visit(
    document: &VideoDocument,
    index: &HashMap<&str, usize>,
    current: usize,
    marks: &mut [Mark],
    path: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), DocumentError> {
    match marks[current] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let start = path.iter().position(|&i| i == current).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..]
                .iter()
                .map(|&i| document.videos[i].title.clone())
                .collect();
            cycle.push(document.videos[current].title.clone());
            return Err(DocumentError::CyclicCombine { cycle });
        }
        Mark::Unvisited => {}
    }

    marks[current] = Mark::InProgress;
    path.push(current);

    let video = &document.videos[current];
    for part in video.parts() {
        let &next = index
            .get(part.as_str())
            .ok_or_else(|| DocumentError::UnknownReference {
                video: video.title.clone(),
                missing: part.clone(),
            })?;
        visit(document, index, next, marks, path, order)?;
    }

    path.pop();
    marks[current] = Mark::Done;
    order.push(current);
    Ok(())
}

/// Whether `title` can be used as a bash variable name prefix.
pub fn is_shell_identifier(title: &str) -> bool {
    let mut chars = title.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
