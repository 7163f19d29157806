//! Deciding which body parts are worth extracting.

use serde::{Deserialize, Serialize};

use crate::model::structure::{BodyPart, MessageStructure};

/// How far into a message's MIME tree candidate parts are collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalDepth {
    /// Only the immediate children of a multipart root.
    ///
    /// A non-multipart root yields nothing, and attachments nested inside a
    /// multipart-within-multipart (e.g. `mixed > related > image`) are not
    /// seen. This is the historical behavior of the extractor.
    #[default]
    DirectChildren,

    /// Every non-multipart part in depth-first order, including a leaf root.
    Recursive,
}

/// `true` if the part's disposition marks it for extraction.
///
/// `attachment` always qualifies, `inline` only with `include_inline`.
/// Comparison ignores case. Parts without a disposition never qualify.
pub fn is_extractable(part: &BodyPart, include_inline: bool) -> bool {
    let disposition = part.disposition.trim();
    disposition.eq_ignore_ascii_case("attachment")
        || (include_inline && disposition.eq_ignore_ascii_case("inline"))
}

/// Parts to run through the classifier, in structure order.
pub fn candidate_parts(structure: &MessageStructure, depth: TraversalDepth) -> Vec<&BodyPart> {
    match depth {
        TraversalDepth::DirectChildren => structure.root.children.iter().collect(),
        TraversalDepth::Recursive => {
            let mut leaves = Vec::new();
            collect_leaves(&structure.root, &mut leaves);
            leaves
        }
    }
}

/// Candidate parts that pass [`is_extractable`].
pub fn extractable_parts(
    structure: &MessageStructure,
    depth: TraversalDepth,
    include_inline: bool,
) -> Vec<&BodyPart> {
    candidate_parts(structure, depth)
        .into_iter()
        .filter(|part| is_extractable(part, include_inline))
        .collect()
}

fn collect_leaves<'a>(part: &'a BodyPart, out: &mut Vec<&'a BodyPart>) {
    if part.is_multipart() {
        for child in &part.children {
            collect_leaves(child, out);
        }
    } else {
        out.push(part);
    }
}
