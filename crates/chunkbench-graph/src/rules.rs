//! Inference rules. Each rule walks the chunk sequence once and returns its
//! edges in source order.

use chunkbench_core::{Chunk, Element, ElementKind, Metadata, Relationship, RelationshipKind};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Confidence of structurally certain edges.
pub const CERTAIN: f32 = 1.0;
/// Confidence of a link whose text matches a header only after normalization.
pub const FUZZY_MATCH: f32 = 0.7;
/// Confidence of a code chunk's link to the prose before it.
pub const CODE_CONTEXT: f32 = 0.9;
/// Upper bound for similarity-derived confidences.
pub const MAX_INFERRED: f32 = 0.99;

fn edge(source: &Chunk, target: &Chunk, kind: RelationshipKind, confidence: f32) -> Relationship {
    Relationship {
        source_chunk_id: source.chunk_id,
        target_chunk_id: target.chunk_id,
        relationship_kind: kind,
        confidence,
        metadata: Metadata::new(),
    }
}

fn with_meta(mut relationship: Relationship, key: &str, value: Value) -> Relationship {
    relationship.metadata.insert(key.to_string(), value);
    relationship
}

/// Level of the header a chunk opens with. A chunk that starts partway into
/// its leading header (an overlapping window) does not count.
fn leading_header_level(chunk: &Chunk) -> Option<u8> {
    let header = chunk
        .leading_element()
        .filter(|e| e.kind == ElementKind::Header)?;
    chunk
        .content
        .trim_start()
        .starts_with(header.content.trim())
        .then(|| header.level.unwrap_or(1))
}

/// A chunk led by a level-L header parents every following chunk up to the
/// next chunk led by a header of level L or higher.
pub(crate) fn hierarchy(chunks: &[Chunk]) -> Vec<Relationship> {
    let mut out = Vec::new();
    for (idx, parent) in chunks.iter().enumerate() {
        let Some(level) = leading_header_level(parent) else {
            continue;
        };
        for child in &chunks[idx + 1..] {
            if leading_header_level(child).is_some_and(|l| l <= level) {
                break;
            }
            out.push(with_meta(
                edge(parent, child, RelationshipKind::Hierarchy, CERTAIN),
                "parent_level",
                json!(level),
            ));
        }
    }
    out
}

/// Lowercase, drop punctuation, collapse whitespace.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Texts a link may refer to: its own text and, for `#anchor` urls, the
/// anchor with dashes read as spaces.
fn link_targets(link: &Element) -> Vec<String> {
    let mut targets = vec![link.content.trim().to_string()];
    if let Some(anchor) = link.url.as_deref().and_then(|u| u.strip_prefix('#')) {
        targets.push(anchor.replace('-', " "));
    }
    targets.retain(|t| !t.is_empty());
    targets
}

fn match_confidence(candidate: &str, header: &str) -> Option<f32> {
    if candidate == header.trim() {
        return Some(CERTAIN);
    }
    let normalized = normalize(candidate);
    (!normalized.is_empty() && normalized == normalize(header)).then_some(FUZZY_MATCH)
}

/// Links whose text or anchor names another chunk's header. One edge per
/// chunk pair, carrying the best match.
pub(crate) fn cross_references(chunks: &[Chunk]) -> Vec<Relationship> {
    let headers: Vec<Vec<String>> = chunks.iter().map(|c| c.header_texts().collect()).collect();
    let mut out = Vec::new();

    for (idx, source) in chunks.iter().enumerate() {
        let mut best: BTreeMap<usize, (f32, &str)> = BTreeMap::new();
        for link in source.elements.iter().filter(|e| e.kind == ElementKind::Link) {
            for candidate in link_targets(link) {
                for (target, texts) in headers.iter().enumerate() {
                    if target == idx {
                        continue;
                    }
                    let Some(confidence) = texts
                        .iter()
                        .filter_map(|header| match_confidence(&candidate, header))
                        .reduce(f32::max)
                    else {
                        continue;
                    };
                    let entry = best.entry(target).or_insert((0.0, link.content.as_str()));
                    if confidence > entry.0 {
                        *entry = (confidence, link.content.as_str());
                    }
                }
            }
        }

        for (target, (confidence, text)) in best {
            let relationship = edge(
                source,
                &chunks[target],
                RelationshipKind::CrossReference,
                confidence,
            );
            out.push(with_meta(relationship, "link_text", json!(text)));
        }
    }
    out
}

/// Each chunk holding a code block points at the nearest earlier chunk
/// without one.
pub(crate) fn code_context(chunks: &[Chunk]) -> Vec<Relationship> {
    let mut out = Vec::new();
    for (idx, chunk) in chunks.iter().enumerate() {
        let Some(code) = chunk
            .elements
            .iter()
            .find(|e| e.kind == ElementKind::CodeBlock)
        else {
            continue;
        };
        let prose = chunks[..idx]
            .iter()
            .rev()
            .find(|c| !c.contains_kind(ElementKind::CodeBlock));
        if let Some(prose) = prose {
            out.push(with_meta(
                edge(chunk, prose, RelationshipKind::CodeContext, CODE_CONTEXT),
                "language",
                json!(code.language),
            ));
        }
    }
    out
}

/// Keywords from the chunk's semantic metadata, or its longer words when the
/// chunk was assembled without metadata.
fn keyword_set(chunk: &Chunk) -> BTreeSet<String> {
    match chunk
        .semantic_metadata
        .get("keywords")
        .and_then(Value::as_array)
    {
        Some(words) => words
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => chunk
            .content
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 4)
            .map(str::to_lowercase)
            .collect(),
    }
}

pub(crate) fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

/// Pairs of chunks whose keyword sets overlap by at least `threshold`.
pub(crate) fn topic_similarity(chunks: &[Chunk], threshold: f32) -> Vec<Relationship> {
    let sets: Vec<BTreeSet<String>> = chunks.iter().map(keyword_set).collect();
    let mut out = Vec::new();
    for (i, source) in chunks.iter().enumerate() {
        for (j, target) in chunks.iter().enumerate().skip(i + 1) {
            let similarity = jaccard(&sets[i], &sets[j]);
            if similarity > 0.0 && similarity >= threshold {
                let shared: Vec<&String> = sets[i].intersection(&sets[j]).collect();
                out.push(with_meta(
                    edge(
                        source,
                        target,
                        RelationshipKind::TopicSimilarity,
                        similarity.min(MAX_INFERRED),
                    ),
                    "shared_terms",
                    json!(shared),
                ));
            }
        }
    }
    out
}
