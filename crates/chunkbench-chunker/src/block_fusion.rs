//! Markdown semantic block fusion.
//!
//! Adjacent blocks that belong together are fused into one chunk:
//!
//! - a header with the block under it (`heading`)
//! - a paragraph ending in `:` with the list, table or code it introduces
//!   (`intro+structure`)
//! - prose with the code block that follows it (`prose+code`)
//! - two paragraphs whose term similarity reaches `semantic_threshold`
//!   (`similar`)
//!
//! Fusion stops at `target_size`, or at `max_size` when the incoming block is
//! a table or code block.

use chunkbench_core::{ChunkingConfig, ElementKind, ProcessorError};
use serde_json::json;

use crate::assembly::{shape, Draft, Unit};
use crate::text;

/// Why `next` should join the block before it, if it should.
fn fusion_reason(prev: &Unit<'_>, next: &Unit<'_>, threshold: f32) -> Option<&'static str> {
    if next.header_level().is_some() || next.boundary_before {
        return None;
    }
    let prev_kind = prev.kind();
    let next_kind = next.kind();

    if prev_kind == ElementKind::Header {
        return Some("heading");
    }
    if prev_kind == ElementKind::Paragraph
        && prev.text.trim_end().ends_with(':')
        && matches!(
            next_kind,
            ElementKind::List | ElementKind::Table | ElementKind::CodeBlock
        )
    {
        return Some("intro+structure");
    }
    if matches!(prev_kind, ElementKind::Paragraph | ElementKind::Blockquote)
        && next_kind == ElementKind::CodeBlock
    {
        return Some("prose+code");
    }
    if prev_kind == ElementKind::Paragraph
        && next_kind == ElementKind::Paragraph
        && text::cosine(&text::term_counts(prev.text), &text::term_counts(next.text))
            >= threshold
    {
        return Some("similar");
    }
    None
}

fn finish<'e>(draft: Draft<'e>, reasons: &[&'static str]) -> Draft<'e> {
    let kind = if draft.units.len() > 1 {
        "fused-block"
    } else {
        "block"
    };
    Draft { kind, ..draft }.with_semantic("fusion", json!(reasons))
}

pub(crate) fn drafts<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
) -> Result<Vec<Draft<'e>>, ProcessorError> {
    let mut drafts = Vec::new();
    let mut current = Draft::new("block");
    let mut reasons: Vec<&'static str> = Vec::new();

    for unit in units {
        let limit = if unit.is_atomic() {
            config.max_size
        } else {
            config.target_size
        };
        let reason = current
            .units
            .last()
            .and_then(|prev| fusion_reason(prev, unit, config.semantic_threshold))
            .filter(|_| current.char_len_with(unit, config) <= limit);

        match reason {
            Some(reason) => {
                if !reasons.contains(&reason) {
                    reasons.push(reason);
                }
            }
            None if !current.is_empty() => {
                let done = std::mem::replace(&mut current, Draft::new("block"));
                drafts.push(finish(done, &reasons));
                reasons.clear();
            }
            None => {}
        }
        current.push(*unit);
    }
    if !current.is_empty() {
        drafts.push(finish(current, &reasons));
    }

    Ok(shape(drafts, config))
}
