//! Shared assembly toolkit.
//!
//! Strategies decide where chunks begin and end by producing [`Draft`]s over
//! [`Unit`]s. This module owns everything the strategies have in common:
//!
//! - grouping elements into units ([`units`])
//! - greedy packing under a size limit ([`Packer`])
//! - the size rules: split above `max_size`, merge below `min_size` ([`shape`])
//! - turning drafts into [`Chunk`]s with ids and metadata ([`materialize`])

use chrono::Utc;
use chunkbench_core::{
    Chunk, ChunkingConfig, Element, ElementKind, Metadata, ProcessorError, StructuralMetadata,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::text;

/// Number of keywords attached to each chunk when metadata is enabled.
const KEYWORD_COUNT: usize = 5;

// ============================================================================
// Units
// ============================================================================

/// A block element together with the child elements that follow it.
///
/// `text` is the content contributed to a chunk. For a block this is the
/// block's own content, which already includes the raw text of its children.
#[derive(Debug, Clone, Copy)]
pub struct Unit<'e> {
    pub elements: &'e [Element],
    pub text: &'e str,
    /// A separator (horizontal rule) preceded this unit
    pub boundary_before: bool,
}

impl<'e> Unit<'e> {
    /// Element that leads the unit.
    #[must_use]
    pub fn lead(&self) -> &'e Element {
        &self.elements[0]
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.lead().kind
    }

    #[must_use]
    pub fn char_len(&self) -> usize {
        text::char_len(self.text)
    }

    #[must_use]
    pub fn is_atomic(&self) -> bool {
        self.kind().is_atomic()
    }

    /// Header depth when the unit is a header.
    #[must_use]
    pub fn header_level(&self) -> Option<u8> {
        (self.kind() == ElementKind::Header).then(|| self.lead().level.unwrap_or(1))
    }
}

/// Group elements into units.
///
/// Every block starts a unit and takes the non-block elements after it.
/// Separator blocks are dropped and set `boundary_before` on the next unit.
#[must_use]
pub fn units(elements: &[Element]) -> Vec<Unit<'_>> {
    let mut units = Vec::new();
    let mut boundary = false;
    let mut idx = 0;

    while idx < elements.len() {
        let lead = &elements[idx];
        let mut end = idx + 1;
        if lead.kind.is_block() {
            while end < elements.len() && !elements[end].kind.is_block() {
                end += 1;
            }
        }

        if lead.kind.is_separator() {
            boundary = true;
        } else {
            units.push(Unit {
                elements: &elements[idx..end],
                text: &lead.content,
                boundary_before: boundary,
            });
            boundary = false;
        }
        idx = end;
    }

    units
}

// ============================================================================
// Drafts
// ============================================================================

/// A planned chunk: the units it covers plus strategy-provided labels.
#[derive(Debug, Clone)]
pub struct Draft<'e> {
    pub units: Vec<Unit<'e>>,
    /// Chunk kind tag
    pub kind: &'static str,
    /// Overrides the configured separator when joining unit text
    pub joiner: Option<&'static str>,
    /// Explicit content, used instead of joining unit text
    pub content: Option<String>,
    /// Content is final: never split or merged
    pub fixed: bool,
    /// Strategy labels, attached regardless of `use_metadata`
    pub semantic: Metadata,
    /// Never merged with neighbours
    pub standalone: bool,
}

impl<'e> Draft<'e> {
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            units: Vec::new(),
            kind,
            joiner: None,
            content: None,
            fixed: false,
            semantic: Metadata::new(),
            standalone: false,
        }
    }

    #[must_use]
    pub fn from_units(kind: &'static str, units: Vec<Unit<'e>>) -> Self {
        Self {
            units,
            ..Self::new(kind)
        }
    }

    #[must_use]
    pub fn with_semantic(mut self, key: &str, value: Value) -> Self {
        self.semantic.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn standalone(mut self) -> Self {
        self.standalone = true;
        self
    }

    pub fn push(&mut self, unit: Unit<'e>) {
        self.units.push(unit);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    fn joiner<'c>(&'c self, config: &'c ChunkingConfig) -> &'c str {
        self.joiner.unwrap_or(config.separator.as_str())
    }

    /// Rendered length in chars.
    #[must_use]
    pub fn char_len(&self, config: &ChunkingConfig) -> usize {
        if let Some(content) = &self.content {
            return text::char_len(content);
        }
        let units: usize = self.units.iter().map(Unit::char_len).sum();
        let joins = self.units.len().saturating_sub(1) * text::char_len(self.joiner(config));
        units + joins
    }

    /// Rendered length after appending `unit`.
    #[must_use]
    pub fn char_len_with(&self, unit: &Unit<'_>, config: &ChunkingConfig) -> usize {
        if self.is_empty() {
            return unit.char_len();
        }
        self.char_len(config) + text::char_len(self.joiner(config)) + unit.char_len()
    }

    fn render(&self, config: &ChunkingConfig) -> String {
        match &self.content {
            Some(content) => content.clone(),
            None => self
                .units
                .iter()
                .map(|u| u.text)
                .collect::<Vec<_>>()
                .join(self.joiner(config)),
        }
    }

    fn can_absorb(&self, other: &Draft<'_>, config: &ChunkingConfig) -> bool {
        !self.fixed
            && !other.fixed
            && !self.standalone
            && !other.standalone
            && self.joiner == other.joiner
            && self.char_len(config) + text::char_len(self.joiner(config)) + other.char_len(config)
                <= config.max_size
    }

    fn absorb(&mut self, other: Draft<'e>, config: &ChunkingConfig) {
        if self.content.is_some() || other.content.is_some() {
            let joined = format!(
                "{}{}{}",
                self.render(config),
                self.joiner(config),
                other.render(config)
            );
            self.content = Some(joined);
        }
        // Pieces of one split unit share that unit.
        let mut incoming = other.units.into_iter().peekable();
        let shared = match (self.units.last(), incoming.peek()) {
            (Some(last), Some(first)) => same_unit(last, first),
            _ => false,
        };
        if shared {
            incoming.next();
        }
        self.units.extend(incoming);
        for (key, value) in other.semantic {
            self.semantic.entry(key).or_insert(value);
        }
    }

    fn is_undersized(&self, config: &ChunkingConfig) -> bool {
        !self.fixed && !self.standalone && self.char_len(config) < config.min_size
    }
}

fn same_unit(a: &Unit<'_>, b: &Unit<'_>) -> bool {
    std::ptr::eq(a.elements, b.elements)
}

/// Greedy packer: flushes whenever the next unit would push the open draft
/// past `limit`.
#[derive(Debug)]
pub struct Packer<'e, 'c> {
    config: &'c ChunkingConfig,
    limit: usize,
    current: Draft<'e>,
    done: Vec<Draft<'e>>,
}

impl<'e, 'c> Packer<'e, 'c> {
    #[must_use]
    pub fn new(config: &'c ChunkingConfig, limit: usize, kind: &'static str) -> Self {
        Self {
            config,
            limit,
            current: Draft::new(kind),
            done: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_joiner(mut self, joiner: Option<&'static str>) -> Self {
        self.current.joiner = joiner;
        self
    }

    pub fn push(&mut self, unit: Unit<'e>) {
        if !self.current.is_empty() && self.current.char_len_with(&unit, self.config) > self.limit
        {
            self.flush();
        }
        self.current.push(unit);
    }

    /// Close the open draft, if any.
    pub fn flush(&mut self) {
        let template = Draft {
            joiner: self.current.joiner,
            ..Draft::new(self.current.kind)
        };
        let draft = std::mem::replace(&mut self.current, template);
        if !draft.is_empty() {
            self.done.push(draft);
        }
    }

    /// Close the open draft and hand over everything packed so far.
    pub fn drain(&mut self) -> Vec<Draft<'e>> {
        self.flush();
        std::mem::take(&mut self.done)
    }

    #[must_use]
    pub fn finish(mut self) -> Vec<Draft<'e>> {
        self.flush();
        self.done
    }
}

/// Pack units in order into drafts no longer than `limit`.
#[must_use]
pub fn pack<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
    limit: usize,
    kind: &'static str,
) -> Vec<Draft<'e>> {
    let mut packer = Packer::new(config, limit, kind);
    for unit in units {
        packer.push(*unit);
    }
    packer.finish()
}

// ============================================================================
// Size rules
// ============================================================================

/// Apply the shared size rules: split drafts above `max_size`, then merge
/// drafts below `min_size` into a neighbour when the result still fits.
#[must_use]
pub fn shape<'e>(drafts: Vec<Draft<'e>>, config: &ChunkingConfig) -> Vec<Draft<'e>> {
    merge_undersized(enforce_max(drafts, config), config)
}

fn enforce_max<'e>(drafts: Vec<Draft<'e>>, config: &ChunkingConfig) -> Vec<Draft<'e>> {
    let mut out = Vec::with_capacity(drafts.len());
    for draft in drafts {
        if draft.content.is_some() || draft.char_len(config) <= config.max_size {
            out.push(draft);
        } else if draft.units.len() > 1 {
            let mut packer =
                Packer::new(config, config.max_size, draft.kind).with_joiner(draft.joiner);
            for unit in &draft.units {
                packer.push(*unit);
            }
            for mut part in packer.finish() {
                part.semantic = draft.semantic.clone();
                part.standalone = draft.standalone;
                out.extend(split_unit(part, config));
            }
        } else {
            out.extend(split_unit(draft, config));
        }
    }
    out
}

/// Split a single oversized non-atomic unit at whitespace. Atomic units are
/// returned whole even when they exceed `max_size`.
///
/// Pieces carry their text as explicit content but stay mergeable, so an
/// undersized tail can still join a neighbour.
fn split_unit<'e>(draft: Draft<'e>, config: &ChunkingConfig) -> Vec<Draft<'e>> {
    if draft.units.len() != 1 {
        return vec![draft];
    }
    let unit = draft.units[0];
    if unit.is_atomic() || draft.char_len(config) <= config.max_size {
        return vec![draft];
    }

    text::split_to_fit(unit.text, config.max_size)
        .into_iter()
        .map(|piece| Draft {
            units: vec![unit],
            joiner: draft.joiner,
            content: Some(piece),
            semantic: draft.semantic.clone(),
            standalone: draft.standalone,
            ..Draft::new(draft.kind)
        })
        .collect()
}

fn merge_undersized<'e>(drafts: Vec<Draft<'e>>, config: &ChunkingConfig) -> Vec<Draft<'e>> {
    if drafts.len() < 2 || config.min_size == 0 {
        return drafts;
    }

    let mut out: Vec<Draft<'e>> = Vec::with_capacity(drafts.len());
    let mut rest = drafts.into_iter().peekable();
    while let Some(mut draft) = rest.next() {
        if draft.is_undersized(config) {
            if let Some(prev) = out.last_mut() {
                if prev.can_absorb(&draft, config) {
                    prev.absorb(draft, config);
                    continue;
                }
            }
            while let Some(next) =
                rest.next_if(|next| draft.is_undersized(config) && draft.can_absorb(next, config))
            {
                draft.absorb(next, config);
            }
        }
        out.push(draft);
    }
    out
}

// ============================================================================
// Materialization
// ============================================================================

/// Header outline of a document, used to compute header paths.
struct Outline {
    headers: Vec<(usize, u8, String)>,
}

impl Outline {
    fn new(elements: &[Element]) -> Self {
        let headers = elements
            .iter()
            .filter_map(|e| {
                let text = e.header_text()?;
                Some((e.position, e.level.unwrap_or(1), text))
            })
            .collect();
        Self { headers }
    }

    /// Texts of the headers enclosing `position`, outermost first.
    fn path_at(&self, position: usize) -> Vec<String> {
        let mut stack: Vec<(u8, &str)> = Vec::new();
        for (pos, level, text) in &self.headers {
            if *pos > position {
                break;
            }
            while stack.last().is_some_and(|(l, _)| *l >= *level) {
                stack.pop();
            }
            stack.push((*level, text.as_str()));
        }
        stack.into_iter().map(|(_, t)| t.to_string()).collect()
    }
}

/// Turn drafts into chunks, assigning ordinals and deterministic ids.
///
/// Fails when a draft would violate the shared ordering or size invariants.
pub fn materialize(
    drafts: Vec<Draft<'_>>,
    document_id: &str,
    elements: &[Element],
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>, ProcessorError> {
    let created_at = Utc::now();
    let outline = Outline::new(elements);
    let violated = |detail: String| ProcessorError::InvariantViolated {
        strategy_id: config.strategy_id.clone(),
        detail,
    };

    let mut chunks: Vec<Chunk> = Vec::with_capacity(drafts.len());
    for draft in drafts.into_iter().filter(|d| !d.is_empty()) {
        let ordinal = u32::try_from(chunks.len())
            .map_err(|_| violated("chunk count exceeds u32".to_string()))?;
        let content = draft.render(config);
        let elements: Vec<Element> = draft
            .units
            .iter()
            .flat_map(|u| u.elements.iter().cloned())
            .collect();

        let position_start = elements.iter().map(|e| e.position).min().unwrap_or(0);
        let position_end = elements
            .iter()
            .map(|e| e.position)
            .max()
            .unwrap_or(position_start);

        if let Some(prev) = chunks.last() {
            if position_start < prev.position_start {
                return Err(violated(format!(
                    "chunk {ordinal} starts at {position_start}, before previous start {}",
                    prev.position_start
                )));
            }
        }
        let char_count = text::char_len(&content);
        let atomic_override = draft.units.len() == 1 && draft.units[0].is_atomic();
        if char_count > config.max_size && !atomic_override {
            return Err(violated(format!(
                "chunk {ordinal} has {char_count} chars, max_size is {}",
                config.max_size
            )));
        }

        let mut kind_histogram = BTreeMap::new();
        for element in &elements {
            *kind_histogram.entry(element.kind).or_insert(0) += 1;
        }
        let header_path = outline.path_at(position_start);

        let mut semantic = draft.semantic;
        if config.use_metadata {
            semantic.insert(
                "keywords".to_string(),
                json!(text::keywords(&content, KEYWORD_COUNT)),
            );
            semantic.insert(
                "has_code".to_string(),
                json!(elements
                    .iter()
                    .any(|e| matches!(e.kind, ElementKind::CodeBlock | ElementKind::InlineCode))),
            );
            semantic.insert(
                "link_count".to_string(),
                json!(elements
                    .iter()
                    .filter(|e| e.kind == ElementKind::Link)
                    .count()),
            );
            if let Some(heading) = header_path.last() {
                semantic.insert("heading".to_string(), json!(heading));
            }
        }

        chunks.push(Chunk {
            chunk_id: Chunk::derive_id(document_id, &config.strategy_id, ordinal),
            document_id: document_id.to_string(),
            strategy_id: config.strategy_id.clone(),
            ordinal,
            word_count: content.split_whitespace().count(),
            structural_metadata: StructuralMetadata {
                element_count: elements.len(),
                kind_histogram,
                header_path,
            },
            content,
            elements,
            chunk_kind: draft.kind.to_string(),
            semantic_metadata: semantic,
            position_start,
            position_end,
            created_at,
        });
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(text: &str, position: usize) -> Element {
        Element::new(ElementKind::Paragraph, text, position)
    }

    fn config(min: usize, target: usize, max: usize) -> ChunkingConfig {
        ChunkingConfig {
            min_size: min,
            target_size: target,
            max_size: max,
            separator: "\n\n".to_string(),
            ..ChunkingConfig::new("test")
        }
    }

    #[test]
    fn test_units_group_children_and_drop_separators() {
        let elements = vec![
            Element::new(ElementKind::List, "- a\n- b", 0),
            Element::new(ElementKind::ListItem, "a", 1),
            Element::new(ElementKind::ListItem, "b", 2),
            Element::new(ElementKind::HorizontalRule, "---", 3),
            paragraph("after", 4),
        ];
        let units = units(&elements);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].elements.len(), 3);
        assert_eq!(units[0].text, "- a\n- b");
        assert!(!units[0].boundary_before);
        assert!(units[1].boundary_before);
    }

    #[test]
    fn test_pack_respects_limit() {
        let elements: Vec<Element> = (0..4).map(|i| paragraph("0123456789", i)).collect();
        let units = units(&elements);
        let cfg = config(0, 30, 60);
        // 10 + 2 + 10 = 22 fits in 25; a third unit would make 34.
        let drafts = pack(&units, &cfg, 25, "text");
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].units.len(), 2);
        assert_eq!(drafts[0].char_len(&cfg), 22);
    }

    #[test]
    fn test_shape_splits_oversized_prose() {
        let long = "word ".repeat(40);
        let elements = vec![paragraph(long.trim(), 0)];
        let units = units(&elements);
        let cfg = config(0, 50, 60);
        let drafts = shape(vec![Draft::from_units("text", units)], &cfg);
        assert!(drafts.len() > 1);
        for draft in &drafts {
            assert!(draft.char_len(&cfg) <= 60);
        }
    }

    #[test]
    fn test_shape_keeps_oversized_code_whole() {
        let code = format!("```\n{}\n```", "let x = 1;\n".repeat(20));
        let elements = vec![Element::new(ElementKind::CodeBlock, code.clone(), 0)];
        let units = units(&elements);
        let cfg = config(0, 50, 60);
        let drafts = shape(vec![Draft::from_units("code", units)], &cfg);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].render(&cfg), code);
    }

    #[test]
    fn test_shape_merges_undersized_into_previous() {
        let elements = vec![paragraph(&"a".repeat(40), 0), paragraph("tiny", 1)];
        let units = units(&elements);
        let cfg = config(10, 50, 100);
        let drafts = vec![
            Draft::from_units("text", vec![units[0]]),
            Draft::from_units("text", vec![units[1]]),
        ];
        let shaped = shape(drafts, &cfg);
        assert_eq!(shaped.len(), 1);
        assert_eq!(shaped[0].units.len(), 2);
    }

    #[test]
    fn test_shape_merges_leading_undersized_forward() {
        let elements = vec![paragraph("tiny", 0), paragraph(&"a".repeat(40), 1)];
        let units = units(&elements);
        let cfg = config(10, 50, 100);
        let drafts = vec![
            Draft::from_units("text", vec![units[0]]),
            Draft::from_units("text", vec![units[1]]),
        ];
        let shaped = shape(drafts, &cfg);
        assert_eq!(shaped.len(), 1);
        assert_eq!(shaped[0].render(&cfg), format!("tiny\n\n{}", "a".repeat(40)));
    }

    #[test]
    fn test_shape_keeps_merging_forward_while_undersized() {
        let elements = vec![
            paragraph(&"a".repeat(95), 0),
            paragraph("bbbbb", 1),
            paragraph("ccccc", 2),
            paragraph(&"d".repeat(60), 3),
        ];
        let units = units(&elements);
        let cfg = config(15, 50, 100);
        let drafts = units
            .iter()
            .map(|u| Draft::from_units("text", vec![*u]))
            .collect();

        let shaped = shape(drafts, &cfg);
        assert_eq!(shaped.len(), 2);
        // "bbbbb" cannot join the 95-char draft; it collects both followers.
        assert_eq!(shaped[1].units.len(), 3);
        assert_eq!(shaped[1].char_len(&cfg), 74);
    }

    #[test]
    fn test_shape_does_not_merge_past_max() {
        let elements = vec![paragraph(&"a".repeat(95), 0), paragraph("tiny", 1)];
        let units = units(&elements);
        let cfg = config(10, 50, 100);
        let drafts = vec![
            Draft::from_units("text", vec![units[0]]),
            Draft::from_units("text", vec![units[1]]),
        ];
        assert_eq!(shape(drafts, &cfg).len(), 2);
    }

    #[test]
    fn test_shape_never_merges_standalone() {
        let elements = vec![paragraph("tiny", 0), paragraph("also tiny", 1)];
        let units = units(&elements);
        let cfg = config(50, 50, 100);
        let drafts = vec![
            Draft::from_units("text", vec![units[0]]).standalone(),
            Draft::from_units("text", vec![units[1]]),
        ];
        assert_eq!(shape(drafts, &cfg).len(), 2);
    }

    #[test]
    fn test_split_tail_merges_with_next_paragraph() {
        // 106 chars: splits into 99 chars of "word" and a 6-char tail.
        let long = format!("{}x", "word ".repeat(21));
        let elements = vec![paragraph(&long, 0), paragraph("Short trailing para.", 1)];
        let units = units(&elements);
        let cfg = config(15, 50, 100);
        let drafts = vec![
            Draft::from_units("text", vec![units[0]]),
            Draft::from_units("text", vec![units[1]]),
        ];

        let shaped = shape(drafts, &cfg);
        let rendered: Vec<String> = shaped.iter().map(|d| d.render(&cfg)).collect();
        assert_eq!(
            rendered,
            vec![
                format!("{}word", "word ".repeat(19)),
                "word x\n\nShort trailing para.".to_string(),
            ]
        );
        assert_eq!(shaped[1].units.len(), 2);
        assert_eq!(shaped[1].char_len(&cfg), 28);
    }

    #[test]
    fn test_shape_leaves_fixed_content_alone() {
        let elements = vec![paragraph("tiny", 0), paragraph("also tiny", 1)];
        let units = units(&elements);
        let cfg = config(50, 50, 100);
        let drafts = units
            .iter()
            .map(|u| Draft {
                content: Some(u.text.to_string()),
                fixed: true,
                ..Draft::from_units("window", vec![*u])
            })
            .collect();
        assert_eq!(shape(drafts, &cfg).len(), 2);
    }

    #[test]
    fn test_materialize_ids_and_metadata() {
        let elements = vec![
            Element::new(ElementKind::Header, "# Guide", 0).with_level(1),
            paragraph("Install the chunker crate.", 1),
            Element::new(ElementKind::Header, "## Usage", 2).with_level(2),
            paragraph("Call assemble on parsed elements.", 3),
        ];
        let units = units(&elements);
        let cfg = config(0, 100, 200);
        let drafts = vec![
            Draft::from_units("section", units[..2].to_vec()),
            Draft::from_units("section", units[2..].to_vec()),
        ];
        let chunks = materialize(drafts, "doc", &elements, &cfg).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "# Guide\n\nInstall the chunker crate.");
        assert_eq!(chunks[0].chunk_id, Chunk::derive_id("doc", "test", 0));
        assert_eq!(chunks[1].ordinal, 1);
        assert_eq!(chunks[1].position_start, 2);
        assert_eq!(chunks[1].position_end, 3);
        assert_eq!(
            chunks[1].structural_metadata.header_path,
            vec!["Guide".to_string(), "Usage".to_string()]
        );
        assert_eq!(chunks[1].semantic_metadata["heading"], json!("Usage"));
        assert_eq!(chunks[1].word_count, 7);
        assert_eq!(
            chunks[0].structural_metadata.kind_histogram[&ElementKind::Header],
            1
        );
    }

    #[test]
    fn test_materialize_without_metadata() {
        let elements = vec![paragraph("plain", 0)];
        let units = units(&elements);
        let cfg = ChunkingConfig {
            use_metadata: false,
            ..config(0, 100, 200)
        };
        let chunks =
            materialize(vec![Draft::from_units("text", units)], "doc", &elements, &cfg).unwrap();
        assert!(chunks[0].semantic_metadata.is_empty());
    }

    #[test]
    fn test_materialize_rejects_out_of_order_drafts() {
        let elements = vec![paragraph("one", 0), paragraph("two", 1)];
        let units = units(&elements);
        let cfg = config(0, 100, 200);
        let drafts = vec![
            Draft::from_units("text", vec![units[1]]),
            Draft::from_units("text", vec![units[0]]),
        ];
        let err = materialize(drafts, "doc", &elements, &cfg).unwrap_err();
        assert!(matches!(err, ProcessorError::InvariantViolated { .. }));
        assert_eq!(err.strategy_id(), "test");
    }
}
