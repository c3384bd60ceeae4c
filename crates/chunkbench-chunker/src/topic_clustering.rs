//! Topic clustering over adjacent units.
//!
//! Consecutive units stay in one chunk while their bag-of-words similarity to
//! the chunk's running centroid is at least the threshold (`min_similarity`,
//! falling back to `semantic_threshold`) and the chunk fits `target_size`.
//! Headers always open a new chunk and pull in the unit that follows them.

use chunkbench_core::{ChunkingConfig, ProcessorError};
use serde_json::json;

use crate::assembly::{shape, Draft, Unit};
use crate::params;
use crate::text::{self, TermCounts};

const TOPIC_TERMS: usize = 3;

struct Cluster<'e> {
    draft: Draft<'e>,
    centroid: TermCounts,
    header_only: bool,
}

impl<'e> Cluster<'e> {
    fn open(unit: Unit<'e>, terms: TermCounts) -> Self {
        Self {
            draft: Draft::from_units("topic", vec![unit]),
            centroid: terms,
            header_only: unit.header_level().is_some(),
        }
    }

    fn add(&mut self, unit: Unit<'e>, terms: &TermCounts) {
        self.draft.push(unit);
        for (term, count) in terms {
            *self.centroid.entry(term.clone()).or_insert(0) += count;
        }
        self.header_only = false;
    }

    fn into_draft(self) -> Draft<'e> {
        let terms = text::top_terms(&self.centroid, TOPIC_TERMS);
        self.draft
            .with_semantic("topic", json!(terms.first()))
            .with_semantic("topic_terms", json!(terms))
    }
}

pub(crate) fn drafts<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
) -> Result<Vec<Draft<'e>>, ProcessorError> {
    let threshold =
        params::optional_ratio(config, "min_similarity")?.unwrap_or(config.semantic_threshold);

    let mut drafts = Vec::new();
    let mut current: Option<Cluster<'e>> = None;

    for unit in units {
        let terms = text::term_counts(unit.text);
        let joins = match &current {
            Some(cluster) if unit.header_level().is_none() && !unit.boundary_before => {
                cluster.header_only
                    || (text::cosine(&cluster.centroid, &terms) >= threshold
                        && cluster.draft.char_len_with(unit, config) <= config.target_size)
            }
            _ => false,
        };

        match current.as_mut() {
            Some(cluster) if joins => cluster.add(*unit, &terms),
            _ => {
                if let Some(done) = current.replace(Cluster::open(*unit, terms)) {
                    drafts.push(done.into_draft());
                }
            }
        }
    }
    drafts.extend(current.map(Cluster::into_draft));

    Ok(shape(drafts, config))
}
