//! Entity-centric chunking.
//!
//! Requires `custom_params.entities`, a list of entity names. Each unit is
//! assigned its dominant entity (most mentions, ties to the earlier entry in
//! the list); units that mention none inherit the running entity. A new chunk
//! starts when the dominant entity changes or the chunk would outgrow
//! `target_size`.

use chunkbench_core::{ChunkingConfig, ProcessorError};
use serde_json::{json, Value};

use crate::assembly::{shape, Draft, Unit};
use crate::params;

/// Case-insensitive whole-word mention counter.
struct EntityMatcher {
    names: Vec<String>,
    needles: Vec<String>,
}

impl EntityMatcher {
    fn new(names: Vec<String>) -> Self {
        let needles = names.iter().map(|n| n.to_lowercase()).collect();
        Self { names, needles }
    }

    fn mentions(&self, text: &str) -> Vec<usize> {
        let haystack = text.to_lowercase();
        self.needles
            .iter()
            .map(|needle| count_words(&haystack, needle))
            .collect()
    }

    /// Index of the most-mentioned entity, if any is mentioned.
    fn dominant(&self, text: &str) -> Option<usize> {
        let counts = self.mentions(text);
        let best = counts.iter().copied().max().filter(|n| *n > 0)?;
        counts.iter().position(|n| *n == best)
    }

    /// Names of every entity mentioned in `text`, in list order.
    fn mentioned(&self, text: &str) -> Vec<&str> {
        self.mentions(text)
            .iter()
            .zip(&self.names)
            .filter(|(count, _)| **count > 0)
            .map(|(_, name)| name.as_str())
            .collect()
    }
}

fn count_words(haystack: &str, needle: &str) -> usize {
    haystack
        .match_indices(needle)
        .filter(|(at, _)| {
            let before = haystack[..*at].chars().next_back();
            let after = haystack[at + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
        .count()
}

pub(crate) fn drafts<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
) -> Result<Vec<Draft<'e>>, ProcessorError> {
    let matcher = EntityMatcher::new(params::required_strings(config, "entities")?);

    let mut drafts = Vec::new();
    let mut current = Draft::new("entity");
    let mut running: Option<usize> = None;

    for unit in units {
        let entity = matcher.dominant(unit.text).or(running);
        let shifts = entity != running;
        if !current.is_empty()
            && (shifts || current.char_len_with(unit, config) > config.target_size)
        {
            let done = std::mem::replace(&mut current, Draft::new("entity"));
            drafts.push(label(done, &matcher, running));
        }
        running = entity;
        current.push(*unit);
    }
    if !current.is_empty() {
        drafts.push(label(current, &matcher, running));
    }

    let mut drafts = shape(drafts, config);
    for draft in &mut drafts {
        let text: Vec<&str> = draft.units.iter().map(|u| u.text).collect();
        let mentioned = matcher.mentioned(&text.join("\n"));
        draft.semantic.insert("entities".to_string(), json!(mentioned));
    }
    Ok(drafts)
}

fn label<'e>(draft: Draft<'e>, matcher: &EntityMatcher, entity: Option<usize>) -> Draft<'e> {
    let name = entity
        .and_then(|idx| matcher.names.get(idx))
        .map_or(Value::Null, |name| json!(name));
    draft.with_semantic("entity", name)
}
