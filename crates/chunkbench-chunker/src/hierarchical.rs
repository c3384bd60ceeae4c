//! Header-boundary chunking.
//!
//! Every header at or above `max_split_level` opens a new section. A section
//! that fits `target_size` becomes one chunk; a longer one is packed into
//! consecutive parts without ever splitting a table or code block.

use chunkbench_core::{ChunkingConfig, ProcessorError};
use serde_json::json;

use crate::assembly::{pack, shape, Draft, Unit};
use crate::params;

const DEFAULT_MAX_SPLIT_LEVEL: u8 = 6;

pub(crate) fn drafts<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
) -> Result<Vec<Draft<'e>>, ProcessorError> {
    let max_split_level =
        params::optional_level(config, "max_split_level")?.unwrap_or(DEFAULT_MAX_SPLIT_LEVEL);

    let mut sections: Vec<Vec<Unit<'e>>> = Vec::new();
    for unit in units {
        let opens_section = unit
            .header_level()
            .is_some_and(|level| level <= max_split_level);
        match sections.last_mut() {
            Some(section) if !opens_section => section.push(*unit),
            _ => sections.push(vec![*unit]),
        }
    }

    let mut drafts = Vec::new();
    for section in &sections {
        let level = section.first().and_then(Unit::header_level);
        for (part, mut draft) in pack(section, config, config.target_size, "section")
            .into_iter()
            .enumerate()
        {
            if part > 0 {
                draft.kind = "section-continuation";
            }
            drafts.push(draft.with_semantic("section_level", json!(level)));
        }
    }

    Ok(shape(drafts, config))
}
