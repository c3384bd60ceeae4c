//! Content-adaptive chunking.
//!
//! Units are grouped into runs of one content class (prose, list, quote,
//! code, table). A header, a horizontal rule or a change of class ends the
//! run; headers travel with the run that follows them. Each run is packed
//! with a class-dependent limit: prose to `target_size`, lists halfway to
//! `max_size`, and code or tables up to `max_size` so neighbouring snippets
//! stay together.

use chunkbench_core::{ChunkingConfig, ElementKind, ProcessorError};
use serde_json::json;

use crate::assembly::{pack, shape, Draft, Unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentClass {
    Prose,
    List,
    Quote,
    Code,
    Table,
}

impl ContentClass {
    fn of(unit: &Unit<'_>) -> Self {
        match unit.kind() {
            ElementKind::CodeBlock => Self::Code,
            ElementKind::Table => Self::Table,
            ElementKind::List => Self::List,
            ElementKind::Blockquote => Self::Quote,
            _ => Self::Prose,
        }
    }

    fn kind(self) -> &'static str {
        match self {
            Self::Prose => "prose",
            Self::List => "list",
            Self::Quote => "quote",
            Self::Code => "code",
            Self::Table => "table",
        }
    }

    fn limit(self, config: &ChunkingConfig) -> usize {
        match self {
            Self::Prose | Self::Quote => config.target_size,
            Self::List => {
                config.target_size + config.max_size.saturating_sub(config.target_size) / 2
            }
            Self::Code | Self::Table => config.max_size,
        }
    }
}

struct Run<'e> {
    class: ContentClass,
    units: Vec<Unit<'e>>,
}

pub(crate) fn drafts<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
) -> Result<Vec<Draft<'e>>, ProcessorError> {
    let mut runs: Vec<Run<'e>> = Vec::new();
    let mut headers: Vec<Unit<'e>> = Vec::new();

    for unit in units {
        if unit.header_level().is_some() {
            if unit.boundary_before && !headers.is_empty() {
                runs.push(Run {
                    class: ContentClass::Prose,
                    units: std::mem::take(&mut headers),
                });
            }
            headers.push(*unit);
            continue;
        }

        let class = ContentClass::of(unit);
        let continues = headers.is_empty()
            && !unit.boundary_before
            && runs.last().is_some_and(|run| run.class == class);
        match runs.last_mut() {
            Some(run) if continues => run.units.push(*unit),
            _ => {
                let mut members = std::mem::take(&mut headers);
                members.push(*unit);
                runs.push(Run {
                    class,
                    units: members,
                });
            }
        }
    }
    if !headers.is_empty() {
        runs.push(Run {
            class: ContentClass::Prose,
            units: headers,
        });
    }

    let mut drafts = Vec::new();
    for run in &runs {
        let kind = run.class.kind();
        drafts.extend(
            pack(&run.units, config, run.class.limit(config), kind)
                .into_iter()
                .map(|d| d.with_semantic("content_class", json!(kind))),
        );
    }

    Ok(shape(drafts, config))
}
