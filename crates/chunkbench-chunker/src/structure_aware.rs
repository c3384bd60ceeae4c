//! Markdown structure-aware hierarchical chunking.
//!
//! Every header opens a section and each section records its breadcrumb (the
//! texts of the enclosing headers). A section absorbs the deeper sections that
//! follow it while the whole stays within `target_size`, so short subsections
//! travel with their parent. Longer sections are packed into parts.

use chunkbench_core::{ChunkingConfig, ProcessorError};
use serde_json::json;

use crate::assembly::{pack, shape, Draft, Unit};
use crate::text;

const BREADCRUMB_SEPARATOR: &str = " > ";

struct Section<'e> {
    units: Vec<Unit<'e>>,
    /// `None` for text before the first header
    level: Option<u8>,
    breadcrumb: Vec<String>,
}

fn sections<'e>(units: &[Unit<'e>]) -> Vec<Section<'e>> {
    let mut sections: Vec<Section<'e>> = Vec::new();
    let mut stack: Vec<(u8, String)> = Vec::new();

    for unit in units {
        match unit.header_level() {
            Some(level) => {
                while stack.last().is_some_and(|(l, _)| *l >= level) {
                    stack.pop();
                }
                stack.push((level, unit.lead().header_text().unwrap_or_default()));
                sections.push(Section {
                    units: vec![*unit],
                    level: Some(level),
                    breadcrumb: stack.iter().map(|(_, t)| t.clone()).collect(),
                });
            }
            None => match sections.last_mut() {
                Some(section) => section.units.push(*unit),
                None => sections.push(Section {
                    units: vec![*unit],
                    level: None,
                    breadcrumb: Vec::new(),
                }),
            },
        }
    }
    sections
}

fn rendered_len(units: &[Unit<'_>], config: &ChunkingConfig) -> usize {
    let body: usize = units.iter().map(Unit::char_len).sum();
    body + units.len().saturating_sub(1) * text::char_len(&config.separator)
}

pub(crate) fn drafts<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
) -> Result<Vec<Draft<'e>>, ProcessorError> {
    let mut sections = sections(units).into_iter().peekable();
    let mut drafts = Vec::new();

    while let Some(mut group) = sections.next() {
        if let Some(level) = group.level {
            while let Some(child) = sections.next_if(|next| {
                next.level.is_some_and(|l| l > level) && {
                    let combined = rendered_len(&group.units, config)
                        + text::char_len(&config.separator)
                        + rendered_len(&next.units, config);
                    combined <= config.target_size
                }
            }) {
                group.units.extend(child.units);
            }
        }

        let breadcrumb = group.breadcrumb.join(BREADCRUMB_SEPARATOR);
        let depth = group.breadcrumb.len();
        drafts.extend(
            pack(&group.units, config, config.target_size, "section")
                .into_iter()
                .map(|draft| {
                    draft
                        .with_semantic("breadcrumb", json!(breadcrumb))
                        .with_semantic("depth", json!(depth))
                }),
        );
    }

    Ok(shape(drafts, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::units;
    use chunkbench_parse::parse;

    const DOC: &str = "# A\n\nIntro.\n\n## B\n\nShort.\n\n## C\n\nAlso short.\n\n# D\n\nEnd.";

    fn config(target: usize) -> ChunkingConfig {
        ChunkingConfig {
            min_size: 0,
            target_size: target,
            max_size: target * 2,
            ..ChunkingConfig::new("structure_aware_hierarchical")
        }
    }

    #[test]
    fn test_short_children_travel_with_parent() {
        let elements = parse(DOC);
        let units = units(&elements);
        let drafts = drafts(&units, &config(100)).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].units.len(), 6);
        assert_eq!(drafts[0].semantic["breadcrumb"], json!("A"));
        assert_eq!(drafts[1].semantic["breadcrumb"], json!("D"));
    }

    #[test]
    fn test_breadcrumbs_when_sections_stand_alone() {
        let elements = parse(DOC);
        let units = units(&elements);
        let drafts = drafts(&units, &config(20)).unwrap();

        let crumbs: Vec<_> = drafts.iter().map(|d| d.semantic["breadcrumb"].clone()).collect();
        assert_eq!(
            crumbs,
            vec![json!("A"), json!("A > B"), json!("A > C"), json!("D")]
        );
        assert_eq!(drafts[1].semantic["depth"], json!(2));
    }

    #[test]
    fn test_preface_before_first_header() {
        let elements = parse("Preface text.\n\n# Title\n\nBody.");
        let units = units(&elements);
        let drafts = drafts(&units, &config(20)).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].semantic["breadcrumb"], json!(""));
        assert_eq!(drafts[0].semantic["depth"], json!(0));
    }
}
