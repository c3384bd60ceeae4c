//! Row-oriented chunking.
//!
//! Tables and lists are exploded into one unit per row (or item), then rows
//! are grouped, either `rows_per_chunk` at a time or packed to `target_size`.
//! Prose between tables is packed normally. With `overlap > 0` the trailing
//! whole rows of each group whose combined length is closest to `overlap`
//! are repeated at the head of the next group.

use chunkbench_core::{ChunkingConfig, ElementKind, ProcessorError};
use serde_json::json;

use crate::assembly::{pack, shape, Draft, Packer, Unit};
use crate::{params, text};

const ROW_JOINER: &str = "\n";

/// A run of units that chunk together: one table or list, or a stretch of prose.
struct Segment<'e> {
    units: Vec<Unit<'e>>,
    tabular: bool,
    header: Option<&'e str>,
}

/// Split a table or list unit into row units. Other units pass through.
///
/// The first row keeps the parent block element so nothing is dropped.
fn explode<'e>(unit: Unit<'e>) -> Vec<Unit<'e>> {
    let row_kind = match unit.kind() {
        ElementKind::Table => ElementKind::TableRow,
        ElementKind::List => ElementKind::ListItem,
        _ => return vec![unit],
    };

    let starts: Vec<usize> = unit
        .elements
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, e)| e.kind == row_kind)
        .map(|(i, _)| i)
        .collect();
    if starts.is_empty() {
        return vec![unit];
    }

    starts
        .iter()
        .enumerate()
        .map(|(n, &row)| {
            let from = if n == 0 { 0 } else { row };
            let to = starts.get(n + 1).copied().unwrap_or(unit.elements.len());
            Unit {
                elements: &unit.elements[from..to],
                text: &unit.elements[row].content,
                boundary_before: n == 0 && unit.boundary_before,
            }
        })
        .collect()
}

/// Element positions spanned by each table or list.
fn tabular_spans(units: &[Unit<'_>]) -> Vec<(usize, usize)> {
    units
        .iter()
        .filter(|u| matches!(u.kind(), ElementKind::Table | ElementKind::List))
        .map(|u| {
            let first = u.lead().position;
            (first, u.elements.last().map_or(first, |e| e.position))
        })
        .collect()
}

/// Index of the table or list a row unit was exploded from.
fn span_of(spans: &[(usize, usize)], row: &Unit<'_>) -> Option<usize> {
    let position = row.lead().position;
    spans
        .iter()
        .position(|&(first, last)| (first..=last).contains(&position))
}

fn segments<'e>(units: &[Unit<'e>]) -> Vec<Segment<'e>> {
    let mut segments: Vec<Segment<'e>> = Vec::new();
    for unit in units {
        if matches!(unit.kind(), ElementKind::Table | ElementKind::List) {
            let rows = explode(*unit);
            let header = (unit.kind() == ElementKind::Table)
                .then(|| rows.first().map(|r| r.text))
                .flatten();
            segments.push(Segment {
                units: rows,
                tabular: true,
                header,
            });
            continue;
        }
        match segments.last_mut() {
            Some(segment) if !segment.tabular => segment.units.push(*unit),
            _ => segments.push(Segment {
                units: vec![*unit],
                tabular: false,
                header: None,
            }),
        }
    }
    segments
}

pub(crate) fn drafts<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
) -> Result<Vec<Draft<'e>>, ProcessorError> {
    let rows_per_chunk = params::optional_count(config, "rows_per_chunk")?;

    let mut drafts = Vec::new();
    for segment in segments(units) {
        if !segment.tabular {
            drafts.extend(pack(&segment.units, config, config.target_size, "text"));
            continue;
        }

        let groups: Vec<Draft<'e>> = match rows_per_chunk {
            Some(n) => segment
                .units
                .chunks(n)
                .map(|rows| Draft {
                    joiner: Some(ROW_JOINER),
                    ..Draft::from_units("rows", rows.to_vec())
                })
                .collect(),
            None => {
                let mut packer = Packer::new(config, config.target_size, "rows")
                    .with_joiner(Some(ROW_JOINER));
                for row in &segment.units {
                    packer.push(*row);
                }
                packer.finish()
            }
        };

        drafts.extend(groups.into_iter().map(|draft| match segment.header {
            Some(header) => draft.with_semantic("table_header", json!(header)),
            None => draft,
        }));
    }

    let drafts = shape(drafts, config);
    Ok(carry_overlap(drafts, &tabular_spans(units), config))
}

/// Prefix each row group with the trailing rows of the group before it,
/// when both groups come from the same table or list.
fn carry_overlap<'e>(
    drafts: Vec<Draft<'e>>,
    spans: &[(usize, usize)],
    config: &ChunkingConfig,
) -> Vec<Draft<'e>> {
    if config.overlap == 0 {
        return drafts;
    }

    let originals: Vec<(&'static str, Vec<Unit<'e>>)> =
        drafts.iter().map(|d| (d.kind, d.units.clone())).collect();
    let mut out = Vec::with_capacity(drafts.len());

    for (idx, mut draft) in drafts.into_iter().enumerate() {
        let carried = match idx.checked_sub(1).map(|prev| &originals[prev]) {
            Some(("rows", previous)) if draft.kind == "rows" && draft.content.is_none() => {
                match draft.units.first().and_then(|row| span_of(spans, row)) {
                    Some(span) => trailing_rows(previous, span, spans, &draft, config),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        };
        if !carried.is_empty() {
            let count = carried.len();
            let mut units = carried;
            units.extend(draft.units);
            draft.units = units;
            draft = draft.with_semantic("overlap_rows", json!(count));
        }
        out.push(draft);
    }
    out
}

/// Longest run of trailing rows of table or list `span` that fits in
/// `overlap` and keeps the next group within `max_size`.
fn trailing_rows<'e>(
    previous: &[Unit<'e>],
    span: usize,
    spans: &[(usize, usize)],
    next: &Draft<'e>,
    config: &ChunkingConfig,
) -> Vec<Unit<'e>> {
    let joiner = text::char_len(ROW_JOINER);
    let budget = config
        .overlap
        .min(config.max_size.saturating_sub(next.char_len(config) + joiner));

    let mut taken = 0;
    let mut length = 0;
    for row in previous.iter().rev() {
        if span_of(spans, row) != Some(span) {
            break;
        }
        let added = row.char_len() + if taken > 0 { joiner } else { 0 };
        if length + added > budget {
            break;
        }
        length += added;
        taken += 1;
    }
    previous[previous.len() - taken..].to_vec()
}
