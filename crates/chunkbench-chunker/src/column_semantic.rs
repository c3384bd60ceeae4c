//! Table-aware chunking.
//!
//! Each table becomes a standalone `table-block` chunk annotated with its
//! column names; prose around tables is packed to `target_size`.

use chunkbench_core::{ChunkingConfig, ElementKind, ProcessorError};
use serde_json::json;

use crate::assembly::{shape, Draft, Packer, Unit};

/// Column names from a table's header row.
fn columns(table: &str) -> Vec<String> {
    table
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('|')
        .split('|')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

fn table_block<'e>(unit: Unit<'e>) -> Draft<'e> {
    let columns = columns(unit.text);
    let rows = unit
        .elements
        .iter()
        .filter(|e| e.kind == ElementKind::TableRow)
        .count()
        .saturating_sub(1);

    Draft::from_units("table-block", vec![unit])
        .standalone()
        .with_semantic("column_count", json!(columns.len()))
        .with_semantic("columns", json!(columns))
        .with_semantic("row_count", json!(rows))
}

pub(crate) fn drafts<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
) -> Result<Vec<Draft<'e>>, ProcessorError> {
    let mut drafts = Vec::new();
    let mut prose = Packer::new(config, config.target_size, "text");

    for unit in units {
        if unit.kind() == ElementKind::Table {
            drafts.extend(prose.drain());
            drafts.push(table_block(*unit));
        } else {
            prose.push(*unit);
        }
    }
    drafts.extend(prose.finish());

    Ok(shape(drafts, config))
}
