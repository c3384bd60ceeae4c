//! Fixed-size sliding windows over the document text.
//!
//! Unit texts are joined with the configured separator into one char stream.
//! Windows of `target_size` chars end at the best nearby break (paragraph,
//! line, sentence, word) and the next window starts `overlap` chars before the
//! previous end, so adjacent windows share exactly `overlap` chars. A tail
//! shorter than `min_size` is folded into the last window when that stays
//! within `max_size`.

use chunkbench_core::{ChunkingConfig, ProcessorError};
use serde_json::json;

use crate::assembly::{Draft, Unit};
use crate::text;

/// The joined char stream plus each unit's `[start, end)` span in it.
struct Stream {
    chars: Vec<char>,
    spans: Vec<(usize, usize)>,
}

impl Stream {
    fn new(units: &[Unit<'_>], separator: &str) -> Self {
        let mut chars = Vec::new();
        let mut spans = Vec::with_capacity(units.len());
        for (idx, unit) in units.iter().enumerate() {
            if idx > 0 {
                chars.extend(separator.chars());
            }
            let start = chars.len();
            chars.extend(unit.text.chars());
            spans.push((start, chars.len()));
        }
        Self { chars, spans }
    }

    /// Indices of the units overlapping `[start, end)`.
    fn covering(&self, start: usize, end: usize) -> Vec<usize> {
        let hits: Vec<usize> = self
            .spans
            .iter()
            .enumerate()
            .filter(|(_, (from, to))| {
                if from == to {
                    (start..end).contains(from)
                } else {
                    *from < end && *to > start
                }
            })
            .map(|(idx, _)| idx)
            .collect();
        if !hits.is_empty() {
            return hits;
        }
        // Window fell entirely inside a separator: attribute it to the unit before.
        self.spans
            .iter()
            .rposition(|(_, to)| *to <= start)
            .into_iter()
            .collect()
    }
}

/// Window boundaries as `(start, end)` char offsets.
fn windows(chars: &[char], config: &ChunkingConfig) -> Vec<(usize, usize)> {
    let total = chars.len();
    let mut out = Vec::new();
    let mut start = 0;

    while start < total {
        let mut end = (start + config.target_size).min(total);
        if end < total {
            end = text::find_break_point(chars, start + config.overlap, end);
        }
        if end < total
            && total - (end - config.overlap) < config.min_size
            && total - start <= config.max_size
        {
            end = total;
        }
        out.push((start, end));
        if end >= total {
            break;
        }
        start = end - config.overlap;
    }
    out
}

pub(crate) fn drafts<'e>(
    units: &[Unit<'e>],
    config: &ChunkingConfig,
) -> Result<Vec<Draft<'e>>, ProcessorError> {
    let stream = Stream::new(units, &config.separator);

    let drafts = windows(&stream.chars, config)
        .into_iter()
        .map(|(start, end)| {
            let covered = stream.covering(start, end);
            Draft {
                units: covered.into_iter().map(|idx| units[idx]).collect(),
                content: Some(stream.chars[start..end].iter().collect()),
                fixed: true,
                ..Draft::new("window")
            }
            .with_semantic("window_start", json!(start))
            .with_semantic("window_end", json!(end))
        })
        .collect();
    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::units;
    use chunkbench_parse::parse;

    fn config(min: usize, target: usize, max: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            min_size: min,
            target_size: target,
            max_size: max,
            overlap,
            ..ChunkingConfig::new("sliding_window")
        }
    }

    fn contents(drafts: &[Draft<'_>]) -> Vec<String> {
        drafts.iter().filter_map(|d| d.content.clone()).collect()
    }

    const PROSE: &str = "The parser emits elements in order. Each element has a position.\n\n\
        Strategies group elements into chunks. Windows slide over the joined text.\n\n\
        Overlap repeats the tail of one window at the head of the next one.";

    #[test]
    fn test_windows_cover_stream_without_overlap() {
        let elements = parse(PROSE);
        let units = units(&elements);
        let cfg = config(0, 40, 80, 0);
        let drafts = drafts(&units, &cfg).unwrap();

        assert!(drafts.len() > 1);
        let joined: String = contents(&drafts).concat();
        let expected: Vec<&str> = units.iter().map(|u| u.text).collect();
        assert_eq!(joined, expected.join("\n\n"));
        for content in contents(&drafts) {
            assert!(text::char_len(&content) <= 80);
        }
    }

    #[test]
    fn test_overlap_law() {
        let elements = parse(PROSE);
        let units = units(&elements);
        let k = 8;
        let drafts = drafts(&units, &config(0, 40, 80, k)).unwrap();
        let contents = contents(&drafts);

        assert!(contents.len() > 2);
        for pair in contents.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let next: Vec<char> = pair[1].chars().collect();
            assert_eq!(&prev[prev.len() - k..], &next[..k]);
        }
    }

    #[test]
    fn test_short_tail_is_folded() {
        let text = "0123456789 0123456789 0123456789 01";
        let elements = parse(text);
        let units = units(&elements);

        let folded = drafts(&units, &config(10, 30, 60, 0)).unwrap();
        assert_eq!(contents(&folded), vec![text.to_string()]);

        let split = drafts(&units, &config(0, 30, 60, 0)).unwrap();
        assert_eq!(split.len(), 2);
        assert_eq!(split[1].content.as_deref(), Some("89 01"));
    }

    #[test]
    fn test_windows_reference_covered_units() {
        let elements = parse("First paragraph here.\n\nSecond paragraph here.");
        let units = units(&elements);
        let drafts = drafts(&units, &config(0, 30, 60, 0)).unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].units.len(), 2);
        assert_eq!(drafts[1].units.len(), 1);
        assert_eq!(drafts[1].units[0].text, "Second paragraph here.");
        assert_eq!(drafts[1].semantic["window_start"], json!(30));
    }

    #[test]
    fn test_empty_input() {
        let drafts = drafts(&[], &config(0, 30, 60, 5)).unwrap();
        assert!(drafts.is_empty());
    }
}
