//! Structural parser for chunkbench.
//!
//! [`parse`] turns raw, optionally markdown-flavored text into a flat,
//! ordered sequence of [`Element`]s. Nested structure is expressed by
//! adjacency rather than by pointers: a list is followed by its items, a
//! table by its rows, and every block by the inline spans found in it.
//!
//! Parsing never fails. Constructs that do not close (an unterminated code
//! fence, for example) degrade to literal paragraphs from the point where
//! they start.
//!
//! ```
//! use chunkbench_core::ElementKind;
//!
//! let elements = chunkbench_parse::parse("# Title\n\nSome text.");
//! assert_eq!(elements[0].kind, ElementKind::Header);
//! assert_eq!(elements[1].kind, ElementKind::Paragraph);
//! ```

mod block;
mod inline;

use chunkbench_core::Element;
use tracing::debug;

use block::BlockParser;

/// Parse raw text into elements with strictly increasing positions.
///
/// Empty or whitespace-only input yields an empty sequence.
#[must_use]
pub fn parse(raw_text: &str) -> Vec<Element> {
    if raw_text.trim().is_empty() {
        return Vec::new();
    }

    let elements = BlockParser::new(raw_text).run();
    debug!(
        bytes = raw_text.len(),
        elements = elements.len(),
        "Parsed document structure"
    );
    elements
}
