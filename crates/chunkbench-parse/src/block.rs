//! Block-level structure.
//!
//! A single forward pass over the source lines. Each block is emitted
//! followed directly by its children (list items, table rows, inline spans),
//! so the output is flat and already in document order.

use chunkbench_core::{Element, ElementKind, ListKind};
use regex::Regex;
use std::sync::OnceLock;

use crate::inline::{self, Segment};

static LIST_MARKER_REGEX: OnceLock<Regex> = OnceLock::new();

fn list_marker_regex() -> &'static Regex {
    LIST_MARKER_REGEX.get_or_init(|| {
        Regex::new(r"^(?P<indent>[ \t]*)(?P<marker>[-*+]|\d{1,9}[.)])(?:[ \t]+|$)")
            .expect("valid list marker regex")
    })
}

/// One source line with the byte offset of its first byte.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    text: &'a str,
    offset: usize,
}

impl<'a> Line<'a> {
    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// The line with leading whitespace removed, as an inline segment.
    fn body(&self) -> Segment<'a> {
        let body = self.text.trim_start();
        Segment {
            text: body,
            offset: self.offset + (self.text.len() - body.len()),
        }
    }
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        lines.push(Line { text: line, offset });
        offset += raw.len() + 1;
    }
    lines
}

/// Indentation width in columns, tabs counting as four.
fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// An opening code fence.
#[derive(Debug)]
struct Fence {
    marker: char,
    width: usize,
    language: Option<String>,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        if indent_width(line) > 3 {
            return None;
        }
        let rest = line.trim_start();
        let marker = rest.chars().next()?;
        if marker != '`' && marker != '~' {
            return None;
        }
        let width = rest.chars().take_while(|c| *c == marker).count();
        if width < 3 {
            return None;
        }
        let info = rest[width..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }
        Some(Self {
            marker,
            width,
            language: info.split_whitespace().next().map(str::to_string),
        })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let count = trimmed.chars().take_while(|c| *c == self.marker).count();
        count >= self.width && count == trimmed.len()
    }
}

/// ATX header depth (`#` through `######`).
fn atx_level(line: &str) -> Option<u8> {
    if indent_width(line) > 3 {
        return None;
    }
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &trimmed[hashes..];
    if rest.is_empty() || rest.starts_with([' ', '\t']) {
        u8::try_from(hashes).ok()
    } else {
        None
    }
}

/// Setext underline depth (`===` is 1, `---` is 2).
fn setext_level(line: &str) -> Option<u8> {
    if indent_width(line) > 3 {
        return None;
    }
    let trimmed = line.trim();
    if trimmed.len() < 3 {
        return None;
    }
    if trimmed.chars().all(|c| c == '=') {
        Some(1)
    } else if trimmed.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

fn is_thematic_break(line: &str) -> bool {
    if indent_width(line) > 3 {
        return false;
    }
    let mut marks = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = marks.next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_') {
        return false;
    }
    let mut count = 1;
    for c in marks {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

fn is_blockquote(line: &str) -> bool {
    indent_width(line) <= 3 && line.trim_start().starts_with('>')
}

/// A GFM delimiter row such as `| --- | :---: |`.
fn is_delimiter_row(line: &str) -> bool {
    let trimmed = line.trim();
    if !trimmed.contains('|') {
        return false;
    }
    let inner = trimmed.trim_start_matches('|').trim_end_matches('|');
    let mut cells = 0;
    for cell in inner.split('|') {
        let cell = cell.trim();
        if cell.is_empty()
            || !cell.contains('-')
            || !cell.chars().all(|c| c == '-' || c == ':')
        {
            return false;
        }
        cells += 1;
    }
    cells > 0
}

/// A list item marker found at the start of a line.
#[derive(Debug, Clone, Copy)]
struct ListMarker {
    indent: usize,
    kind: ListKind,
    /// Byte index in the line where the item text starts
    body_start: usize,
}

fn list_marker(line: &str) -> Option<ListMarker> {
    if is_thematic_break(line) {
        return None;
    }
    let caps = list_marker_regex().captures(line)?;
    let whole = caps.get(0)?;
    let indent = caps.name("indent").map_or("", |m| m.as_str());
    let marker = caps.name("marker")?.as_str();
    let kind = if marker.starts_with(|c: char| c.is_ascii_digit()) {
        ListKind::Ordered
    } else {
        ListKind::Unordered
    };
    Some(ListMarker {
        indent: indent_width(indent),
        kind,
        body_start: whole.end(),
    })
}

/// Nesting depth of a list item from its indentation.
fn list_depth(indent: usize) -> u8 {
    u8::try_from(indent / 2).unwrap_or(u8::MAX)
}

/// An item collected while scanning a list.
struct ListItem<'a> {
    marker: ListMarker,
    segments: Vec<Segment<'a>>,
}

/// Line-oriented block parser.
pub(crate) struct BlockParser<'a> {
    lines: Vec<Line<'a>>,
    cursor: usize,
    out: Vec<Element>,
}

impl<'a> BlockParser<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        Self {
            lines: split_lines(text),
            cursor: 0,
            out: Vec::new(),
        }
    }

    /// Consume the parser, returning elements with positions assigned.
    pub(crate) fn run(mut self) -> Vec<Element> {
        while self.cursor < self.lines.len() {
            let line = self.lines[self.cursor];
            if line.is_blank() {
                self.cursor += 1;
            } else if let Some(fence) = Fence::open(line.text) {
                if !self.code_block(&fence) {
                    self.literal_tail();
                }
            } else if let Some(level) = atx_level(line.text) {
                self.atx_header(line, level);
            } else if is_thematic_break(line.text) {
                self.emit(
                    Element::new(ElementKind::HorizontalRule, line.text.trim(), 0)
                        .at_offset(line.offset),
                );
                self.cursor += 1;
            } else if self.table_starts_at(self.cursor) {
                self.table();
            } else if is_blockquote(line.text) {
                self.blockquote();
            } else if list_marker(line.text).is_some() {
                self.list();
            } else {
                self.paragraph();
            }
        }
        self.out
    }

    fn emit(&mut self, mut element: Element) {
        element.position = self.out.len();
        self.out.push(element);
    }

    fn emit_inline(&mut self, segments: &[Segment<'_>]) {
        for child in inline::scan(segments) {
            self.emit(child);
        }
    }

    fn joined(&self, start: usize, end: usize) -> String {
        self.lines[start..end]
            .iter()
            .map(|l| l.text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn table_starts_at(&self, idx: usize) -> bool {
        self.lines[idx].text.contains('|')
            && self
                .lines
                .get(idx + 1)
                .is_some_and(|next| is_delimiter_row(next.text))
    }

    /// Whether a line ends a running paragraph.
    fn interrupts_paragraph(&self, idx: usize) -> bool {
        let text = self.lines[idx].text;
        atx_level(text).is_some()
            || Fence::open(text).is_some()
            || is_thematic_break(text)
            || is_blockquote(text)
            || list_marker(text).is_some()
            || self.table_starts_at(idx)
    }

    /// Emit a fenced block. Returns false when the fence never closes.
    fn code_block(&mut self, fence: &Fence) -> bool {
        let start = self.cursor;
        let Some(close) = (start + 1..self.lines.len())
            .find(|&idx| fence.is_closed_by(self.lines[idx].text))
        else {
            return false;
        };

        let content = self.joined(start, close + 1);
        self.emit(
            Element::new(ElementKind::CodeBlock, content, 0)
                .at_offset(self.lines[start].offset)
                .with_language(fence.language.clone()),
        );
        self.cursor = close + 1;
        true
    }

    /// Everything from an unclosed fence onward becomes literal paragraphs.
    fn literal_tail(&mut self) {
        let mut idx = self.cursor;
        while idx < self.lines.len() {
            if self.lines[idx].is_blank() {
                idx += 1;
                continue;
            }
            let start = idx;
            while idx < self.lines.len() && !self.lines[idx].is_blank() {
                idx += 1;
            }
            let content = self.joined(start, idx);
            self.emit(
                Element::new(ElementKind::Paragraph, content, 0)
                    .at_offset(self.lines[start].offset),
            );
        }
        self.cursor = self.lines.len();
    }

    fn atx_header(&mut self, line: Line<'a>, level: u8) {
        self.emit(
            Element::new(ElementKind::Header, line.text.trim(), 0)
                .at_offset(line.offset)
                .with_level(level),
        );
        let body = line.body();
        let text = body.text.trim_start_matches('#');
        let inner = text.trim_start();
        let segment = Segment {
            text: inner,
            offset: body.offset + (body.text.len() - inner.len()),
        };
        self.emit_inline(&[segment]);
        self.cursor += 1;
    }

    fn table(&mut self) {
        let start = self.cursor;
        let mut end = start + 2;
        while end < self.lines.len()
            && !self.lines[end].is_blank()
            && self.lines[end].text.contains('|')
        {
            end += 1;
        }

        let content = self.joined(start, end);
        self.emit(
            Element::new(ElementKind::Table, content, 0).at_offset(self.lines[start].offset),
        );
        for idx in (start..end).filter(|&idx| idx != start + 1) {
            let line = self.lines[idx];
            self.emit(
                Element::new(ElementKind::TableRow, line.text.trim(), 0).at_offset(line.offset),
            );
        }
        self.cursor = end;
    }

    fn blockquote(&mut self) {
        let start = self.cursor;
        let mut end = start;
        while end < self.lines.len() && is_blockquote(self.lines[end].text) {
            end += 1;
        }

        let content = self.joined(start, end);
        self.emit(
            Element::new(ElementKind::Blockquote, content, 0).at_offset(self.lines[start].offset),
        );

        let segments: Vec<Segment<'_>> = self.lines[start..end]
            .iter()
            .map(|line| {
                let body = line.body();
                let quoted = body.text.trim_start_matches('>');
                let inner = quoted.strip_prefix(' ').unwrap_or(quoted);
                Segment {
                    text: inner,
                    offset: body.offset + (body.text.len() - inner.len()),
                }
            })
            .collect();
        self.emit_inline(&segments);
        self.cursor = end;
    }

    fn list(&mut self) {
        let start = self.cursor;
        let mut idx = start;
        let mut end = start;
        let mut prev_blank = false;
        let mut items: Vec<ListItem<'a>> = Vec::new();

        while idx < self.lines.len() {
            let line = self.lines[idx];
            if line.is_blank() {
                let next = (idx + 1..self.lines.len()).find(|&k| !self.lines[k].is_blank());
                match next {
                    Some(k)
                        if list_marker(self.lines[k].text).is_some()
                            || indent_width(self.lines[k].text) >= 2 =>
                    {
                        idx = k;
                        prev_blank = true;
                        continue;
                    }
                    _ => break,
                }
            }

            if let Some(marker) = list_marker(line.text) {
                let body = &line.text[marker.body_start..];
                items.push(ListItem {
                    marker,
                    segments: vec![Segment {
                        text: body,
                        offset: line.offset + marker.body_start,
                    }],
                });
            } else if indent_width(line.text) >= 2
                || (!prev_blank && !self.interrupts_paragraph(idx))
            {
                match items.last_mut() {
                    Some(item) => item.segments.push(line.body()),
                    None => break,
                }
            } else {
                break;
            }

            end = idx + 1;
            prev_blank = false;
            idx += 1;
        }

        let kind = items
            .first()
            .map_or(ListKind::Unordered, |item| item.marker.kind);
        let content = self.joined(start, end);
        self.emit(
            Element::new(ElementKind::List, content, 0)
                .at_offset(self.lines[start].offset)
                .with_list_kind(kind),
        );

        for item in items {
            let text = item
                .segments
                .iter()
                .map(|s| s.text.trim())
                .collect::<Vec<_>>()
                .join("\n");
            let offset = item.segments.first().map_or(0, |s| s.offset);
            self.emit(
                Element::new(ElementKind::ListItem, text, 0)
                    .at_offset(offset)
                    .with_level(list_depth(item.marker.indent))
                    .with_list_kind(item.marker.kind),
            );
            self.emit_inline(&item.segments);
        }

        self.cursor = end.max(start + 1);
    }

    fn paragraph(&mut self) {
        let start = self.cursor;
        let first = self.lines[start];

        if let Some(level) = self
            .lines
            .get(start + 1)
            .and_then(|next| setext_level(next.text))
        {
            let underline = self.lines[start + 1].text.trim();
            self.emit(
                Element::new(
                    ElementKind::Header,
                    format!("{}\n{}", first.text.trim(), underline),
                    0,
                )
                .at_offset(first.offset)
                .with_level(level),
            );
            self.emit_inline(&[first.body()]);
            self.cursor = start + 2;
            return;
        }

        let mut end = start + 1;
        while end < self.lines.len()
            && !self.lines[end].is_blank()
            && !self.interrupts_paragraph(end)
        {
            end += 1;
        }

        let content = self.lines[start..end]
            .iter()
            .map(|l| l.text.trim())
            .collect::<Vec<_>>()
            .join("\n");
        self.emit(Element::new(ElementKind::Paragraph, content, 0).at_offset(first.offset));

        let segments: Vec<Segment<'_>> = self.lines[start..end].iter().map(Line::body).collect();
        self.emit_inline(&segments);
        self.cursor = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atx_level() {
        assert_eq!(atx_level("# Title"), Some(1));
        assert_eq!(atx_level("###### Deep"), Some(6));
        assert_eq!(atx_level("####### Too deep"), None);
        assert_eq!(atx_level("#hashtag"), None);
        assert_eq!(atx_level("#"), Some(1));
    }

    #[test]
    fn test_setext_level() {
        assert_eq!(setext_level("==="), Some(1));
        assert_eq!(setext_level("-----"), Some(2));
        assert_eq!(setext_level("--"), None);
        assert_eq!(setext_level("=-="), None);
    }

    #[test]
    fn test_thematic_break() {
        assert!(is_thematic_break("---"));
        assert!(is_thematic_break("* * *"));
        assert!(is_thematic_break("___"));
        assert!(!is_thematic_break("-- -x"));
        assert!(!is_thematic_break("--"));
    }

    #[test]
    fn test_delimiter_row() {
        assert!(is_delimiter_row("|---|:---:|"));
        assert!(is_delimiter_row("--- | ---"));
        assert!(!is_delimiter_row("---"));
        assert!(!is_delimiter_row("| a | b |"));
    }

    #[test]
    fn test_list_marker() {
        let marker = list_marker("  - nested item").unwrap();
        assert_eq!(marker.indent, 2);
        assert_eq!(marker.kind, ListKind::Unordered);

        let marker = list_marker("12. twelfth").unwrap();
        assert_eq!(marker.kind, ListKind::Ordered);

        assert!(list_marker("- - -").is_none());
        assert!(list_marker("-5 degrees").is_none());
        assert!(list_marker("**bold** start").is_none());
    }

    #[test]
    fn test_fence_open_and_close() {
        let fence = Fence::open("```rust").unwrap();
        assert_eq!(fence.language.as_deref(), Some("rust"));
        assert!(fence.is_closed_by("```"));
        assert!(fence.is_closed_by("````"));
        assert!(!fence.is_closed_by("~~~"));
        assert!(!fence.is_closed_by("``` trailing"));

        let tilde = Fence::open("~~~~").unwrap();
        assert!(tilde.language.is_none());
        assert!(!tilde.is_closed_by("~~~"));
    }

    #[test]
    fn test_split_lines_offsets() {
        let lines = split_lines("ab\r\ncd\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "ab");
        assert_eq!(lines[1].offset, 4);
        assert_eq!(lines[1].text, "cd");
    }
}
