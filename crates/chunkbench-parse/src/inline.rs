//! Inline spans inside block text.

use chunkbench_core::{Element, ElementKind};
use regex::Regex;
use std::sync::OnceLock;

static INLINE_REGEX: OnceLock<Regex> = OnceLock::new();

fn inline_regex() -> &'static Regex {
    INLINE_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"!\[(?P<alt>[^\]]*)\]\((?P<src>[^)\s]+)[^)]*\)",
            r"|\[(?P<text>[^\]]+)\]\((?P<href>[^)\s]+)[^)]*\)",
            r"|<(?P<auto>https?://[^>\s]+)>",
            r"|`(?P<code>[^`]+)`",
            r"|\*\*(?P<strong>[^*]+)\*\*|__(?P<strong_u>[^_]+)__",
            r"|\*(?P<em>[^*\s][^*]*)\*|\b_(?P<em_u>[^_\s][^_]*)_\b",
        ))
        .expect("valid inline regex")
    })
}

/// One line of a block body and the byte offset where it starts.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment<'a> {
    pub text: &'a str,
    pub offset: usize,
}

/// Scan block body lines for inline children, in source order.
///
/// Spans do not cross line boundaries. A segment ending in two spaces or a
/// backslash yields a hard line break unless it is the last one.
pub(crate) fn scan(segments: &[Segment<'_>]) -> Vec<Element> {
    let mut out = Vec::new();
    let last = segments.len().saturating_sub(1);

    for (i, segment) in segments.iter().enumerate() {
        for caps in inline_regex().captures_iter(segment.text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };

            let element = if let Some(src) = caps.name("src") {
                let alt = caps.name("alt").map_or("", |m| m.as_str());
                Element::new(ElementKind::Image, whole.as_str(), 0)
                    .with_url(src.as_str())
                    .with_alt_text(alt)
            } else if let Some(href) = caps.name("href") {
                let text = caps.name("text").map_or("", |m| m.as_str());
                Element::new(ElementKind::Link, text, 0).with_url(href.as_str())
            } else if let Some(auto) = caps.name("auto") {
                Element::new(ElementKind::Link, auto.as_str(), 0).with_url(auto.as_str())
            } else if let Some(code) = caps.name("code") {
                Element::new(ElementKind::InlineCode, code.as_str(), 0)
            } else if let Some(strong) = caps.name("strong").or_else(|| caps.name("strong_u")) {
                Element::new(ElementKind::Strong, strong.as_str(), 0)
            } else if let Some(em) = caps.name("em").or_else(|| caps.name("em_u")) {
                Element::new(ElementKind::Emphasis, em.as_str(), 0)
            } else {
                continue;
            };

            out.push(element.at_offset(segment.offset + whole.start()));
        }

        if i < last && (segment.text.ends_with("  ") || segment.text.ends_with('\\')) {
            out.push(
                Element::new(ElementKind::LineBreak, "", 0)
                    .at_offset(segment.offset + segment.text.len()),
            );
        }
    }

    out
}
