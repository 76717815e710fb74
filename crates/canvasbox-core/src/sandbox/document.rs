//! Template document: `<html>`, `<head>` and `<body>` with raw children.
//!
//! Only the three structural elements are parsed. Everything inside head
//! and body stays an opaque child, which is all the sandbox mutations need:
//! they edit body attributes and insert children at either end.

use super::element::Element;

/// A parsed template, mutable through head/body child lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxDocument {
    html: Element,
    head: Element,
    head_children: Vec<String>,
    /// Whitespace between `</head>` and `<body>`.
    between: String,
    body: Element,
    body_children: Vec<String>,
}

impl SandboxDocument {
    /// Parse `template`.
    ///
    /// Missing `<html>`, `<head>` or `<body>` elements are synthesized the
    /// way an HTML parser would, so any fragment is a usable template.
    #[must_use]
    pub fn parse(template: &str) -> Self {
        let mut cursor = 0;

        let html = match find_start_tag(template, "html", cursor) {
            Some((element, _, end)) => {
                cursor = end;
                element
            }
            None => {
                cursor = skip_doctype(template);
                Element::new("html")
            }
        };

        let mut head_children = Vec::new();
        let head = match find_start_tag(template, "head", cursor) {
            Some((element, _, end)) => {
                let close = find_end_tag(template, "head", end);
                let inner_end = close.map_or(end, |(start, _)| start);
                push_non_empty(&mut head_children, &template[end..inner_end]);
                cursor = close.map_or(end, |(_, after)| after);
                element
            }
            None => Element::new("head"),
        };

        let mut between = String::new();
        let mut body_children = Vec::new();
        let body = match find_start_tag(template, "body", cursor) {
            Some((element, start, end)) => {
                let gap = &template[cursor..start];
                if gap.trim().is_empty() {
                    between.push_str(gap);
                } else {
                    push_non_empty(&mut body_children, gap);
                }
                let inner_end = find_end_tag(template, "body", end)
                    .or_else(|| find_end_tag(template, "html", end))
                    .map_or(template.len(), |(start, _)| start);
                push_non_empty(&mut body_children, &template[end..inner_end]);
                element
            }
            None => {
                let inner_end = find_end_tag(template, "html", cursor)
                    .map_or(template.len(), |(start, _)| start);
                push_non_empty(&mut body_children, template[cursor..inner_end].trim());
                Element::new("body")
            }
        };

        Self {
            html,
            head,
            head_children,
            between,
            body,
            body_children,
        }
    }

    #[must_use]
    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Element {
        &mut self.body
    }

    #[must_use]
    pub fn head(&self) -> &Element {
        &self.head
    }

    #[must_use]
    pub fn head_children(&self) -> &[String] {
        &self.head_children
    }

    #[must_use]
    pub fn body_children(&self) -> &[String] {
        &self.body_children
    }

    /// Insert `markup` before every existing head child.
    pub fn prepend_head(&mut self, markup: String) {
        self.head_children.insert(0, markup);
    }

    pub fn append_head(&mut self, markup: String) {
        self.head_children.push(markup);
    }

    pub fn append_body(&mut self, markup: String) {
        self.body_children.push(markup);
    }

    /// Serialize the `<html>` element and everything inside it.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut output = self.html.start_tag();
        output.push_str(&self.head.render(&self.head_children.concat()));
        output.push_str(&self.between);
        output.push_str(&self.body.render(&self.body_children.concat()));
        output.push_str(&self.html.end_tag());
        output
    }
}

fn push_non_empty(children: &mut Vec<String>, markup: &str) {
    if !markup.is_empty() {
        children.push(markup.to_string());
    }
}

/// Find `<name ...>` at or after `from`; returns the element, tag start and tag end.
fn find_start_tag(src: &str, name: &str, from: usize) -> Option<(Element, usize, usize)> {
    let needle = format!("<{}", name);
    let mut search = from;
    while let Some(offset) = find_ignore_case(&src[search..], &needle) {
        let start = search + offset;
        let after_name = src.as_bytes().get(start + needle.len()).copied();
        if matches!(after_name, Some(b) if b.is_ascii_whitespace() || b == b'>' || b == b'/') {
            if let Some((element, len)) = Element::parse(&src[start..]) {
                return Some((element, start, start + len));
            }
        }
        search = start + needle.len();
    }
    None
}

/// Find `</name>` at or after `from`; returns its start and the index after `>`.
fn find_end_tag(src: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let needle = format!("</{}", name);
    let offset = find_ignore_case(&src[from..], &needle)?;
    let start = from + offset;
    let close = src[start..].find('>')?;
    Some((start, start + close + 1))
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

fn skip_doctype(src: &str) -> usize {
    let trimmed = src.trim_start();
    let leading = src.len() - trimmed.len();
    if trimmed.len() >= 9 && trimmed[..9].eq_ignore_ascii_case("<!doctype") {
        trimmed.find('>').map_or(0, |end| leading + end + 1)
    } else {
        0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"></head>\n<body class=\"canvas-box\"><canvas></canvas></body>\n</html>\n";

    #[test]
    fn parses_structural_elements() {
        let doc = SandboxDocument::parse(TEMPLATE);
        assert_eq!(doc.head_children(), ["<meta charset=\"utf-8\">"]);
        assert_eq!(doc.body_children(), ["<canvas></canvas>"]);
        assert!(doc.body().has_class("canvas-box"));
    }

    #[test]
    fn serializes_without_doctype() {
        let doc = SandboxDocument::parse(TEMPLATE);
        assert_eq!(
            doc.to_html(),
            "<html lang=\"en\"><head><meta charset=\"utf-8\"></head>\n<body class=\"canvas-box\"><canvas></canvas></body></html>"
        );
    }

    #[test]
    fn header_element_is_not_mistaken_for_head() {
        let doc = SandboxDocument::parse("<html><body><header>x</header></body></html>");
        assert!(doc.head_children().is_empty());
        assert_eq!(doc.body_children(), ["<header>x</header>"]);
    }

    #[test]
    fn synthesizes_missing_structure() {
        let doc = SandboxDocument::parse("<canvas id=\"c\"></canvas>");
        assert_eq!(
            doc.to_html(),
            "<html><head></head><body><canvas id=\"c\"></canvas></body></html>"
        );
    }

    #[test]
    fn prepend_goes_before_existing_children() {
        let mut doc = SandboxDocument::parse(TEMPLATE);
        doc.append_head("<style></style>".to_string());
        doc.prepend_head("<script></script>".to_string());
        assert_eq!(doc.head_children()[0], "<script></script>");
        assert_eq!(doc.head_children().last().map(String::as_str), Some("<style></style>"));
    }
}
