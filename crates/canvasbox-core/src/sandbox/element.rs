//! Start tags with editable attributes.
//!
//! Attribute values are held decoded, as a DOM would expose them, and are
//! escaped once when the start tag is serialized.

/// An element start tag: name plus ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
}

impl Element {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Builder-style [`set_attribute`](Self::set_attribute).
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Parse the start tag at the beginning of `src`.
    ///
    /// Returns the element and the byte length of the tag, or `None` when
    /// `src` does not start with a well-formed start tag.
    #[must_use]
    pub fn parse(src: &str) -> Option<(Self, usize)> {
        let bytes = src.as_bytes();
        if bytes.first() != Some(&b'<') {
            return None;
        }

        let mut pos = 1;
        let name_end = scan(bytes, pos, |b| {
            !(b.is_ascii_whitespace() || b == b'>' || b == b'/')
        });
        if name_end == pos {
            return None;
        }
        let mut element = Self::new(src[pos..name_end].to_ascii_lowercase());
        pos = name_end;

        loop {
            pos = scan(bytes, pos, |b| b.is_ascii_whitespace() || b == b'/');
            match bytes.get(pos) {
                None => return None,
                Some(b'>') => return Some((element, pos + 1)),
                Some(_) => {}
            }

            let attr_end = scan(bytes, pos, |b| {
                !(b.is_ascii_whitespace() || b == b'=' || b == b'>' || b == b'/')
            });
            let name = src[pos..attr_end].to_ascii_lowercase();
            pos = scan(bytes, attr_end, |b| b.is_ascii_whitespace());

            if bytes.get(pos) != Some(&b'=') {
                element.attributes.push((name, String::new()));
                continue;
            }
            pos = scan(bytes, pos + 1, |b| b.is_ascii_whitespace());

            let value = match bytes.get(pos) {
                Some(&quote @ (b'"' | b'\'')) => {
                    let start = pos + 1;
                    let end = scan(bytes, start, |b| b != quote);
                    if end >= bytes.len() {
                        return None;
                    }
                    pos = end + 1;
                    &src[start..end]
                }
                _ => {
                    let start = pos;
                    pos = scan(bytes, pos, |b| !(b.is_ascii_whitespace() || b == b'>'));
                    &src[start..pos]
                }
            };
            element.attributes.push((name, decode_entities(value)));
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set or replace an attribute, keeping its position when it exists.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|(key, _)| key != name);
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|list| list.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let list = match self.attribute("class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attribute("class", &list);
    }

    pub fn remove_class(&mut self, class: &str) {
        let Some(existing) = self.attribute("class") else {
            return;
        };
        if !self.has_class(class) {
            return;
        }
        let list = existing
            .split_ascii_whitespace()
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute("class", &list);
    }

    /// Inline style property value, if declared.
    #[must_use]
    pub fn style_property(&self, property: &str) -> Option<&str> {
        split_declarations(self.attribute("style")?)
            .into_iter()
            .filter_map(|decl| decl.split_once(':'))
            .find(|(name, _)| name.trim() == property)
            .map(|(_, value)| value.trim())
    }

    /// Set one inline style property, replacing a previous declaration.
    pub fn set_style_property(&mut self, property: &str, value: &str) {
        let mut declarations: Vec<(String, String)> =
            split_declarations(self.attribute("style").unwrap_or_default())
                .into_iter()
                .filter_map(|decl| decl.split_once(':'))
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .collect();

        match declarations.iter_mut().find(|(name, _)| name == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => declarations.push((property.to_string(), value.to_string())),
        }

        let style = declarations
            .iter()
            .map(|(name, value)| format!("{}: {};", name, value))
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute("style", &style);
    }

    /// Serialize the start tag.
    #[must_use]
    pub fn start_tag(&self) -> String {
        let mut tag = format!("<{}", self.name);
        for (name, value) in &self.attributes {
            tag.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
        }
        tag.push('>');
        tag
    }

    #[must_use]
    pub fn end_tag(&self) -> String {
        format!("</{}>", self.name)
    }

    /// Serialize the element around raw `content`.
    #[must_use]
    pub fn render(&self, content: &str) -> String {
        format!("{}{}{}", self.start_tag(), content, self.end_tag())
    }
}

fn scan(bytes: &[u8], mut pos: usize, keep: impl Fn(u8) -> bool) -> usize {
    while let Some(&b) = bytes.get(pos) {
        if !keep(b) {
            break;
        }
        pos += 1;
    }
    pos
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Decode character references in a raw attribute value.
///
/// Unknown or malformed references are kept verbatim.
fn decode_entities(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let reference = rest
            .find(';')
            .and_then(|end| decode_reference(&rest[1..end]).map(|c| (c, end + 1)));
        match reference {
            Some((c, len)) => {
                decoded.push(c);
                rest = &rest[len..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

fn decode_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Split an inline style on `;` outside quotes and parentheses.
fn split_declarations(style: &str) -> Vec<&str> {
    let mut declarations = Vec::new();
    let mut quote = None;
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in style.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, ';') if depth == 0 => {
                declarations.push(&style[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    declarations.push(&style[start..]);
    declarations
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_unquoted_and_bare_attributes() {
        let (element, len) =
            Element::parse(r#"<BODY class="a b" data-x=1 hidden style='color: red'>rest"#).unwrap();
        assert_eq!(element.name(), "body");
        assert_eq!(element.attribute("class"), Some("a b"));
        assert_eq!(element.attribute("data-x"), Some("1"));
        assert_eq!(element.attribute("hidden"), Some(""));
        assert_eq!(element.attribute("style"), Some("color: red"));
        assert_eq!(len, 53);
    }

    #[test]
    fn rejects_unterminated_tag() {
        assert!(Element::parse("<body class=\"a").is_none());
        assert!(Element::parse("body>").is_none());
    }

    #[test]
    fn class_toggling_is_idempotent() {
        let mut element = Element::new("body");
        element.add_class("sl-theme-dark");
        element.add_class("sl-theme-dark");
        assert_eq!(element.attribute("class"), Some("sl-theme-dark"));

        element.add_class("other");
        element.remove_class("sl-theme-dark");
        assert_eq!(element.attribute("class"), Some("other"));
        assert!(!element.has_class("sl-theme-dark"));
    }

    #[test]
    fn style_property_replaces_existing_declaration() {
        let source = r#"<body style="margin: 0; --v-theme-surface: 1, 1, 1">"#;
        let (mut element, _) = Element::parse(source).unwrap();
        element.set_style_property("--v-theme-surface", "0, 0, 0");
        assert_eq!(element.style_property("--v-theme-surface"), Some("0, 0, 0"));
        assert_eq!(
            element.attribute("style"),
            Some("margin: 0; --v-theme-surface: 0, 0, 0;")
        );
    }

    #[test]
    fn parsed_values_are_decoded_and_escaped_once() {
        let source = r#"<body class="a&amp;b" title="x &#39;y&#x27; &bogus; &" style='font-family: "Fira"'>"#;
        let (mut element, _) = Element::parse(source).unwrap();
        assert_eq!(element.attribute("class"), Some("a&b"));
        assert_eq!(element.attribute("title"), Some("x 'y' &bogus; &"));
        assert_eq!(element.style_property("font-family"), Some("\"Fira\""));

        element.add_class("sl-theme-light");
        element.set_style_property("--v-theme-surface", "0, 0, 0");
        assert_eq!(
            element.start_tag(),
            concat!(
                r#"<body class="a&amp;b sl-theme-light" title="x 'y' &amp;bogus; &amp;" "#,
                r#"style="font-family: &quot;Fira&quot;; --v-theme-surface: 0, 0, 0;">"#,
            )
        );
    }

    #[test]
    fn style_split_ignores_semicolons_in_quotes_and_urls() {
        let source = r#"<body style='content: "a;b"; background: url(x;y.png)'>"#;
        let (mut element, _) = Element::parse(source).unwrap();
        element.set_style_property("color", "red");
        assert_eq!(element.style_property("content"), Some("\"a;b\""));
        assert_eq!(element.style_property("background"), Some("url(x;y.png)"));
        assert_eq!(element.style_property("color"), Some("red"));
    }

    #[test]
    fn start_tag_escapes_new_values() {
        let element = Element::new("div").with_attribute("title", "a \"b\" & c");
        assert_eq!(element.start_tag(), r#"<div title="a &quot;b&quot; &amp; c">"#);
        assert_eq!(element.render("x"), r#"<div title="a &quot;b&quot; &amp; c">x</div>"#);
    }
}
