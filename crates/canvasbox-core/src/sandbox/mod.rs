//! # Sandbox Module
//!
//! Assembles the standalone document a preview frame loads as `srcdoc`.
//!
//! The template is parsed once, then a fixed sequence of mutations runs.
//! The order matters for precedence in the rendered page:
//!
//! 1. theme on `<body>` (surface colour, theme class, `dark` attribute)
//! 2. base URL script appended to `<head>`
//! 3. import map script inserted as the *first* head child, ahead of any
//!    module script that depends on it
//! 4. HTML fragment in a controllers container appended to `<body>`
//! 5. stylesheet appended to `<head>`
//! 6. module script appended to `<head>`
//!
//! Omitted or empty fragments are skipped entirely.

mod document;
mod element;

pub use document::SandboxDocument;
pub use element::Element;

use crate::import_map::{ImportMapEntry, to_imports_object};
use serde::Serialize;

/// Template shipped with the crate.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../assets/canvas_box.html");

/// Surface colour used when the theme does not name one.
pub const DEFAULT_SURFACE: &str = "0, 0, 0";

/// CSS custom property carrying the surface colour.
pub const SURFACE_PROPERTY: &str = "--v-theme-surface";

/// Class of the container wrapping the HTML fragment.
pub const CONTROLLERS_CLASS: &str = "canvas-box__controllers";

const DARK_CLASS: &str = "sl-theme-dark";
const LIGHT_CLASS: &str = "sl-theme-light";

/// Presentation flags applied to the document body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme {
    pub dark: bool,
    /// `r, g, b` triple; [`DEFAULT_SURFACE`] when `None`.
    pub surface: Option<String>,
}

impl Theme {
    #[must_use]
    pub fn dark() -> Self {
        Self {
            dark: true,
            surface: None,
        }
    }

    #[must_use]
    pub fn light() -> Self {
        Self::default()
    }
}

/// Optional parts of a sandbox document.
#[derive(Debug, Clone, Default)]
pub struct SandboxContent<'a> {
    pub theme: Theme,
    pub import_maps: Option<&'a [ImportMapEntry]>,
    pub html: Option<&'a str>,
    pub stylesheet: Option<&'a str>,
    pub script: Option<&'a str>,
}

/// Build the mutated document without serializing it.
pub fn build_document(
    template: &str,
    base_url: &str,
    content: &SandboxContent<'_>,
) -> Result<SandboxDocument, serde_json::Error> {
    let mut document = SandboxDocument::parse(template);

    set_theme(&mut document, &content.theme);
    append_base_url(&mut document, base_url)?;
    if let Some(import_maps) = content.import_maps {
        prepend_import_map(&mut document, import_maps)?;
    }
    if let Some(html) = non_empty(content.html) {
        let container = Element::new("div").with_attribute("class", CONTROLLERS_CLASS);
        document.append_body(container.render(html));
    }
    if let Some(stylesheet) = non_empty(content.stylesheet) {
        document.append_head(Element::new("style").render(stylesheet));
    }
    if let Some(script) = non_empty(content.script) {
        let module = Element::new("script").with_attribute("type", "module");
        document.append_head(module.render(script));
    }

    Ok(document)
}

/// Produce the `srcdoc` string for a preview frame.
///
/// `base_url` is exposed to the page as `window.CHAPTERS_BASE_URL`.
pub fn create_iframe_doc(
    template: &str,
    base_url: &str,
    content: &SandboxContent<'_>,
) -> Result<String, serde_json::Error> {
    build_document(template, base_url, content).map(|document| document.to_html())
}

fn set_theme(document: &mut SandboxDocument, theme: &Theme) {
    let (add, remove) = if theme.dark {
        (DARK_CLASS, LIGHT_CLASS)
    } else {
        (LIGHT_CLASS, DARK_CLASS)
    };

    let body = document.body_mut();
    body.set_style_property(
        SURFACE_PROPERTY,
        theme.surface.as_deref().unwrap_or(DEFAULT_SURFACE),
    );
    body.add_class(add);
    body.remove_class(remove);
    body.set_attribute("dark", if theme.dark { "true" } else { "false" });
}

fn append_base_url(
    document: &mut SandboxDocument,
    base_url: &str,
) -> Result<(), serde_json::Error> {
    let literal = script_json(&base_url)?;
    let script = format!("window.CHAPTERS_BASE_URL = {};", literal);
    document.append_head(Element::new("script").render(&script));
    Ok(())
}

fn prepend_import_map(
    document: &mut SandboxDocument,
    entries: &[ImportMapEntry],
) -> Result<(), serde_json::Error> {
    #[derive(Serialize)]
    struct ImportMap<'a> {
        imports: indexmap::IndexMap<&'a str, &'a str>,
    }

    let json = script_json(&ImportMap {
        imports: to_imports_object(entries),
    })?;
    let script = Element::new("script").with_attribute("type", "importmap");
    document.prepend_head(script.render(&json));
    Ok(())
}

/// JSON for embedding inside `<script>`; `</` cannot close the element early.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

fn non_empty(fragment: Option<&str>) -> Option<&str> {
    fragment.filter(|code| !code.is_empty())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    const TEMPLATE: &str =
        "<html><head><meta charset=\"utf-8\"></head><body><canvas></canvas></body></html>";
    const BASE: &str = "https://cdn.example/chapters";

    #[test]
    fn no_fragments_adds_only_theme_and_base_url() {
        let doc = create_iframe_doc(TEMPLATE, BASE, &SandboxContent::default()).unwrap();
        assert!(!doc.contains("<style>"));
        assert!(!doc.contains(CONTROLLERS_CLASS));
        assert!(!doc.contains("type=\"module\""));
        assert!(!doc.contains("importmap"));
        assert!(doc.contains("class=\"sl-theme-light\""));
        assert!(doc.contains("dark=\"false\""));
        assert!(doc.contains("--v-theme-surface: 0, 0, 0;"));
        assert!(doc.contains(
            "<script>window.CHAPTERS_BASE_URL = \"https://cdn.example/chapters\";</script>"
        ));
    }

    #[test]
    fn dark_theme_swaps_classes() {
        let template = "<html><head></head><body class=\"sl-theme-light\"></body></html>";
        let content = SandboxContent {
            theme: Theme {
                dark: true,
                surface: Some("18, 18, 18".to_string()),
            },
            ..SandboxContent::default()
        };
        let doc = build_document(template, BASE, &content).unwrap();
        assert!(doc.body().has_class("sl-theme-dark"));
        assert!(!doc.body().has_class("sl-theme-light"));
        assert_eq!(doc.body().attribute("dark"), Some("true"));
        assert_eq!(doc.body().style_property(SURFACE_PROPERTY), Some("18, 18, 18"));
    }

    #[test]
    fn import_map_is_first_head_child() {
        let maps = vec![
            ImportMapEntry::third_party("three", "https://esm.sh/three"),
            ImportMapEntry::local("a.js", "https://cdn.example/chapters/demo/a.js"),
        ];
        let content = SandboxContent {
            import_maps: Some(&maps),
            script: Some("import * as THREE from 'three';"),
            ..SandboxContent::default()
        };
        let doc = build_document(TEMPLATE, BASE, &content).unwrap();
        let first = &doc.head_children()[0];
        assert_eq!(
            first,
            "<script type=\"importmap\">{\"imports\":{\"three\":\"https://esm.sh/three\",\"a.js\":\"https://cdn.example/chapters/demo/a.js\"}}</script>"
        );
        assert!(
            doc.head_children()
                .last()
                .is_some_and(|last| last.starts_with("<script type=\"module\">"))
        );
    }

    #[test]
    fn fragments_land_in_order() {
        let content = SandboxContent {
            html: Some("<button>go</button>"),
            stylesheet: Some("body { color: red; }"),
            script: Some("console.log(1);"),
            ..SandboxContent::default()
        };
        let doc = build_document(TEMPLATE, BASE, &content).unwrap();
        let head = doc.head_children();
        assert_eq!(head.len(), 4);
        assert!(head[1].starts_with("<script>window.CHAPTERS_BASE_URL"));
        assert_eq!(head[2], "<style>body { color: red; }</style>");
        assert_eq!(head[3], "<script type=\"module\">console.log(1);</script>");
        assert_eq!(
            doc.body_children().last().map(String::as_str),
            Some("<div class=\"canvas-box__controllers\"><button>go</button></div>")
        );
    }

    #[test]
    fn empty_fragments_are_skipped() {
        let content = SandboxContent {
            html: Some(""),
            stylesheet: Some(""),
            script: Some(""),
            ..SandboxContent::default()
        };
        let doc = build_document(TEMPLATE, BASE, &content).unwrap();
        assert_eq!(doc.head_children().len(), 2);
        assert_eq!(doc.body_children().len(), 1);
    }

    #[test]
    fn script_json_cannot_close_script_element() {
        let doc = create_iframe_doc(TEMPLATE, "/x</script><b>", &SandboxContent::default()).unwrap();
        assert!(doc.contains("\"/x<\\/script><b>\""));
    }

    #[test]
    fn default_template_parses() {
        let doc = build_document(DEFAULT_TEMPLATE, BASE, &SandboxContent::default()).unwrap();
        assert!(doc.body_children().iter().any(|c| c.contains("<canvas id=\"gpu\">")));
        assert!(doc.to_html().starts_with("<html lang=\"en\">"));
    }

    #[test]
    fn theme_keeps_escaped_body_attributes_intact() {
        let template = "<html><head></head><body class=\"a&amp;b\" style='font-family: \"Fira\"'></body></html>";
        let doc = create_iframe_doc(template, "/c", &SandboxContent::default()).unwrap();
        assert!(doc.contains(concat!(
            r#"<body class="a&amp;b sl-theme-light" "#,
            r#"style="font-family: &quot;Fira&quot;; --v-theme-surface: 0, 0, 0;" dark="false">"#,
        )));
    }
}
