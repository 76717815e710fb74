//! # Descriptor Module
//!
//! Wire types of the prelude payload served at `index.json`.
//!
//! Descriptors are tagged by a numeric `type` field (`0` instance,
//! `1` directory). Serde cannot use integer tags for internally tagged
//! enums, so a flat raw shape is decoded first and converted.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// ERROR TYPE
// =============================================================================

/// Errors raised while decoding descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The `type` tag is neither instance nor directory.
    #[error("unknown descriptor type {tag} for entry '{entry}'")]
    UnknownType { tag: u64, entry: String },
}

// =============================================================================
// DESCRIPTOR TYPES
// =============================================================================

/// Numeric tag of an instance descriptor.
pub const INSTANCE_TAG: u64 = 0;

/// Numeric tag of a directory descriptor.
pub const DIRECTORY_TAG: u64 = 1;

/// A runnable chapter: one demo with its own assets and library files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instance {
    pub entry: String,
    pub title: Option<String>,
    pub intro: Option<String>,
    /// Module specifiers relative to the instance directory.
    pub libs: Vec<String>,
    pub has_html: bool,
    pub has_stylesheet: bool,
    pub has_description: bool,
    pub has_preview_image: bool,
}

impl Instance {
    /// Create an instance with no libs and no optional assets.
    #[must_use]
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            ..Self::default()
        }
    }

    /// Builder-style libs setter.
    #[must_use]
    pub fn with_libs<I, S>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libs = libs.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style title setter.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A grouping node with ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    pub entry: String,
    pub title: Option<String>,
    pub intro: Option<String>,
    pub children: Vec<Descriptor>,
}

impl Directory {
    #[must_use]
    pub fn new(entry: impl Into<String>, children: Vec<Descriptor>) -> Self {
        Self {
            entry: entry.into(),
            children,
            ..Self::default()
        }
    }
}

/// A node of the unresolved content tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RawDescriptor", into = "RawDescriptor")]
pub enum Descriptor {
    Instance(Instance),
    Directory(Directory),
}

impl Descriptor {
    /// Segment name of this node within its parent.
    #[must_use]
    pub fn entry(&self) -> &str {
        match self {
            Self::Instance(instance) => &instance.entry,
            Self::Directory(directory) => &directory.entry,
        }
    }

    /// Count this node and every descendant.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Instance(_) => 1,
            Self::Directory(directory) => {
                1 + directory.children.iter().map(Self::count).sum::<usize>()
            }
        }
    }
}

impl From<Instance> for Descriptor {
    fn from(instance: Instance) -> Self {
        Self::Instance(instance)
    }
}

impl From<Directory> for Descriptor {
    fn from(directory: Directory) -> Self {
        Self::Directory(directory)
    }
}

/// Root payload: global third-party imports plus the descriptor forest.
///
/// `imports` keeps JSON declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Prelude {
    #[serde(default)]
    pub imports: IndexMap<String, String>,
    #[serde(default)]
    pub descriptors: Vec<Descriptor>,
}

// =============================================================================
// WIRE SHAPE
// =============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawDescriptor {
    #[serde(rename = "type")]
    tag: u64,
    entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    intro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    libs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<Descriptor>>,
    #[serde(rename = "hasHTML", default, skip_serializing_if = "Option::is_none")]
    has_html: Option<bool>,
    #[serde(rename = "hasStylesheet", default, skip_serializing_if = "Option::is_none")]
    has_stylesheet: Option<bool>,
    #[serde(rename = "hasDescription", default, skip_serializing_if = "Option::is_none")]
    has_description: Option<bool>,
    #[serde(rename = "hasPreviewImage", default, skip_serializing_if = "Option::is_none")]
    has_preview_image: Option<bool>,
}

impl TryFrom<RawDescriptor> for Descriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        match raw.tag {
            INSTANCE_TAG => Ok(Self::Instance(Instance {
                entry: raw.entry,
                title: raw.title,
                intro: raw.intro,
                libs: raw.libs.unwrap_or_default(),
                has_html: raw.has_html.unwrap_or(false),
                has_stylesheet: raw.has_stylesheet.unwrap_or(false),
                has_description: raw.has_description.unwrap_or(false),
                has_preview_image: raw.has_preview_image.unwrap_or(false),
            })),
            DIRECTORY_TAG => Ok(Self::Directory(Directory {
                entry: raw.entry,
                title: raw.title,
                intro: raw.intro,
                children: raw.children.unwrap_or_default(),
            })),
            tag => Err(DescriptorError::UnknownType {
                tag,
                entry: raw.entry,
            }),
        }
    }
}

impl From<Descriptor> for RawDescriptor {
    fn from(descriptor: Descriptor) -> Self {
        match descriptor {
            Descriptor::Instance(instance) => Self {
                tag: INSTANCE_TAG,
                entry: instance.entry,
                title: instance.title,
                intro: instance.intro,
                libs: Some(instance.libs),
                children: None,
                has_html: Some(instance.has_html),
                has_stylesheet: Some(instance.has_stylesheet),
                has_description: Some(instance.has_description),
                has_preview_image: Some(instance.has_preview_image),
            },
            Descriptor::Directory(directory) => Self {
                tag: DIRECTORY_TAG,
                entry: directory.entry,
                title: directory.title,
                intro: directory.intro,
                libs: None,
                children: Some(directory.children),
                has_html: None,
                has_stylesheet: None,
                has_description: None,
                has_preview_image: None,
            },
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn decodes_instance_with_flags() {
        let json = r#"{
            "type": 0,
            "entry": "triangle",
            "libs": ["shader.js"],
            "hasHTML": true,
            "hasStylesheet": false,
            "hasDescription": true,
            "hasPreviewImage": false
        }"#;
        let descriptor: Descriptor = serde_json::from_str(json).unwrap();
        let Descriptor::Instance(instance) = descriptor else {
            panic!("expected instance");
        };
        assert_eq!(instance.entry, "triangle");
        assert_eq!(instance.libs, vec!["shader.js".to_string()]);
        assert!(instance.has_html);
        assert!(instance.has_description);
        assert!(!instance.has_stylesheet);
        assert!(instance.title.is_none());
    }

    #[test]
    fn decodes_nested_directory() {
        let json = r#"{
            "type": 1,
            "entry": "basics",
            "title": "Basics",
            "children": [
                {"type": 0, "entry": "a"},
                {"type": 1, "entry": "b", "children": []}
            ]
        }"#;
        let descriptor: Descriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.entry(), "basics");
        assert_eq!(descriptor.count(), 3);
    }

    #[test]
    fn rejects_unknown_type_tag() {
        let json = r#"{"type": 7, "entry": "odd"}"#;
        let result: Result<Descriptor, _> = serde_json::from_str(json);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown descriptor type 7"));
    }

    #[test]
    fn prelude_imports_keep_declaration_order() {
        let json = r#"{
            "imports": {"zeta": "https://z.example/z.js", "alpha": "https://a.example/a.js"},
            "descriptors": []
        }"#;
        let prelude: Prelude = serde_json::from_str(json).unwrap();
        let libs: Vec<_> = prelude.imports.keys().cloned().collect();
        assert_eq!(libs, vec!["zeta".to_string(), "alpha".to_string()]);
    }

    #[test]
    fn encodes_with_numeric_tag() {
        let descriptor = Descriptor::from(Instance::new("demo").with_libs(["a.js"]));
        let json = serde_json::to_string(&descriptor).unwrap();
        assert!(json.contains("\"type\":0"));
        assert!(json.contains("\"hasHTML\":false"));
    }
}
