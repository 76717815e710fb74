//! # Descriptor Tree
//!
//! The resolved chapter tree.
//!
//! Resolution flattens the nested prelude into an arena of [`ResolvedNode`]s.
//! Each node knows its full entry (root-to-node path), its display title and
//! its ancestors as [`NodeId`]s, so nothing holds a pointer back into its
//! parent. A `BTreeMap` index addresses nodes by full entry.

use crate::descriptor::{Descriptor, Directory, Instance, Prelude};
use crate::import_map::{ImportMapEntry, resolve_instance_import_maps, third_party_entries};
use crate::locator::ContentLocator;
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// NODE TYPES
// =============================================================================

/// Index of a node in the [`DescriptorTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub usize);

/// Instance payload after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedInstance {
    pub libs: Vec<String>,
    pub has_html: bool,
    pub has_stylesheet: bool,
    pub has_description: bool,
    pub has_preview_image: bool,
    /// Third-party entries first, then local libs.
    pub import_maps: Vec<ImportMapEntry>,
}

/// Variant-specific part of a resolved node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Instance(ResolvedInstance),
    Directory { children: Vec<NodeId> },
}

/// A descriptor with its derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNode {
    pub id: NodeId,
    pub entry: String,
    pub full_entry: String,
    /// Declared title, or the entry when none was declared.
    pub title: String,
    pub intro: Option<String>,
    /// Ancestor directories, root first, immediate parent last.
    pub parents: Vec<NodeId>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl ResolvedNode {
    #[must_use]
    pub fn is_instance(&self) -> bool {
        matches!(self.kind, NodeKind::Instance(_))
    }

    #[must_use]
    pub fn as_instance(&self) -> Option<&ResolvedInstance> {
        match &self.kind {
            NodeKind::Instance(instance) => Some(instance),
            NodeKind::Directory { .. } => None,
        }
    }

    /// Child ids of a directory; empty for instances.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Directory { children } => children,
            NodeKind::Instance(_) => &[],
        }
    }
}

// =============================================================================
// TREE
// =============================================================================

/// Arena of resolved nodes plus the full-entry index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorTree {
    /// Node storage in pre-order.
    nodes: Vec<ResolvedNode>,

    /// Top-level nodes in prelude order.
    roots: Vec<NodeId>,

    /// full_entry -> NodeId. Last write wins on duplicates.
    index: BTreeMap<String, NodeId>,
}

impl DescriptorTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Top-level nodes in prelude order.
    pub fn roots(&self) -> impl Iterator<Item = &ResolvedNode> {
        self.roots.iter().filter_map(|id| self.get(*id))
    }

    #[must_use]
    pub fn root_ids(&self) -> &[NodeId] {
        &self.roots
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&ResolvedNode> {
        self.nodes.get(id.0)
    }

    /// Lookup a node by its full entry.
    #[must_use]
    pub fn find(&self, full_entry: &str) -> Option<&ResolvedNode> {
        self.index.get(full_entry).and_then(|id| self.get(*id))
    }

    /// Ancestor nodes of `id`, root first.
    pub fn parents_of(&self, id: NodeId) -> impl Iterator<Item = &ResolvedNode> {
        self.get(id)
            .into_iter()
            .flat_map(|node| node.parents.iter())
            .filter_map(|parent| self.get(*parent))
    }

    /// Direct children of `id` in declaration order.
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = &ResolvedNode> {
        self.get(id)
            .into_iter()
            .flat_map(|node| node.children().iter())
            .filter_map(|child| self.get(*child))
    }

    /// All nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedNode> {
        self.nodes.iter()
    }

    /// Index entries sorted by full entry.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ResolvedNode)> {
        self.index
            .iter()
            .filter_map(|(key, id)| self.get(*id).map(|node| (key.as_str(), node)))
    }

    /// All instance nodes in pre-order.
    pub fn instances(&self) -> impl Iterator<Item = &ResolvedNode> {
        self.nodes.iter().filter(|node| node.is_instance())
    }

    /// First instance in pre-order, the default chapter to open.
    #[must_use]
    pub fn first_instance(&self) -> Option<&ResolvedNode> {
        self.instances().next()
    }

    /// Number of resolved nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct full entries in the index.
    ///
    /// Smaller than [`len`](Self::len) only when entries collide.
    #[must_use]
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Render an indented outline, one node per line.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        for node in &self.nodes {
            let indent = "  ".repeat(node.parents.len());
            let marker = if node.is_instance() { "-" } else { "+" };
            output.push_str(&format!(
                "{}{} {} ({})\n",
                indent, marker, node.title, node.full_entry
            ));
        }
        output
    }
}

/// Serialized as the nested tree the UI walks: roots with inline children.
impl Serialize for DescriptorTree {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;

        #[derive(Serialize)]
        struct Nested<'a> {
            #[serde(flatten)]
            node: &'a ResolvedNode,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            nodes: Vec<Nested<'a>>,
        }

        fn nest<'a>(tree: &'a DescriptorTree, node: &'a ResolvedNode) -> Nested<'a> {
            Nested {
                node,
                nodes: tree.children_of(node.id).map(|c| nest(tree, c)).collect(),
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.roots.len()))?;
        for root in self.roots() {
            seq.serialize_element(&nest(self, root))?;
        }
        seq.end()
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolve a prelude into a [`DescriptorTree`].
///
/// Depth-first pre-order walk. Directories keep their child order; instances
/// get their import maps. Duplicate full entries are not rejected: the later
/// node replaces the earlier one in the index.
#[must_use]
pub fn resolve_tree(prelude: Prelude, locator: &ContentLocator) -> DescriptorTree {
    let third_party = third_party_entries(&prelude.imports);
    let mut resolver = Resolver {
        tree: DescriptorTree::new(),
        third_party: &third_party,
        locator,
    };

    let mut chain = Vec::new();
    for descriptor in prelude.descriptors {
        let id = resolver.resolve(descriptor, &mut chain, "");
        resolver.tree.roots.push(id);
    }

    resolver.tree
}

struct Resolver<'a> {
    tree: DescriptorTree,
    third_party: &'a [ImportMapEntry],
    locator: &'a ContentLocator,
}

impl Resolver<'_> {
    /// Resolve one node and its subtree, returning the node id.
    ///
    /// `chain` holds the ancestor ids and is restored before returning.
    fn resolve(&mut self, descriptor: Descriptor, chain: &mut Vec<NodeId>, parent: &str) -> NodeId {
        let id = NodeId(self.tree.nodes.len());
        let full_entry = format!("{}/{}", parent, descriptor.entry());

        match descriptor {
            Descriptor::Instance(instance) => {
                let node = self.instance_node(id, instance, chain, full_entry);
                self.insert(node);
            }
            Descriptor::Directory(directory) => {
                let Directory {
                    entry,
                    title,
                    intro,
                    children,
                } = directory;
                // Reserve the slot so the directory precedes its children.
                self.insert(ResolvedNode {
                    id,
                    title: title.unwrap_or_else(|| entry.clone()),
                    entry,
                    full_entry: full_entry.clone(),
                    intro,
                    parents: chain.clone(),
                    kind: NodeKind::Directory {
                        children: Vec::with_capacity(children.len()),
                    },
                });

                chain.push(id);
                let child_ids: Vec<NodeId> = children
                    .into_iter()
                    .map(|child| self.resolve(child, chain, &full_entry))
                    .collect();
                chain.pop();

                if let Some(NodeKind::Directory { children }) =
                    self.tree.nodes.get_mut(id.0).map(|node| &mut node.kind)
                {
                    *children = child_ids;
                }
            }
        }

        id
    }

    fn instance_node(
        &self,
        id: NodeId,
        instance: Instance,
        chain: &[NodeId],
        full_entry: String,
    ) -> ResolvedNode {
        let Instance {
            entry,
            title,
            intro,
            libs,
            has_html,
            has_stylesheet,
            has_description,
            has_preview_image,
        } = instance;
        let import_maps =
            resolve_instance_import_maps(self.third_party, &full_entry, &libs, self.locator);

        ResolvedNode {
            id,
            title: title.unwrap_or_else(|| entry.clone()),
            entry,
            full_entry,
            intro,
            parents: chain.to_vec(),
            kind: NodeKind::Instance(ResolvedInstance {
                libs,
                has_html,
                has_stylesheet,
                has_description,
                has_preview_image,
                import_maps,
            }),
        }
    }

    fn insert(&mut self, node: ResolvedNode) {
        if let Some(previous) = self.tree.index.insert(node.full_entry.clone(), node.id) {
            tracing::debug!(
                full_entry = %node.full_entry,
                previous = previous.0,
                current = node.id.0,
                "duplicate full entry, later descriptor wins"
            );
        }
        self.tree.nodes.push(node);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::import_map::ImportKind;
    use url::Url;

    fn locator() -> ContentLocator {
        ContentLocator::new(
            "https://cdn.example/chapters",
            Url::parse("http://localhost").unwrap(),
        )
    }

    fn sample_prelude() -> Prelude {
        let mut prelude = Prelude::default();
        prelude
            .imports
            .insert("three".to_string(), "https://esm.sh/three".to_string());
        prelude.descriptors = vec![
            Directory::new(
                "basics",
                vec![
                    Instance::new("triangle").with_libs(["mesh.js"]).into(),
                    Directory::new("lights", vec![Instance::new("spot").with_title("Spot Light").into()])
                        .into(),
                ],
            )
            .into(),
            Instance::new("hello").into(),
        ];
        prelude
    }

    #[test]
    fn full_entries_join_parent_paths() {
        let tree = resolve_tree(sample_prelude(), &locator());
        let entries: Vec<_> = tree.iter().map(|n| n.full_entry.as_str()).collect();
        assert_eq!(entries, vec![
            "/basics",
            "/basics/triangle",
            "/basics/lights",
            "/basics/lights/spot",
            "/hello",
        ]);
    }

    #[test]
    fn title_defaults_to_entry() {
        let tree = resolve_tree(sample_prelude(), &locator());
        assert_eq!(tree.find("/basics/triangle").map(|n| n.title.as_str()), Some("triangle"));
        assert_eq!(
            tree.find("/basics/lights/spot").map(|n| n.title.as_str()),
            Some("Spot Light")
        );
    }

    #[test]
    fn parents_are_root_first() {
        let tree = resolve_tree(sample_prelude(), &locator());
        let spot = tree.find("/basics/lights/spot").unwrap();
        let parents: Vec<_> = tree.parents_of(spot.id).map(|n| n.entry.as_str()).collect();
        assert_eq!(parents, vec!["basics", "lights"]);

        let hello = tree.find("/hello").unwrap();
        assert!(hello.parents.is_empty());
    }

    #[test]
    fn children_keep_declaration_order() {
        let tree = resolve_tree(sample_prelude(), &locator());
        let basics = tree.find("/basics").unwrap();
        let children: Vec<_> = tree.children_of(basics.id).map(|n| n.entry.as_str()).collect();
        assert_eq!(children, vec!["triangle", "lights"]);

        let roots: Vec<_> = tree.roots().map(|n| n.entry.as_str()).collect();
        assert_eq!(roots, vec!["basics", "hello"]);
    }

    #[test]
    fn index_has_one_entry_per_node() {
        let prelude = sample_prelude();
        let count: usize = prelude.descriptors.iter().map(Descriptor::count).sum();
        let tree = resolve_tree(prelude, &locator());
        assert_eq!(tree.len(), count);
        assert_eq!(tree.index_len(), count);
    }

    #[test]
    fn instances_carry_import_maps_directories_do_not() {
        let tree = resolve_tree(sample_prelude(), &locator());
        let triangle = tree.find("/basics/triangle").and_then(|n| n.as_instance()).unwrap();
        assert_eq!(triangle.import_maps.len(), 2);
        assert_eq!(triangle.import_maps[0].kind, ImportKind::ThirdParty);
        assert_eq!(
            triangle.import_maps[1].url,
            "https://cdn.example/chapters/basics/triangle/mesh.js"
        );

        let basics = tree.find("/basics").unwrap();
        assert!(basics.as_instance().is_none());
    }

    #[test]
    fn duplicate_full_entry_last_write_wins() {
        let prelude = Prelude {
            imports: Default::default(),
            descriptors: vec![
                Instance::new("demo").with_title("first").into(),
                Instance::new("demo").with_title("second").into(),
            ],
        };
        let tree = resolve_tree(prelude, &locator());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.index_len(), 1);
        assert_eq!(tree.find("/demo").map(|n| n.title.as_str()), Some("second"));
    }

    #[test]
    fn first_instance_is_preorder() {
        let tree = resolve_tree(sample_prelude(), &locator());
        assert_eq!(
            tree.first_instance().map(|n| n.full_entry.as_str()),
            Some("/basics/triangle")
        );
    }

    #[test]
    fn empty_prelude_yields_empty_tree() {
        let tree = resolve_tree(Prelude::default(), &locator());
        assert!(tree.is_empty());
        assert!(tree.first_instance().is_none());
    }

    #[test]
    fn to_text_indents_by_depth() {
        let tree = resolve_tree(sample_prelude(), &locator());
        let text = tree.to_text();
        assert!(text.contains("+ basics (/basics)\n"));
        assert!(text.contains("    - Spot Light (/basics/lights/spot)\n"));
    }

    #[test]
    fn serializes_as_nested_tree() {
        let tree = resolve_tree(sample_prelude(), &locator());
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json[0]["full_entry"], "/basics");
        assert_eq!(json[0]["type"], "directory");
        assert_eq!(json[0]["nodes"][1]["nodes"][0]["title"], "Spot Light");
        assert_eq!(json[1]["type"], "instance");
    }
}
