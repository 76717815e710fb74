//! # canvasbox-core
//!
//! The pure engine behind the canvasbox chapter viewer.
//!
//! A content server publishes a *prelude*: a tree of chapter descriptors plus
//! a global third-party import map. This crate turns that payload into an
//! addressable [`DescriptorTree`], resolves per-instance import maps, and
//! assembles the standalone sandbox document a preview frame displays.
//!
//! ```text
//! Prelude ──► resolve_tree ──► DescriptorTree ──► create_iframe_doc ──► srcdoc
//!   (json)      (tree.rs)       (arena + index)      (sandbox/)
//! ```
//!
//! Nothing in here touches the network. Fetching, live-reload connections and
//! the CLI live in the `canvasbox` app crate.

pub mod descriptor;
pub mod import_map;
pub mod live;
pub mod locator;
pub mod sandbox;
pub mod tree;

pub use descriptor::{Descriptor, DescriptorError, Directory, Instance, Prelude};
pub use import_map::{ImportKind, ImportMapEntry, resolve_instance_import_maps};
pub use live::{
    EventStreamDecoder, ListenerId, LiveMessage, RebuildListeners, ServerEvent, dispatch_message,
};
pub use locator::ContentLocator;
pub use sandbox::{DEFAULT_TEMPLATE, SandboxContent, Theme, create_iframe_doc};
pub use tree::{DescriptorTree, NodeId, NodeKind, ResolvedInstance, ResolvedNode, resolve_tree};
