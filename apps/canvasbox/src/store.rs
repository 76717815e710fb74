//! # Chapter Store
//!
//! Application state owned by the composition root.
//!
//! The store fetches the prelude outside its lock and swaps the resolved tree
//! in with a single write, so readers see either the old tree or the new one.
//! Two overlapping loads both complete; whichever finishes last wins.

use crate::client::{ContentClient, ContentError};
use canvasbox_core::{DescriptorTree, resolve_tree};
use tokio::sync::{RwLock, RwLockReadGuard};

/// Viewer state shared by every consumer.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    editing: bool,
    tree: DescriptorTree,
}

impl AppState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the user is editing the open chapter.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn set_editing(&mut self, editing: bool) {
        self.editing = editing;
    }

    #[must_use]
    pub fn tree(&self) -> &DescriptorTree {
        &self.tree
    }
}

/// Stateful service around [`AppState`] with an explicit `load` / `reset`
/// lifecycle.
#[derive(Debug)]
pub struct ChapterStore {
    client: ContentClient,
    state: RwLock<AppState>,
}

impl ChapterStore {
    #[must_use]
    pub fn new(client: ContentClient) -> Self {
        Self {
            client,
            state: RwLock::new(AppState::new()),
        }
    }

    #[must_use]
    pub fn client(&self) -> &ContentClient {
        &self.client
    }

    /// Read access to the current state.
    pub async fn state(&self) -> RwLockReadGuard<'_, AppState> {
        self.state.read().await
    }

    /// Fetch the prelude and replace the tree.
    ///
    /// Returns the number of resolved nodes. On failure the previous tree is
    /// kept.
    pub async fn load(&self) -> Result<usize, ContentError> {
        let prelude = self.client.prelude().await?;
        let tree = resolve_tree(prelude, self.client.locator());
        let count = tree.len();
        tracing::info!(
            nodes = count,
            instances = tree.instances().count(),
            "prelude loaded"
        );

        self.state.write().await.tree = tree;
        Ok(count)
    }

    /// Drop the loaded tree and clear the editing flag.
    pub async fn reset(&self) {
        *self.state.write().await = AppState::new();
    }

    pub async fn set_editing(&self, editing: bool) {
        self.state.write().await.set_editing(editing);
    }
}
