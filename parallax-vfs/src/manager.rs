//! Process-wide mount table and working-directory state.

use crate::path::VfsPath;
use crate::tree::FilesystemTree;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Default)]
struct MountState {
    trees: BTreeMap<String, Arc<dyn FilesystemTree>>,
    current_tree: Option<Arc<dyn FilesystemTree>>,
    // set iff current_tree is set
    current_path: Option<VfsPath>,
}

/// Registry of mounted trees plus the virtual working-directory state.
///
/// The mount table and working directory share one mutex; the
/// temporary-directory override has its own, so temp-dir queries never
/// contend with routing. Trees are handed out as `Arc`s: a clone obtained
/// before [`clear`](Self::clear) stays valid afterwards.
pub struct FilesystemManager {
    state: Mutex<MountState>,
    temp_dir: Mutex<Option<VfsPath>>,
}

impl FilesystemManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MountState::default()),
            temp_dir: Mutex::new(None),
        }
    }

    /// Installs `tree` at `root_name`, which must be spelled `//name` with
    /// an alphanumeric name.
    ///
    /// # Panics
    /// If a tree is already installed at that root. Double installation is
    /// a programming error, not an I/O failure.
    pub fn install_tree(&self, root_name: &str, tree: Arc<dyn FilesystemTree>) {
        debug_assert_eq!(
            VfsPath::new(root_name).root_name().as_deref(),
            Some(root_name),
            "root name must have the form //name"
        );
        let mut state = self.state.lock().unwrap();
        let previous = state.trees.insert(root_name.to_string(), tree);
        assert!(
            previous.is_none(),
            "filesystem tree already installed at root '{root_name}'"
        );
        debug!(target: "parallax::vfs", root = %root_name, "installed tree");
    }

    /// The tree installed at `root_name`, if any.
    pub fn tree_at_root(&self, root_name: &str) -> Option<Arc<dyn FilesystemTree>> {
        let state = self.state.lock().unwrap();
        state.trees.get(root_name).cloned()
    }

    /// The tree owning the current working directory, or `None` when the
    /// host filesystem owns it.
    pub fn current_tree(&self) -> Option<Arc<dyn FilesystemTree>> {
        self.state.lock().unwrap().current_tree.clone()
    }

    /// The in-tree working directory, or `None` when the host owns the
    /// working directory (the host then tracks it itself).
    pub fn current_path(&self) -> Option<VfsPath> {
        self.state.lock().unwrap().current_path.clone()
    }

    /// Moves the working directory.
    ///
    /// An absolute path inside a mounted tree switches to that tree; an
    /// absolute path outside every tree hands the working directory back to
    /// the host. A relative path is resolved against the current in-tree
    /// directory.
    ///
    /// # Panics
    /// If `path` is relative and no tree owns the working directory.
    pub fn set_current_path(&self, path: &VfsPath) {
        let mut state = self.state.lock().unwrap();
        if path.is_absolute() {
            let tree = path.root_name().and_then(|r| state.trees.get(&r).cloned());
            match tree {
                Some(tree) => {
                    state.current_tree = Some(tree);
                    state.current_path = Some(path.lexically_normal());
                }
                None => {
                    state.current_tree = None;
                    state.current_path = None;
                }
            }
        } else if state.current_tree.is_some() {
            let current = state
                .current_path
                .clone()
                .expect("in-tree working directory is set whenever a tree owns it");
            state.current_path = Some(current.join(path).lexically_normal());
        } else {
            panic!("relative working directory given but no tree owns the current path");
        }
        debug!(
            target: "parallax::vfs",
            path = %path,
            in_tree = state.current_tree.is_some(),
            "set current path"
        );
    }

    /// Overrides the temporary-directory location.
    pub fn set_temp_dir(&self, path: impl Into<VfsPath>) {
        *self.temp_dir.lock().unwrap() = Some(path.into());
    }

    /// The temporary-directory override, if one is set.
    pub fn temp_dir(&self) -> Option<VfsPath> {
        self.temp_dir.lock().unwrap().clone()
    }

    /// Drops every installed tree and resets all state. Only for tests that
    /// guarantee no concurrent users.
    pub fn clear(&self) {
        {
            let mut state = self.state.lock().unwrap();
            *state = MountState::default();
        }
        *self.temp_dir.lock().unwrap() = None;
        debug!(target: "parallax::vfs", "cleared manager state");
    }
}

impl Default for FilesystemManager {
    fn default() -> Self {
        Self::new()
    }
}

static MANAGER: OnceCell<FilesystemManager> = OnceCell::new();

/// The process-wide manager instance, created lazily.
pub fn manager() -> &'static FilesystemManager {
    MANAGER.get_or_init(FilesystemManager::new)
}
