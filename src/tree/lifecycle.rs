//! Removing, reloading and clearing nodes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::data::loader::Loader;
use crate::error::TreeError;

use super::{ActivationMode, LoadState, NodeId, NodeOrigin, SpectrumTree};

/// Which nodes [`SpectrumTree::clear`] removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClearTarget {
    /// Every top-level node.
    All,
    /// Nodes whose own flag is set.
    Active(ActivationMode),
    /// Nodes not active through themselves, a descendant or an ancestor.
    Inactive(ActivationMode),
}

impl SpectrumTree {
    /// Remove `id` and its subtree.
    ///
    /// Children go first, last child first. Any external background pointing
    /// into the removed subtree is cleared, and a load in flight for a removed
    /// node will be discarded when it finishes.
    pub fn remove(&mut self, id: NodeId) -> Result<(), TreeError> {
        let name = self.display_name(id, false);
        let node = self.node_mut(id)?;
        node.selected = false;
        let parent = node.parent;
        match parent {
            Some(parent) => {
                if let Some(children) = self.get_mut(parent).and_then(|p| p.children_mut()) {
                    children.retain(|c| *c != id);
                }
            }
            None => self.roots.retain(|r| *r != id),
        }

        let subtree = self.descendants(id);
        let count = subtree.len();
        for d in subtree.iter().rev() {
            self.release(*d);
        }

        let removed: HashSet<NodeId> = subtree.into_iter().collect();
        for slot in self.slots.iter_mut() {
            if let Some(node) = slot.node.as_mut() {
                if node.external_background.is_some_and(|e| removed.contains(&e)) {
                    node.external_background = None;
                }
            }
        }

        log::debug!("Removing {}; nodes: {}", name, count);
        Ok(())
    }

    /// Remove every child of `id`, last first.
    pub fn clear_children(&mut self, id: NodeId) -> Result<(), TreeError> {
        let children = self.node(id)?.children().to_vec();
        for child in children.into_iter().rev() {
            self.remove(child)?;
        }
        Ok(())
    }

    /// Mark a file node as not loaded, so the next populate reads it again.
    /// Children and data stay in place until then.
    pub fn invalidate(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        if node.origin != NodeOrigin::File {
            return Err(TreeError::NotAFile(id));
        }
        node.load_state = LoadState::Unloaded;
        Ok(())
    }

    /// Read a file node again, updating matching children in place.
    ///
    /// Nodes that use this file's spectra as background keep their reference
    /// as long as the shapes still agree; nothing else is fixed up.
    pub fn reload<L: Loader + ?Sized>(&mut self, id: NodeId, loader: &L) -> Result<(), TreeError> {
        if self.in_flight.contains(&id) {
            return Err(TreeError::LoadInFlight(id));
        }
        self.invalidate(id)?;
        log::info!("Reloading {}", self.display_name(id, false));
        self.populate(id, loader)
    }

    /// Remove a group of nodes. Returns how many of the targeted nodes were
    /// removed; nodes already gone with a removed ancestor are not counted.
    pub fn clear(&mut self, target: ClearTarget) -> usize {
        let candidates: Vec<NodeId> = match target {
            ClearTarget::All => self.roots.clone(),
            ClearTarget::Active(mode) => self
                .all_nodes()
                .into_iter()
                .filter(|id| self.is_active(*id, false, false, mode))
                .collect(),
            ClearTarget::Inactive(mode) => self
                .all_nodes()
                .into_iter()
                .filter(|id| !self.is_active(*id, true, true, mode))
                .collect(),
        };
        log::info!("Clearing {:?}: {} candidates", target, candidates.len());

        let mut removed = 0;
        for id in candidates {
            if self.contains(id) && self.remove(id).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    fn all_nodes(&self) -> Vec<NodeId> {
        self.roots.iter().flat_map(|r| self.descendants(*r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::data::dataset::Dataset;
    use crate::tree::testing::*;
    use crate::tree::SpectrumNode;

    #[test]
    fn test_remove_detaches_background_consumers() {
        init_logging();
        let mut tree = SpectrumTree::new();
        let file = tree.add_root(SpectrumNode::file(Path::new("/virtual/pair.nc")));
        tree.populate(
            file,
            &fixed(vec![
                Dataset::single("A", axis(2), vec![1.0; 2]),
                Dataset::single("B", axis(2), vec![1.0; 2]),
            ]),
        )
        .unwrap();
        let b = tree.children(file)[1];
        let x = leaf(&mut tree, "x", vec![3.0; 2]);
        tree.set_background(x, b.into()).unwrap();
        assert_eq!(tree.background_consumers(b), vec![x]);

        tree.remove(file).unwrap();
        assert!(!tree.contains(file));
        assert!(!tree.contains(b));
        assert_eq!(tree.background_reference(x), None);
        assert_eq!(tree.effective(x).unwrap().y, vec![3.0; 2]);
        assert_eq!(tree.roots(), &[x]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_remove_child_updates_parent() {
        let mut tree = SpectrumTree::new();
        let d = tree.add_root(SpectrumNode::directory(Path::new("/d")));
        let a = tree.add_child(d, SpectrumNode::content(Path::new("/d"), "a", None)).unwrap();
        let b = tree.add_child(d, SpectrumNode::content(Path::new("/d"), "b", None)).unwrap();
        tree.set_selected(a, true).unwrap();

        tree.remove(a).unwrap();
        assert_eq!(tree.children(d), &[b]);
        assert!(matches!(tree.remove(a), Err(TreeError::StaleNode(_))));
    }

    #[test]
    fn test_clear_children_empties_container() {
        let mut tree = SpectrumTree::new();
        let d = tree.add_root(SpectrumNode::directory(Path::new("/d")));
        for name in ["a", "b", "c"] {
            tree.add_child(d, SpectrumNode::content(Path::new("/d"), name, None)).unwrap();
        }
        tree.clear_children(d).unwrap();
        assert!(tree.children(d).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_invalidate_requires_file() {
        let mut tree = SpectrumTree::new();
        let d = tree.add_root(SpectrumNode::directory(Path::new("/d")));
        assert!(matches!(tree.invalidate(d), Err(TreeError::NotAFile(_))));

        let x = leaf(&mut tree, "x", vec![1.0]);
        tree.invalidate(x).unwrap();
        let node = tree.node(x).unwrap();
        assert!(!node.is_loaded());
        assert!(node.buffer().is_some());
    }

    #[test]
    fn test_reload_refused_while_in_flight() {
        let mut tree = SpectrumTree::new();
        let file = tree.add_root(SpectrumNode::file(Path::new("/virtual/slow.sif")));
        let _ticket = tree.begin_load(file).unwrap().unwrap();
        let err = tree.reload(file, &fixed(vec![])).unwrap_err();
        assert!(matches!(err, TreeError::LoadInFlight(_)));
    }

    #[test]
    fn test_clear_variants() {
        let mut tree = SpectrumTree::new();
        let d = tree.add_root(SpectrumNode::directory(Path::new("/d")));
        let a = tree.add_child(d, SpectrumNode::content(Path::new("/d"), "a", None)).unwrap();
        let b = tree.add_child(d, SpectrumNode::content(Path::new("/d"), "b", None)).unwrap();
        let x = leaf(&mut tree, "x", vec![1.0]);
        let y = leaf(&mut tree, "y", vec![1.0]);

        tree.set_checked(a, true).unwrap();
        // d is active through a, a through itself; b and y are not
        assert_eq!(tree.clear(ClearTarget::Inactive(ActivationMode::Checked)), 3);
        assert!(tree.contains(d));
        assert!(tree.contains(a));
        assert!(!tree.contains(b));
        assert!(!tree.contains(x));
        assert!(!tree.contains(y));

        tree.set_selected(a, true).unwrap();
        assert_eq!(tree.clear(ClearTarget::Active(ActivationMode::Selection)), 1);
        assert_eq!(tree.children(d).len(), 0);

        leaf(&mut tree, "z", vec![1.0]);
        assert_eq!(tree.clear(ClearTarget::All), 2);
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
    }
}
