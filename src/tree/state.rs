//! Checked / selected propagation.
//!
//! Two independent flags live on every node. Whether a node is *active*
//! (contributes to what a renderer shows) is an OR over the node's own flag
//! and, optionally, the same flag on its descendants or ancestors.
//! A removed node is never active.

use serde::{Deserialize, Serialize};

use super::{NodeId, SpectrumTree};

/// Which flag drives activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationMode {
    Selection,
    Checked,
}

impl SpectrumTree {
    fn flag(&self, id: NodeId, mode: ActivationMode) -> bool {
        match (self.get(id), mode) {
            (Some(node), ActivationMode::Selection) => node.selected,
            (Some(node), ActivationMode::Checked) => node.checked,
            (None, _) => false,
        }
    }

    fn with_descendants(&self, id: NodeId, mode: ActivationMode) -> bool {
        self.flag(id, mode) || self.children(id).iter().any(|c| self.with_descendants(*c, mode))
    }

    fn with_ancestors(&self, id: NodeId, mode: ActivationMode) -> bool {
        let mut current = Some(id);
        while let Some(n) = current {
            if self.flag(n, mode) {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    pub fn checked_with_descendants(&self, id: NodeId) -> bool {
        self.with_descendants(id, ActivationMode::Checked)
    }

    pub fn checked_with_ancestors(&self, id: NodeId) -> bool {
        self.with_ancestors(id, ActivationMode::Checked)
    }

    pub fn selected_with_descendants(&self, id: NodeId) -> bool {
        self.with_descendants(id, ActivationMode::Selection)
    }

    pub fn selected_with_ancestors(&self, id: NodeId) -> bool {
        self.with_ancestors(id, ActivationMode::Selection)
    }

    /// The single activation decision for renderers.
    pub fn is_active(&self, id: NodeId, with_descendants: bool, with_ancestors: bool, mode: ActivationMode) -> bool {
        let mut active = self.flag(id, mode);
        if with_descendants {
            active |= self.with_descendants(id, mode);
        }
        if with_ancestors {
            active |= self.with_ancestors(id, mode);
        }
        active
    }

    /// Every leaf holding data that is active through itself or an
    /// ancestor, in display order.
    pub fn active_leaves(&self, mode: ActivationMode) -> Vec<NodeId> {
        self.roots
            .iter()
            .flat_map(|r| self.leaves(*r))
            .filter(|id| self.get(*id).and_then(|n| n.buffer()).is_some())
            .filter(|id| self.is_active(*id, false, true, mode))
            .collect()
    }
}
