//! The spectrum tree.
//!
//! All nodes live in one arena owned by [`SpectrumTree`] and are addressed by
//! [`NodeId`] handles. Children are owned through their parent's child list;
//! `parent` and `external_background` are plain handles that never keep a
//! node alive. A removed node's slot is reused with a new generation, so a
//! handle kept past removal is detected instead of silently pointing at an
//! unrelated node.
//!
//! The tree is mutated from one thread. Slow file reads can run elsewhere
//! through [`SpectrumTree::begin_load`] / [`SpectrumTree::finish_load`].

pub mod background;
pub mod bridge;
pub mod builder;
pub mod lifecycle;
pub mod naming;
pub mod node;
pub mod signal;
pub mod state;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calibration::Calibration;
use crate::config::TreeConfig;
use crate::error::TreeError;

pub use background::{AssignmentReport, BackgroundSource};
pub use bridge::LoadTicket;
pub use lifecycle::ClearTarget;
pub use node::{LoadState, NodeKind, NodeOrigin, SpectrumNode};
pub use signal::EffectiveSignal;
pub use state::ActivationMode;

/// Stable handle to a node in a [`SpectrumTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    node: Option<SpectrumNode>,
}

pub struct SpectrumTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
    config: TreeConfig,
    global_shift: f64,
    calibration: Option<Box<dyn Calibration>>,
    calibration_enabled: bool,
    /// Nodes with an outstanding [`LoadTicket`].
    in_flight: HashSet<NodeId>,
}

impl Default for SpectrumTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumTree {
    pub fn new() -> Self {
        Self::with_config(TreeConfig::default())
    }

    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            roots: Vec::new(),
            config,
            global_shift: 0.0,
            calibration: None,
            calibration_enabled: false,
            in_flight: HashSet::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    // ─── Arena ──────────────────────────────────────────────────────────────

    pub(crate) fn insert(&mut self, node: SpectrumNode) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId { index, generation: 0 }
        }
    }

    /// Drop a node from the arena. Links to and from it are the caller's
    /// business.
    pub(crate) fn release(&mut self, id: NodeId) -> Option<SpectrumNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.in_flight.remove(&id);
        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&SpectrumNode> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut SpectrumNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    pub fn node(&self, id: NodeId) -> Result<&SpectrumNode, TreeError> {
        self.get(id).ok_or(TreeError::StaleNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut SpectrumNode, TreeError> {
        self.get_mut(id).ok_or(TreeError::StaleNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Every live node, in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SpectrumNode)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        index: i as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    // ─── Structure ──────────────────────────────────────────────────────────

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Children of `id`, empty for leaves and stale handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub(crate) fn add_root(&mut self, mut node: SpectrumNode) -> NodeId {
        node.parent = None;
        node.shift = self.global_shift;
        let id = self.insert(node);
        self.roots.push(id);
        id
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, mut node: SpectrumNode) -> Result<NodeId, TreeError> {
        if !self.node(parent)?.is_container() {
            return Err(TreeError::NotAContainer(parent));
        }
        node.parent = Some(parent);
        node.shift = self.global_shift;
        let id = self.insert(node);
        if let Some(children) = self.get_mut(parent).and_then(|p| p.children_mut()) {
            children.push(id);
        }
        Ok(id)
    }

    /// `id` and everything below it, pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Leaf nodes at or below `id`, in display order.
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|d| self.get(*d).map(|n| n.is_leaf()).unwrap_or(false))
            .collect()
    }

    // ─── Flags ──────────────────────────────────────────────────────────────

    pub fn set_checked(&mut self, id: NodeId, checked: bool) -> Result<(), TreeError> {
        self.node_mut(id)?.checked = checked;
        Ok(())
    }

    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> Result<(), TreeError> {
        self.node_mut(id)?.selected = selected;
        Ok(())
    }

    /// Unselect and uncheck every node.
    pub fn clear_selection(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(node) = slot.node.as_mut() {
                node.selected = false;
                node.checked = false;
            }
        }
    }

    // ─── Wavelength shift ───────────────────────────────────────────────────

    /// Set the axis shift of `id` and its whole subtree.
    pub fn set_shift(&mut self, id: NodeId, shift: f64) -> Result<(), TreeError> {
        self.node(id)?;
        for d in self.descendants(id) {
            if let Some(node) = self.get_mut(d) {
                node.shift = shift;
            }
        }
        Ok(())
    }

    /// Shift every node, and every node created from now on.
    pub fn set_global_shift(&mut self, shift: f64) {
        self.global_shift = shift;
        for slot in self.slots.iter_mut() {
            if let Some(node) = slot.node.as_mut() {
                node.shift = shift;
            }
        }
    }

    pub fn global_shift(&self) -> f64 {
        self.global_shift
    }

    // ─── Calibration ────────────────────────────────────────────────────────

    /// Install (or remove) the calibration. Does not enable it.
    pub fn set_calibration(&mut self, calibration: Option<Box<dyn Calibration>>) {
        if calibration.is_none() {
            self.calibration_enabled = false;
        }
        self.calibration = calibration;
    }

    pub fn set_calibration_enabled(&mut self, enabled: bool) {
        if enabled && self.calibration.is_none() {
            log::warn!("No calibration loaded, calibration stays disabled");
            return;
        }
        self.calibration_enabled = enabled;
    }

    /// The calibration applied by [`SpectrumTree::effective`], if any.
    pub fn active_calibration(&self) -> Option<&dyn Calibration> {
        if self.calibration_enabled {
            self.calibration.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::data::dataset::Dataset;
    use crate::error::LoadError;

    pub fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Loader that answers every path with the same datasets.
    pub fn fixed(datasets: Vec<Dataset>) -> impl Fn(&Path) -> Result<Vec<Dataset>, LoadError> {
        move |_: &Path| Ok(datasets.clone())
    }

    pub fn axis(n: usize) -> Vec<f64> {
        (0..n).map(|i| 400.0 + i as f64).collect()
    }

    /// A loaded top-level leaf holding `y` on a synthetic axis.
    pub fn leaf(tree: &mut SpectrumTree, name: &str, y: Vec<f64>) -> NodeId {
        let id = tree.add_root(SpectrumNode::file(&PathBuf::from(format!("/virtual/{}.txt", name))));
        let ds = Dataset::single(name, axis(y.len()), y);
        tree.populate(id, &fixed(vec![ds])).unwrap();
        id
    }
}
