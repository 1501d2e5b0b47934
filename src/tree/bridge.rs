//! Populating file nodes from a [`Loader`].
//!
//! Shape of the result depends on what the file contains:
//! - one dataset with a 1-D intensity: the file node itself becomes a leaf;
//! - one dataset with several channels: one leaf per channel, keyed by index;
//! - several datasets: one child per dataset, keyed by name, each filled by
//!   the same rules.
//!
//! Existing children are matched by key and updated in place, so handles to
//! them stay valid across a reload.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;

use crate::data::buffer::{BackgroundValue, SignalBuffer};
use crate::data::dataset::{Dataset, Intensity};
use crate::data::loader::Loader;
use crate::error::{LoadError, TreeError};

use super::{LoadState, NodeId, NodeOrigin, SpectrumNode, SpectrumTree};

/// Exclusive right to load one node, from [`SpectrumTree::begin_load`].
///
/// Only one ticket per node exists at a time. Hand it back through
/// [`SpectrumTree::finish_load`] or [`SpectrumTree::abandon_load`].
#[derive(Debug)]
pub struct LoadTicket {
    id: NodeId,
    path: PathBuf,
    started: Instant,
}

impl LoadTicket {
    pub fn node(&self) -> NodeId {
        self.id
    }

    /// The file to hand to [`Loader::open`].
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// How children are matched against incoming data.
#[derive(Clone, PartialEq)]
enum ChildKey<'a> {
    Label(&'a str),
    Index(usize),
}

impl SpectrumTree {
    /// Load `id` if it has not been loaded yet. A no-op for loaded nodes.
    pub fn populate<L: Loader + ?Sized>(&mut self, id: NodeId, loader: &L) -> Result<(), TreeError> {
        let Some(ticket) = self.begin_load(id)? else {
            return Ok(());
        };
        let result = loader.open(ticket.path());
        self.finish_load(ticket, result)
    }

    /// Reserve `id` for loading. `Ok(None)` when it is already loaded.
    pub fn begin_load(&mut self, id: NodeId) -> Result<Option<LoadTicket>, TreeError> {
        let node = self.node(id)?;
        if node.origin != NodeOrigin::File {
            return Err(TreeError::NotAFile(id));
        }
        if node.is_loaded() {
            return Ok(None);
        }
        if self.in_flight.contains(&id) {
            return Err(TreeError::LoadInFlight(id));
        }
        let path = node.path.clone();
        self.in_flight.insert(id);
        Ok(Some(LoadTicket {
            id,
            path,
            started: Instant::now(),
        }))
    }

    /// Give up a ticket without applying anything.
    pub fn abandon_load(&mut self, ticket: LoadTicket) {
        self.in_flight.remove(&ticket.id);
    }

    /// Apply a loader result. A result for a node removed in the meantime is
    /// dropped.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<Vec<Dataset>, LoadError>) -> Result<(), TreeError> {
        self.in_flight.remove(&ticket.id);
        let id = ticket.id;
        if !self.contains(id) {
            log::debug!("Discarding load result for removed node {} ({})", id, ticket.path.display());
            return Ok(());
        }

        let datasets = result.and_then(|datasets| {
            if datasets.is_empty() {
                return Err(LoadError::Empty(ticket.path.clone()));
            }
            datasets
                .into_iter()
                .map(Dataset::normalized)
                .collect::<Result<Vec<_>, _>>()
        });

        let datasets = match datasets {
            Ok(d) => d,
            Err(e) => {
                log::error!("Could not open file {}: {}", ticket.path.display(), e);
                if let Some(node) = self.get_mut(id) {
                    node.load_state = LoadState::Failed { reason: e.to_string() };
                }
                return Err(e.into());
            }
        };

        let count = datasets.len();
        self.apply_datasets(id, datasets)?;
        self.settle_backgrounds(id);
        if let Some(node) = self.get_mut(id) {
            node.load_state = LoadState::Loaded { at: Local::now() };
        }
        log::info!(
            "Read '{}' ({} dataset{}) in {:.2} ms",
            ticket.path.display(),
            count,
            if count == 1 { "" } else { "s" },
            ticket.started.elapsed().as_secs_f64() * 1e3
        );
        Ok(())
    }

    fn apply_datasets(&mut self, id: NodeId, mut datasets: Vec<Dataset>) -> Result<(), TreeError> {
        if datasets.len() == 1 {
            let dataset = datasets.remove(0);
            return self.apply_dataset(id, dataset);
        }

        self.ensure_container(id);
        let mut keep = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let child = self.child_for(id, ChildKey::Label(&dataset.name), &keep)?;
            keep.push(child);
            self.apply_dataset(child, dataset)?;
        }
        self.prune_children(id, &keep)
    }

    /// Fill `id` from one dataset: directly when 1-D, through one child per
    /// channel otherwise.
    fn apply_dataset(&mut self, id: NodeId, dataset: Dataset) -> Result<(), TreeError> {
        let background = dataset.background.unwrap_or_default();
        match dataset.values {
            Intensity::Single(y) => self.fill_leaf(id, dataset.axis, y, background)?,
            Intensity::Channels(channels) => {
                self.ensure_container(id);
                let mut keep = Vec::with_capacity(channels.len());
                for (i, y) in channels.into_iter().enumerate() {
                    let child = self.child_for(id, ChildKey::Index(i), &keep)?;
                    if let Some(node) = self.get_mut(child) {
                        node.label = dataset.name.clone();
                    }
                    keep.push(child);
                    self.fill_leaf(child, dataset.axis.clone(), y, background.clone())?;
                }
                self.prune_children(id, &keep)?;
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.load_state = LoadState::Loaded { at: Local::now() };
        }
        Ok(())
    }

    /// The existing child of `parent` matching `key` and not yet claimed in
    /// this pass, or a new content child.
    fn child_for(&mut self, parent: NodeId, key: ChildKey<'_>, claimed: &[NodeId]) -> Result<NodeId, TreeError> {
        let existing = self.children(parent).iter().copied().find(|c| {
            if claimed.contains(c) {
                return false;
            }
            match (self.get(*c), &key) {
                (Some(n), ChildKey::Label(label)) => n.content_index.is_none() && n.label == *label,
                (Some(n), ChildKey::Index(i)) => n.content_index == Some(*i),
                (None, _) => false,
            }
        });
        if let Some(child) = existing {
            return Ok(child);
        }

        let path = self.node(parent)?.path.clone();
        let node = match key {
            ChildKey::Label(label) => SpectrumNode::content(&path, label, None),
            ChildKey::Index(i) => SpectrumNode::content(&path, "", Some(i)),
        };
        self.add_child(parent, node)
    }

    fn ensure_container(&mut self, id: NodeId) {
        if let Some(node) = self.get_mut(id) {
            if node.is_leaf() {
                log::debug!("{} now holds several spectra, turning it into a container", id);
                node.demote_to_container();
            }
        }
    }

    /// Remove children of `parent` that did not appear in the latest data.
    fn prune_children(&mut self, parent: NodeId, keep: &[NodeId]) -> Result<(), TreeError> {
        let stale: Vec<NodeId> = self
            .children(parent)
            .iter()
            .rev()
            .copied()
            .filter(|c| !keep.contains(c))
            .collect();
        for child in stale {
            log::debug!("Removing {}: no longer present in {}", child, parent);
            self.remove(child)?;
        }
        Ok(())
    }

    /// Store one spectrum on `id`, turning it into a leaf if needed.
    fn fill_leaf(&mut self, id: NodeId, x: Vec<f64>, y: Vec<f64>, background: BackgroundValue) -> Result<(), TreeError> {
        let Some(buffer) = SignalBuffer::new(x, y, background) else {
            log::error!("Inconsistent arrays for {} after validation, leaving it unchanged", id);
            return Ok(());
        };

        let stale_children: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        for child in stale_children {
            self.remove(child)?;
        }

        let node = self.node_mut(id)?;
        if node.is_container() {
            node.promote_to_leaf(buffer);
        } else {
            node.kind = super::NodeKind::Leaf { buffer: Some(buffer) };
            node.is_content = true;
        }
        node.load_state = LoadState::Loaded { at: Local::now() };
        Ok(())
    }

    /// Check the external background of every leaf below `id` against the
    /// data it now holds. Runs once all datasets of the file are in place,
    /// so siblings referencing each other see their new shapes.
    fn settle_backgrounds(&mut self, id: NodeId) {
        let keep = self.config.keep_backgrounds_on_reload;
        for leaf in self.leaves(id) {
            if keep {
                self.revalidate_external_background(leaf);
            } else if let Some(node) = self.get_mut(leaf) {
                node.external_background = None;
            }
        }
    }
}
