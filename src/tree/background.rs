//! Background composition.
//!
//! A leaf's background is its internal background (shipped with the file)
//! plus, optionally, the net signal `raw_y - internal_background` of another
//! leaf. Using the other leaf's *net* signal rather than its composed
//! background keeps chains of references from subtracting twice, and means
//! composition never recurses, so reference cycles cannot loop.

use crate::data::buffer::{BackgroundValue, SignalBuffer};
use crate::error::TreeError;

use super::{NodeId, SpectrumTree};

/// The `bg` argument of [`SpectrumTree::set_background`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundSource {
    /// Drop the external background reference.
    Clear,
    /// Replace the internal background.
    Value(BackgroundValue),
    /// Use another node (or the node itself) as external background.
    Node(NodeId),
}

impl From<f64> for BackgroundSource {
    fn from(value: f64) -> Self {
        BackgroundSource::Value(BackgroundValue::Scalar(value))
    }
}

impl From<NodeId> for BackgroundSource {
    fn from(id: NodeId) -> Self {
        BackgroundSource::Node(id)
    }
}

/// Which leaves took a background assignment. A subtree assignment may be
/// partially accepted; that is not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentReport {
    pub accepted: Vec<NodeId>,
    pub rejected: Vec<NodeId>,
}

impl AssignmentReport {
    pub fn all_accepted(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl SpectrumTree {
    /// The data of a populated leaf.
    pub(crate) fn leaf_data(&self, id: NodeId) -> Result<&SignalBuffer, TreeError> {
        let node = self.node(id)?;
        if node.is_container() {
            return Err(TreeError::NotALeaf(id));
        }
        node.buffer().ok_or(TreeError::NotLoaded(id))
    }

    /// What `id` contributes when used as someone's external background.
    fn external_contribution(&self, id: NodeId) -> Option<Vec<f64>> {
        self.get(id)?.buffer().map(|b| b.net_signal())
    }

    /// Internal background plus the external contribution, when that
    /// contribution still fits. A node referencing itself gets its internal
    /// background only.
    pub fn effective_background(&self, id: NodeId) -> Result<BackgroundValue, TreeError> {
        let buffer = self.leaf_data(id)?;
        let internal = buffer.internal_background().clone();
        let external = match self.node(id)?.external_background {
            None => return Ok(internal),
            Some(e) if e == id => return Ok(internal),
            Some(e) => e,
        };

        match self.external_contribution(external) {
            Some(contribution) if contribution.len() == buffer.len() => {
                Ok(internal.add(&BackgroundValue::Array(contribution)))
            }
            Some(contribution) => {
                log::warn!(
                    "Ignoring external background {} for {}: shape ({},) vs ({},)",
                    external,
                    id,
                    contribution.len(),
                    buffer.len()
                );
                Ok(internal)
            }
            None => {
                log::warn!("Ignoring external background {} for {}: it holds no data", external, id);
                Ok(internal)
            }
        }
    }

    /// The external reference recorded on `id`. Containers record the last
    /// reference broadcast to them even though they hold no data.
    pub fn background_reference(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.external_background)
    }

    /// Nodes whose external background is `id`.
    pub fn background_consumers(&self, id: NodeId) -> Vec<NodeId> {
        self.iter()
            .filter(|(_, node)| node.external_background == Some(id))
            .map(|(consumer, _)| consumer)
            .collect()
    }

    /// A container used as background stands for its first leaf with data.
    fn resolve_background_node(&self, id: NodeId) -> Result<NodeId, TreeError> {
        let node = self.node(id)?;
        if node.is_leaf() {
            return match node.buffer() {
                Some(_) => Ok(id),
                None => Err(TreeError::NotLoaded(id)),
            };
        }
        let first = self
            .leaves(id)
            .into_iter()
            .find(|l| self.get(*l).and_then(|n| n.buffer()).is_some())
            .ok_or(TreeError::NotLoaded(id))?;
        log::warn!(
            "Background {} holds several spectra, using its first spectrum {}",
            id,
            first
        );
        Ok(first)
    }

    /// Assign a background to `id`, or to every leaf below it when `id` is a
    /// container. Each leaf validates the shape on its own and keeps its
    /// previous state when the new background does not fit.
    pub fn set_background(&mut self, id: NodeId, source: BackgroundSource) -> Result<AssignmentReport, TreeError> {
        self.node(id)?;
        let source = match source {
            BackgroundSource::Node(r) => BackgroundSource::Node(self.resolve_background_node(r)?),
            other => other,
        };
        let mut report = AssignmentReport::default();
        self.assign_background(id, &source, &mut report);
        Ok(report)
    }

    fn assign_background(&mut self, id: NodeId, source: &BackgroundSource, report: &mut AssignmentReport) {
        let Some(node) = self.get_mut(id) else {
            return;
        };

        if node.is_container() {
            match source {
                BackgroundSource::Clear => node.external_background = None,
                BackgroundSource::Node(r) => node.external_background = Some(*r),
                BackgroundSource::Value(_) => {}
            }
            let children = node.children().to_vec();
            for child in children {
                self.assign_background(child, source, report);
            }
            return;
        }

        let Some(len) = node.buffer().map(|b| b.len()) else {
            log::debug!("{} holds no data yet, background not applied", id);
            report.rejected.push(id);
            return;
        };

        let offered = match source {
            BackgroundSource::Clear => None,
            BackgroundSource::Value(v) => v.len(),
            BackgroundSource::Node(r) if *r == id => Some(len),
            BackgroundSource::Node(r) => Some(self.external_contribution(*r).map(|c| c.len()).unwrap_or(0)),
        };
        if let Some(n) = offered {
            if n != len {
                log::info!("Cannot set background on {}, inappropriate shape: ({},) vs. ({},)", id, n, len);
                report.rejected.push(id);
                return;
            }
        }

        let Some(node) = self.get_mut(id) else {
            return;
        };
        match source {
            BackgroundSource::Clear => node.external_background = None,
            BackgroundSource::Node(r) => node.external_background = Some(*r),
            BackgroundSource::Value(v) => {
                if let Some(buffer) = node.buffer_mut() {
                    buffer.set_internal_background(v.clone());
                }
            }
        }
        report.accepted.push(id);
    }

    /// After `id`'s data was replaced: keep its external background only if
    /// it still fits.
    pub(crate) fn revalidate_external_background(&mut self, id: NodeId) {
        let Some(node) = self.get(id) else {
            return;
        };
        let (Some(external), Some(len)) = (node.external_background, node.buffer().map(|b| b.len())) else {
            return;
        };
        if external == id {
            return;
        }
        let fits = self
            .external_contribution(external)
            .map(|c| c.len() == len)
            .unwrap_or(false);
        if !fits {
            log::info!("Clearing external background {} of {}: no longer matches the data", external, id);
            if let Some(node) = self.get_mut(id) {
                node.external_background = None;
            }
        }
    }
}
