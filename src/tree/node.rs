//! Spectrum nodes: directories, files, and content units inside files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::NodeId;
use crate::data::buffer::SignalBuffer;

/// What a node stands for on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeOrigin {
    Directory,
    File,
    /// A spectrum, region of interest or channel inside a file.
    Content,
}

/// Container nodes group other nodes and never hold data; leaves hold at
/// most one spectrum.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Container { children: Vec<NodeId> },
    /// `buffer` is `None` until the leaf has been populated.
    Leaf { buffer: Option<SignalBuffer> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LoadState {
    Unloaded,
    Loaded { at: DateTime<Local> },
    /// The loader could not interpret the file. Not retried automatically.
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct SpectrumNode {
    pub(crate) path: PathBuf,
    pub(crate) label: String,
    pub(crate) content_index: Option<usize>,
    pub(crate) is_content: bool,
    pub(crate) origin: NodeOrigin,
    pub(crate) kind: NodeKind,
    /// Non-owning. May equal the node's own id.
    pub(crate) external_background: Option<NodeId>,
    pub(crate) shift: f64,
    pub(crate) load_state: LoadState,
    pub(crate) checked: bool,
    pub(crate) selected: bool,
    /// Non-owning back-reference, `None` for top-level nodes.
    pub(crate) parent: Option<NodeId>,
}

impl SpectrumNode {
    fn with_kind(path: &Path, label: &str, origin: NodeOrigin, kind: NodeKind) -> Self {
        Self {
            path: path.to_path_buf(),
            label: label.to_string(),
            content_index: None,
            is_content: false,
            origin,
            kind,
            external_background: None,
            shift: 0.0,
            load_state: LoadState::Unloaded,
            checked: false,
            selected: false,
            parent: None,
        }
    }

    pub fn directory(path: &Path) -> Self {
        Self::with_kind(path, &file_name(path), NodeOrigin::Directory, NodeKind::Container { children: Vec::new() })
    }

    /// A file whose content is not known yet: an empty container until
    /// populated.
    pub fn file(path: &Path) -> Self {
        Self::with_kind(path, &file_name(path), NodeOrigin::File, NodeKind::Container { children: Vec::new() })
    }

    /// A content unit of `path`, keyed by `label` or by `content_index`.
    pub fn content(path: &Path, label: &str, content_index: Option<usize>) -> Self {
        let mut node = Self::with_kind(path, label, NodeOrigin::Content, NodeKind::Leaf { buffer: None });
        node.content_index = content_index;
        node.is_content = true;
        node
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn content_index(&self) -> Option<usize> {
        self.content_index
    }

    pub fn is_content(&self) -> bool {
        self.is_content
    }

    pub fn origin(&self) -> NodeOrigin {
        self.origin
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container { .. })
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Container { children } => children,
            NodeKind::Leaf { .. } => &[],
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    pub fn buffer(&self) -> Option<&SignalBuffer> {
        match &self.kind {
            NodeKind::Leaf { buffer } => buffer.as_ref(),
            NodeKind::Container { .. } => None,
        }
    }

    pub(crate) fn buffer_mut(&mut self) -> Option<&mut SignalBuffer> {
        match &mut self.kind {
            NodeKind::Leaf { buffer } => buffer.as_mut(),
            NodeKind::Container { .. } => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.kind {
            NodeKind::Container { children } => Some(children),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Turn a childless container into a leaf holding `buffer`.
    /// Callers remove any children first.
    pub(crate) fn promote_to_leaf(&mut self, buffer: SignalBuffer) {
        debug_assert!(!self.has_children(), "promoting a container with children");
        self.kind = NodeKind::Leaf { buffer: Some(buffer) };
        self.is_content = true;
    }

    /// Turn a leaf into an empty container, dropping its data and its
    /// external background.
    pub(crate) fn demote_to_container(&mut self) {
        if self.is_leaf() {
            self.kind = NodeKind::Container { children: Vec::new() };
            self.external_background = None;
            self.is_content = false;
        }
    }

    pub fn external_background(&self) -> Option<NodeId> {
        self.external_background
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.load_state, LoadState::Loaded { .. })
    }

    pub fn has_load_error(&self) -> bool {
        matches!(self.load_state, LoadState::Failed { .. })
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn selected(&self) -> bool {
        self.selected
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
