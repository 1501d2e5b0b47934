//! Error types for loading datasets and mutating the spectrum tree.
//!
//! Recoverable data problems (a background of the wrong shape, an external
//! reference that no longer fits) are not errors at all: they are logged and
//! the previous state is kept. What ends up here is either a file the loader
//! could not interpret, or structural misuse of the tree.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::tree::NodeId;

/// Failure reported by a [`Loader`](crate::data::loader::Loader).
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Unreadable file {path}: {reason}")]
    UnreadableFile { path: PathBuf, reason: String },
    #[error("Loader returned no datasets for {0}")]
    Empty(PathBuf),
    #[error("Dataset '{name}' is malformed: {reason}")]
    Malformed { name: String, reason: String },
}

/// Structural failure of a tree operation.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Node {0} does not exist (removed or never created)")]
    StaleNode(NodeId),
    #[error("Node {0} is a container and holds no signal of its own")]
    NotALeaf(NodeId),
    #[error("Node {0} is a leaf and cannot hold children")]
    NotAContainer(NodeId),
    #[error("Node {0} has not been loaded")]
    NotLoaded(NodeId),
    #[error("Node {0} does not stand for a file")]
    NotAFile(NodeId),
    #[error("A load is already in flight for node {0}")]
    LoadInFlight(NodeId),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Failure while reading a [`TreeConfig`](crate::config::TreeConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
