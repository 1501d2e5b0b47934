//! Hierarchical spectrum tree for optical emission spectroscopy.
//!
//! Folders, files and the spectra inside files form one [`SpectrumTree`].
//! File nodes are filled on demand by a [`Loader`]; every data-holding leaf
//! then yields an [`EffectiveSignal`]: the shifted wavelength axis and the
//! intensity minus its composed background, optionally divided by a
//! radiometric [`Calibration`].
//!
//! ```no_run
//! use std::path::Path;
//! use oes_spectra::{SpectrumTree, TextLoader};
//!
//! # fn main() -> Result<(), oes_spectra::TreeError> {
//! let mut tree = SpectrumTree::new();
//! let root = tree.build(Path::new("measurements/2024-03-11"))?;
//! let files: Vec<_> = tree
//!     .descendants(root)
//!     .into_iter()
//!     .filter(|id| tree.is_file_node(*id))
//!     .collect();
//! for file in files {
//!     tree.populate(file, &TextLoader::default())?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod tree;

pub use calibration::{Calibration, LinearCalibration};
pub use config::TreeConfig;
pub use data::{BackgroundValue, Dataset, Intensity, Loader, SignalBuffer, TextLoader};
pub use error::{ConfigError, LoadError, TreeError};
pub use tree::{
    ActivationMode, AssignmentReport, BackgroundSource, ClearTarget, EffectiveSignal, LoadState, LoadTicket, NodeId,
    NodeKind, NodeOrigin, SpectrumNode, SpectrumTree,
};
