//! The loader seam.
//!
//! The tree never looks at file bytes. Whatever knows how to read a vendor
//! format implements [`Loader`] and returns the datasets found in the file.

use std::path::Path;

use super::dataset::Dataset;
use crate::error::LoadError;

pub trait Loader {
    /// Read every dataset in `path`, in file order.
    fn open(&self, path: &Path) -> Result<Vec<Dataset>, LoadError>;
}

impl<F> Loader for F
where
    F: Fn(&Path) -> Result<Vec<Dataset>, LoadError>,
{
    fn open(&self, path: &Path) -> Result<Vec<Dataset>, LoadError> {
        self(path)
    }
}
