//! Datasets handed over by a loader.
//!
//! One file yields one or more datasets. Each dataset has a single wavelength
//! axis shared by all of its channels (e.g. all frames of a kinetic series,
//! or all tracks of a camera region of interest).

use serde::{Deserialize, Serialize};

use super::buffer::BackgroundValue;
use crate::error::LoadError;

/// Name used when the loader does not supply one.
pub const DEFAULT_DATASET_NAME: &str = "spectrum";

/// Intensity of a dataset: one spectrum, or several channels on the same axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Intensity {
    Single(Vec<f64>),
    /// One `Vec` per channel, each as long as the axis.
    Channels(Vec<Vec<f64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub axis: Vec<f64>,
    pub values: Intensity,
    pub background: Option<BackgroundValue>,
}

impl Dataset {
    pub fn new(name: &str, axis: Vec<f64>, values: Intensity) -> Self {
        Self {
            name: if name.is_empty() {
                DEFAULT_DATASET_NAME.to_string()
            } else {
                name.to_string()
            },
            axis,
            values,
            background: None,
        }
    }

    /// Convenience constructor for a one-spectrum dataset.
    pub fn single(name: &str, axis: Vec<f64>, values: Vec<f64>) -> Self {
        Self::new(name, axis, Intensity::Single(values))
    }

    pub fn channels(name: &str, axis: Vec<f64>, channels: Vec<Vec<f64>>) -> Self {
        Self::new(name, axis, Intensity::Channels(channels))
    }

    pub fn with_background(mut self, background: BackgroundValue) -> Self {
        self.background = Some(background);
        self
    }

    /// Check array lengths and fold a one-channel 2-D intensity into 1-D.
    ///
    /// A background that does not fit the axis is dropped with a warning,
    /// the spectra themselves are still usable.
    pub fn normalized(mut self) -> Result<Self, LoadError> {
        let n = self.axis.len();
        let malformed = |name: &str, reason: String| LoadError::Malformed {
            name: name.to_string(),
            reason,
        };

        match &self.values {
            Intensity::Single(y) if y.len() != n => {
                return Err(malformed(
                    &self.name,
                    format!("axis has {} points, intensity has {}", n, y.len()),
                ));
            }
            Intensity::Channels(c) if c.is_empty() => {
                return Err(malformed(&self.name, "no channels".to_string()));
            }
            Intensity::Channels(c) => {
                if let Some((i, ch)) = c.iter().enumerate().find(|(_, ch)| ch.len() != n) {
                    return Err(malformed(
                        &self.name,
                        format!("axis has {} points, channel {} has {}", n, i, ch.len()),
                    ));
                }
            }
            _ => {}
        }

        if let Intensity::Channels(c) = &mut self.values {
            if c.len() == 1 {
                let only = c.remove(0);
                self.values = Intensity::Single(only);
            }
        }

        if let Some(bg) = &self.background {
            if !bg.fits(n) {
                log::warn!(
                    "Dataset '{}': dropping background of shape {}, axis has {} points",
                    self.name,
                    bg.shape_string(),
                    n
                );
                self.background = None;
            }
        }

        Ok(self)
    }
}
