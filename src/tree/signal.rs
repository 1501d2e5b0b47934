//! Effective signal of a leaf: shifted axis, background-subtracted and
//! optionally calibrated intensity. Computed on demand from the node's
//! current state, never cached.

use serde::{Deserialize, Serialize};

use crate::calibration::{apply_calibration, Calibration};
use crate::error::TreeError;

use super::{NodeId, SpectrumTree};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveSignal {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl EffectiveSignal {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

impl SpectrumTree {
    /// Effective signal using the tree's calibration when it is enabled.
    pub fn effective(&self, id: NodeId) -> Result<EffectiveSignal, TreeError> {
        self.effective_with(id, self.active_calibration())
    }

    /// Effective signal with an explicit calibration (or none).
    ///
    /// The calibration is evaluated on the shifted axis.
    pub fn effective_with(&self, id: NodeId, calibration: Option<&dyn Calibration>) -> Result<EffectiveSignal, TreeError> {
        let buffer = self.leaf_data(id)?;
        let shift = self.node(id)?.shift;
        let background = self.effective_background(id)?;

        let x: Vec<f64> = buffer.raw_x().iter().map(|v| v + shift).collect();
        let raw: Vec<f64> = buffer
            .raw_y()
            .iter()
            .enumerate()
            .map(|(i, y)| y - background.value_at(i))
            .collect();

        let y = match calibration {
            Some(cal) => {
                let sensitivity = cal.evaluate(&x);
                if sensitivity.len() == raw.len() {
                    apply_calibration(&raw, &sensitivity)
                } else {
                    log::warn!(
                        "Calibration returned {} points for an axis of {}, leaving {} uncalibrated",
                        sensitivity.len(),
                        x.len(),
                        id
                    );
                    raw
                }
            }
            None => raw,
        };

        Ok(EffectiveSignal { x, y })
    }
}
