//! Signal buffer: the raw arrays a leaf holds once its file has been read.

use serde::{Deserialize, Serialize};

/// A background value: either one number subtracted everywhere, or one
/// number per point of the intensity array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackgroundValue {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Default for BackgroundValue {
    fn default() -> Self {
        BackgroundValue::Scalar(0.0)
    }
}

impl BackgroundValue {
    /// Number of points, `None` for a scalar.
    pub fn len(&self) -> Option<usize> {
        match self {
            BackgroundValue::Scalar(_) => None,
            BackgroundValue::Array(v) => Some(v.len()),
        }
    }

    /// A scalar fits anything, an array only an intensity of equal length.
    pub fn fits(&self, len: usize) -> bool {
        match self {
            BackgroundValue::Scalar(_) => true,
            BackgroundValue::Array(v) => v.len() == len,
        }
    }

    pub fn value_at(&self, index: usize) -> f64 {
        match self {
            BackgroundValue::Scalar(s) => *s,
            BackgroundValue::Array(v) => v[index],
        }
    }

    /// Elementwise sum. Caller guarantees the two values are compatible.
    pub fn add(&self, other: &BackgroundValue) -> BackgroundValue {
        match (self, other) {
            (BackgroundValue::Scalar(a), BackgroundValue::Scalar(b)) => BackgroundValue::Scalar(a + b),
            (BackgroundValue::Scalar(s), BackgroundValue::Array(v))
            | (BackgroundValue::Array(v), BackgroundValue::Scalar(s)) => {
                BackgroundValue::Array(v.iter().map(|b| b + s).collect())
            }
            (BackgroundValue::Array(a), BackgroundValue::Array(b)) => {
                BackgroundValue::Array(a.iter().zip(b).map(|(x, y)| x + y).collect())
            }
        }
    }

    /// Human-readable shape for diagnostics: `()` for a scalar, `(n,)` otherwise.
    pub fn shape_string(&self) -> String {
        match self.len() {
            None => "()".to_string(),
            Some(n) => format!("({},)", n),
        }
    }
}

impl From<f64> for BackgroundValue {
    fn from(value: f64) -> Self {
        BackgroundValue::Scalar(value)
    }
}

impl From<Vec<f64>> for BackgroundValue {
    fn from(values: Vec<f64>) -> Self {
        BackgroundValue::Array(values)
    }
}

/// Raw wavelength axis, raw intensity and the background shipped with them.
///
/// Invariant: `raw_x` and `raw_y` have the same length and the internal
/// background fits `raw_y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignalBufferFields")]
pub struct SignalBuffer {
    raw_x: Vec<f64>,
    raw_y: Vec<f64>,
    internal_background: BackgroundValue,
}

/// Serialized form of [`SignalBuffer`], checked before it becomes one.
#[derive(Deserialize)]
struct SignalBufferFields {
    raw_x: Vec<f64>,
    raw_y: Vec<f64>,
    internal_background: BackgroundValue,
}

impl TryFrom<SignalBufferFields> for SignalBuffer {
    type Error = String;

    fn try_from(fields: SignalBufferFields) -> Result<Self, Self::Error> {
        let (x_len, y_len) = (fields.raw_x.len(), fields.raw_y.len());
        let shape = fields.internal_background.shape_string();
        SignalBuffer::new(fields.raw_x, fields.raw_y, fields.internal_background).ok_or_else(|| {
            format!(
                "inconsistent signal buffer: {} wavelengths, {} intensities, background {}",
                x_len, y_len, shape
            )
        })
    }
}

impl SignalBuffer {
    /// Build a buffer, returning `None` when the arrays disagree in length.
    pub fn new(raw_x: Vec<f64>, raw_y: Vec<f64>, internal_background: BackgroundValue) -> Option<Self> {
        if raw_x.len() != raw_y.len() || !internal_background.fits(raw_y.len()) {
            return None;
        }
        Some(Self {
            raw_x,
            raw_y,
            internal_background,
        })
    }

    pub fn len(&self) -> usize {
        self.raw_y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_y.is_empty()
    }

    pub fn raw_x(&self) -> &[f64] {
        &self.raw_x
    }

    pub fn raw_y(&self) -> &[f64] {
        &self.raw_y
    }

    pub fn internal_background(&self) -> &BackgroundValue {
        &self.internal_background
    }

    /// Replace the internal background. Leaves the buffer untouched and
    /// returns false when the new value does not fit.
    pub fn set_internal_background(&mut self, background: BackgroundValue) -> bool {
        if !background.fits(self.raw_y.len()) {
            return false;
        }
        self.internal_background = background;
        true
    }

    /// `raw_y - internal_background`: what this buffer contributes when
    /// another leaf uses it as external background.
    pub fn net_signal(&self) -> Vec<f64> {
        self.raw_y
            .iter()
            .enumerate()
            .map(|(i, y)| y - self.internal_background.value_at(i))
            .collect()
    }
}
