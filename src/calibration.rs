//! Radiometric calibration.
//!
//! A calibration maps a wavelength axis to the relative sensitivity of the
//! spectrometer at each point. Effective intensities are divided by it; any
//! point where that produces NaN or ±inf is reported as zero.

use serde::{Deserialize, Serialize};

pub trait Calibration {
    /// Sensitivity at every point of `axis`, same length as `axis`.
    fn evaluate(&self, axis: &[f64]) -> Vec<f64>;
}

impl<F> Calibration for F
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn evaluate(&self, axis: &[f64]) -> Vec<f64> {
        self(axis)
    }
}

/// Divide `values` by `sensitivity` elementwise, replacing every non-finite
/// quotient with `0.0`.
pub fn apply_calibration(values: &[f64], sensitivity: &[f64]) -> Vec<f64> {
    values
        .iter()
        .zip(sensitivity)
        .map(|(v, s)| {
            let q = v / s;
            if q.is_finite() {
                q
            } else {
                0.0
            }
        })
        .collect()
}

/// Piecewise-linear sensitivity curve through measured knots.
///
/// Outside the knot range the sensitivity is `0`, so calibrated intensities
/// there come out as `0` rather than extrapolated guesses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CalibrationFields")]
pub struct LinearCalibration {
    wavelengths: Vec<f64>,
    response: Vec<f64>,
}

#[derive(Deserialize)]
struct CalibrationFields {
    wavelengths: Vec<f64>,
    response: Vec<f64>,
}

impl TryFrom<CalibrationFields> for LinearCalibration {
    type Error = String;

    fn try_from(fields: CalibrationFields) -> Result<Self, Self::Error> {
        if fields.wavelengths.len() != fields.response.len() {
            return Err(format!(
                "calibration has {} wavelengths but {} responses",
                fields.wavelengths.len(),
                fields.response.len()
            ));
        }
        let knots = fields.wavelengths.into_iter().zip(fields.response).collect();
        LinearCalibration::new(knots).ok_or_else(|| "calibration needs two or more distinct finite knots".to_string())
    }
}

impl LinearCalibration {
    /// Build from `(wavelength, response)` knots in any order. Returns `None`
    /// for fewer than two usable knots or duplicated wavelengths.
    pub fn new(mut knots: Vec<(f64, f64)>) -> Option<Self> {
        knots.retain(|(x, y)| x.is_finite() && y.is_finite());
        if knots.len() < 2 {
            return None;
        }
        knots.sort_by(|a, b| a.0.total_cmp(&b.0));
        if knots.windows(2).any(|w| w[0].0 == w[1].0) {
            return None;
        }
        let (wavelengths, response) = knots.into_iter().unzip();
        Some(Self {
            wavelengths,
            response,
        })
    }

    /// Wavelength span covered by the knots.
    pub fn range(&self) -> (f64, f64) {
        (self.wavelengths[0], self.wavelengths[self.wavelengths.len() - 1])
    }

    fn at(&self, x: f64) -> f64 {
        let (lo, hi) = self.range();
        if !(x >= lo && x <= hi) {
            return 0.0;
        }
        // first knot strictly greater than x
        let upper = self.wavelengths.partition_point(|w| *w <= x);
        if upper >= self.wavelengths.len() {
            return self.response[self.response.len() - 1];
        }
        let lower = upper - 1;
        let (x0, x1) = (self.wavelengths[lower], self.wavelengths[upper]);
        let (y0, y1) = (self.response[lower], self.response[upper]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}

impl Calibration for LinearCalibration {
    fn evaluate(&self, axis: &[f64]) -> Vec<f64> {
        axis.iter().map(|x| self.at(*x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_calibration_sanitizes() {
        let out = apply_calibration(&[2.0, 3.0, 0.0, -1.0], &[2.0, 0.0, 0.0, 0.0]);
        assert_eq!(out, vec![1.0, 0.0, 0.0, 0.0]);
        let out = apply_calibration(&[f64::NAN], &[1.0]);
        assert_eq!(out, vec![0.0]);
    }

    #[test]
    fn test_linear_interpolation() {
        let cal = LinearCalibration::new(vec![(300.0, 2.0), (200.0, 1.0)]).unwrap();
        assert_eq!(cal.range(), (200.0, 300.0));
        let s = cal.evaluate(&[200.0, 250.0, 300.0]);
        assert!((s[0] - 1.0).abs() < 1e-12);
        assert!((s[1] - 1.5).abs() < 1e-12);
        assert!((s[2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_outside_range_is_zero() {
        let cal = LinearCalibration::new(vec![(200.0, 1.0), (300.0, 2.0)]).unwrap();
        assert_eq!(cal.evaluate(&[199.0, 301.0, f64::NAN]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_invalid_knots() {
        assert!(LinearCalibration::new(vec![(1.0, 1.0)]).is_none());
        assert!(LinearCalibration::new(vec![(1.0, 1.0), (1.0, 2.0)]).is_none());
        assert!(LinearCalibration::new(vec![(1.0, 1.0), (f64::NAN, 2.0)]).is_none());
    }

    #[test]
    fn test_deserialize_validates_knots() {
        for bad in [
            r#"{"wavelengths":[],"response":[]}"#,
            r#"{"wavelengths":[400.0],"response":[1.0]}"#,
            r#"{"wavelengths":[400.0,500.0],"response":[1.0]}"#,
            r#"{"wavelengths":[400.0,400.0],"response":[1.0,2.0]}"#,
        ] {
            assert!(serde_json::from_str::<LinearCalibration>(bad).is_err(), "{}", bad);
        }

        let cal: LinearCalibration = serde_json::from_str(r#"{"wavelengths":[500.0,400.0],"response":[2.0,1.0]}"#).unwrap();
        assert_eq!(cal.range(), (400.0, 500.0));
        assert_eq!(cal.evaluate(&[450.0, 600.0]), vec![1.5, 0.0]);
        let again: LinearCalibration = serde_json::from_str(&serde_json::to_string(&cal).unwrap()).unwrap();
        assert_eq!(again, cal);
    }

    #[test]
    fn test_closure_calibration() {
        let flat = |axis: &[f64]| vec![2.0; axis.len()];
        assert_eq!(flat.evaluate(&[1.0, 2.0]), vec![2.0, 2.0]);
    }
}
