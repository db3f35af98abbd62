//! Exact bivariate Gaussian kernel density estimation.

use std::f64::consts::TAU;

use geo::Point;

use crate::DensityError;

/// A Gaussian kernel density fitted to a fixed sample.
///
/// Every evaluation sums over all samples in their original order, so the
/// same inputs always produce bit-identical results.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    samples: Vec<Point<f64>>,
    /// `1 / (2 h²)`.
    inv_two_h2: f64,
    /// `ln n + ln(2π h²)`.
    log_norm: f64,
}

impl GaussianKde {
    /// Fits the estimator to `samples` with isotropic `bandwidth`.
    ///
    /// # Errors
    ///
    /// Returns [`DensityError::EmptySample`] for an empty sample or
    /// [`DensityError::InvalidBandwidth`] unless `bandwidth` is positive and
    /// finite.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(samples: Vec<Point<f64>>, bandwidth: f64) -> Result<Self, DensityError> {
        if samples.is_empty() {
            return Err(DensityError::EmptySample);
        }
        if !bandwidth.is_finite() || bandwidth <= 0.0 {
            return Err(DensityError::InvalidBandwidth { bandwidth });
        }

        let h2 = bandwidth * bandwidth;
        let n = samples.len() as f64;
        Ok(Self {
            inv_two_h2: 1.0 / (2.0 * h2),
            log_norm: n.ln() + (TAU * h2).ln(),
            samples,
        })
    }

    /// Number of fitted samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false; fitting rejects empty samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Natural log of the estimated density at `at`.
    ///
    /// Uses log-sum-exp over the kernel exponents so that points far from
    /// every sample yield a large negative value instead of `-inf`.
    #[must_use]
    pub fn log_density(&self, at: Point<f64>) -> f64 {
        let exponent = |s: &Point<f64>| {
            let dx = at.x() - s.x();
            let dy = at.y() - s.y();
            -dx.mul_add(dx, dy * dy) * self.inv_two_h2
        };

        let max = self
            .samples
            .iter()
            .map(exponent)
            .fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = self.samples.iter().map(|s| (exponent(s) - max).exp()).sum();

        max + sum.ln() - self.log_norm
    }
}
