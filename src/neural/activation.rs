//! Activation functions for neurons

use serde::{Deserialize, Serialize};

/// Transfer function applied to a neuron's thresholded input sum
///
/// Every variant is a pure function, so a single value can be shared by any
/// number of neurons.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ActivationFunction {
    /// Output in (0, 1)
    Sigmoid,
    /// Sigmoid stretched to (-1, 1)
    ModifiedSigmoid,
    /// `2a / (1 + e^(-bx)) - a`, output in (-a, a)
    Tanh { a: f64, b: f64 },
    /// 1 when the sum reaches the threshold, else 0
    Step,
    /// 1 when the sum reaches the threshold, else -1
    Sign,
    /// Sum passed through unchanged
    Linear,
}

impl ActivationFunction {
    /// Tanh with amplitude 1.716 and slope 0.667
    pub const DEFAULT_TANH: Self = Self::Tanh { a: 1.716, b: 0.667 };

    pub fn tanh(a: f64, b: f64) -> Self {
        Self::Tanh { a, b }
    }

    /// Apply the shape function to an already thresholded sum
    pub fn shape(&self, x: f64) -> f64 {
        match *self {
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::ModifiedSigmoid => 2.0 / (1.0 + (-x).exp()) - 1.0,
            Self::Tanh { a, b } => (2.0 * a) / (1.0 + (-x * b).exp()) - a,
            Self::Step => {
                if x >= 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Sign => {
                if x >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Linear => x,
        }
    }

    /// Weighted sum of `inputs`, minus `theta`, through the shape function
    pub fn activate(&self, inputs: &[f64], weights: &[f64], theta: f64) -> f64 {
        let sum: f64 = inputs.iter().zip(weights).map(|(x, w)| x * w).sum();
        self.shape(sum - theta)
    }
}

impl Default for ActivationFunction {
    fn default() -> Self {
        Self::DEFAULT_TANH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_sigmoid_family() {
        let sigmoid = ActivationFunction::Sigmoid;
        let modified = ActivationFunction::ModifiedSigmoid;
        assert!((sigmoid.shape(0.0) - 0.5).abs() < EPS);
        assert!(modified.shape(0.0).abs() < EPS);

        // strictly inside the open range before f64 saturates
        assert!(sigmoid.shape(10.0) < 1.0);
        assert!(sigmoid.shape(-10.0) > 0.0);
        assert!(modified.shape(10.0) < 1.0);
        assert!(modified.shape(-10.0) > -1.0);
        assert!(sigmoid.shape(1.0) < sigmoid.shape(2.0));
        assert!(modified.shape(-2.0) < modified.shape(-1.0));

        // saturated values never overshoot the bound
        assert!(sigmoid.shape(50.0) <= 1.0);
        assert!(modified.shape(-50.0) >= -1.0);
    }

    #[test]
    fn test_tanh_range_follows_amplitude() {
        let f = ActivationFunction::DEFAULT_TANH;
        assert!(f.shape(0.0).abs() < EPS);
        assert!(f.shape(10.0) < 1.716);
        assert!(f.shape(-10.0) > -1.716);
        assert!(f.shape(1.0) < f.shape(2.0));
        assert!(f.shape(100.0) <= 1.716 + EPS);
        assert!(f.shape(-100.0) >= -1.716 - EPS);

        let wide = ActivationFunction::tanh(3.0, 1.0);
        assert!(wide.shape(20.0) > 2.99);
    }

    #[test]
    fn test_step_and_sign_at_threshold() {
        assert_eq!(ActivationFunction::Step.shape(0.0), 1.0);
        assert_eq!(ActivationFunction::Step.shape(-0.01), 0.0);
        assert_eq!(ActivationFunction::Sign.shape(0.0), 1.0);
        assert_eq!(ActivationFunction::Sign.shape(-0.01), -1.0);
    }

    #[test]
    fn test_activate_subtracts_threshold() {
        let out = ActivationFunction::Linear.activate(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0], 0.5);
        assert!((out - 5.5).abs() < EPS);

        let out = ActivationFunction::Step.activate(&[0.2], &[1.0], 0.3);
        assert_eq!(out, 0.0);
    }

    #[test]
    fn test_activate_without_inputs() {
        assert_eq!(ActivationFunction::Linear.activate(&[], &[], 0.25), -0.25);
    }
}
