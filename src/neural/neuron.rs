//! Single neuron with Hebbian weight adaptation

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ActivationFunction, NetworkError, Result};

/// Weight magnitude above which an update is reported as anomalous
pub const MAX_WEIGHT: f64 = 10.0;

/// Exponent applied to the cosine damping factor
const DAMPING_EXPONENT: f64 = 0.75;

/// Index of a neuron inside its network's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NeuronId(pub(crate) usize);

impl NeuronId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "neuron #{}", self.0)
    }
}

/// What happens when a learned weight leaves `[-MAX_WEIGHT, MAX_WEIGHT]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightPolicy {
    /// Log a warning and keep the weight
    #[default]
    Advisory,
    /// Log a warning and clamp the weight to the bound
    Clamp,
}

/// Learning parameters shared by every neuron of a network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HebbianParams {
    /// Learning rate
    pub alpha: f64,
    /// Forgetting rate
    pub phi: f64,
    pub weight_policy: WeightPolicy,
}

impl HebbianParams {
    pub fn new(alpha: f64, phi: f64) -> Self {
        Self {
            alpha,
            phi,
            weight_policy: WeightPolicy::default(),
        }
    }

    /// Parameters that leave every weight untouched
    pub fn frozen() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn with_policy(mut self, policy: WeightPolicy) -> Self {
        self.weight_policy = policy;
        self
    }
}

impl Default for HebbianParams {
    fn default() -> Self {
        Self::frozen()
    }
}

/// A neuron: incoming synapses with weights, a threshold and an activation
///
/// Synapses live as parallel `sources`/`weights` vectors; `sources[i]` feeds
/// the value multiplied by `weights[i]`. Outgoing edges are kept only as ids
/// so the owning network can check fan-out against capacity.
#[derive(Debug, Clone)]
pub struct Neuron {
    sources: Vec<NeuronId>,
    weights: Vec<f64>,
    input_capacity: usize,

    targets: Vec<NeuronId>,
    output_capacity: usize,

    last_inputs: Vec<f64>,
    output: f64,

    theta: f64,
    activation: ActivationFunction,
    learning: HebbianParams,
    anomalies: u64,
}

impl Neuron {
    pub fn new(
        input_capacity: usize,
        output_capacity: usize,
        theta: f64,
        activation: ActivationFunction,
        learning: HebbianParams,
    ) -> Self {
        Self {
            sources: Vec::with_capacity(input_capacity),
            weights: Vec::with_capacity(input_capacity),
            input_capacity,
            targets: Vec::with_capacity(output_capacity),
            output_capacity,
            last_inputs: Vec::with_capacity(input_capacity),
            output: 0.0,
            theta,
            activation,
            learning,
            anomalies: 0,
        }
    }

    /// Pass-through neuron whose output is written directly by the network
    pub fn sensor() -> Self {
        Self::new(
            0,
            1,
            0.0,
            ActivationFunction::Linear,
            HebbianParams::frozen(),
        )
    }

    pub(crate) fn add_input(&mut self, id: NeuronId, source: NeuronId, weight: f64) -> Result<()> {
        if !self.has_input_room() {
            return Err(NetworkError::CapacityExceeded {
                neuron: id,
                direction: "input",
                capacity: self.input_capacity,
            });
        }
        self.sources.push(source);
        self.weights.push(weight);
        Ok(())
    }

    pub(crate) fn add_output(&mut self, id: NeuronId, target: NeuronId) -> Result<()> {
        if !self.has_output_room() {
            return Err(NetworkError::CapacityExceeded {
                neuron: id,
                direction: "output",
                capacity: self.output_capacity,
            });
        }
        self.targets.push(target);
        Ok(())
    }

    pub fn has_input_room(&self) -> bool {
        self.sources.len() < self.input_capacity
    }

    pub fn has_output_room(&self) -> bool {
        self.targets.len() < self.output_capacity
    }

    pub(crate) fn set_output(&mut self, value: f64) {
        self.output = value;
    }

    /// Compute the output from presynaptic values, then adapt the weights
    ///
    /// `presynaptic[i]` must be the current output of `sources()[i]`.
    pub fn step(&mut self, presynaptic: &[f64]) {
        debug_assert_eq!(presynaptic.len(), self.sources.len());

        self.last_inputs.clear();
        self.last_inputs.extend_from_slice(presynaptic);

        self.output = self
            .activation
            .activate(&self.last_inputs, &self.weights, self.theta);
        self.learn();
    }

    fn learn(&mut self) {
        let HebbianParams {
            alpha,
            phi,
            weight_policy,
        } = self.learning;
        let y = self.output;

        for (i, (w, &x)) in self.weights.iter_mut().zip(&self.last_inputs).enumerate() {
            let mut delta = alpha * x * y - phi * y * *w;
            if java_signum(delta) == java_signum(*w) {
                let cos = (*w * std::f64::consts::PI / MAX_WEIGHT).cos();
                delta *= ((1.0 + cos) / 2.0).powf(DAMPING_EXPONENT);
            }
            *w += delta;

            if w.abs() > MAX_WEIGHT {
                self.anomalies += 1;
                log::warn!(
                    "Weight {} from {} reached {:.4}, beyond +/-{}",
                    i,
                    self.sources[i],
                    *w,
                    MAX_WEIGHT
                );
                if weight_policy == WeightPolicy::Clamp {
                    *w = w.clamp(-MAX_WEIGHT, MAX_WEIGHT);
                }
            }
        }
    }

    pub fn output(&self) -> f64 {
        self.output
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn sources(&self) -> &[NeuronId] {
        &self.sources
    }

    pub fn targets(&self) -> &[NeuronId] {
        &self.targets
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activation
    }

    pub fn input_capacity(&self) -> usize {
        self.input_capacity
    }

    pub fn output_capacity(&self) -> usize {
        self.output_capacity
    }

    /// Number of weight updates that left the advisory bound
    pub fn weight_anomalies(&self) -> u64 {
        self.anomalies
    }
}

/// `<w1,w2,...>[theta]`
impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<")?;
        for (i, w) in self.weights.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", w)?;
        }
        write!(f, ">[{}]", self.theta)
    }
}

/// Sign that maps zero to zero, unlike `f64::signum`
fn java_signum(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
