//! Layered feed-forward network assembled one neuron at a time
//!
//! Neurons are owned by a single arena and refer to each other by
//! [`NeuronId`]. Every input neuron is fed by its own sensor, a pass-through
//! neuron whose output is written by [`NeuralNetwork::set_inputs`] and which
//! is never stepped.
//!
//! Construction follows the topology strictly: all input neurons, then each
//! hidden layer in order, then the output neurons. Every `add_*` call checks
//! its preconditions before touching the arena, so a rejected call leaves the
//! network exactly as it was.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ActivationFunction, HebbianParams, NetworkError, Neuron, NeuronId, Result};

/// Layer sizes of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub inputs: usize,
    pub hidden_layers: usize,
    pub hidden_width: usize,
    pub outputs: usize,
}

impl Topology {
    pub fn new(inputs: usize, hidden_layers: usize, hidden_width: usize, outputs: usize) -> Self {
        Self {
            inputs,
            hidden_layers,
            hidden_width,
            outputs,
        }
    }

    /// A hidden section exists only when both its depth and width are positive
    pub fn has_hidden(&self) -> bool {
        self.hidden_layers > 0 && self.hidden_width > 0
    }

    /// Number of hidden layers actually built
    pub fn effective_hidden_layers(&self) -> usize {
        if self.has_hidden() {
            self.hidden_layers
        } else {
            0
        }
    }

    /// Width of the layer feeding the output neurons
    pub fn pre_output_width(&self) -> usize {
        if self.has_hidden() {
            self.hidden_width
        } else {
            self.inputs
        }
    }

    /// Fan-out of each input neuron
    fn input_fan_out(&self) -> usize {
        if self.has_hidden() {
            self.hidden_width
        } else {
            self.outputs
        }
    }

    /// Fan-out of each neuron in hidden layer `layer`
    fn hidden_fan_out(&self, layer: usize) -> usize {
        if layer + 1 < self.hidden_layers {
            self.hidden_width
        } else {
            self.outputs
        }
    }

    /// Width of the layer that [`NeuralNetwork::outputs`] reports
    pub fn exposed_width(&self) -> usize {
        if self.outputs > 0 {
            self.outputs
        } else {
            self.pre_output_width()
        }
    }

    /// Non-sensor neuron count of a complete network
    pub fn neuron_count(&self) -> usize {
        self.inputs + self.effective_hidden_layers() * self.hidden_width + self.outputs
    }
}

/// Construction progress of a network
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    DefiningInputs,
    DefiningHidden { layer: usize, position: usize },
    DefiningOutputs,
    Complete,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefiningInputs => write!(f, "defining inputs"),
            Self::DefiningHidden { layer, position } => {
                write!(f, "defining hidden layer {} (neuron {})", layer, position)
            }
            Self::DefiningOutputs => write!(f, "defining outputs"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NeuralNetwork {
    topology: Topology,
    learning: HebbianParams,
    stage: BuildStage,

    neurons: Vec<Neuron>,
    sensors: Vec<NeuronId>,
    input_layer: Vec<NeuronId>,
    hidden: Vec<Vec<NeuronId>>,
    output_layer: Vec<NeuronId>,

    /// Non-sensor neurons in creation order, which is also step order
    step_order: Vec<NeuronId>,
    scratch: Vec<f64>,
}

impl NeuralNetwork {
    pub fn new(topology: Topology, learning: HebbianParams) -> Self {
        let hidden = (0..topology.effective_hidden_layers())
            .map(|_| Vec::with_capacity(topology.hidden_width))
            .collect();

        let mut network = Self {
            topology,
            learning,
            stage: BuildStage::DefiningInputs,
            neurons: Vec::with_capacity(topology.neuron_count() + topology.inputs),
            sensors: Vec::with_capacity(topology.inputs),
            input_layer: Vec::with_capacity(topology.inputs),
            hidden,
            output_layer: Vec::with_capacity(topology.outputs),
            step_order: Vec::with_capacity(topology.neuron_count()),
            scratch: Vec::new(),
        };
        if topology.inputs == 0 {
            network.stage = network.stage_after_inputs();
        }
        log::debug!(
            "New network {}-{}x{}-{}, stage: {}",
            topology.inputs,
            topology.hidden_layers,
            topology.hidden_width,
            topology.outputs,
            network.stage
        );
        network
    }

    fn stage_after_inputs(&self) -> BuildStage {
        if self.topology.has_hidden() {
            BuildStage::DefiningHidden {
                layer: 0,
                position: 0,
            }
        } else {
            self.stage_after_hidden()
        }
    }

    fn stage_after_hidden(&self) -> BuildStage {
        if self.topology.outputs > 0 {
            BuildStage::DefiningOutputs
        } else {
            BuildStage::Complete
        }
    }

    /// Append an input neuron together with its sensor
    pub fn add_input(
        &mut self,
        weight: f64,
        theta: f64,
        activation: ActivationFunction,
    ) -> Result<NeuronId> {
        if self.stage != BuildStage::DefiningInputs {
            return Err(NetworkError::WrongStage {
                operation: "adding an input neuron",
                stage: self.stage,
            });
        }

        let sensor = self.push(Neuron::sensor());
        let input = self.push(Neuron::new(
            1,
            self.topology.input_fan_out(),
            theta,
            activation,
            self.learning,
        ));
        self.connect(sensor, input, weight)?;

        self.sensors.push(sensor);
        self.input_layer.push(input);
        self.step_order.push(input);

        if self.input_layer.len() == self.topology.inputs {
            self.stage = self.stage_after_inputs();
            log::trace!("Input layer complete, stage: {}", self.stage);
        }
        Ok(input)
    }

    /// Append a neuron to the hidden layer currently being defined
    ///
    /// `weights[i]` weighs the output of neuron `i` of the previous layer.
    pub fn add_hidden(
        &mut self,
        weights: &[f64],
        theta: f64,
        activation: ActivationFunction,
    ) -> Result<NeuronId> {
        let BuildStage::DefiningHidden { layer, position } = self.stage else {
            return Err(NetworkError::WrongStage {
                operation: "adding a hidden neuron",
                stage: self.stage,
            });
        };

        let previous = if layer == 0 {
            self.input_layer.clone()
        } else {
            self.hidden[layer - 1].clone()
        };
        self.check_fan_in(&previous, weights)?;

        let id = self.push(Neuron::new(
            previous.len(),
            self.topology.hidden_fan_out(layer),
            theta,
            activation,
            self.learning,
        ));
        for (&source, &weight) in previous.iter().zip(weights) {
            self.connect(source, id, weight)?;
        }
        self.hidden[layer].push(id);
        self.step_order.push(id);

        self.stage = if position + 1 < self.topology.hidden_width {
            BuildStage::DefiningHidden {
                layer,
                position: position + 1,
            }
        } else if layer + 1 < self.topology.hidden_layers {
            log::trace!("Hidden layer {} complete", layer);
            BuildStage::DefiningHidden {
                layer: layer + 1,
                position: 0,
            }
        } else {
            self.stage_after_hidden()
        };
        Ok(id)
    }

    /// Append an output neuron fed by the last hidden layer, or by the
    /// input layer when there are no hidden layers
    pub fn add_output(
        &mut self,
        weights: &[f64],
        theta: f64,
        activation: ActivationFunction,
    ) -> Result<NeuronId> {
        if self.stage != BuildStage::DefiningOutputs {
            return Err(NetworkError::WrongStage {
                operation: "adding an output neuron",
                stage: self.stage,
            });
        }

        let previous = self.hidden.last().unwrap_or(&self.input_layer).clone();
        self.check_fan_in(&previous, weights)?;

        let id = self.push(Neuron::new(
            previous.len(),
            0,
            theta,
            activation,
            self.learning,
        ));
        for (&source, &weight) in previous.iter().zip(weights) {
            self.connect(source, id, weight)?;
        }
        self.output_layer.push(id);
        self.step_order.push(id);

        if self.output_layer.len() == self.topology.outputs {
            self.stage = BuildStage::Complete;
            log::debug!("Network complete with {} neurons", self.step_order.len());
        }
        Ok(id)
    }

    fn push(&mut self, neuron: Neuron) -> NeuronId {
        let id = NeuronId(self.neurons.len());
        self.neurons.push(neuron);
        id
    }

    fn check_fan_in(&self, previous: &[NeuronId], weights: &[f64]) -> Result<()> {
        if weights.len() != previous.len() {
            return Err(NetworkError::WeightCountMismatch {
                expected: previous.len(),
                found: weights.len(),
            });
        }
        for &source in previous {
            let neuron = &self.neurons[source.0];
            if !neuron.has_output_room() {
                return Err(NetworkError::CapacityExceeded {
                    neuron: source,
                    direction: "output",
                    capacity: neuron.output_capacity(),
                });
            }
        }
        Ok(())
    }

    fn connect(&mut self, source: NeuronId, target: NeuronId, weight: f64) -> Result<()> {
        self.neurons[source.0].add_output(source, target)?;
        self.neurons[target.0].add_input(target, source, weight)
    }

    /// Write one value per sensor
    pub fn set_inputs(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.sensors.len() {
            return Err(NetworkError::InputCountMismatch {
                expected: self.sensors.len(),
                found: values.len(),
            });
        }
        for (&sensor, &value) in self.sensors.iter().zip(values) {
            self.neurons[sensor.0].set_output(value);
        }
        Ok(())
    }

    /// Step every non-sensor neuron once: inputs, hidden layers in order,
    /// then outputs
    pub fn step(&mut self) {
        let mut values = std::mem::take(&mut self.scratch);
        for &id in &self.step_order {
            values.clear();
            values.extend(
                self.neurons[id.0]
                    .sources()
                    .iter()
                    .map(|src| self.neurons[src.0].output()),
            );
            self.neurons[id.0].step(&values);
        }
        self.scratch = values;
    }

    /// Current outputs of the output layer
    ///
    /// With no output neurons the last hidden layer is reported, and with
    /// neither hidden nor output neurons the input layer is.
    pub fn outputs(&self) -> Vec<f64> {
        self.exposed_layer()
            .iter()
            .map(|id| self.neurons[id.0].output())
            .collect()
    }

    fn exposed_layer(&self) -> &[NeuronId] {
        if self.topology.outputs > 0 {
            &self.output_layer
        } else if let Some(last) = self.hidden.last() {
            last
        } else {
            &self.input_layer
        }
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn learning(&self) -> HebbianParams {
        self.learning
    }

    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    pub fn is_complete(&self) -> bool {
        self.stage == BuildStage::Complete
    }

    pub fn neuron(&self, id: NeuronId) -> Option<&Neuron> {
        self.neurons.get(id.0)
    }

    pub fn input_layer(&self) -> &[NeuronId] {
        &self.input_layer
    }

    pub fn hidden_layer(&self, layer: usize) -> Option<&[NeuronId]> {
        self.hidden.get(layer).map(Vec::as_slice)
    }

    pub fn output_layer(&self) -> &[NeuronId] {
        &self.output_layer
    }

    /// Learning rates followed by every weight and threshold, neuron by
    /// neuron in step order
    pub fn network_factors(&self) -> Vec<f64> {
        let mut factors = Vec::with_capacity(self.factor_count());
        factors.push(self.learning.alpha);
        factors.push(self.learning.phi);
        for &id in &self.step_order {
            let neuron = &self.neurons[id.0];
            factors.extend_from_slice(neuron.weights());
            factors.push(neuron.theta());
        }
        factors
    }

    pub fn factor_count(&self) -> usize {
        2 + self
            .step_order
            .iter()
            .map(|id| self.neurons[id.0].weights().len() + 1)
            .sum::<usize>()
    }

    /// Total out-of-bound weight updates across all neurons
    pub fn weight_anomalies(&self) -> u64 {
        self.neurons.iter().map(Neuron::weight_anomalies).sum()
    }

    /// One line per layer listing each neuron as `<weights>[theta]`
    pub fn construct_report(&self) -> String {
        let mut report = format!(
            "alpha={} phi={}\n",
            self.learning.alpha, self.learning.phi
        );
        for (name, layer) in self.named_layers() {
            report.push_str(&name);
            report.push(':');
            for id in layer {
                report.push(' ');
                report.push_str(&self.neurons[id.0].to_string());
            }
            report.push('\n');
        }
        report
    }

    /// One line per layer listing each neuron's current output
    pub fn activation_report(&self) -> String {
        let mut report = String::new();
        for (name, layer) in self.named_layers() {
            report.push_str(&name);
            report.push(':');
            for id in layer {
                report.push_str(&format!(" {:.4}", self.neurons[id.0].output()));
            }
            report.push('\n');
        }
        report
    }

    fn named_layers(&self) -> Vec<(String, &[NeuronId])> {
        let mut layers = vec![("input".to_string(), self.input_layer.as_slice())];
        for (i, layer) in self.hidden.iter().enumerate() {
            layers.push((format!("hidden {}", i), layer.as_slice()));
        }
        if self.topology.outputs > 0 {
            layers.push(("output".to_string(), self.output_layer.as_slice()));
        }
        layers
    }
}

impl fmt::Display for NeuralNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.construct_report())
    }
}
