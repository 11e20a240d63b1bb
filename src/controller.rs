//! Agent controller driven by a decoded brain
//!
//! A [`Controller`] owns a chromosome and the network decoded from it. Each
//! tick it feeds the stored sensor values to the network, reads the velocity
//! and turn outputs, and moves through whatever [`MoveConstraint`] the
//! environment supplies.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::decoder::{self, DecodeError, Layout, OUTPUTS};
use crate::genetics::Chromosome;
use crate::neural::{NetworkError, NeuralNetwork, WeightPolicy};

/// Output index carrying velocity
pub const VEL: usize = 0;
/// Output index carrying the turn delta
pub const DELTA: usize = 1;

pub type Result<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControllerError {
    #[error("Brain could not be built: {0}")]
    Brain(#[from] DecodeError),

    #[error("Controller needs exactly {expected} outputs, layout has {found}")]
    OutputCount { expected: usize, found: usize },

    #[error("Input index {index} out of range for {len} inputs")]
    InputOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Environment hook that turns an intended move into a feasible one
pub trait MoveConstraint {
    /// Position actually reached when moving from `from` by `heading`
    fn fix_move(&self, from: DVec2, heading: DVec2) -> DVec2;
}

/// Open field: every move succeeds in full
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconstrained;

impl MoveConstraint for Unconstrained {
    fn fix_move(&self, from: DVec2, heading: DVec2) -> DVec2 {
        from + heading
    }
}

/// Multipliers applied to the brain's motion outputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    pub rotate_multiplier: f64,
    pub speed_multiplier: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            rotate_multiplier: 1.0,
            speed_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Controller {
    chromosome: Chromosome,
    brain: NeuralNetwork,

    inputs: Vec<f64>,
    outputs: Vec<f64>,

    position: DVec2,
    /// Degrees in `[0, 360)`
    direction: f64,
    velocity: f64,
    motion: MotionConfig,
    true_vector: Option<DVec2>,

    success: u32,
    failure: u32,
    fitness: f64,
    max_fitness: f64,
}

impl Controller {
    /// Decode `chromosome` into a brain and place the agent at the origin
    pub fn new(
        chromosome: Chromosome,
        layout: &Layout,
        motion: MotionConfig,
        weight_policy: WeightPolicy,
    ) -> Result<Self> {
        if layout.output_classes.len() != OUTPUTS {
            log::warn!(
                "Lobotomy: controller layout has {} outputs",
                layout.output_classes.len()
            );
            return Err(ControllerError::OutputCount {
                expected: OUTPUTS,
                found: layout.output_classes.len(),
            });
        }
        let brain = decoder::decode_with_policy(&chromosome, layout, weight_policy)?;

        Ok(Self {
            chromosome,
            inputs: vec![0.0; layout.input_classes.len()],
            outputs: vec![0.0; OUTPUTS],
            brain,
            position: DVec2::ZERO,
            direction: 0.0,
            velocity: 0.0,
            motion,
            true_vector: None,
            success: 0,
            failure: 0,
            fitness: 0.0,
            max_fitness: f64::NEG_INFINITY,
        })
    }

    /// Set position and heading in degrees
    pub fn place(&mut self, position: DVec2, direction: f64) {
        self.position = position;
        self.direction = direction;
    }

    pub fn set_input(&mut self, index: usize, value: f64) -> Result<()> {
        let len = self.inputs.len();
        let slot = self
            .inputs
            .get_mut(index)
            .ok_or(ControllerError::InputOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    pub fn set_inputs(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.inputs.len() {
            return Err(NetworkError::InputCountMismatch {
                expected: self.inputs.len(),
                found: values.len(),
            }
            .into());
        }
        self.inputs.copy_from_slice(values);
        Ok(())
    }

    pub fn input(&self, index: usize) -> Option<f64> {
        self.inputs.get(index).copied()
    }

    /// Output register from the last step
    pub fn output(&self, index: usize) -> Option<f64> {
        self.outputs.get(index).copied()
    }

    /// Run one tick: think, turn, then move within `constraint`
    pub fn step(&mut self, constraint: &impl MoveConstraint) -> Result<()> {
        self.brain.set_inputs(&self.inputs)?;
        self.brain.step();
        self.outputs = self.brain.outputs();

        self.velocity = self.outputs[VEL];
        self.direction = normalize_degrees(self.direction + 2.0 * self.outputs[DELTA]);

        let heading = self.heading();
        let reached = constraint.fix_move(self.position, heading);
        self.true_vector = Some(reached - self.position);
        self.position = reached;

        log::trace!(
            "Stepped to ({:.3}, {:.3}) facing {:.2} at {:.3}",
            self.position.x,
            self.position.y,
            self.direction,
            self.velocity
        );
        Ok(())
    }

    /// Intended movement for the current direction and velocity
    pub fn heading(&self) -> DVec2 {
        let angle = (self.direction * self.motion.rotate_multiplier).to_radians();
        DVec2::new(angle.cos(), angle.sin()) * (self.velocity * self.motion.speed_multiplier)
    }

    /// Movement actually achieved by the last step
    pub fn true_vector(&self) -> Option<DVec2> {
        self.true_vector
    }

    pub fn true_velocity(&self) -> f64 {
        self.true_vector.map_or(0.0, DVec2::length)
    }

    pub fn position(&self) -> DVec2 {
        self.position
    }

    pub fn direction(&self) -> f64 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: f64) {
        self.direction = direction;
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.velocity = velocity;
    }

    pub fn chromosome(&self) -> &Chromosome {
        &self.chromosome
    }

    pub fn brain(&self) -> &NeuralNetwork {
        &self.brain
    }

    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
        if fitness > self.max_fitness {
            self.max_fitness = fitness;
        }
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Best fitness ever set, negative infinity before the first
    pub fn max_fitness(&self) -> f64 {
        self.max_fitness
    }

    pub fn inc_success(&mut self) {
        self.success += 1;
    }

    pub fn clear_success(&mut self) {
        self.success = 0;
    }

    pub fn success(&self) -> u32 {
        self.success
    }

    pub fn inc_failure(&mut self) {
        self.failure += 1;
    }

    pub fn clear_failure(&mut self) {
        self.failure = 0;
    }

    pub fn failure(&self) -> u32 {
        self.failure
    }
}

fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees % 360.0;
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
