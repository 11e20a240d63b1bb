//! Neural network module for bug brains.
//!
//! Implements layered feed-forward networks with:
//! - Stateless activation functions
//! - Arena-owned neurons wired by index
//! - A strict layer-by-layer construction protocol
//! - Online Hebbian learning applied as neurons step

mod activation;
mod network;
mod neuron;

pub use activation::ActivationFunction;
pub use network::{BuildStage, NeuralNetwork, Topology};
pub use neuron::{HebbianParams, Neuron, NeuronId, WeightPolicy, MAX_WEIGHT};

/// Result type for network construction and evaluation
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors raised while assembling or driving a network
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NetworkError {
    #[error("{operation} is not allowed while {stage}")]
    WrongStage {
        operation: &'static str,
        stage: BuildStage,
    },

    #[error("Weight vector has {found} entries but the previous layer has {expected} neurons")]
    WeightCountMismatch { expected: usize, found: usize },

    #[error("{neuron} has no free {direction} slot (capacity {capacity})")]
    CapacityExceeded {
        neuron: NeuronId,
        direction: &'static str,
        capacity: usize,
    },

    #[error("Expected {expected} input values, got {found}")]
    InputCountMismatch { expected: usize, found: usize },
}
