//! # Mazebrain - evolved Hebbian brains for maze bugs
//!
//! Binary chromosomes are decoded into layered feed-forward networks that
//! keep learning while they run. A [`controller::Controller`] turns a
//! network's two outputs into velocity and heading for an agent moving
//! through an environment.

pub mod config;
pub mod controller;
pub mod decoder;
pub mod genetics;
pub mod neural;

pub use config::BrainConfig;
pub use controller::{Controller, MoveConstraint, Unconstrained};
pub use decoder::{decode, estimate_chromosome, Layout};
pub use genetics::{Chromosome, Gene};
pub use neural::NeuralNetwork;

/// Common imports for internal use
pub mod prelude {
    pub use crate::controller::{Controller, MoveConstraint};
    pub use crate::decoder::{InputClass, Layout, OutputClass};
    pub use crate::genetics::{BreedingConfig, Chromosome, Gene};
    pub use crate::neural::{ActivationFunction, NeuralNetwork, Topology};
    pub use glam::DVec2;
}
