//! Chromosome to network decoding
//!
//! Genes are consumed front to back in a fixed order: the two learning rates,
//! then every input neuron, every hidden neuron layer by layer, and finally
//! every output neuron. Each gene value in `[0, 1)` is first mapped through a
//! [`GeneTransform`] to the range its role needs.

use serde::{Deserialize, Serialize};

use crate::genetics::{Chromosome, GenomeError};
use crate::neural::{
    ActivationFunction, HebbianParams, NetworkError, NeuralNetwork, Topology, WeightPolicy,
};

/// Output count of the reference bug brain: velocity and turn delta
pub const OUTPUTS: usize = 2;

pub type Result<T> = std::result::Result<T, DecodeError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("Chromosome has {available} genes but the layout needs {required}")]
    InsufficientGenome { required: usize, available: usize },

    #[error("Read past the end of the chromosome at gene {position}")]
    GenomeOverrun { position: usize },

    #[error("Unknown input class tag {0}")]
    UnknownInputClass(u8),

    #[error("Unknown output class tag {0}")]
    UnknownOutputClass(u8),

    #[error(transparent)]
    Genome(#[from] GenomeError),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Maps a raw gene value in `[0, 1)` to a network factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneTransform {
    /// `x - 0.5`, in `[-0.5, 0.5)`
    Fit,
    /// `x * 0.5`, in `[0, 0.5)`
    Mid,
    /// `x * 0.1`, in `[0, 0.1)`
    Tin,
}

impl GeneTransform {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Fit => x - 0.5,
            Self::Mid => x * 0.5,
            Self::Tin => x * 0.1,
        }
    }
}

/// How an input neuron's threshold gene is scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum InputClass {
    Mid,
    Fit,
    Tin,
}

impl InputClass {
    pub fn transform(self) -> GeneTransform {
        match self {
            Self::Mid => GeneTransform::Mid,
            Self::Fit => GeneTransform::Fit,
            Self::Tin => GeneTransform::Tin,
        }
    }
}

impl TryFrom<u8> for InputClass {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Mid),
            1 => Ok(Self::Fit),
            2 => Ok(Self::Tin),
            other => Err(DecodeError::UnknownInputClass(other)),
        }
    }
}

impl From<InputClass> for u8 {
    fn from(class: InputClass) -> u8 {
        match class {
            InputClass::Mid => 0,
            InputClass::Fit => 1,
            InputClass::Tin => 2,
        }
    }
}

/// Activation of an output neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OutputClass {
    Tanh,
    Sigmoid,
}

impl OutputClass {
    pub fn activation(self) -> ActivationFunction {
        match self {
            Self::Tanh => ActivationFunction::DEFAULT_TANH,
            Self::Sigmoid => ActivationFunction::Sigmoid,
        }
    }
}

impl TryFrom<u8> for OutputClass {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Tanh),
            1 => Ok(Self::Sigmoid),
            other => Err(DecodeError::UnknownOutputClass(other)),
        }
    }
}

impl From<OutputClass> for u8 {
    fn from(class: OutputClass) -> u8 {
        match class {
            OutputClass::Tanh => 0,
            OutputClass::Sigmoid => 1,
        }
    }
}

/// Shape of the network a chromosome decodes into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub input_classes: Vec<InputClass>,
    pub hidden_width: usize,
    pub hidden_layers: usize,
    pub output_classes: Vec<OutputClass>,
}

impl Layout {
    pub fn topology(&self) -> Topology {
        Topology::new(
            self.input_classes.len(),
            self.hidden_layers,
            self.hidden_width,
            self.output_classes.len(),
        )
    }

    /// Genes consumed by [`decode`] for this layout
    pub fn required_genes(&self) -> usize {
        let topology = self.topology();
        let mut required = 2 + 2 * topology.inputs;

        let mut previous = topology.inputs;
        for _ in 0..topology.effective_hidden_layers() {
            required += topology.hidden_width * (previous + 1);
            previous = topology.hidden_width;
        }
        required + topology.outputs * (previous + 1)
    }
}

/// Gene count for a layout with [`OUTPUTS`] outputs
///
/// Equal to `2 + 2i + w(i+1) + (h-1)w(w+1) + 2(w+1)` whenever `h` and `w`
/// are positive.
pub fn estimate_chromosome(inputs: usize, hidden_width: usize, hidden_layers: usize) -> usize {
    Layout {
        input_classes: vec![InputClass::Mid; inputs],
        hidden_width,
        hidden_layers,
        output_classes: vec![OutputClass::Tanh; OUTPUTS],
    }
    .required_genes()
}

/// Sequential reader over a chromosome's decoded gene values
struct GeneCursor<'a> {
    chromosome: &'a Chromosome,
    position: usize,
}

impl<'a> GeneCursor<'a> {
    fn new(chromosome: &'a Chromosome) -> Self {
        Self {
            chromosome,
            position: 0,
        }
    }

    fn next(&mut self, transform: GeneTransform) -> Result<f64> {
        let position = self.position;
        let gene = self
            .chromosome
            .genes()
            .get(position)
            .ok_or(DecodeError::GenomeOverrun { position })?;
        self.position += 1;
        Ok(transform.apply(gene.decode()))
    }

    fn take(&mut self, count: usize, transform: GeneTransform) -> Result<Vec<f64>> {
        (0..count).map(|_| self.next(transform)).collect()
    }
}

/// Build a network from `chromosome` with advisory weight bounds
pub fn decode(chromosome: &Chromosome, layout: &Layout) -> Result<NeuralNetwork> {
    decode_with_policy(chromosome, layout, WeightPolicy::default())
}

/// Build a network from `chromosome`
///
/// Fails before any neuron is created when the chromosome is too short.
pub fn decode_with_policy(
    chromosome: &Chromosome,
    layout: &Layout,
    weight_policy: WeightPolicy,
) -> Result<NeuralNetwork> {
    let required = layout.required_genes();
    let available = chromosome.num_genes();
    if available < required {
        log::warn!(
            "Lobotomy: chromosome carries {} genes, brain needs {}",
            available,
            required
        );
        return Err(DecodeError::InsufficientGenome {
            required,
            available,
        });
    }

    let mut genes = GeneCursor::new(chromosome);
    let alpha = genes.next(GeneTransform::Mid)?;
    let phi = genes.next(GeneTransform::Mid)?;
    let learning = HebbianParams::new(alpha, phi).with_policy(weight_policy);

    let topology = layout.topology();
    let mut network = NeuralNetwork::new(topology, learning);

    for class in &layout.input_classes {
        let weight = genes.next(GeneTransform::Fit)?;
        let theta = genes.next(class.transform())?;
        network.add_input(weight, theta, ActivationFunction::DEFAULT_TANH)?;
    }

    let mut previous = topology.inputs;
    for _ in 0..topology.effective_hidden_layers() {
        for _ in 0..topology.hidden_width {
            let weights = genes.take(previous, GeneTransform::Fit)?;
            let theta = genes.next(GeneTransform::Fit)?;
            network.add_hidden(&weights, theta, ActivationFunction::DEFAULT_TANH)?;
        }
        previous = topology.hidden_width;
    }

    for class in &layout.output_classes {
        let weights = genes.take(previous, GeneTransform::Fit)?;
        let theta = genes.next(GeneTransform::Fit)?;
        network.add_output(&weights, theta, class.activation())?;
    }

    if genes.position < available {
        log::debug!(
            "Decoded brain from {} of {} genes",
            genes.position,
            available
        );
    }
    Ok(network)
}
