//! Genetics module - binary genes, chromosomes and their genetic operators.
//!
//! Implements:
//! - Fixed-length binary genes decoding to values in `[0, 1)`
//! - Chromosomes with k-point crossover, single-bit mutation and cloning
//! - Plain (`[0101][1100]`) and dense (7 bits per byte) serialization
//! - Probability-gated breeding helpers

pub mod breeding;
pub mod chromosome;
pub mod gene;

pub use breeding::BreedingConfig;
pub use chromosome::Chromosome;
pub use gene::Gene;

/// Result type for genome operations
pub type Result<T> = std::result::Result<T, GenomeError>;

/// Errors raised by gene and chromosome operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenomeError {
    #[error("Gene index {index} out of range for chromosome of {len} genes")]
    GeneIndexOutOfRange { index: usize, len: usize },

    #[error("Cannot append an absent gene")]
    MissingGene,

    #[error("Crossover requires at least one crossover point")]
    NoCrossoverPoints,

    #[error("Invalid bit '{found}' at position {position}")]
    InvalidBit { position: usize, found: char },

    #[error("Gene {gene}: {source}")]
    InvalidGene {
        gene: usize,
        #[source]
        source: Box<GenomeError>,
    },

    #[error("Malformed chromosome text at byte {position}: {reason}")]
    Malformed {
        position: usize,
        reason: &'static str,
    },

    #[error("Invalid dense byte {byte:#04x} at position {position}")]
    InvalidDenseByte { position: usize, byte: u8 },

    #[error("Dense gene of {bit_len} bits needs {expected} bytes, found {found}")]
    DenseLengthMismatch {
        bit_len: usize,
        expected: usize,
        found: usize,
    },

    #[error("Dense encoding requires uniform gene length: gene {gene} has {found} bits, expected {expected}")]
    MixedGeneLengths {
        gene: usize,
        expected: usize,
        found: usize,
    },

    #[error("Dense header declares {declared} bytes per gene but {bit_len} bits need {expected}")]
    DenseHeaderMismatch {
        declared: usize,
        bit_len: usize,
        expected: usize,
    },

    #[error("Character '{found}' cannot be carried in dense text")]
    NonLatin1 { found: char },

    #[error("Cannot encode an empty chromosome densely")]
    Empty,
}
