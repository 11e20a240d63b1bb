//! Brain configuration loaded from RON files

use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::controller::{self, Controller, MotionConfig};
use crate::decoder::{InputClass, Layout, OutputClass, OUTPUTS};
use crate::genetics::{BreedingConfig, Chromosome};
use crate::neural::WeightPolicy;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse RON config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("Failed to serialize config to RON: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to breed and build bug brains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub layout: Layout,
    /// Bits per gene in freshly generated chromosomes
    pub gene_bits: usize,
    pub weight_policy: WeightPolicy,
    pub motion: MotionConfig,
    pub breeding: BreedingConfig,
}

impl Default for BrainConfig {
    /// 24 sensors alternating distance and type, ten hidden layers of 30,
    /// sigmoid velocity and tanh turn outputs
    fn default() -> Self {
        let input_classes = (0..24)
            .map(|i| {
                if i % 2 == 0 {
                    InputClass::Mid
                } else {
                    InputClass::Fit
                }
            })
            .collect();

        Self {
            layout: Layout {
                input_classes,
                hidden_width: 30,
                hidden_layers: 10,
                output_classes: vec![OutputClass::Sigmoid, OutputClass::Tanh],
            },
            gene_bits: 28,
            weight_policy: WeightPolicy::Advisory,
            motion: MotionConfig::default(),
            breeding: BreedingConfig::default(),
        }
    }
}

impl BrainConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&content)?;
        log::info!("Loaded brain config from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_ron_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_ron_str(content: &str) -> Result<Self> {
        let config: Self = ron::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gene_bits == 0 {
            return Err(ConfigError::Invalid("gene_bits must be positive".into()));
        }
        if self.layout.output_classes.len() != OUTPUTS {
            return Err(ConfigError::Invalid(format!(
                "controller brains need {} output classes, found {}",
                OUTPUTS,
                self.layout.output_classes.len()
            )));
        }
        if self.breeding.crossover_points == 0 {
            return Err(ConfigError::Invalid(
                "crossover_points must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.breeding.mutation_rate) {
            return Err(ConfigError::Invalid(format!(
                "mutation_rate {} is not a probability",
                self.breeding.mutation_rate
            )));
        }
        Ok(())
    }

    pub fn required_genes(&self) -> usize {
        self.layout.required_genes()
    }

    /// Chromosome of exactly the size the layout consumes
    pub fn random_chromosome<R: Rng + ?Sized>(&self, rng: &mut R) -> Chromosome {
        Chromosome::random(self.required_genes(), self.gene_bits, rng)
    }

    pub fn controller(&self, chromosome: Chromosome) -> controller::Result<Controller> {
        Controller::new(chromosome, &self.layout, self.motion, self.weight_policy)
    }
}
