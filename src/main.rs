use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mazebrain::decoder::decode_with_policy;
use mazebrain::{BrainConfig, Chromosome, Unconstrained};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Brain config in RON format (defaults to the reference bug brain)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for every random choice
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a random chromosome sized for the configured layout
    Random {
        /// Emit the dense byte encoding instead of plain text
        #[arg(long)]
        dense: bool,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Decode a chromosome file and print the resulting network
    Inspect { file: PathBuf },

    /// Drive a decoded brain in an open field
    Run {
        file: PathBuf,

        /// Number of ticks to simulate
        #[arg(long, default_value = "100")]
        ticks: usize,

        /// Feed seeded random sensor values instead of a constant 0.5
        #[arg(long)]
        random_inputs: bool,
    },

    /// Decode and step a population of random genomes in parallel
    BenchPopulation {
        /// Population size
        #[arg(long, default_value = "64")]
        size: usize,

        /// Ticks per individual
        #[arg(long, default_value = "50")]
        ticks: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BrainConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => BrainConfig::default(),
    };
    let mut rng = match args.seed {
        Some(seed) => Xoshiro256StarStar::seed_from_u64(seed),
        None => Xoshiro256StarStar::from_rng(&mut rand::rng()),
    };

    match args.command {
        Command::Random { dense, output } => random(&config, &mut rng, dense, output.as_deref()),
        Command::Inspect { file } => inspect(&config, &file),
        Command::Run {
            file,
            ticks,
            random_inputs,
        } => run(&config, &mut rng, &file, ticks, random_inputs),
        Command::BenchPopulation { size, ticks } => {
            bench_population(&config, args.seed.unwrap_or_default(), size, ticks)
        }
    }
}

fn random(
    config: &BrainConfig,
    rng: &mut Xoshiro256StarStar,
    dense: bool,
    output: Option<&Path>,
) -> Result<()> {
    let chromosome = config.random_chromosome(rng);
    log::info!(
        "Generated chromosome of {} genes x {} bits",
        chromosome.len(),
        config.gene_bits
    );

    let bytes = if dense {
        chromosome.to_dense_bytes()?
    } else {
        chromosome.to_string().into_bytes()
    };

    match output {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write chromosome: {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            if !dense {
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}

/// Plain text first, dense bytes as fallback
fn read_chromosome(path: &Path) -> Result<Chromosome> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read chromosome: {}", path.display()))?;

    if let Some(plain) = std::str::from_utf8(&bytes)
        .ok()
        .and_then(|text| text.parse::<Chromosome>().ok())
    {
        return Ok(plain);
    }
    Chromosome::from_dense_bytes(&bytes)
        .with_context(|| format!("{} is not a chromosome file", path.display()))
}

fn inspect(config: &BrainConfig, file: &Path) -> Result<()> {
    let chromosome = read_chromosome(file)?;
    let network = decode_with_policy(&chromosome, &config.layout, config.weight_policy)
        .context("Failed to decode brain")?;

    println!(
        "genes: {} (layout uses {})",
        chromosome.len(),
        config.required_genes()
    );
    println!("factors: {}", network.factor_count());
    print!("{}", network.construct_report());
    Ok(())
}

fn run(
    config: &BrainConfig,
    rng: &mut Xoshiro256StarStar,
    file: &Path,
    ticks: usize,
    random_inputs: bool,
) -> Result<()> {
    let chromosome = read_chromosome(file)?;
    let mut bug = config
        .controller(chromosome)
        .context("Failed to build controller")?;
    let inputs = config.layout.input_classes.len();

    for tick in 0..ticks {
        let sensors: Vec<f64> = if random_inputs {
            (0..inputs).map(|_| rng.random::<f64>()).collect()
        } else {
            vec![0.5; inputs]
        };
        bug.set_inputs(&sensors)?;
        bug.step(&Unconstrained)?;

        let position = bug.position();
        println!(
            "{:>5} pos=({:.3}, {:.3}) dir={:.2} vel={:.4}",
            tick,
            position.x,
            position.y,
            bug.direction(),
            bug.velocity()
        );
    }

    let anomalies = bug.brain().weight_anomalies();
    if anomalies > 0 {
        log::warn!("{} weight updates left the advisory bound", anomalies);
    }
    Ok(())
}

fn bench_population(config: &BrainConfig, seed: u64, size: usize, ticks: usize) -> Result<()> {
    let start = Instant::now();
    let inputs = config.layout.input_classes.len();

    let results: Vec<std::result::Result<f64, String>> = (0..size)
        .into_par_iter()
        .map(|i| -> std::result::Result<f64, String> {
            let mut rng = Xoshiro256StarStar::seed_from_u64(seed.wrapping_add(i as u64));
            let chromosome = config.random_chromosome(&mut rng);
            let mut bug = config.controller(chromosome).map_err(|e| e.to_string())?;
            for _ in 0..ticks {
                let sensors: Vec<f64> = (0..inputs).map(|_| rng.random::<f64>()).collect();
                bug.set_inputs(&sensors).map_err(|e| e.to_string())?;
                bug.step(&Unconstrained).map_err(|e| e.to_string())?;
            }
            Ok(bug.position().length())
        })
        .collect();

    let failures: Vec<&String> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    let distances: Vec<f64> = results
        .iter()
        .filter_map(|r| r.as_ref().ok().copied())
        .collect();
    for failure in &failures {
        log::warn!("Decode failure: {}", failure);
    }

    let best = distances.iter().copied().fold(0.0, f64::max);
    println!(
        "{} brains, {} ticks each, {} failures in {:.2?}",
        size,
        ticks,
        failures.len(),
        start.elapsed()
    );
    println!("furthest distance from origin: {:.3}", best);
    Ok(())
}
