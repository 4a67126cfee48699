//! Hopfield capacity trials.
//!
//! Each trial builds a fresh network, learns a set of random targets, relaxes a
//! batch of random probes concurrently and reports how many settled.
//! Writes one JSONL event per relaxed probe and one per trial.

use clap::{Parser, ValueEnum};
use hopfield::checkpoint::save_checkpoint;
use hopfield::pool::default_workers;
use hopfield::{
    ConfigError, Domain, HopfieldResult, LearningRule, NetworkConfig, NoiseMethod,
    StateGenerator, TrialAccumulator,
};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RuleArg {
    Hebbian,
    Delta,
    ThermalDelta,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum NoiseArg {
    None,
    ExactInversion,
    SubMaximalInversion,
    Gaussian,
}

impl From<NoiseArg> for NoiseMethod {
    fn from(arg: NoiseArg) -> Self {
        match arg {
            NoiseArg::None => NoiseMethod::None,
            NoiseArg::ExactInversion => NoiseMethod::ExactInversion,
            NoiseArg::SubMaximalInversion => NoiseMethod::SubMaximalInversion,
            NoiseArg::Gaussian => NoiseMethod::Gaussian,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "hopfield-trials",
    about = "Train Hopfield networks on random targets and probe them with random states"
)]
struct Args {
    /// Number of independent trials
    #[arg(long, default_value_t = 10)]
    trials: usize,

    /// Probe states relaxed per trial
    #[arg(long, default_value_t = 1000)]
    probes: usize,

    /// Target states learned per trial
    #[arg(long, default_value_t = 5)]
    targets: usize,

    /// Base network config (JSON); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of units
    #[arg(long)]
    dimension: Option<usize>,

    /// State domain (bipolar or binary)
    #[arg(long)]
    domain: Option<Domain>,

    /// Learning rule
    #[arg(long, value_enum)]
    rule: Option<RuleArg>,

    /// Temperature for the thermal delta rule
    #[arg(long, default_value_t = 1.0)]
    temperature: f64,

    /// Noise applied to delta-rule probes
    #[arg(long, value_enum)]
    noise: Option<NoiseArg>,

    /// Noise ratio (inversions) or standard deviation (gaussian)
    #[arg(long)]
    noise_scale: Option<f64>,

    /// Maximum learning epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Learning rate (eta)
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Units updated together per chunk of a sweep
    #[arg(long)]
    units_updated: Option<usize>,

    /// Sweep cap per relaxation
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Unstable units tolerated in a stable state
    #[arg(long)]
    max_unstable: Option<usize>,

    /// Relaxation workers (default: available parallelism)
    #[arg(long)]
    workers: Option<usize>,

    /// Base seed; trial k uses seed + k
    #[arg(long)]
    seed: Option<u64>,

    /// Output events file (JSONL)
    #[arg(long, default_value = "data/output/trials.jsonl")]
    output: PathBuf,

    /// Save the last trial's network here
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Log level (off, trace, debug, info, warn, error)
    #[arg(long, default_value = "info", value_parser = parse_log_level)]
    log_level: LevelFilter,
}

fn parse_log_level(s: &str) -> Result<LevelFilter, String> {
    s.parse::<LevelFilter>()
        .map_err(|_| format!("unknown log level `{s}`; expected off, trace, debug, info, warn or error"))
}

/// Relaxation workers: the explicit request, or the machine's parallelism.
fn resolve_workers(requested: Option<usize>) -> Result<usize, ConfigError> {
    match requested {
        Some(0) => Err(ConfigError::invalid_value("workers", "must be positive")),
        Some(workers) => Ok(workers),
        None => Ok(default_workers()),
    }
}

fn base_config(args: &Args) -> HopfieldResult<NetworkConfig> {
    let mut config = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            NetworkConfig::from_json_file(path)?
        }
        None => NetworkConfig {
            dimension: 100,
            ..NetworkConfig::default()
        },
    };

    if let Some(dimension) = args.dimension {
        config.dimension = dimension;
    }
    if let Some(domain) = args.domain {
        config.domain = domain;
    }
    if let Some(rule) = args.rule {
        config.learning_rule = match rule {
            RuleArg::Hebbian => LearningRule::Hebbian,
            RuleArg::Delta => LearningRule::Delta,
            RuleArg::ThermalDelta => LearningRule::ThermalDelta {
                temperature: args.temperature,
            },
        };
    }
    if let Some(noise) = args.noise {
        config.noise_method = noise.into();
    }
    if let Some(scale) = args.noise_scale {
        config.noise_scale = scale;
    }
    if let Some(epochs) = args.epochs {
        config.epochs = epochs;
    }
    if let Some(eta) = args.learning_rate {
        config.learning_rate = eta;
    }
    if let Some(units) = args.units_updated {
        config.units_updated_per_step = units;
    }
    if let Some(max) = args.max_iterations {
        config.max_relaxation_iterations = max;
    }
    if let Some(max) = args.max_unstable {
        config.max_unstable_units = max;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> HopfieldResult<()> {
    let config = base_config(args)?;
    let workers = resolve_workers(args.workers)?;

    if let Some(parent) = args.output.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut events = BufWriter::new(File::create(&args.output)?);

    info!(
        dimension = config.dimension,
        domain = %config.domain,
        rule = %config.learning_rule,
        targets = args.targets,
        probes = args.probes,
        workers,
        "starting {} trials",
        args.trials
    );

    let mut last_network = None;
    for trial in 0..args.trials {
        let start = Instant::now();
        let trial_seed = config.seed.map(|seed| seed.wrapping_add(trial as u64));

        let mut network = NetworkConfig {
            seed: trial_seed,
            ..config.clone()
        }
        .build()?;

        let mut generator = StateGenerator::builder()
            .dimension(config.dimension)
            .domain(config.domain);
        if let Some(seed) = trial_seed {
            generator = generator.seed(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        }
        let mut generator = generator.build()?;

        let targets = generator.create_learned_collection(args.targets);
        network.learn_states(&targets);
        let mut unstable_targets = 0;
        for (target_index, target) in targets.iter().enumerate() {
            let stable = network.state_is_stable(target);
            if !stable {
                unstable_targets += 1;
            }
            let event = serde_json::json!({
                "type": "target_probe",
                "trial_index": trial,
                "target_index": target_index,
                "stable": stable,
                "energy_profile": network.all_unit_energies(target).to_vec(),
            });
            writeln!(events, "{event}")?;
        }
        if unstable_targets > 0 {
            warn!(trial, unstable_targets, "not every target is stable after learning");
        }

        let mut probes = generator.create_collection(args.probes);
        let results = network.relax_batch(&mut probes, workers);

        let mut accumulator = TrialAccumulator::new(trial, targets.len());
        for (probe_index, (state, result)) in probes.iter().zip(&results).enumerate() {
            let record = accumulator.record(probe_index, state, result);
            let event = serde_json::json!({
                "type": "relaxation",
                "record": record,
            });
            writeln!(events, "{event}")?;
        }

        let summary = accumulator.summary();
        let elapsed = start.elapsed().as_secs_f64();
        let event = serde_json::json!({
            "type": "trial_end",
            "summary": summary,
            "elapsed_secs": elapsed,
        });
        writeln!(events, "{event}")?;
        events.flush()?;

        match summary.mean_steps_stable {
            Some(mean_steps) => info!(
                trial,
                stable = summary.num_stable,
                probes = summary.num_probes,
                mean_steps,
                elapsed_secs = elapsed,
                "trial complete"
            ),
            None => info!(
                trial,
                stable = 0,
                probes = summary.num_probes,
                elapsed_secs = elapsed,
                "trial complete, no stable probes"
            ),
        }

        last_network = Some(network);
    }

    if let (Some(path), Some(network)) = (args.checkpoint.as_deref(), last_network.as_ref()) {
        save_checkpoint(network, path)?;
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workers_rejected() {
        let err = resolve_workers(Some(0)).unwrap_err();
        assert!(err.to_string().contains("workers"));
        assert_eq!(resolve_workers(Some(3)).unwrap(), 3);
        assert_eq!(resolve_workers(None).unwrap(), default_workers());
    }

    #[test]
    fn test_cli_rejects_zero_workers() {
        let args = Args::try_parse_from(["hopfield-trials", "--workers", "0", "--trials", "0"]).unwrap();
        assert!(run(&args).is_err());
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(parse_log_level("debug").unwrap(), LevelFilter::DEBUG);
        assert!(parse_log_level("verbose").is_err());
        assert!(Args::try_parse_from(["hopfield-trials", "--log-level", "loud"]).is_err());
        let args = Args::try_parse_from(["hopfield-trials", "--log-level", "warn"]).unwrap();
        assert_eq!(args.log_level, LevelFilter::WARN);
    }

    #[test]
    fn test_run_writes_target_events() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("trials.jsonl");
        let output_arg = output.to_str().unwrap();
        let args = Args::try_parse_from([
            "hopfield-trials", "--trials", "1", "--probes", "3", "--targets", "2",
            "--dimension", "16", "--workers", "1", "--seed", "11", "--output", output_arg,
        ])
        .unwrap();
        run(&args).unwrap();

        let events: Vec<serde_json::Value> = fs::read_to_string(&output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let count = |kind: &str| events.iter().filter(|e| e["type"] == kind).count();
        assert_eq!(count("target_probe"), 2);
        assert_eq!(count("relaxation"), 3);
        assert_eq!(count("trial_end"), 1);

        let target = events.iter().find(|e| e["type"] == "target_probe").unwrap();
        assert_eq!(target["energy_profile"].as_array().unwrap().len(), 16);
        assert!(target["stable"].is_boolean());
    }
}
