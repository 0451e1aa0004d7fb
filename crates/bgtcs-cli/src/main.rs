//! # BGTCS MFM CLI
//!
//! Command-line interface for running and inspecting mean-field simulations.

use anyhow::Context;
use bgtcs_mfm::{
    parse_assignment, resolve_run, run_batch_with, sweep_configs, RunRecord, SaveTarget,
    Simulation, SimulationConfig,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mfm")]
#[command(author = "Yatrogenesis")]
#[command(version)]
#[command(about = "BGTCS mean-field model with open- and closed-loop DBS", long_about = None)]
struct Cli {
    /// Run catalogue directory
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation and save it
    Run {
        /// Options as key=value (see `mfm list`)
        options: Vec<String>,
        /// JSON configuration file, applied before the options
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output file instead of the catalogue
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Do not save the run
        #[arg(long)]
        no_save: bool,
    },

    /// List options and their defaults
    List,

    /// Summarize a saved run
    Show {
        /// RunID or path
        run: String,
    },

    /// Run one simulation per value of an option, in parallel
    Sweep {
        /// Option to vary
        #[arg(short, long)]
        key: String,
        /// Comma-separated values
        #[arg(short, long, value_delimiter = ',', required = true)]
        values: Vec<String>,
        /// Options shared by every run, as key=value
        options: Vec<String>,
        /// JSON configuration file, applied before the options
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            options,
            config,
            out,
            no_save,
        } => {
            let config = build_config(config.as_deref(), &options)?;
            let verbose = config.verbose;
            if verbose {
                println!("{}", config);
            }

            let mut sim = Simulation::new(config).context("invalid configuration")?;
            if verbose {
                let pb = progress_bar(1000, "integrating");
                sim.run_with(|_: usize, fraction: f64| -> ControlFlow<()> {
                    pb.set_position((fraction * 1000.0) as u64);
                    ControlFlow::Continue(())
                })?;
                pb.finish_and_clear();
            } else {
                sim.run()?;
            }

            print_telemetry(
                sim.telemetry(),
                sim.current_step() + 1,
                sim.seed(),
                &sim.config().state_target,
            );

            if !no_save {
                let target = match out {
                    Some(path) => SaveTarget::Path(path),
                    None => SaveTarget::Catalogue(cli.data_dir),
                };
                let path = sim.save(&target)?;
                println!();
                println!("{}", "Saving data...".green().bold());
                if matches!(target, SaveTarget::Catalogue(_)) {
                    println!("  RunID: {:03}", sim.config().run_id);
                }
                println!("  {}", path.display());
            }
        }

        Commands::List => {
            println!("{}", "Options (key=value):".green().bold());
            println!();
            for (key, value) in SimulationConfig::options() {
                println!("  {:<16} {}", key.cyan(), value);
            }
        }

        Commands::Show { run } => {
            let path = resolve_run(&cli.data_dir, &run);
            let record = RunRecord::load(&path)
                .with_context(|| format!("cannot load run '{}'", run))?;

            println!("{} {}", "Run:".green().bold(), path.display());
            println!();
            println!("{}", record.config);
            print_telemetry(
                &record.telemetry,
                record.states.nrows(),
                record.seed,
                &record.config.state_target,
            );
            let trace = record.trace(&record.config.state_target)?;
            if let Some(mean) = trace.mean() {
                println!("  mean {:<10}: {:.3} mV", record.config.state_target, mean);
            }
        }

        Commands::Sweep {
            key,
            values,
            options,
            config,
        } => {
            let mut base = build_config(config.as_deref(), &options)?;
            base.verbose = false;
            let configs = sweep_configs(&base, &key, &values)?;

            println!(
                "{} {} over {} values",
                "Sweeping".green().bold(),
                key.cyan(),
                configs.len()
            );
            let pb = progress_bar(configs.len() as u64, "runs");
            let results = run_batch_with(configs, |_, _| pb.inc(1));
            pb.finish_and_clear();

            let target = SaveTarget::Catalogue(cli.data_dir);
            for (value, result) in values.iter().zip(results) {
                match result {
                    Ok(mut sim) => {
                        let path = sim.save(&target)?;
                        println!(
                            "  {}={:<10} RunID {:03}  pulses {:>6}  {}",
                            key,
                            value,
                            sim.config().run_id,
                            sim.telemetry().pulse_count,
                            path.display()
                        );
                    }
                    Err(e) => {
                        println!("  {}={:<10} {}", key, value, format!("failed: {}", e).red());
                    }
                }
            }
        }
    }

    Ok(())
}

/// Defaults, then the JSON file, then `key=value` options
fn build_config(file: Option<&Path>, options: &[String]) -> anyhow::Result<SimulationConfig> {
    let mut config = match file {
        Some(path) => {
            let (config, ignored) = SimulationConfig::from_json_file(path)?;
            for key in ignored {
                println!("{} {}", "Invalid keyword argument".yellow(), key);
            }
            config
        }
        None => SimulationConfig::default(),
    };

    let pairs = options
        .iter()
        .map(|s| parse_assignment(s))
        .collect::<Result<Vec<_>, _>>()?;
    for key in config.apply_overrides(pairs)? {
        println!("{} {}", "Invalid keyword argument".yellow(), key);
    }
    Ok(config)
}

fn progress_bar(len: u64, msg: &'static str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(msg);
    pb
}

fn print_telemetry(
    telemetry: &bgtcs_mfm::Telemetry,
    samples: usize,
    seed: u64,
    state_target: &str,
) {
    println!("{}", "Telemetry".green().bold());
    println!("  samples        : {}", samples);
    println!("  seed           : {}", seed);
    println!("  pulses         : {}", telemetry.pulse_count);
    println!("  total charge   : {:.4e} mC", telemetry.total_charge());
    match telemetry.mean_amplitude(samples / 2) {
        Some(db) => println!("  mean power     : {:.2} dB ({}, second half)", db, state_target),
        None => println!("  mean power     : {}", "not tracked".yellow()),
    }
}
