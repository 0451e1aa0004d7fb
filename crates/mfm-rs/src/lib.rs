//! # MFM-RS: BGTCS Mean-Field Model
//!
//! Mean-field model of the cortico-basal-ganglia-thalamic circuit, after
//! van Albada & Robinson, with open-loop (cDBS) and phase-locked (pDBS)
//! deep brain stimulation.
//!
//! Ten lumped populations are integrated with a fixed-step Euler-Maruyama
//! scheme over a delay history:
//! - Cortex: excitatory wave `phie`, excitatory `e`, inhibitory `i`
//! - Striatum: `d1`, `d2`
//! - Pallidum: GPi `p1`, GPe `p2`
//! - Subthalamic nucleus `STN`
//! - Thalamus: relay `s`, reticular `r`
//!
//! ```no_run
//! use bgtcs_mfm::{SaveTarget, Simulation, SimulationConfig};
//!
//! let mut config = SimulationConfig::default();
//! config.apply_overrides([("tstop", "5"), ("pDBS", "true")])?;
//!
//! let mut sim = Simulation::new(config)?;
//! sim.run()?;
//! sim.save(&SaveTarget::default())?;
//! # Ok::<(), bgtcs_core::BgtcsError>(())
//! ```

pub mod batch;
pub mod config;
pub mod integrator;
pub mod params;
pub mod persist;
mod serde_ext;
pub mod simulation;

pub use batch::{run_batch, run_batch_with, sweep_configs};
pub use config::{parse_assignment, ConfigValue, SimulationConfig};
pub use integrator::NeuralMassIntegrator;
pub use params::{ConnectionTable, ParameterSet, Regime};
pub use persist::{next_run_id, resolve_run, run_path, RunRecord, SaveTarget};
pub use simulation::{RunStatus, Simulation, StepObserver, StimulationMode, Telemetry};
