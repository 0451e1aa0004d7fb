//! Run orchestration: owns the state, the controllers and the telemetry.

use bgtcs_core::{channel_map, BgtcsError, DelayHistory, Result, Time, TimeSeries};
use bgtcs_dbs::{PeriodicController, PhaseLockedController, Stimulator};
use ndarray::{Array1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::ControlFlow;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::integrator::NeuralMassIntegrator;
use crate::params::{ConnectionTable, ParameterSet, INITIAL_STATE};
use crate::serde_ext;

/// Which controller drives the stimulation target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulationMode {
    Off,
    /// Open-loop pulses (cDBS)
    Periodic,
    /// Phase- and power-gated pulses (pDBS)
    PhaseLocked,
}

impl StimulationMode {
    /// Periodic stimulation takes precedence when both are requested
    pub fn from_flags(cdbs: bool, pdbs: bool) -> Self {
        match (cdbs, pdbs) {
            (true, _) => Self::Periodic,
            (false, true) => Self::PhaseLocked,
            (false, false) => Self::Off,
        }
    }
}

impl fmt::Display for StimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::Periodic => f.write_str("cDBS"),
            Self::PhaseLocked => f.write_str("pDBS"),
        }
    }
}

/// Per-sample record of the tracked spectrum and delivered charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Tracked power (dB)
    #[serde(with = "serde_ext::nonfinite_vec")]
    pub amplitude: Vec<f64>,
    /// Tracked phase (rad)
    #[serde(with = "serde_ext::nonfinite_vec")]
    pub phase: Vec<f64>,
    /// Delivered charge (mC), zero where no pulse
    pub stim: Vec<f64>,
    pub pulse_count: usize,
}

impl Telemetry {
    pub fn new(n: usize) -> Self {
        Self {
            amplitude: vec![0.0; n],
            phase: vec![0.0; n],
            stim: vec![0.0; n],
            pulse_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.stim.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stim.is_empty()
    }

    fn record_pulse(&mut self, index: usize, charge: f64) {
        self.stim[index] = charge;
        self.pulse_count += 1;
    }

    /// Sample indices at which a pulse was delivered
    pub fn pulse_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.stim
            .iter()
            .enumerate()
            .filter(|(_, &q)| q != 0.0)
            .map(|(i, _)| i)
    }

    /// Total delivered charge (mC)
    pub fn total_charge(&self) -> f64 {
        self.stim.iter().sum()
    }

    /// Mean of the finite tracked power values from `from` on
    pub fn mean_amplitude(&self, from: usize) -> Option<f64> {
        let tail: Vec<f64> = self
            .amplitude
            .iter()
            .skip(from)
            .copied()
            .filter(|v| v.is_finite())
            .collect();
        if tail.is_empty() {
            None
        } else {
            Some(tail.iter().sum::<f64>() / tail.len() as f64)
        }
    }
}

/// Receives progress once per produced sample and may stop the run
pub trait StepObserver {
    /// `step` is the index of the sample just written, `fraction` in [0, 1]
    fn on_step(&mut self, step: usize, fraction: f64) -> ControlFlow<()>;
}

impl<F> StepObserver for F
where
    F: FnMut(usize, f64) -> ControlFlow<()>,
{
    fn on_step(&mut self, step: usize, fraction: f64) -> ControlFlow<()> {
        self(step, fraction)
    }
}

/// How a call to [`Simulation::run_with`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// Stopped by the observer after writing sample `at`
    Cancelled { at: usize },
}

/// One forward run of the BGTCS model
pub struct Simulation {
    config: SimulationConfig,
    seed: u64,
    integrator: NeuralMassIntegrator,
    history: DelayHistory,
    mode: StimulationMode,
    periodic: Option<PeriodicController>,
    phase_locked: Option<PhaseLockedController>,
    /// Column of the tracked channel
    monitored: usize,
    telemetry: Telemetry,
    rng: StdRng,
    n: usize,
    i: usize,
}

impl Simulation {
    /// Validate `config` and build a run positioned at sample 0
    pub fn new(mut config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.resolve_seed();

        let regime = config.regime();
        let n = config.n_samples();
        let integrator = NeuralMassIntegrator::new(
            ParameterSet::new(regime),
            ConnectionTable::bgtcs(regime, config.dt)?,
            config.noise_amp,
            config.stim_population()?,
            config.cm,
        )?;
        let history = DelayHistory::new(n, Array1::from(INITIAL_STATE.to_vec()))?;

        let mode = config.mode();
        let periodic = match mode {
            StimulationMode::Periodic => Some(PeriodicController::new(config.periodic_params())?),
            _ => None,
        };
        let phase_locked = if mode == StimulationMode::PhaseLocked || config.track_phase {
            Some(PhaseLockedController::new(config.phase_locked_params())?)
        } else {
            None
        };

        info!(
            n_samples = n,
            regime = %regime,
            mode = %mode,
            seed,
            "Simulation configured"
        );

        Ok(Self {
            monitored: config.state_population()?.value_channel(),
            seed,
            integrator,
            history,
            mode,
            periodic,
            phase_locked,
            telemetry: Telemetry::new(n),
            rng: StdRng::seed_from_u64(seed),
            n,
            i: 0,
            config,
        })
    }

    /// Produce one sample; returns `false` once the run is complete
    pub fn step(&mut self) -> Result<bool> {
        if self.is_finished() {
            return Ok(false);
        }
        let i = self.i;
        let monitored = self.history.read(i as isize)[self.monitored];

        let mut charge = 0.0;
        if let Some(periodic) = self.periodic.as_mut() {
            charge = periodic.advance(monitored);
        }
        if let Some(tracker) = self.phase_locked.as_mut() {
            let q = tracker.advance(monitored);
            if self.mode == StimulationMode::PhaseLocked {
                charge = q;
            }
            self.telemetry.amplitude[i + 1] = tracker.amplitude_db();
            self.telemetry.phase[i + 1] = tracker.phase();
        }

        self.integrator
            .advance(&mut self.history, i, charge, &mut self.rng)?;

        if charge != 0.0 {
            self.telemetry.record_pulse(i + 1, charge);
        }
        self.i += 1;
        Ok(true)
    }

    /// Run to completion
    pub fn run(&mut self) -> Result<()> {
        self.run_with(keep_going).map(|_| ())
    }

    /// Run until the last sample or until `observer` breaks
    pub fn run_with<O: StepObserver>(&mut self, mut observer: O) -> Result<RunStatus> {
        while self.step()? {
            if observer.on_step(self.i, self.progress()).is_break() {
                info!(at = self.i, n_samples = self.n, "Simulation cancelled");
                return Ok(RunStatus::Cancelled { at: self.i });
            }
        }
        debug!(
            pulses = self.telemetry.pulse_count,
            total_charge = self.telemetry.total_charge(),
            "Simulation finished"
        );
        Ok(RunStatus::Completed)
    }

    /// Fraction of the run done, in [0, 1]
    pub fn progress(&self) -> f64 {
        if self.n <= 2 {
            return 1.0;
        }
        (self.i as f64 / (self.n - 2) as f64).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.i + 1 >= self.n
    }

    /// Index of the latest written sample
    pub fn current_step(&self) -> usize {
        self.i
    }

    pub fn n_samples(&self) -> usize {
        self.n
    }

    /// Written samples, one row per sample
    pub fn states(&self) -> ArrayView2<'_, f64> {
        self.history.as_array()
    }

    pub fn history(&self) -> &DelayHistory {
        &self.history
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn dt(&self) -> Time {
        self.config.dt
    }

    pub fn channel_map(&self) -> BTreeMap<String, usize> {
        channel_map()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn mode(&self) -> StimulationMode {
        self.mode
    }

    pub fn integrator(&self) -> &NeuralMassIntegrator {
        &self.integrator
    }

    pub fn periodic(&self) -> Option<&PeriodicController> {
        self.periodic.as_ref()
    }

    pub fn periodic_mut(&mut self) -> Option<&mut PeriodicController> {
        self.periodic.as_mut()
    }

    /// Phase-locked controller, present when pDBS is on or the phase is tracked
    pub fn phase_locked(&self) -> Option<&PhaseLockedController> {
        self.phase_locked.as_ref()
    }

    pub fn phase_locked_mut(&mut self) -> Option<&mut PhaseLockedController> {
        self.phase_locked.as_mut()
    }

    /// Time series of one named channel (see [`channel_map`])
    pub fn trace(&self, channel: &str) -> Result<TimeSeries> {
        channel_trace(self.states(), self.dt(), channel)
    }
}

fn keep_going(_: usize, _: f64) -> ControlFlow<()> {
    ControlFlow::Continue(())
}

/// Extract a named channel from a state matrix
pub fn channel_trace(states: ArrayView2<'_, f64>, dt: Time, channel: &str) -> Result<TimeSeries> {
    let column = *channel_map()
        .get(channel)
        .ok_or_else(|| BgtcsError::InvalidParameter(format!("Unknown channel '{}'", channel)))?;

    let mut series = TimeSeries::new(channel).with_units(if channel.ends_with("_dot") {
        "mV/s"
    } else {
        "mV"
    });
    for (k, v) in states.column(column).iter().enumerate() {
        series.push(k as f64 * dt, *v);
    }
    Ok(series)
}
