//! # DBS-RS
//!
//! Deep brain stimulation controllers for the BGTCS mean-field model.
//!
//! Two pulse sources share one charge model:
//!
//! - **cDBS** ([`PeriodicController`]): open-loop pulses at a fixed
//!   frequency once the start offset has elapsed.
//! - **pDBS** ([`PhaseLockedController`]): closed-loop pulses on the rising
//!   zero-crossing of the tracked phase relative to a phase threshold,
//!   gated by a refractory period and a power threshold.
//!
//! Delivered charge is `amplitude (mA) * width (us) * 1e-6` in mC.

use bgtcs_core::{BgtcsError, Charge, Frequency, Result, Time};
use bgtcs_swift::{Aswift, SpectralSample};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

// ============================================================================
// PULSE SETTINGS
// ============================================================================

/// Pulse amplitude and width, with the derived charge kept in sync
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseSettings {
    amplitude: f64, // mA
    width: f64,     // us
    charge: Charge, // mC
}

impl PulseSettings {
    pub fn new(amplitude: f64, width: f64) -> Self {
        let mut pulse = Self {
            amplitude,
            width,
            charge: 0.0,
        };
        pulse.update_charge();
        pulse
    }

    fn update_charge(&mut self) {
        self.charge = if self.amplitude > 0.0 && self.width > 0.0 {
            self.amplitude * self.width * 1e-6
        } else {
            0.0
        };
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Charge per pulse (mC)
    pub fn charge(&self) -> Charge {
        self.charge
    }

    pub fn set_amplitude(&mut self, amplitude: f64) {
        self.amplitude = amplitude;
        self.update_charge();
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
        self.update_charge();
    }
}

/// A source of stimulation pulses, advanced once per integration step
pub trait Stimulator {
    /// Advance one sample; returns the charge delivered on this sample (0 if none)
    fn advance(&mut self, monitored: f64) -> Charge;

    fn pulse(&self) -> &PulseSettings;

    fn pulse_mut(&mut self) -> &mut PulseSettings;

    /// Charge per pulse (mC)
    fn charge(&self) -> Charge {
        self.pulse().charge()
    }

    fn set_amplitude(&mut self, amplitude: f64) {
        self.pulse_mut().set_amplitude(amplitude);
    }

    fn set_width(&mut self, width: f64) {
        self.pulse_mut().set_width(width);
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0) || !value.is_finite() {
        return Err(BgtcsError::InvalidParameter(format!(
            "{} must be > 0 (got {})",
            name, value
        )));
    }
    Ok(())
}

/// Whole samples needed to cover `duration`, rounding up unless the ratio is
/// an integer up to floating-point error
fn samples_to_cover(duration: Time, dt: Time) -> usize {
    let ratio = duration / dt;
    let nearest = ratio.round();
    if (ratio - nearest).abs() <= 1e-9 * nearest.max(1.0) {
        nearest as usize
    } else {
        ratio.ceil() as usize
    }
}

// ============================================================================
// PERIODIC (cDBS)
// ============================================================================

/// Parameters for open-loop stimulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicParams {
    pub f: Frequency,    // Stimulation frequency (Hz)
    pub dt: Time,        // Integration timestep (s)
    pub amplitude: f64,  // Pulse amplitude (mA)
    pub width: f64,      // Pulse width (us)
    pub tstart: Time,    // Stimulation start (s)
}

impl Default for PeriodicParams {
    fn default() -> Self {
        Self {
            f: 130.0,
            dt: 1e-3,
            amplitude: 1.0,
            width: 60.0,
            tstart: 0.0,
        }
    }
}

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodicState {
    /// Start offset not reached yet
    Waiting,
    /// Pulsing at the fixed rate (permanent)
    Firing,
}

/// Open-loop pulse generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicController {
    params: PeriodicParams,
    pulse: PulseSettings,
    steps_per_pulse: usize,
    pulse_counter: usize,
    start_samples: usize,
    elapsed: usize,
}

impl PeriodicController {
    pub fn new(params: PeriodicParams) -> Result<Self> {
        check_positive("cDBS frequency", params.f)?;
        check_positive("dt", params.dt)?;
        if !(params.tstart >= 0.0) {
            return Err(BgtcsError::InvalidParameter(format!(
                "Stimulation start must be >= 0 (got {})",
                params.tstart
            )));
        }

        let steps_per_pulse = ((1.0 / params.f / params.dt).round() as usize).max(1);
        let start_samples = samples_to_cover(params.tstart, params.dt);
        debug!(
            f = params.f,
            steps_per_pulse, start_samples, "periodic controller configured"
        );

        Ok(Self {
            pulse: PulseSettings::new(params.amplitude, params.width),
            params,
            steps_per_pulse,
            // first call in the firing state pulses
            pulse_counter: steps_per_pulse,
            start_samples,
            elapsed: 0,
        })
    }

    /// Advance one sample
    pub fn step(&mut self) -> Charge {
        if self.elapsed < self.start_samples {
            self.elapsed += 1;
            return 0.0;
        }

        let mut stim = false;
        if self.pulse_counter >= self.steps_per_pulse {
            self.pulse_counter = 0;
            stim = true;
        }
        self.pulse_counter += 1;

        if stim {
            self.pulse.charge()
        } else {
            0.0
        }
    }

    pub fn state(&self) -> PeriodicState {
        if self.elapsed < self.start_samples {
            PeriodicState::Waiting
        } else {
            PeriodicState::Firing
        }
    }

    /// Inter-pulse interval in samples
    pub fn steps_per_pulse(&self) -> usize {
        self.steps_per_pulse
    }

    pub fn start_samples(&self) -> usize {
        self.start_samples
    }

    pub fn params(&self) -> &PeriodicParams {
        &self.params
    }
}

impl Stimulator for PeriodicController {
    fn advance(&mut self, _monitored: f64) -> Charge {
        self.step()
    }

    fn pulse(&self) -> &PulseSettings {
        &self.pulse
    }

    fn pulse_mut(&mut self) -> &mut PulseSettings {
        &mut self.pulse
    }
}

// ============================================================================
// PHASE-LOCKED (pDBS)
// ============================================================================

/// Power gate for phase-locked stimulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PowerThreshold {
    /// Every trigger passes
    Disabled,
    /// Trigger only when the tracked power is at least this many dB
    Db(f64),
}

impl PowerThreshold {
    /// Map a raw dB value, treating -inf as disabled
    pub fn from_db(db: f64) -> Self {
        if db == f64::NEG_INFINITY {
            Self::Disabled
        } else {
            Self::Db(db)
        }
    }

    pub fn admits(&self, amplitude_db: f64) -> bool {
        match self {
            Self::Disabled => true,
            Self::Db(thr) => amplitude_db >= *thr,
        }
    }

    pub fn as_db(&self) -> f64 {
        match self {
            Self::Disabled => f64::NEG_INFINITY,
            Self::Db(thr) => *thr,
        }
    }
}

impl Default for PowerThreshold {
    fn default() -> Self {
        Self::Disabled
    }
}

impl fmt::Display for PowerThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("off"),
            Self::Db(thr) => write!(f, "{}", thr),
        }
    }
}

impl FromStr for PowerThreshold {
    type Err = BgtcsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "disabled" | "-inf" | "-infinity" => Ok(Self::Disabled),
            other => other
                .parse::<f64>()
                .map(Self::from_db)
                .map_err(|_| {
                    BgtcsError::InvalidParameter(format!("Invalid power threshold '{}'", s))
                }),
        }
    }
}

/// Parameters for phase-locked stimulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseLockedParams {
    pub f: Frequency,               // Tracked frequency (Hz)
    pub tau_s: Time,                // aSWIFT slow time constant (s)
    pub tau_f: Time,                // aSWIFT fast time constant (s)
    pub phase_thr: f64,             // Stimulation phase (rad)
    pub power_thr: PowerThreshold,  // Power gate
    pub ref_period: f64,            // Refractory period (cycles of f)
    pub dt: Time,                   // Integration timestep (s)
    pub amplitude: f64,             // Pulse amplitude (mA)
    pub width: f64,                 // Pulse width (us)
}

impl Default for PhaseLockedParams {
    fn default() -> Self {
        Self {
            f: 29.0,
            tau_s: 0.2397,
            tau_f: 0.2397 / 5.0,
            phase_thr: 0.0,
            power_thr: PowerThreshold::Disabled,
            ref_period: 0.3,
            dt: 1e-3,
            amplitude: 1.0,
            width: 60.0,
        }
    }
}

/// Closed-loop pulse trigger driven by an aSWIFT phase estimate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseLockedController {
    params: PhaseLockedParams,
    pulse: PulseSettings,
    aswift: Aswift,
    last_sample: Option<SpectralSample>,
    shift_phase: f64,
    last_shift_phase: f64,
    refractory_samples: f64,
    since_pulse: u64,
}

impl PhaseLockedController {
    pub fn new(params: PhaseLockedParams) -> Result<Self> {
        check_positive("dt", params.dt)?;
        if !(params.ref_period >= 0.0) {
            return Err(BgtcsError::InvalidParameter(format!(
                "Refractory period must be >= 0 (got {})",
                params.ref_period
            )));
        }
        let aswift = Aswift::new(params.tau_s, params.tau_f, params.f, 1.0 / params.dt)?;

        let refractory_samples = params.ref_period / (params.f * params.dt);
        debug!(
            f = params.f,
            tau_s = params.tau_s,
            tau_f = params.tau_f,
            refractory_samples,
            "phase-locked controller configured"
        );

        Ok(Self {
            pulse: PulseSettings::new(params.amplitude, params.width),
            aswift,
            last_sample: None,
            shift_phase: 0.0,
            last_shift_phase: f64::INFINITY,
            refractory_samples,
            // ready to fire on the first trigger
            since_pulse: refractory_samples.ceil() as u64,
            params,
        })
    }

    /// Feed one sample of the monitored channel; returns the delivered charge
    pub fn step(&mut self, x: f64) -> Charge {
        let sample = self.aswift.estimate(x);
        self.last_sample = Some(sample);

        self.last_shift_phase = self.shift_phase;
        self.shift_phase = wrap_phase(sample.phase - self.params.phase_thr);

        let mut stim = false;
        if self.last_shift_phase < 0.0 && 0.0 <= self.shift_phase {
            if self.is_ready() && self.params.power_thr.admits(sample.amplitude_db) {
                stim = true;
                self.since_pulse = 0;
                trace!(amplitude_db = sample.amplitude_db, "phase-locked pulse");
            }
        }
        self.since_pulse += 1;

        if stim {
            self.pulse.charge()
        } else {
            0.0
        }
    }

    /// Refractory period has elapsed since the last pulse
    pub fn is_ready(&self) -> bool {
        self.since_pulse as f64 >= self.refractory_samples
    }

    /// Last tracked power (dB); 0 before the first sample
    pub fn amplitude_db(&self) -> f64 {
        self.last_sample.map_or(0.0, |s| s.amplitude_db)
    }

    /// Last tracked phase (rad); 0 before the first sample
    pub fn phase(&self) -> f64 {
        self.last_sample.map_or(0.0, |s| s.phase)
    }

    pub fn phasor(&self) -> Complex64 {
        self.aswift.phasor()
    }

    pub fn aswift(&self) -> &Aswift {
        &self.aswift
    }

    pub fn phase_threshold(&self) -> f64 {
        self.params.phase_thr
    }

    /// Change the stimulation phase; estimator and refractory state are kept
    pub fn set_phase_threshold(&mut self, phase_thr: f64) {
        self.params.phase_thr = phase_thr;
    }

    pub fn power_threshold(&self) -> PowerThreshold {
        self.params.power_thr
    }

    /// Change the power gate; estimator and refractory state are kept
    pub fn set_power_threshold(&mut self, power_thr: PowerThreshold) {
        self.params.power_thr = power_thr;
    }

    /// Minimum spacing between pulses, in samples
    pub fn refractory_samples(&self) -> f64 {
        self.refractory_samples
    }

    /// Samples since the last pulse
    pub fn since_pulse(&self) -> u64 {
        self.since_pulse
    }

    pub fn params(&self) -> &PhaseLockedParams {
        &self.params
    }
}

impl Stimulator for PhaseLockedController {
    fn advance(&mut self, monitored: f64) -> Charge {
        self.step(monitored)
    }

    fn pulse(&self) -> &PulseSettings {
        &self.pulse
    }

    fn pulse_mut(&mut self) -> &mut PulseSettings {
        &mut self.pulse
    }
}

/// Signed phase offset in [-pi, pi)
fn wrap_phase(x: f64) -> f64 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}
