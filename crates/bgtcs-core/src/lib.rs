//! # BGTCS Core
//!
//! Shared types and utilities for the cortico-basal-ganglia-thalamic
//! mean-field model (BGTCS MFM).
//!
//! ## State Layout
//!
//! The model state is a fixed 20-scalar vector: ten subsystems, each stored
//! as (value, first derivative).
//!
//! | Subsystem | Name | Value column | Rate column |
//! |-----------|------|--------------|-------------|
//! | Cortical excitatory wave | `phie` | 0 | 1 |
//! | Cortical excitatory | `e` | 2 | 3 |
//! | Cortical inhibitory | `i` | 4 | 5 |
//! | Striatum D1 | `d1` | 6 | 7 |
//! | Striatum D2 | `d2` | 8 | 9 |
//! | Pallidum GPi | `p1` | 10 | 11 |
//! | Pallidum GPe | `p2` | 12 | 13 |
//! | Subthalamic nucleus | `STN` | 14 | 15 |
//! | Thalamic relay | `s` | 16 | 17 |
//! | Thalamic reticular | `r` | 18 | 19 |
//!
//! ## Delays
//!
//! Conduction delays are whole sample counts. A [`DelayHistory`] keeps the
//! full trajectory of a run; reads before time 0 return the declared
//! initial condition.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Common errors
#[derive(Debug, Error)]
pub enum BgtcsError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unrecognized option: {0}")]
    UnrecognizedOption(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Numerical error: {0}")]
    NumericalError(String),
}

pub type Result<T> = std::result::Result<T, BgtcsError>;

/// Time point (s)
pub type Time = f64;

/// Membrane potential (mV)
pub type Voltage = f64;

/// Stimulus charge (mC)
pub type Charge = f64;

/// Frequency (Hz)
pub type Frequency = f64;

/// State vector for the delay system
pub type StateVector = Array1<f64>;

/// Number of scalars in one state sample
pub const STATE_DIM: usize = 20;

/// Threshold spread of the firing-rate sigmoid (mV)
pub const SIGMOID_SPREAD: f64 = 3.8;

/// Saturating firing-rate function shared by every population.
///
/// `Q / (1 + exp(-(V - theta) / 3.8))`
#[inline]
pub fn sigmoid(v: Voltage, q_max: f64, theta: Voltage) -> f64 {
    q_max / (1.0 + (-(v - theta) / SIGMOID_SPREAD).exp())
}

/// Lumped neural populations of the circuit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Population {
    /// Cortical excitatory axonal field (phi_e)
    CorticalWave,
    /// Cortical excitatory
    Excitatory,
    /// Cortical inhibitory
    Inhibitory,
    /// Striatal D1 projection neurons
    D1,
    /// Striatal D2 projection neurons
    D2,
    /// Globus pallidus interna / SNr
    Gpi,
    /// Globus pallidus externa
    Gpe,
    /// Subthalamic nucleus
    Stn,
    /// Thalamic relay nuclei
    Relay,
    /// Thalamic reticular nucleus
    Reticular,
}

impl Population {
    /// All subsystems in storage order
    pub const ALL: [Population; 10] = [
        Population::CorticalWave,
        Population::Excitatory,
        Population::Inhibitory,
        Population::D1,
        Population::D2,
        Population::Gpi,
        Population::Gpe,
        Population::Stn,
        Population::Relay,
        Population::Reticular,
    ];

    /// Populations carrying a membrane voltage (everything but phi_e)
    pub const VOLTAGES: [Population; 9] = [
        Population::Excitatory,
        Population::Inhibitory,
        Population::D1,
        Population::D2,
        Population::Gpi,
        Population::Gpe,
        Population::Stn,
        Population::Relay,
        Population::Reticular,
    ];

    /// Short name used in configuration and run files
    pub fn name(&self) -> &'static str {
        match self {
            Self::CorticalWave => "phie",
            Self::Excitatory => "e",
            Self::Inhibitory => "i",
            Self::D1 => "d1",
            Self::D2 => "d2",
            Self::Gpi => "p1",
            Self::Gpe => "p2",
            Self::Stn => "STN",
            Self::Relay => "s",
            Self::Reticular => "r",
        }
    }

    /// Look up a population by its short name (case-insensitive)
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| BgtcsError::InvalidParameter(format!("Unknown population '{}'", name)))
    }

    /// Position in storage order
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Column holding the value (voltage, or phi_e for the wave)
    pub fn value_channel(&self) -> usize {
        2 * self.index()
    }

    /// Column holding the first derivative
    pub fn rate_channel(&self) -> usize {
        2 * self.index() + 1
    }

    pub fn is_voltage(&self) -> bool {
        !matches!(self, Self::CorticalWave)
    }
}

impl fmt::Display for Population {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Channel name -> state column map exposed to downstream consumers.
///
/// Value channels use the population name, derivative channels append `_dot`.
pub fn channel_map() -> BTreeMap<String, usize> {
    let mut map = BTreeMap::new();
    for p in Population::ALL {
        map.insert(p.name().to_string(), p.value_channel());
        map.insert(format!("{}_dot", p.name()), p.rate_channel());
    }
    map
}

/// Time series data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Time points
    pub time: Vec<Time>,
    /// Values at each time point
    pub values: Vec<f64>,
    /// Variable name
    pub name: String,
    /// Units
    pub units: Option<String>,
}

impl TimeSeries {
    pub fn new(name: &str) -> Self {
        Self {
            time: Vec::new(),
            values: Vec::new(),
            name: name.to_string(),
            units: None,
        }
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = Some(units.to_string());
        self
    }

    pub fn push(&mut self, t: Time, v: f64) {
        self.time.push(t);
        self.values.push(v);
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Mean of the finite values
    pub fn mean(&self) -> Option<f64> {
        let finite: Vec<f64> = self.values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            None
        } else {
            Some(finite.iter().sum::<f64>() / finite.len() as f64)
        }
    }
}

/// Delay-differential system trait (for fixed-step integrators)
pub trait DelaySystem {
    /// System dimension
    fn dimension(&self) -> usize;

    /// Compute derivatives at sample `i`, reading delayed samples from `history`
    fn derivatives(&self, i: usize, history: &DelayHistory) -> StateVector;

    /// Longest delay the system reads, in samples
    fn max_lag(&self) -> usize;
}

/// Fixed-size, time-indexed buffer of state vectors.
///
/// Sample 0 is the initial condition and is written at construction.
/// Samples are appended strictly in order; nothing is ever dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayHistory {
    samples: Array2<f64>,
    initial: StateVector,
    len: usize,
}

impl DelayHistory {
    /// Create a history with room for `capacity` samples, seeded with `initial` at index 0
    pub fn new(capacity: usize, initial: StateVector) -> Result<Self> {
        if capacity == 0 {
            return Err(BgtcsError::InvalidParameter(
                "History capacity must be at least one sample".into(),
            ));
        }
        if initial.is_empty() {
            return Err(BgtcsError::InvalidParameter("Initial condition is empty".into()));
        }

        let mut samples = Array2::zeros((capacity, initial.len()));
        samples.row_mut(0).assign(&initial);

        Ok(Self {
            samples,
            initial,
            len: 1,
        })
    }

    /// Number of samples written so far
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total number of samples the history can hold
    pub fn capacity(&self) -> usize {
        self.samples.nrows()
    }

    /// Width of one sample
    pub fn width(&self) -> usize {
        self.initial.len()
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Declared initial condition
    pub fn initial(&self) -> ArrayView1<'_, f64> {
        self.initial.view()
    }

    /// Append sample `t`; `t` must equal the current length.
    pub fn write(&mut self, t: usize, sample: &StateVector) -> Result<()> {
        if t != self.len {
            return Err(BgtcsError::InvalidParameter(format!(
                "Out-of-order write: expected sample {}, got {}",
                self.len, t
            )));
        }
        if t >= self.capacity() {
            return Err(BgtcsError::InvalidParameter(format!(
                "History is full ({} samples)",
                self.capacity()
            )));
        }
        if sample.len() != self.width() {
            return Err(BgtcsError::InvalidParameter(format!(
                "Expected {} values, got {}",
                self.width(),
                sample.len()
            )));
        }
        self.samples.row_mut(t).assign(sample);
        self.len += 1;
        Ok(())
    }

    /// Read sample `t`. Negative `t` yields the initial condition.
    ///
    /// # Panics
    ///
    /// Panics if `t` has not been written yet.
    pub fn read(&self, t: isize) -> ArrayView1<'_, f64> {
        if t < 0 {
            return self.initial.view();
        }
        let t = t as usize;
        assert!(t < self.len, "sample {} read before it was written", t);
        self.samples.row(t)
    }

    /// Value of `channel` at `lag` samples before sample `i`
    #[inline]
    pub fn lagged(&self, i: usize, lag: usize, channel: usize) -> f64 {
        if lag > i {
            self.initial[channel]
        } else {
            self.read((i - lag) as isize)[channel]
        }
    }

    /// Add `delta` to one channel of an already written sample
    pub fn add_to(&mut self, t: usize, channel: usize, delta: f64) -> Result<()> {
        if t >= self.len || channel >= self.width() {
            return Err(BgtcsError::InvalidParameter(format!(
                "No written sample ({}, {})",
                t, channel
            )));
        }
        self.samples[[t, channel]] += delta;
        Ok(())
    }

    /// Written part of the trajectory, one row per sample
    pub fn as_array(&self) -> ArrayView2<'_, f64> {
        self.samples.slice(s![..self.len, ..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::arr1;

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(sigmoid(14.0, 300.0, 14.0), 150.0);
        assert!(sigmoid(100.0, 300.0, 14.0) < 300.0);
        assert!(sigmoid(100.0, 300.0, 14.0) > 299.0);
        assert!(sigmoid(-100.0, 300.0, 14.0) < 1e-6);
    }

    #[test]
    fn test_population_names() {
        assert_eq!(Population::from_name("STN").unwrap(), Population::Stn);
        assert_eq!(Population::from_name("stn").unwrap(), Population::Stn);
        assert_eq!(Population::from_name("p1").unwrap(), Population::Gpi);
        assert!(Population::from_name("gpx").is_err());

        assert_eq!(Population::Stn.value_channel(), 14);
        assert_eq!(Population::Reticular.rate_channel(), 19);
        assert!(!Population::CorticalWave.is_voltage());
    }

    #[test]
    fn test_channel_map() {
        let map = channel_map();
        assert_eq!(map.len(), STATE_DIM);
        assert_eq!(map["p1"], 10);
        assert_eq!(map["STN_dot"], 15);
    }

    #[test]
    fn test_history_reads_initial_before_zero() {
        let initial = arr1(&[1.0, 2.0, 3.0]);
        let mut history = DelayHistory::new(4, initial.clone()).unwrap();
        history.write(1, &arr1(&[4.0, 5.0, 6.0])).unwrap();

        assert_eq!(history.read(-1), initial.view());
        assert_eq!(history.read(-50), initial.view());
        assert_eq!(history.read(1)[2], 6.0);
        assert_eq!(history.lagged(1, 5, 0), 1.0);
        assert_eq!(history.lagged(1, 0, 0), 4.0);
    }

    #[test]
    fn test_history_rejects_out_of_order_writes() {
        let mut history = DelayHistory::new(3, arr1(&[0.0, 0.0])).unwrap();
        assert!(history.write(2, &arr1(&[1.0, 1.0])).is_err());
        history.write(1, &arr1(&[1.0, 1.0])).unwrap();
        history.write(2, &arr1(&[2.0, 2.0])).unwrap();
        assert!(history.is_full());
        assert!(history.write(3, &arr1(&[3.0, 3.0])).is_err());
        assert_eq!(history.as_array().nrows(), 3);
    }

    #[test]
    fn test_history_injection() {
        let mut history = DelayHistory::new(2, arr1(&[0.0, 0.0])).unwrap();
        history.add_to(0, 1, 1.8).unwrap();
        assert_relative_eq!(history.read(0)[1], 1.8);
        // the declared initial condition is untouched
        assert_eq!(history.read(-1)[1], 0.0);
        assert!(history.add_to(1, 0, 1.0).is_err());
    }

    #[test]
    fn test_time_series() {
        let mut ts = TimeSeries::new("p1").with_units("mV");
        ts.push(0.0, 1.0);
        ts.push(0.001, f64::NEG_INFINITY);
        ts.push(0.002, 3.0);
        assert_eq!(ts.len(), 3);
        assert_relative_eq!(ts.mean().unwrap(), 2.0);
    }
}
