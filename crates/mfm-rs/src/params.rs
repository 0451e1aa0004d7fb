//! Model constants, the two weight regimes, and the connection table.
//!
//! Connection strengths are in mV s, delays in seconds (converted to whole
//! samples once `dt` is known). Naming follows `v<target><source>`: `vd2e` is
//! the cortex -> D2 projection.

use bgtcs_core::{BgtcsError, Population, Result, Time, STATE_DIM};
use serde::{Deserialize, Serialize};
use std::fmt;

use Population::*;

/// Weight/threshold regime, fixed for the lifetime of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Regime {
    /// Healthy network
    Baseline,
    /// Dopamine-depleted (parkinsonian) network
    Pathological,
}

impl Regime {
    pub fn from_dopamine_depleted(dd: bool) -> Self {
        if dd {
            Self::Pathological
        } else {
            Self::Baseline
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Baseline => f.write_str("baseline"),
            Self::Pathological => f.write_str("pathological (DD)"),
        }
    }
}

/// Sigmoid parameters of one population
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Firing {
    pub q_max: f64, // Maximum firing rate (s^-1)
    pub theta: f64, // Firing threshold (mV)
}

/// How a source population enters the target's input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coupling {
    /// Source voltage passed through the source's sigmoid
    Firing,
    /// Source value used as is (phi_e, or a raw voltage)
    Linear,
}

/// One directed projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub target: Population,
    pub source: Population,
    pub coupling: Coupling,
    /// Strength (mV s)
    pub weight: f64,
    /// Conduction delay (s)
    pub delay: Time,
    /// Conduction delay (samples)
    pub lag: usize,
}

/// Fixed (target, source) -> (weight, lag) mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTable {
    dt: Time,
    connections: Vec<Connection>,
}

impl ConnectionTable {
    /// Connection table of the BGTCS model for a regime and timestep
    pub fn bgtcs(regime: Regime, dt: Time) -> Result<Self> {
        if !(dt > 0.0) {
            return Err(BgtcsError::InvalidParameter(format!("dt must be > 0 (got {})", dt)));
        }
        let dd = regime == Regime::Pathological;
        let pick = |baseline: f64, depleted: f64| if dd { depleted } else { baseline };

        use Coupling::{Firing as F, Linear as L};
        #[rustfmt::skip]
        let projections: [(Population, Population, Coupling, f64, Time); 27] = [
            // cortical field, driven by the excitatory firing rate
            (CorticalWave, Excitatory, F, 1.0,                0.0),
            // cortex
            (Excitatory, CorticalWave, L, pick(1.6, 1.4),     0.0),
            (Excitatory, Inhibitory,   F, pick(-1.9, -1.6),   0.0),
            (Excitatory, Relay,        F, 0.4,                0.035),
            (Inhibitory, Inhibitory,   F, pick(-1.9, -1.6),   0.0),
            (Inhibitory, CorticalWave, L, pick(1.6, 1.4),     0.0),
            (Inhibitory, Relay,        F, 0.4,                0.035),
            // striatum
            (D1, CorticalWave,         L, pick(1.0, 0.5),     0.002),
            (D1, Relay,                F, 0.1,                0.002),
            (D1, D1,                   F, -0.3,               0.0),
            (D2, Excitatory,           L, pick(0.7, 1.4),     0.002),
            (D2, D1,                   F, 0.0,                0.001),
            (D2, Relay,                F, 0.05,               0.002),
            (D2, D2,                   F, -0.3,               0.0),
            // pallidum
            (Gpi, D1,                  F, -0.1,               0.001),
            (Gpi, Gpe,                 F, -0.03,              0.001),
            (Gpi, Stn,                 F, 0.3,                0.001),
            (Gpe, D2,                  F, pick(-0.3, -0.5),   0.001),
            (Gpe, Gpe,                 F, pick(-0.1, -0.07),  0.0),
            (Gpe, Stn,                 F, 0.3,                0.001),
            // subthalamic nucleus
            (Stn, Gpe,                 F, -0.04,              0.001),
            (Stn, CorticalWave,        L, 0.1,                0.001),
            // thalamus
            (Relay, Gpi,               F, -0.03,              0.003),
            (Relay, CorticalWave,      L, 0.8,                0.050),
            (Relay, Reticular,         F, -0.4,               0.002),
            (Reticular, CorticalWave,  L, 0.15,               0.050),
            (Reticular, Relay,         F, 0.03,               0.002),
        ];

        let connections = projections
            .iter()
            .map(|&(target, source, coupling, weight, delay)| Connection {
                target,
                source,
                coupling,
                weight,
                delay,
                lag: (delay / dt).round() as usize,
            })
            .collect();

        Ok(Self { dt, connections })
    }

    pub fn dt(&self) -> Time {
        self.dt
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Projection from `source` onto `target`, if any
    pub fn get(&self, target: Population, source: Population) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.target == target && c.source == source)
    }

    /// All projections onto `target`
    pub fn incoming(&self, target: Population) -> impl Iterator<Item = &Connection> {
        self.connections.iter().filter(move |c| c.target == target)
    }

    /// Longest delay in samples
    pub fn max_lag(&self) -> usize {
        self.connections.iter().map(|c| c.lag).max().unwrap_or(0)
    }
}

/// Immutable physiological parameter bundle, selected once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub regime: Regime,
    /// Dendritic decay rate (s^-1)
    pub alpha: f64,
    /// Dendritic rise rate (s^-1)
    pub beta: f64,
    /// Cortical axonal damping rate (s^-1)
    pub gamma_e: f64,
    /// Constant non-specific drive to the relay nuclei (s^-1)
    pub phi_n: f64,
    /// Sigmoid parameters, indexed by `Population::index`
    pub firing: [Firing; 10],
}

impl ParameterSet {
    pub fn new(regime: Regime) -> Self {
        let dd = regime == Regime::Pathological;
        let fr = |q_max: f64, theta: f64| Firing { q_max, theta };

        Self {
            regime,
            alpha: 160.0,
            beta: 640.0,
            gamma_e: 125.0,
            phi_n: 15.0,
            firing: [
                fr(300.0, 14.0),                         // phie (excitatory field)
                fr(300.0, 14.0),                         // e
                fr(300.0, 14.0),                         // i
                fr(65.0, 19.0),                          // d1
                fr(65.0, 19.0),                          // d2
                fr(250.0, 10.0),                         // p1
                fr(300.0, if dd { 8.0 } else { 9.0 }),   // p2
                fr(500.0, if dd { 9.0 } else { 10.0 }),  // STN
                fr(300.0, 13.0),                         // s
                fr(500.0, 13.0),                         // r
            ],
        }
    }

    pub fn firing(&self, population: Population) -> Firing {
        self.firing[population.index()]
    }

    /// (gain, damping) of the second-order filter for `population`
    pub fn filter(&self, population: Population) -> (f64, f64) {
        match population {
            CorticalWave => (self.gamma_e * self.gamma_e, 2.0 * self.gamma_e),
            Excitatory | Inhibitory => (self.alpha * self.gamma_e, self.alpha + self.beta),
            _ => (self.alpha * self.beta, self.alpha + self.beta),
        }
    }

    /// Constant external input to `population`
    pub fn drive(&self, population: Population) -> f64 {
        match population {
            Relay => self.phi_n,
            _ => 0.0,
        }
    }
}

/// Initial condition on the pathological attractor, in channel order
pub const INITIAL_STATE: [f64; STATE_DIM] = [
    43.74102506, -1.15197439, 6.96276347, -22.25852135, 7.19671392,
    -28.57548512, 17.26916297, 132.89911127, 9.71319243, 67.69191101,
    9.57769785, -21.11198645, 5.33943222, -22.62375016, 0.54172422,
    -22.23467637, 6.76173506, 143.5386694, 7.49756915, 23.59983148,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_in_samples() {
        let table = ConnectionTable::bgtcs(Regime::Baseline, 1e-3).unwrap();
        assert_eq!(table.len(), 27);
        assert_eq!(table.get(Excitatory, Relay).unwrap().lag, 35);
        assert_eq!(table.get(Relay, CorticalWave).unwrap().lag, 50);
        assert_eq!(table.get(Relay, Gpi).unwrap().lag, 3);
        assert_eq!(table.get(Gpe, Gpe).unwrap().lag, 0);
        assert_eq!(table.max_lag(), 50);

        let fine = ConnectionTable::bgtcs(Regime::Baseline, 1e-4).unwrap();
        assert_eq!(fine.max_lag(), 500);
    }

    #[test]
    fn test_regimes_differ_only_where_expected() {
        let healthy = ConnectionTable::bgtcs(Regime::Baseline, 1e-3).unwrap();
        let dd = ConnectionTable::bgtcs(Regime::Pathological, 1e-3).unwrap();

        assert_eq!(healthy.get(Excitatory, CorticalWave).unwrap().weight, 1.6);
        assert_eq!(dd.get(Excitatory, CorticalWave).unwrap().weight, 1.4);
        assert_eq!(dd.get(D2, Excitatory).unwrap().weight, 1.4);
        assert_eq!(dd.get(Gpe, Gpe).unwrap().weight, -0.07);

        let changed = healthy
            .connections()
            .iter()
            .zip(dd.connections())
            .filter(|(a, b)| a.weight != b.weight)
            .count();
        assert_eq!(changed, 8);

        let p_healthy = ParameterSet::new(Regime::Baseline);
        let p_dd = ParameterSet::new(Regime::Pathological);
        assert_eq!(p_healthy.firing(Gpe).theta, 9.0);
        assert_eq!(p_dd.firing(Gpe).theta, 8.0);
        assert_eq!(p_dd.firing(Stn).theta, 9.0);
    }

    #[test]
    fn test_every_population_has_input() {
        let table = ConnectionTable::bgtcs(Regime::Pathological, 1e-3).unwrap();
        for p in Population::ALL {
            assert!(table.incoming(p).count() > 0, "{} has no input", p);
        }
    }

    #[test]
    fn test_filters() {
        let params = ParameterSet::new(Regime::Pathological);
        assert_eq!(params.filter(CorticalWave), (15625.0, 250.0));
        assert_eq!(params.filter(Excitatory), (20000.0, 800.0));
        assert_eq!(params.filter(Stn), (102400.0, 800.0));
        assert_eq!(params.drive(Relay), 15.0);
        assert_eq!(params.drive(Stn), 0.0);
    }

    #[test]
    fn test_rejects_bad_dt() {
        assert!(ConnectionTable::bgtcs(Regime::Baseline, 0.0).is_err());
        assert!(ConnectionTable::bgtcs(Regime::Baseline, -1e-3).is_err());
    }
}
