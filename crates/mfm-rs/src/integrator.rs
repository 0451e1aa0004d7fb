//! Fixed-step Euler-Maruyama integrator for the delay system.

use bgtcs_core::{
    sigmoid, BgtcsError, Charge, DelayHistory, DelaySystem, Population, Result, StateVector,
    Time, STATE_DIM,
};
use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::params::{ConnectionTable, Coupling, ParameterSet};

/// Advances the ten coupled second-order populations by one sample.
///
/// Each population is a damped second-order filter of its summed input:
///
/// ```text
/// dV/dt     = V'
/// dV'/dt    = K * (sum_j w_j * S_j(t - tau_j) + drive - V) - damping * V'
/// ```
///
/// where `S_j` is either the sigmoid of a source voltage or the cortical
/// field `phi_e` taken linearly.
#[derive(Debug, Clone)]
pub struct NeuralMassIntegrator {
    params: ParameterSet,
    table: ConnectionTable,
    dt: Time,
    noise_amp: f64,
    stim_target: Population,
    /// Membrane capacitance (F)
    cm: f64,
}

impl NeuralMassIntegrator {
    pub fn new(
        params: ParameterSet,
        table: ConnectionTable,
        noise_amp: f64,
        stim_target: Population,
        cm: f64,
    ) -> Result<Self> {
        let dt = table.dt();
        if !(dt > 0.0) {
            return Err(BgtcsError::InvalidParameter(format!("dt must be > 0 (got {})", dt)));
        }
        if !(cm > 0.0) {
            return Err(BgtcsError::InvalidParameter(format!("Cm must be > 0 (got {})", cm)));
        }
        if !(noise_amp >= 0.0) || !noise_amp.is_finite() {
            return Err(BgtcsError::InvalidParameter(format!(
                "Noise amplitude must be >= 0 (got {})",
                noise_amp
            )));
        }
        if !stim_target.is_voltage() {
            return Err(BgtcsError::InvalidParameter(format!(
                "Cannot stimulate '{}'",
                stim_target
            )));
        }

        Ok(Self {
            params,
            table,
            dt,
            noise_amp,
            stim_target,
            cm,
        })
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn table(&self) -> &ConnectionTable {
        &self.table
    }

    pub fn dt(&self) -> Time {
        self.dt
    }

    pub fn stim_target(&self) -> Population {
        self.stim_target
    }

    /// Produce sample `i + 1` from the history up to sample `i`.
    ///
    /// The stimulation charge is applied to sample `i` of the target channel
    /// before the derivative is taken, then noise is added to the updated
    /// voltages.
    pub fn advance<R: Rng + ?Sized>(
        &self,
        history: &mut DelayHistory,
        i: usize,
        charge: Charge,
        rng: &mut R,
    ) -> Result<()> {
        if charge != 0.0 {
            history.add_to(i, self.stim_target.value_channel(), charge / self.cm)?;
        }

        let current = history.read(i as isize).to_owned();
        let dsdt = self.derivatives(i, history);
        let mut next = &current + &(dsdt * self.dt);

        if self.noise_amp != 0.0 {
            self.add_noise(&current, &mut next, rng);
        }

        if let Some(channel) = next.iter().position(|v| !v.is_finite()) {
            return Err(BgtcsError::NumericalError(format!(
                "Non-finite value in channel {} at sample {}",
                channel,
                i + 1
            )));
        }

        history.write(i + 1, &next)
    }

    /// State-dependent noise: the variance scales with the firing-rate
    /// slope, using the updated voltage in the first factor and the
    /// previous voltage in the second.
    fn add_noise<R: Rng + ?Sized>(
        &self,
        current: &StateVector,
        next: &mut StateVector,
        rng: &mut R,
    ) {
        let sqrt_dt = self.dt.sqrt();
        for p in Population::VOLTAGES {
            let c = p.value_channel();
            let firing = self.params.firing(p);
            let n: f64 = rng.sample(StandardNormal);
            next[c] += self.noise_amp
                * n
                * sqrt_dt
                * firing.q_max
                * sigmoid(next[c], 1.0, firing.theta)
                * (1.0 - sigmoid(current[c], 1.0, firing.theta));
        }
    }
}

impl DelaySystem for NeuralMassIntegrator {
    fn dimension(&self) -> usize {
        STATE_DIM
    }

    fn derivatives(&self, i: usize, history: &DelayHistory) -> StateVector {
        let mut input = [0.0; 10];
        for p in Population::ALL {
            input[p.index()] = self.params.drive(p);
        }

        for c in self.table.connections() {
            let x = history.lagged(i, c.lag, c.source.value_channel());
            let signal = match c.coupling {
                Coupling::Firing => {
                    let firing = self.params.firing(c.source);
                    sigmoid(x, firing.q_max, firing.theta)
                }
                Coupling::Linear => x,
            };
            input[c.target.index()] += c.weight * signal;
        }

        let now = history.read(i as isize);
        let mut dsdt = Array1::zeros(STATE_DIM);
        for p in Population::ALL {
            let (gain, damping) = self.params.filter(p);
            let value = now[p.value_channel()];
            let rate = now[p.rate_channel()];

            dsdt[p.value_channel()] = rate;
            dsdt[p.rate_channel()] = gain * (input[p.index()] - value) - damping * rate;
        }
        dsdt
    }

    fn max_lag(&self) -> usize {
        self.table.max_lag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{Regime, INITIAL_STATE};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn integrator(noise_amp: f64) -> NeuralMassIntegrator {
        let dt = 1e-3;
        NeuralMassIntegrator::new(
            ParameterSet::new(Regime::Pathological),
            ConnectionTable::bgtcs(Regime::Pathological, dt).unwrap(),
            noise_amp,
            Population::Stn,
            1e-4,
        )
        .unwrap()
    }

    fn history(n: usize) -> DelayHistory {
        DelayHistory::new(n, Array1::from(INITIAL_STATE.to_vec())).unwrap()
    }

    #[test]
    fn test_derivative_of_cortical_field() {
        let integ = integrator(0.0);
        let hist = history(2);
        let d = integ.derivatives(0, &hist);

        let s = Array1::from(INITIAL_STATE.to_vec());
        let expected = 125.0_f64.powi(2) * (sigmoid(s[2], 300.0, 14.0) - s[0]) - 250.0 * s[1];
        assert_relative_eq!(d[1], expected, max_relative = 1e-12);
        // velocity channels integrate into values
        assert_eq!(d[0], s[1]);
        assert_eq!(d[14], s[15]);
    }

    #[test]
    fn test_euler_step_without_noise() {
        let integ = integrator(0.0);
        let mut hist = history(2);
        let d = integ.derivatives(0, &hist);
        let mut rng = StdRng::seed_from_u64(1);
        integ.advance(&mut hist, 0, 0.0, &mut rng).unwrap();

        for c in 0..STATE_DIM {
            assert_relative_eq!(
                hist.read(1)[c],
                INITIAL_STATE[c] + 1e-3 * d[c],
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_charge_is_injected_before_the_step() {
        let integ = integrator(0.0);
        let mut plain = history(2);
        let mut stimulated = history(2);
        let mut rng = StdRng::seed_from_u64(1);

        integ.advance(&mut plain, 0, 0.0, &mut rng).unwrap();
        integ.advance(&mut stimulated, 0, 1.8e-4, &mut rng).unwrap();

        let stn = Population::Stn.value_channel();
        // the jump of 1.8 mV is carried into sample 1
        assert_relative_eq!(
            stimulated.read(0)[stn],
            INITIAL_STATE[stn] + 1.8,
            max_relative = 1e-12
        );
        let jump = stimulated.read(1)[stn] - plain.read(1)[stn];
        assert_relative_eq!(jump, 1.8, max_relative = 1e-9);
        // and the STN derivative saw it
        let rate_jump = stimulated.read(1)[stn + 1] - plain.read(1)[stn + 1];
        assert_relative_eq!(rate_jump, -1e-3 * 102400.0 * 1.8, max_relative = 1e-9);
    }

    #[test]
    fn test_noise_only_touches_voltages() {
        let quiet = integrator(0.0);
        let noisy = integrator(0.03);
        let mut a = history(2);
        let mut b = history(2);
        let mut rng = StdRng::seed_from_u64(7);

        quiet.advance(&mut a, 0, 0.0, &mut rng).unwrap();
        noisy.advance(&mut b, 0, 0.0, &mut rng).unwrap();

        for p in Population::ALL {
            assert_eq!(a.read(1)[p.rate_channel()], b.read(1)[p.rate_channel()]);
        }
        assert_eq!(
            a.read(1)[Population::CorticalWave.value_channel()],
            b.read(1)[Population::CorticalWave.value_channel()]
        );
        assert!(Population::VOLTAGES
            .iter()
            .any(|p| a.read(1)[p.value_channel()] != b.read(1)[p.value_channel()]));
    }

    #[test]
    fn test_rejects_wave_as_target() {
        let dt = 1e-3;
        let result = NeuralMassIntegrator::new(
            ParameterSet::new(Regime::Baseline),
            ConnectionTable::bgtcs(Regime::Baseline, dt).unwrap(),
            0.0,
            Population::CorticalWave,
            1e-4,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_max_lag() {
        assert_eq!(integrator(0.0).max_lag(), 50);
    }
}
