//! Independent runs in parallel.
//!
//! Each run owns all of its state; rayon only distributes whole runs across
//! threads.

use bgtcs_core::{BgtcsError, Result};
use rayon::prelude::*;
use tracing::info;

use crate::config::SimulationConfig;
use crate::simulation::Simulation;

/// Build and run every configuration, in parallel
pub fn run_batch(configs: Vec<SimulationConfig>) -> Vec<Result<Simulation>> {
    run_batch_with(configs, |_, _| {})
}

/// Like [`run_batch`], calling `on_finish(index, result)` as each run ends
pub fn run_batch_with<F>(configs: Vec<SimulationConfig>, on_finish: F) -> Vec<Result<Simulation>>
where
    F: Fn(usize, &Result<Simulation>) + Sync,
{
    info!(runs = configs.len(), threads = rayon::current_num_threads(), "Starting batch");
    configs
        .into_par_iter()
        .enumerate()
        .map(|(index, config)| {
            let result = Simulation::new(config).and_then(|mut sim| sim.run().map(|_| sim));
            on_finish(index, &result);
            result
        })
        .collect()
}

/// One configuration per value of `key`, all other options from `base`.
///
/// Each copy gets RunID -1 so catalogue saves never collide.
pub fn sweep_configs<S: AsRef<str>>(
    base: &SimulationConfig,
    key: &str,
    values: &[S],
) -> Result<Vec<SimulationConfig>> {
    if values.is_empty() {
        return Err(BgtcsError::InvalidParameter(format!(
            "No values given for sweep over '{}'",
            key
        )));
    }
    values
        .iter()
        .map(|value| {
            let mut config = base.clone();
            config.run_id = -1;
            config.set(key, value.as_ref())?;
            Ok(config)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn base() -> SimulationConfig {
        SimulationConfig {
            verbose: false,
            tstop: 0.1,
            seed: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_sweep_configs() {
        let configs = sweep_configs(&base(), "cDBS_f", &["100", "130", "185"]).unwrap();
        let freqs: Vec<f64> = configs.iter().map(|c| c.cdbs_f).collect();
        assert_eq!(freqs, vec![100.0, 130.0, 185.0]);
        assert!(configs.iter().all(|c| c.run_id == -1 && c.tstop == 0.1));

        assert!(sweep_configs(&base(), "bogus", &["1"]).is_err());
        assert!(sweep_configs::<&str>(&base(), "tstop", &[]).is_err());
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let configs = sweep_configs(&base(), "noise_amp", &["0", "0.03", "0.1"]).unwrap();
        let finished = AtomicUsize::new(0);
        let results = run_batch_with(configs.clone(), |_, r| {
            assert!(r.is_ok());
            finished.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(finished.load(Ordering::SeqCst), 3);

        for (config, result) in configs.into_iter().zip(results) {
            let parallel = result.unwrap();
            let mut sequential = Simulation::new(config).unwrap();
            sequential.run().unwrap();
            assert_eq!(parallel.states(), sequential.states());
        }
    }

    #[test]
    fn test_failed_run_does_not_stop_others() {
        let mut bad = base();
        bad.dt = 0.0;
        let results = run_batch(vec![base(), bad]);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
