//! Saved runs and the `data/NNN.mfm` catalogue.

use bgtcs_core::{BgtcsError, Result, Time, TimeSeries};
use bgtcs_swift::Aswift;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::SimulationConfig;
use crate::params::{ConnectionTable, ParameterSet};
use crate::simulation::{channel_trace, Simulation, Telemetry};

/// Extension of catalogued run files
pub const RUN_EXTENSION: &str = "mfm";

/// Everything needed to report on a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub config: SimulationConfig,
    pub seed: u64,
    pub dt: Time,
    /// Channel name -> state column
    pub channels: BTreeMap<String, usize>,
    pub connections: ConnectionTable,
    pub parameters: ParameterSet,
    /// Written samples, one row per sample
    pub states: Array2<f64>,
    /// Estimator accumulators at the end of the run
    pub estimator: Option<Aswift>,
    pub telemetry: Telemetry,
    /// Samples produced after the initial condition
    pub completed_steps: usize,
}

impl RunRecord {
    pub fn from_simulation(sim: &Simulation) -> Self {
        let integrator = sim.integrator();
        Self {
            config: sim.config().clone(),
            seed: sim.seed(),
            dt: sim.dt(),
            channels: sim.channel_map(),
            connections: integrator.table().clone(),
            parameters: integrator.params().clone(),
            states: sim.states().to_owned(),
            estimator: sim.phase_locked().map(|c| c.aswift().clone()),
            telemetry: sim.telemetry().clone(),
            completed_steps: sim.current_step(),
        }
    }

    /// Write as JSON to `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self).map_err(std::io::Error::from)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BgtcsError::FileNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| {
            BgtcsError::DeserializationError(format!("{}: {}", path.display(), e))
        })
    }

    /// Last written sample
    pub fn final_state(&self) -> ArrayView1<'_, f64> {
        self.states.row(self.states.nrows() - 1)
    }

    pub fn trace(&self, channel: &str) -> Result<TimeSeries> {
        channel_trace(self.states.view(), self.dt, channel)
    }
}

/// Where a run is written
#[derive(Debug, Clone)]
pub enum SaveTarget {
    /// Exactly this file
    Path(PathBuf),
    /// `<dir>/NNN.mfm`, using the configured RunID or the lowest free one
    Catalogue(PathBuf),
}

impl Default for SaveTarget {
    fn default() -> Self {
        Self::Catalogue(PathBuf::from("data"))
    }
}

/// Catalogue file for `run_id`
pub fn run_path(dir: impl AsRef<Path>, run_id: i64) -> PathBuf {
    dir.as_ref().join(format!("{:03}.{}", run_id, RUN_EXTENSION))
}

/// Lowest non-negative id not used by a file in `dir`.
///
/// A file counts as used when its first three characters parse as an integer.
pub fn next_run_id(dir: impl AsRef<Path>) -> Result<i64> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut used = Vec::new();
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if let Some(id) = name.get(..3).and_then(|prefix| prefix.parse::<i64>().ok()) {
            used.push(id);
        }
    }
    used.sort_unstable();

    let mut lowest = 0;
    for id in used {
        if id == lowest {
            lowest += 1;
        } else if id > lowest {
            break;
        }
    }
    Ok(lowest)
}

/// Interpret a command-line run reference: a RunID or a path
pub fn resolve_run(dir: impl AsRef<Path>, reference: &str) -> PathBuf {
    match reference.parse::<i64>() {
        Ok(id) if id >= 0 => run_path(dir, id),
        _ => PathBuf::from(reference),
    }
}

impl Simulation {
    /// Save the run and return the written path.
    ///
    /// Catalogue saves assign the RunID first when it is -1.
    pub fn save(&mut self, target: &SaveTarget) -> Result<PathBuf> {
        let path = match target {
            SaveTarget::Path(path) => path.clone(),
            SaveTarget::Catalogue(dir) => {
                fs::create_dir_all(dir)?;
                if self.config().run_id < 0 {
                    self.config_mut().run_id = next_run_id(dir)?;
                }
                info!(run_id = self.config().run_id, "Saving data");
                run_path(dir, self.config().run_id)
            }
        };

        RunRecord::from_simulation(self).save(&path)?;
        info!(path = %path.display(), "Run saved");
        Ok(path)
    }
}
