//! Typed run configuration.
//!
//! Every option has a declared type and a default. Values given as text
//! (from the command line) are coerced to the declared type; unknown keys
//! are reported and skipped.

use bgtcs_core::{BgtcsError, Frequency, Population, Result, Time};
use bgtcs_dbs::{PeriodicParams, PhaseLockedParams, PowerThreshold};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::params::Regime;
use crate::serde_ext;
use crate::simulation::StimulationMode;

/// A configuration value, tagged with its declared type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Recognized option names, in display order
pub const KEYS: [&str; 26] = [
    "verbose",
    "dt",
    "stim_start",
    "tstop",
    "RunID",
    "DD",
    "stim_target",
    "Cm",
    "cDBS",
    "cDBS_f",
    "cDBS_amp",
    "cDBS_width",
    "pDBS",
    "pDBS_phase",
    "pDBS_amp",
    "pDBS_width",
    "pDBS_ref_period",
    "pDBS_power_thr",
    "state_target",
    "swift_f",
    "swift_tau_s",
    "swift_c",
    "swift_s2f",
    "noise_amp",
    "seed",
    "track_phase",
];

/// Complete configuration of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Show progress and the run summary
    pub verbose: bool,
    /// Integration timestep (s)
    pub dt: Time,
    /// Stimulation start (s)
    pub stim_start: Time,
    /// Simulated duration (s)
    pub tstop: Time,
    /// Catalogue id; -1 picks the lowest free id on save
    #[serde(rename = "RunID")]
    pub run_id: i64,
    /// Dopamine-depleted (pathological) regime
    #[serde(rename = "DD")]
    pub dd: bool,
    /// Population receiving the stimulation charge
    pub stim_target: String,
    /// Membrane capacitance (F)
    #[serde(rename = "Cm")]
    pub cm: f64,

    #[serde(rename = "cDBS")]
    pub cdbs: bool,
    #[serde(rename = "cDBS_f")]
    pub cdbs_f: Frequency,
    #[serde(rename = "cDBS_amp")]
    pub cdbs_amp: f64,
    #[serde(rename = "cDBS_width")]
    pub cdbs_width: f64,

    #[serde(rename = "pDBS")]
    pub pdbs: bool,
    #[serde(rename = "pDBS_phase")]
    pub pdbs_phase: f64,
    #[serde(rename = "pDBS_amp")]
    pub pdbs_amp: f64,
    #[serde(rename = "pDBS_width")]
    pub pdbs_width: f64,
    #[serde(rename = "pDBS_ref_period")]
    pub pdbs_ref_period: f64,
    #[serde(rename = "pDBS_power_thr", with = "serde_ext::power_threshold")]
    pub pdbs_power_thr: PowerThreshold,

    /// Population tracked by the spectral estimator
    pub state_target: String,
    /// Tracked frequency (Hz)
    pub swift_f: Frequency,
    /// Slow time constant (s); `None` derives it from `swift_c`
    pub swift_tau_s: Option<Time>,
    /// Cycles of `swift_f` per slow time constant
    pub swift_c: f64,
    /// Ratio of slow to fast time constant
    pub swift_s2f: f64,

    /// Amplitude of the state-dependent noise
    pub noise_amp: f64,
    /// RNG seed; negative draws one from entropy
    pub seed: i64,
    /// Advance the estimator every step even without phase-locked stimulation
    pub track_phase: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            verbose: true,
            dt: 1e-3,
            stim_start: 0.0,
            tstop: 50.0,
            run_id: -1,
            dd: true,
            stim_target: "STN".into(),
            cm: 1e-4,
            cdbs: false,
            cdbs_f: 130.0,
            cdbs_amp: 3.0,
            cdbs_width: 60.0,
            pdbs: false,
            pdbs_phase: 2.24,
            pdbs_amp: 2.38,
            pdbs_width: 60.0,
            pdbs_ref_period: 0.3,
            pdbs_power_thr: PowerThreshold::Db(-28.57),
            state_target: "p1".into(),
            swift_f: 29.0,
            swift_tau_s: Some(0.2397),
            swift_c: 10.0,
            swift_s2f: 5.0,
            noise_amp: 0.03,
            seed: -1,
            track_phase: true,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "bool")),
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    let value = value.trim();
    if let Ok(v) = value.parse::<i64>() {
        return Ok(v);
    }
    // accept integral floats such as "3.0"
    match value.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(v as i64),
        _ => Err(invalid(key, value, "int")),
    }
}

fn parse_float(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid(key, value, "float"))
}

fn invalid(key: &str, value: &str, ty: &str) -> BgtcsError {
    BgtcsError::InvalidParameter(format!("{}: cannot read '{}' as {}", key, value, ty))
}

/// Split `key=value`
pub fn parse_assignment(s: &str) -> Result<(String, String)> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(BgtcsError::InvalidParameter(format!(
            "Expected key=value, got '{}'",
            s
        ))),
    }
}

impl SimulationConfig {
    /// Default value of every recognized option
    pub fn options() -> BTreeMap<String, ConfigValue> {
        Self::default().values()
    }

    /// Current value of every recognized option
    pub fn values(&self) -> BTreeMap<String, ConfigValue> {
        KEYS.iter()
            .filter_map(|&key| self.get(key).map(|v| (key.to_string(), v)))
            .collect()
    }

    /// Current value of `key`
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        use ConfigValue::*;
        let value = match key {
            "verbose" => Bool(self.verbose),
            "dt" => Float(self.dt),
            "stim_start" => Float(self.stim_start),
            "tstop" => Float(self.tstop),
            "RunID" => Int(self.run_id),
            "DD" => Bool(self.dd),
            "stim_target" => Text(self.stim_target.clone()),
            "Cm" => Float(self.cm),
            "cDBS" => Bool(self.cdbs),
            "cDBS_f" => Float(self.cdbs_f),
            "cDBS_amp" => Float(self.cdbs_amp),
            "cDBS_width" => Float(self.cdbs_width),
            "pDBS" => Bool(self.pdbs),
            "pDBS_phase" => Float(self.pdbs_phase),
            "pDBS_amp" => Float(self.pdbs_amp),
            "pDBS_width" => Float(self.pdbs_width),
            "pDBS_ref_period" => Float(self.pdbs_ref_period),
            "pDBS_power_thr" => match self.pdbs_power_thr {
                PowerThreshold::Disabled => Text("off".into()),
                PowerThreshold::Db(db) => Float(db),
            },
            "state_target" => Text(self.state_target.clone()),
            "swift_f" => Float(self.swift_f),
            "swift_tau_s" => match self.swift_tau_s {
                Some(tau) => Float(tau),
                None => Text("none".into()),
            },
            "swift_c" => Float(self.swift_c),
            "swift_s2f" => Float(self.swift_s2f),
            "noise_amp" => Float(self.noise_amp),
            "seed" => Int(self.seed),
            "track_phase" => Bool(self.track_phase),
            _ => return None,
        };
        Some(value)
    }

    /// Set one option from text, coercing to the option's declared type
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "verbose" => self.verbose = parse_bool(key, value)?,
            "dt" => self.dt = parse_float(key, value)?,
            "stim_start" => self.stim_start = parse_float(key, value)?,
            "tstop" => self.tstop = parse_float(key, value)?,
            "RunID" => self.run_id = parse_int(key, value)?,
            "DD" => self.dd = parse_bool(key, value)?,
            "stim_target" => self.stim_target = value.trim().to_string(),
            "Cm" => self.cm = parse_float(key, value)?,
            "cDBS" => self.cdbs = parse_bool(key, value)?,
            "cDBS_f" => self.cdbs_f = parse_float(key, value)?,
            "cDBS_amp" => self.cdbs_amp = parse_float(key, value)?,
            "cDBS_width" => self.cdbs_width = parse_float(key, value)?,
            "pDBS" => self.pdbs = parse_bool(key, value)?,
            "pDBS_phase" => self.pdbs_phase = parse_float(key, value)?,
            "pDBS_amp" => self.pdbs_amp = parse_float(key, value)?,
            "pDBS_width" => self.pdbs_width = parse_float(key, value)?,
            "pDBS_ref_period" => self.pdbs_ref_period = parse_float(key, value)?,
            "pDBS_power_thr" => self.pdbs_power_thr = value.parse()?,
            "state_target" => self.state_target = value.trim().to_string(),
            "swift_f" => self.swift_f = parse_float(key, value)?,
            "swift_tau_s" => {
                self.swift_tau_s = match value.trim().to_ascii_lowercase().as_str() {
                    "none" | "auto" | "" => None,
                    _ => Some(parse_float(key, value)?),
                }
            }
            "swift_c" => self.swift_c = parse_float(key, value)?,
            "swift_s2f" => self.swift_s2f = parse_float(key, value)?,
            "noise_amp" => self.noise_amp = parse_float(key, value)?,
            "seed" => self.seed = parse_int(key, value)?,
            "track_phase" => self.track_phase = parse_bool(key, value)?,
            _ => return Err(BgtcsError::UnrecognizedOption(key.to_string())),
        }
        Ok(())
    }

    /// Apply overrides, skipping unknown keys with a warning.
    ///
    /// Returns the keys that were ignored. A value that cannot be coerced
    /// is an error.
    pub fn apply_overrides<I, K, V>(&mut self, overrides: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut ignored = Vec::new();
        for (key, value) in overrides {
            match self.set(key.as_ref(), value.as_ref()) {
                Ok(()) => {}
                Err(BgtcsError::UnrecognizedOption(key)) => {
                    warn!(key = %key, "Invalid keyword argument, ignored");
                    ignored.push(key);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(ignored)
    }

    /// Apply overrides, failing on the first unknown key
    pub fn apply_strict<I, K, V>(&mut self, overrides: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in overrides {
            self.set(key.as_ref(), value.as_ref())?;
        }
        Ok(())
    }

    /// Load a configuration from a JSON file; missing keys take their defaults.
    ///
    /// Unknown keys are skipped with a warning and returned, as in
    /// [`apply_overrides`](Self::apply_overrides).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<(Self, Vec<String>)> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BgtcsError::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let invalid = |e: serde_json::Error| {
            BgtcsError::DeserializationError(format!("{}: {}", path.display(), e))
        };

        let mut map: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&text).map_err(invalid)?;
        let ignored: Vec<String> = map
            .keys()
            .filter(|key| !KEYS.contains(&key.as_str()))
            .cloned()
            .collect();
        for key in &ignored {
            warn!(key = %key, file = %path.display(), "Invalid keyword argument, ignored");
            map.remove(key);
        }

        let config = serde_json::from_value(serde_json::Value::Object(map)).map_err(invalid)?;
        Ok((config, ignored))
    }

    /// Number of samples, `ceil(tstop / dt)`
    pub fn n_samples(&self) -> usize {
        let ratio = self.tstop / self.dt;
        let nearest = ratio.round();
        // 1.0 / 1e-3 must give 1000, not 1001
        if (ratio - nearest).abs() <= 1e-9 * nearest.max(1.0) {
            nearest as usize
        } else {
            ratio.ceil() as usize
        }
    }

    /// Sampling frequency (Hz)
    pub fn fs(&self) -> Frequency {
        1.0 / self.dt
    }

    /// Slow estimator time constant (s)
    pub fn tau_s(&self) -> Time {
        self.swift_tau_s.unwrap_or(self.swift_c / self.swift_f)
    }

    /// Fast estimator time constant (s)
    pub fn tau_f(&self) -> Time {
        self.tau_s() / self.swift_s2f
    }

    pub fn regime(&self) -> Regime {
        Regime::from_dopamine_depleted(self.dd)
    }

    pub fn mode(&self) -> StimulationMode {
        StimulationMode::from_flags(self.cdbs, self.pdbs)
    }

    pub fn stim_population(&self) -> Result<Population> {
        let p = Population::from_name(&self.stim_target)?;
        if !p.is_voltage() {
            return Err(BgtcsError::InvalidParameter(format!(
                "stim_target must be a voltage population (got '{}')",
                self.stim_target
            )));
        }
        Ok(p)
    }

    pub fn state_population(&self) -> Result<Population> {
        Population::from_name(&self.state_target)
    }

    /// Resolve a negative seed by drawing one; the drawn seed is stored
    pub fn resolve_seed(&mut self) -> u64 {
        if self.seed < 0 {
            self.seed = rand::thread_rng().gen_range(0..i64::MAX);
        }
        self.seed as u64
    }

    pub fn periodic_params(&self) -> PeriodicParams {
        PeriodicParams {
            f: self.cdbs_f,
            dt: self.dt,
            amplitude: self.cdbs_amp,
            width: self.cdbs_width,
            tstart: self.stim_start,
        }
    }

    pub fn phase_locked_params(&self) -> PhaseLockedParams {
        PhaseLockedParams {
            f: self.swift_f,
            tau_s: self.tau_s(),
            tau_f: self.tau_f(),
            phase_thr: self.pdbs_phase,
            power_thr: self.pdbs_power_thr,
            ref_period: self.pdbs_ref_period,
            dt: self.dt,
            amplitude: self.pdbs_amp,
            width: self.pdbs_width,
        }
    }

    /// Check the configuration before a run is built
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("dt", self.dt),
            ("tstop", self.tstop),
            ("Cm", self.cm),
            ("swift_f", self.swift_f),
            ("swift_s2f", self.swift_s2f),
            ("tau_s", self.tau_s()),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(BgtcsError::InvalidParameter(format!(
                    "{} must be > 0 (got {})",
                    name, value
                )));
            }
        }
        if self.tau_f() >= self.tau_s() {
            return Err(BgtcsError::InvalidParameter(format!(
                "swift_s2f must be > 1 so that tau_f < tau_s (got {})",
                self.swift_s2f
            )));
        }
        if self.cdbs && !(self.cdbs_f > 0.0) {
            return Err(BgtcsError::InvalidParameter(format!(
                "cDBS_f must be > 0 (got {})",
                self.cdbs_f
            )));
        }
        if !(self.stim_start >= 0.0) {
            return Err(BgtcsError::InvalidParameter(format!(
                "stim_start must be >= 0 (got {})",
                self.stim_start
            )));
        }
        if !(self.noise_amp >= 0.0) {
            return Err(BgtcsError::InvalidParameter(format!(
                "noise_amp must be >= 0 (got {})",
                self.noise_amp
            )));
        }
        if !(self.pdbs_ref_period >= 0.0) {
            return Err(BgtcsError::InvalidParameter(format!(
                "pDBS_ref_period must be >= 0 (got {})",
                self.pdbs_ref_period
            )));
        }
        self.stim_population()?;
        self.state_population()?;
        Ok(())
    }
}

impl fmt::Display for SimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run Info")?;
        writeln!(f, "--------")?;
        writeln!(f, "length   : {} s", self.tstop)?;
        writeln!(f, "DD       : {}", self.dd)?;
        writeln!(f, "cDBS     : {}", self.cdbs)?;
        writeln!(f, "pDBS     : {}", self.pdbs)?;

        writeln!(f)?;
        writeln!(f, "SWIFT Parameters")?;
        writeln!(f, "----------------")?;
        writeln!(f, "f     : {:.1} Hz", self.swift_f)?;
        writeln!(f, "tau_s : {:.4} s", self.tau_s())?;
        writeln!(f, "tau_f : {:.4} s", self.tau_f())?;

        if self.cdbs {
            writeln!(f)?;
            writeln!(f, "cDBS Parameters")?;
            writeln!(f, "---------------")?;
            writeln!(f, "frequency   : {} Hz", self.cdbs_f)?;
            writeln!(f, "amplitude   : {} mA", self.cdbs_amp)?;
            writeln!(f, "pulse width : {} us", self.cdbs_width)?;
        }

        if self.pdbs {
            writeln!(f)?;
            writeln!(f, "pDBS Parameters")?;
            writeln!(f, "---------------")?;
            writeln!(f, "phase thr  : {} rad", self.pdbs_phase)?;
            writeln!(f, "stim amp   : {} mA", self.pdbs_amp)?;
            writeln!(f, "power thr  : {} dB", self.pdbs_power_thr)?;
            writeln!(f, "ref period : {}", self.pdbs_ref_period)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.n_samples(), 50_000);
        assert_relative_eq!(cfg.fs(), 1000.0);
        assert_relative_eq!(cfg.tau_f(), 0.2397 / 5.0);
        assert_eq!(cfg.regime(), Regime::Pathological);
        assert_eq!(cfg.mode(), StimulationMode::Off);
        assert!(cfg.validate().is_ok());
        assert_eq!(SimulationConfig::options().len(), KEYS.len());
    }

    #[test]
    fn test_sample_count_rounding() {
        let mut cfg = SimulationConfig::default();
        cfg.tstop = 1.0;
        assert_eq!(cfg.n_samples(), 1000);
        cfg.tstop = 1.0005;
        assert_eq!(cfg.n_samples(), 1001);
        cfg.dt = 1e-4;
        cfg.tstop = 0.3;
        assert_eq!(cfg.n_samples(), 3000);
    }

    #[test]
    fn test_coercion_follows_declared_type() {
        let mut cfg = SimulationConfig::default();
        cfg.set("cDBS", "1").unwrap();
        cfg.set("RunID", "7.0").unwrap();
        cfg.set("tstop", "2").unwrap();
        cfg.set("pDBS_power_thr", "-inf").unwrap();
        cfg.set("swift_tau_s", "none").unwrap();

        assert!(cfg.cdbs);
        assert_eq!(cfg.run_id, 7);
        assert_eq!(cfg.tstop, 2.0);
        assert_eq!(cfg.pdbs_power_thr, PowerThreshold::Disabled);
        assert_relative_eq!(cfg.tau_s(), 10.0 / 29.0);

        assert!(matches!(
            cfg.set("dt", "fast"),
            Err(BgtcsError::InvalidParameter(_))
        ));
        assert!(matches!(
            cfg.set("RunID", "1.5"),
            Err(BgtcsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let mut cfg = SimulationConfig::default();
        let ignored = cfg
            .apply_overrides([("tstop", "1"), ("bogus", "3"), ("pDBS", "true")])
            .unwrap();
        assert_eq!(ignored, vec!["bogus".to_string()]);
        assert_eq!(cfg.tstop, 1.0);
        assert!(cfg.pdbs);

        let mut strict = SimulationConfig::default();
        assert!(matches!(
            strict.apply_strict([("bogus", "3")]),
            Err(BgtcsError::UnrecognizedOption(_))
        ));
    }

    #[test]
    fn test_assignment_parsing() {
        assert_eq!(
            parse_assignment("cDBS_f = 100").unwrap(),
            ("cDBS_f".to_string(), "100".to_string())
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=3").is_err());
    }

    #[test]
    fn test_validation() {
        let mut cfg = SimulationConfig::default();
        cfg.swift_s2f = 0.5;
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.stim_target = "phie".into();
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.state_target = "thalamus".into();
        assert!(cfg.validate().is_err());

        let mut cfg = SimulationConfig::default();
        cfg.dt = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_mode_precedence() {
        let mut cfg = SimulationConfig::default();
        cfg.cdbs = true;
        cfg.pdbs = true;
        assert_eq!(cfg.mode(), StimulationMode::Periodic);
        cfg.cdbs = false;
        assert_eq!(cfg.mode(), StimulationMode::PhaseLocked);
    }

    #[test]
    fn test_seed_resolution() {
        let mut cfg = SimulationConfig::default();
        cfg.seed = 42;
        assert_eq!(cfg.resolve_seed(), 42);

        cfg.seed = -1;
        let drawn = cfg.resolve_seed();
        assert!(cfg.seed >= 0);
        assert_eq!(drawn, cfg.seed as u64);
    }

    #[test]
    fn test_summary_sections() {
        let mut cfg = SimulationConfig::default();
        let plain = cfg.to_string();
        assert!(plain.contains("SWIFT Parameters"));
        assert!(!plain.contains("cDBS Parameters"));

        cfg.pdbs = true;
        assert!(cfg.to_string().contains("power thr  : -28.57 dB"));
    }

    #[test]
    fn test_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tstop": 2.5, "cDBS": true, "pDBS_power_thr": "off"}}"#).unwrap();

        let (cfg, ignored) = SimulationConfig::from_json_file(file.path()).unwrap();
        assert!(ignored.is_empty());
        assert_eq!(cfg.tstop, 2.5);
        assert!(cfg.cdbs);
        assert_eq!(cfg.pdbs_power_thr, PowerThreshold::Disabled);
        assert_eq!(cfg.dt, 1e-3);

        assert!(matches!(
            SimulationConfig::from_json_file("/nonexistent/run.json"),
            Err(BgtcsError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_json_reports_unknown_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tstop": 2.5, "tsotp": 9.0, "pDBS": true}}"#).unwrap();

        let (cfg, ignored) = SimulationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(ignored, vec!["tsotp".to_string()]);
        assert_eq!(cfg.tstop, 2.5);
        assert!(cfg.pdbs);
    }

    #[test]
    fn test_json_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2, 3]").unwrap();

        assert!(matches!(
            SimulationConfig::from_json_file(file.path()),
            Err(BgtcsError::DeserializationError(_))
        ));
    }
}
